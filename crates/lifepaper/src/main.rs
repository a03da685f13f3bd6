mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::{Command, ConfigAction};
use paths::AppPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Simulate(args)) => run::simulate(args),
        Some(Command::Config(config_cmd)) => match config_cmd.action {
            ConfigAction::Where => run_config_where(&cli.run.overrides),
        },
        None => run::run(cli.run),
    }
}

fn run_config_where(overrides: &cli::Overrides) -> Result<()> {
    let path = match &overrides.config {
        Some(path) => path.clone(),
        None => AppPaths::discover()?.config_file(),
    };
    let status = if path.exists() { "present" } else { "missing" };
    println!("{} ({status})", path.display());
    Ok(())
}
