use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lifeconfig::GpuPower;

#[derive(Parser, Debug)]
#[command(
    name = "lifepaper",
    author,
    version,
    about = "Conway's Game of Life evolved on the GPU, one cell per pixel"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Settings shared by the window and headless modes. Each one overrides the
/// corresponding configuration file value.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Configuration file to load instead of the discovered one.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Chance (0, 1] that a cell starts alive after a reseed.
    #[arg(long, value_name = "P", value_parser = parse_probability)]
    pub probability: Option<f64>,

    /// Fixed RNG seed for reproducible reseeds.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Cap on simulated generations per second.
    #[arg(long, value_name = "FPS", value_parser = parse_fps)]
    pub fps: Option<f32>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Adapter preference: `low` or `high`.
    #[arg(long, value_name = "POWER", value_parser = parse_power)]
    pub power: Option<GpuPower>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the simulation headless on the CPU and print each generation's
    /// population.
    Simulate(SimulateArgs),
    /// Inspect configuration.
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Grid size in cells.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, default_value = "64x64")]
    pub size: (u32, u32),

    /// Number of generations to compute after the initial seed.
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub generations: u64,
}

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file path that would be loaded.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{w}'"))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{h}'"))?;
    if width == 0 || height == 0 {
        return Err("dimensions must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_fps(value: &str) -> Result<f32, String> {
    let fps = value
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid FPS '{value}'"))?;
    if lifeconfig::interval_for_fps(fps).is_none() {
        return Err("FPS must be a positive number".into());
    }
    Ok(fps)
}

pub fn parse_probability(value: &str) -> Result<f64, String> {
    let probability = value
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid probability '{value}'"))?;
    lifeconfig::validate_probability(probability).map_err(|err| err.to_string())?;
    Ok(probability)
}

pub fn parse_power(value: &str) -> Result<GpuPower, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" => Ok(GpuPower::Low),
        "high" | "high-performance" => Ok(GpuPower::High),
        _ => Err("unknown power preference (expected low or high)".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_size(" 64X48 ").unwrap(), (64, 48));
        assert!(parse_size("0x10").is_err());
        assert!(parse_size("1280").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn rejects_non_positive_fps() {
        assert_eq!(parse_fps("30").unwrap(), 30.0);
        assert!(parse_fps("0").is_err());
        assert!(parse_fps("-4").is_err());
        assert!(parse_fps("fast").is_err());
    }

    #[test]
    fn probability_must_be_in_range() {
        assert_eq!(parse_probability("0.25").unwrap(), 0.25);
        assert_eq!(parse_probability("1").unwrap(), 1.0);
        assert!(parse_probability("0").is_err());
        assert!(parse_probability("1.01").is_err());
    }

    #[test]
    fn parses_power() {
        assert_eq!(parse_power("HIGH").unwrap(), GpuPower::High);
        assert_eq!(parse_power("low").unwrap(), GpuPower::Low);
        assert!(parse_power("turbo").is_err());
    }

    #[test]
    fn simulate_defaults() {
        let cli = Cli::try_parse_from(["lifepaper", "simulate"]).unwrap();
        match cli.command {
            Some(Command::Simulate(args)) => {
                assert_eq!(args.size, (64, 64));
                assert_eq!(args.generations, 10);
                assert!(args.overrides.seed.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
