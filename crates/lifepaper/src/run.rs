use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use lifeconfig::LifeConfig;
use renderer::{CpuBackend, FrameHost, GridSize, Renderer, RendererConfig, Simulation};
use tracing_subscriber::EnvFilter;

use crate::cli::{Overrides, RunArgs, SimulateArgs};
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads `explicit` if given (it must exist), otherwise the discovered
/// config file, falling back to defaults when that is absent.
pub fn load_config(explicit: Option<&Path>) -> Result<LifeConfig> {
    if let Some(path) = explicit {
        return LifeConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()));
    }

    let path = AppPaths::discover()?.config_file();
    let config = LifeConfig::load_or_default(&path)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    tracing::debug!(path = %path.display(), "configuration resolved");
    Ok(config)
}

fn apply_overrides(config: &mut LifeConfig, overrides: &Overrides) {
    if let Some(probability) = overrides.probability {
        config.seed_probability = probability;
    }
    if let Some(seed) = overrides.seed {
        config.seed = Some(seed);
    }
}

pub fn run(args: RunArgs) -> Result<()> {
    let mut config = load_config(args.overrides.config.as_deref())?;
    apply_overrides(&mut config, &args.overrides);
    if let Some(fps) = args.fps {
        if let Some(interval) = lifeconfig::interval_for_fps(fps) {
            config.frame_interval = interval;
        }
    }
    if let Some((width, height)) = args.size {
        config.window.width = width;
        config.window.height = height;
    }
    if let Some(power) = args.power {
        config.gpu.power = power;
    }
    config.validate()?;

    Renderer::new(RendererConfig::from_config(&config)).run()
}

/// Host stand-in for headless runs; there is no event loop to notify.
struct Headless;

impl FrameHost for Headless {
    fn request_frame(&self) {}
}

pub fn simulate(args: SimulateArgs) -> Result<()> {
    let mut config = load_config(args.overrides.config.as_deref())?;
    apply_overrides(&mut config, &args.overrides);
    config.validate()?;

    let (width, height) = args.size;
    let size = GridSize::new(width, height).context("grid must not be empty")?;
    let options = RendererConfig::from_config(&config).simulation;
    let interval = options.frame_interval;
    let mut simulation = Simulation::new(CpuBackend::new(), size, &options)?;

    println!(
        "generation 0: population {}",
        simulation.store().current().population()
    );
    // Timestamps exactly one interval apart, so every invocation executes.
    let mut timestamp = Duration::ZERO;
    for _ in 0..args.generations {
        simulation.on_frame(timestamp, &Headless)?;
        timestamp += interval;
        println!(
            "generation {}: population {}",
            simulation.generation(),
            simulation.store().current().population()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn overrides_replace_file_values() {
        let mut config = LifeConfig::default();
        let overrides = Overrides {
            config: None,
            probability: Some(0.5),
            seed: Some(12),
        };
        apply_overrides(&mut config, &overrides);
        assert_eq!(config.seed_probability, 0.5);
        assert_eq!(config.seed, Some(12));
    }

    #[test]
    fn explicit_config_must_exist() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("missing.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn explicit_config_is_loaded() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("life.toml");
        fs::write(&path, "version = 1\nseed = 5\nseed_probability = 0.4\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.seed_probability, 0.4);
    }
}
