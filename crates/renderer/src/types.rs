use std::fmt;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use lifeconfig::{GpuPower, LifeConfig};

/// Drawable dimensions of the automaton grid in physical pixels (one cell
/// per texel). Both sides are always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridSize {
    width: u32,
    height: u32,
}

impl GridSize {
    /// Returns `None` for zero-area requests.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            Some(Self { width, height })
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Per-texel step in normalised texture coordinates.
    pub fn delta(&self) -> DeltaUniform {
        DeltaUniform::new(1.0 / self.width as f32, 1.0 / self.height as f32)
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One of the two generation textures owned by the texture store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }
}

/// `(1/width, 1/height)` as laid out in the compute program's std140 block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DeltaUniform {
    pub delta: [f32; 2],
    _padding: [f32; 2],
}

impl DeltaUniform {
    pub fn new(dx: f32, dy: f32) -> Self {
        Self {
            delta: [dx, dy],
            _padding: [0.0; 2],
        }
    }
}

impl Default for DeltaUniform {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Adapter power preference passed through to wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

impl From<GpuPower> for GpuPowerPreference {
    fn from(value: GpuPower) -> Self {
        match value {
            GpuPower::Low => GpuPowerPreference::Low,
            GpuPower::High => GpuPowerPreference::High,
        }
    }
}

/// Knobs the simulation core needs regardless of backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOptions {
    /// Minimum spacing between executed frames.
    pub frame_interval: Duration,
    /// Chance that a texel starts alive when a generation is reseeded.
    pub seed_probability: f64,
    /// Fixed RNG seed for reproducible reseeds; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            frame_interval: lifeconfig::DEFAULT_FRAME_INTERVAL,
            seed_probability: lifeconfig::DEFAULT_SEED_PROBABILITY,
            seed: None,
        }
    }
}

/// Immutable configuration passed to the windowed renderer at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub window_size: (u32, u32),
    /// Title shown by the window manager.
    pub title: String,
    /// Adapter selection preference.
    pub power: GpuPowerPreference,
    /// Pacing and seeding parameters.
    pub simulation: SimulationOptions,
}

impl RendererConfig {
    pub fn from_config(config: &LifeConfig) -> Self {
        Self {
            window_size: (config.window.width, config.window.height),
            title: config.window.title.clone(),
            power: config.gpu.power.into(),
            simulation: SimulationOptions {
                frame_interval: config.frame_interval,
                seed_probability: config.seed_probability,
                seed: config.seed,
            },
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::from_config(&LifeConfig::default())
    }
}
