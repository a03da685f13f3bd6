//! GPU-resident Game of Life.
//!
//! Every texel of a window-sized texture is one cell. Two such textures
//! ping-pong: each executed frame a fragment program reads the current
//! generation and writes the next into an off-screen framebuffer, a second
//! program draws that result to the window, and the two swap roles.
//!
//! ```text
//!   winit RedrawRequested
//!          │ timestamp
//!          ▼
//!   Simulation::on_frame ──▶ FrameScheduler::begin ── Throttled ──┐
//!          │ Execute                                              │
//!          ▼                                                      │
//!   compute_pass(next ◀─ current) ─▶ render_pass(next) ─▶ swap    │
//!          │                                                      │
//!          └──────────────▶ FrameHost::request_frame ◀────────────┘
//! ```
//!
//! [`Simulation`] is generic over a [`GraphicsBackend`]: [`GpuBackend`]
//! drives wgpu and a window surface, [`CpuBackend`] runs the same rule on
//! host memory for headless runs and tests.

mod backend;
mod compile;
mod cpu;
mod error;
mod framebuffer;
mod gpu;
pub mod grid;
mod sim;
mod store;
mod types;
mod window;

pub use backend::{FrameStatus, GraphicsBackend};
pub use compile::{
    compile, compute_program, render_program, CompiledProgram, COMPUTE_FRAGMENT_GLSL,
    QUAD_VERTEX_GLSL, RENDER_FRAGMENT_GLSL,
};
pub use cpu::CpuBackend;
pub use error::{ProgramKind, RendererError, ShaderStageKind};
pub use framebuffer::Framebuffer;
pub use gpu::{GpuBackend, GpuTexture};
pub use grid::Generation;
pub use scheduler::{FrameHost, FrameScheduler, SchedulerState, Tick};
pub use sim::{FrameOutcome, Simulation};
pub use store::TextureStore;
pub use types::{
    DeltaUniform, GpuPowerPreference, GridSize, RendererConfig, SimulationOptions, Slot,
};
pub use window::Renderer;
