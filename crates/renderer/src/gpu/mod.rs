//! wgpu backend.
//!
//! - `context` owns instance, adapter, device and the window surface.
//! - `pipeline` builds the compute and render pipelines plus the quad
//!   vertex layout from the compiled programs.
//! - `state` implements [`crate::GraphicsBackend`] on top of both.

mod context;
mod pipeline;
mod state;

pub use state::{GpuBackend, GpuTexture};
