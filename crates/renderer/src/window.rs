use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use scheduler::FrameHost;
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::error::RendererError;
use crate::gpu::GpuBackend;
use crate::sim::{FrameOutcome, Simulation};
use crate::types::{GridSize, RendererConfig};

/// Asks winit for another `RedrawRequested`.
struct WindowHost {
    window: Arc<Window>,
}

impl FrameHost for WindowHost {
    fn request_frame(&self) {
        self.window.request_redraw();
    }
}

/// Opens a window and runs the simulation until it is closed or a frame
/// fails.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn run(self) -> Result<()> {
        run_window(self.config)
    }
}

fn run_window(config: RendererConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let (width, height) = config.window_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let inner = window.inner_size();
    let size = GridSize::new(inner.width, inner.height)
        .or_else(|| GridSize::new(width, height))
        .context("window has no drawable area")?;

    let backend = GpuBackend::new(window.as_ref(), size, config.power)
        .context("failed to initialise GPU backend")?;
    let adapter = backend.adapter_name().to_string();
    let mut simulation = Simulation::new(backend, size, &config.simulation)
        .context("failed to create simulation")?;
    tracing::info!(
        %size,
        %adapter,
        interval_ms = config.simulation.frame_interval.as_secs_f64() * 1000.0,
        "simulation ready"
    );

    let host = WindowHost {
        window: Arc::clone(&window),
    };
    host.request_frame();

    let start = Instant::now();
    let mut failure: Option<RendererError> = None;
    event_loop
        .run(|event, elwt| {
            let Event::WindowEvent { window_id, event } = event else {
                return;
            };
            if window_id != window.id() {
                return;
            }
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                WindowEvent::Resized(new_size) => {
                    if let Err(err) = simulation.resize(new_size.width, new_size.height) {
                        tracing::error!(error = %err, "resize failed");
                        failure = Some(err);
                        elwt.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    match simulation.on_frame(start.elapsed(), &host) {
                        Ok(FrameOutcome::Executed { generation }) => {
                            tracing::trace!(generation, "generation presented");
                        }
                        Ok(FrameOutcome::Skipped) => {
                            tracing::debug!("frame skipped");
                        }
                        Ok(FrameOutcome::Throttled) => {}
                        Err(err) => {
                            tracing::error!(error = %err, "simulation stopped");
                            failure = Some(err);
                            elwt.exit();
                        }
                    }
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))?;

    match failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
