//! Host-memory backend running the reference kernel.
//!
//! Used by the headless `simulate` command and by tests. Textures are
//! [`Generation`]s and the "screen" is a copy of the last rendered one.

use crate::backend::{FrameStatus, GraphicsBackend};
use crate::error::RendererError;
use crate::grid::{self, Generation};
use crate::types::{DeltaUniform, GridSize};

#[derive(Debug, Default)]
pub struct CpuBackend {
    viewport: Option<GridSize>,
    delta: DeltaUniform,
    in_frame: bool,
    presented: Option<Generation>,
    compute_passes: u64,
    render_passes: u64,
    frames: u64,
    uploads: u64,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport(&self) -> Option<GridSize> {
        self.viewport
    }

    pub fn delta(&self) -> DeltaUniform {
        self.delta
    }

    /// Last generation drawn by a render pass.
    pub fn presented(&self) -> Option<&Generation> {
        self.presented.as_ref()
    }

    pub fn compute_passes(&self) -> u64 {
        self.compute_passes
    }

    pub fn render_passes(&self) -> u64 {
        self.render_passes
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    fn ensure_frame(&self, operation: &'static str) -> Result<(), RendererError> {
        if self.in_frame {
            Ok(())
        } else {
            Err(RendererError::NoFrame(operation))
        }
    }
}

impl GraphicsBackend for CpuBackend {
    type Texture = Generation;

    fn create_texture(&mut self, size: GridSize) -> Result<Generation, RendererError> {
        Ok(Generation::dead(size))
    }

    fn upload(
        &mut self,
        texture: &mut Generation,
        size: GridSize,
        texels: &[u8],
    ) -> Result<(), RendererError> {
        *texture = Generation::from_texels(size, texels.to_vec())?;
        self.uploads += 1;
        Ok(())
    }

    fn set_viewport(&mut self, size: GridSize) -> Result<(), RendererError> {
        self.viewport = Some(size);
        Ok(())
    }

    fn set_delta(&mut self, delta: DeltaUniform) -> Result<(), RendererError> {
        self.delta = delta;
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<FrameStatus, RendererError> {
        self.in_frame = true;
        Ok(FrameStatus::Ready)
    }

    fn compute_pass(
        &mut self,
        target: &mut Generation,
        source: &Generation,
    ) -> Result<(), RendererError> {
        self.ensure_frame("compute_pass")?;
        grid::step_into(source, target, self.delta);
        self.compute_passes += 1;
        Ok(())
    }

    fn render_pass(&mut self, source: &Generation) -> Result<(), RendererError> {
        self.ensure_frame("render_pass")?;
        self.presented = Some(source.clone());
        self.render_passes += 1;
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RendererError> {
        self.ensure_frame("end_frame")?;
        self.in_frame = false;
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_require_open_frame() {
        let mut backend = CpuBackend::new();
        let size = GridSize::new(3, 3).unwrap();
        let mut target = backend.create_texture(size).unwrap();
        let source = Generation::dead(size);
        assert!(matches!(
            backend.compute_pass(&mut target, &source),
            Err(RendererError::NoFrame("compute_pass"))
        ));
        assert!(matches!(
            backend.end_frame(),
            Err(RendererError::NoFrame("end_frame"))
        ));
    }

    #[test]
    fn compute_pass_uses_uploaded_delta() {
        let mut backend = CpuBackend::new();
        let size = GridSize::new(5, 5).unwrap();
        let source = Generation::from_cells(size, [(1, 2), (2, 2), (3, 2)]);
        let mut target = backend.create_texture(size).unwrap();
        backend.set_delta(size.delta()).unwrap();

        backend.begin_frame().unwrap();
        backend.compute_pass(&mut target, &source).unwrap();
        backend.render_pass(&target).unwrap();
        backend.end_frame().unwrap();

        assert_eq!(target, source.step());
        assert_eq!(backend.presented(), Some(&target));
        assert_eq!(backend.frames_presented(), 1);
    }

    #[test]
    fn upload_rejects_wrong_length() {
        let mut backend = CpuBackend::new();
        let size = GridSize::new(2, 2).unwrap();
        let mut texture = backend.create_texture(size).unwrap();
        assert!(backend.upload(&mut texture, size, &[0; 8]).is_err());
        assert_eq!(backend.uploads(), 0);
    }
}
