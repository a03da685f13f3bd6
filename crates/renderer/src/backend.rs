use crate::error::RendererError;
use crate::types::{DeltaUniform, GridSize};

/// Whether a frame can be drawn this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Ready,
    /// The presentation target is transiently unavailable. Nothing was
    /// encoded and the frame must be dropped without touching state.
    Skip,
}

/// Graphics capabilities the simulation core drives.
///
/// A step is always `begin_frame`, `compute_pass`, `render_pass`,
/// `end_frame`, in that order. Passes issued outside an open frame are
/// rejected with [`RendererError::NoFrame`].
pub trait GraphicsBackend {
    type Texture;

    /// Allocates an RGBA8 texture sampled with nearest filtering and
    /// clamp-to-edge addressing. Contents are undefined until uploaded.
    fn create_texture(&mut self, size: GridSize) -> Result<Self::Texture, RendererError>;

    /// Replaces the texture's storage with `texels` at `size`, discarding
    /// any previous contents.
    fn upload(
        &mut self,
        texture: &mut Self::Texture,
        size: GridSize,
        texels: &[u8],
    ) -> Result<(), RendererError>;

    fn set_viewport(&mut self, size: GridSize) -> Result<(), RendererError>;

    fn set_delta(&mut self, delta: DeltaUniform) -> Result<(), RendererError>;

    fn begin_frame(&mut self) -> Result<FrameStatus, RendererError>;

    /// Runs the transition program over a full-screen quad, sampling
    /// `source` and writing the off-screen attachment `target`.
    fn compute_pass(
        &mut self,
        target: &mut Self::Texture,
        source: &Self::Texture,
    ) -> Result<(), RendererError>;

    /// Draws `source` to the presentation target.
    fn render_pass(&mut self, source: &Self::Texture) -> Result<(), RendererError>;

    /// Submits everything encoded since `begin_frame` and presents.
    fn end_frame(&mut self) -> Result<(), RendererError>;
}
