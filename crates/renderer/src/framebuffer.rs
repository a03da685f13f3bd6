use crate::error::RendererError;
use crate::types::Slot;

/// Off-screen render target for the compute pass.
///
/// Only tracks which store slot the colour attachment points at; the
/// backend resolves the slot to a texture when the pass is encoded.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    attachment: Option<Slot>,
    bound: bool,
}

impl Framebuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-points the colour attachment.
    pub fn attach(&mut self, slot: Slot) {
        self.attachment = Some(slot);
    }

    pub fn attachment(&self) -> Option<Slot> {
        self.attachment
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Makes the framebuffer the draw target for a pass that samples
    /// `sampled`. Returns the attached slot.
    pub fn bind(&mut self, sampled: Slot) -> Result<Slot, RendererError> {
        let target = self.attachment.ok_or(RendererError::MissingAttachment)?;
        if target == sampled {
            return Err(RendererError::AliasedAttachment(target));
        }
        self.bound = true;
        Ok(target)
    }

    /// Returns drawing to the screen.
    pub fn unbind(&mut self) {
        self.bound = false;
    }
}
