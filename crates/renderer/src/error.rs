use std::fmt;

use scheduler::SchedulerError;

use crate::types::{GridSize, Slot};

/// Which of the two compiled programs a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    Render,
    Compute,
}

impl fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramKind::Render => f.write_str("render"),
            ProgramKind::Compute => f.write_str("compute"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStageKind::Vertex => f.write_str("vertex"),
            ShaderStageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failures surfaced by the simulation core and its graphics backends.
///
/// All of them are fatal to the frame loop; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("graphics initialization failed: {0:#}")]
    Init(anyhow::Error),
    #[error("{program} program: {stage} shader failed to compile:\n{diagnostic}")]
    Compile {
        program: ProgramKind,
        stage: ShaderStageKind,
        diagnostic: String,
    },
    #[error("{program} program failed to link:\n{diagnostic}")]
    Link {
        program: ProgramKind,
        diagnostic: String,
    },
    #[error("framebuffer has no colour attachment")]
    MissingAttachment,
    #[error("texture {0:?} is both the framebuffer attachment and the sampled input")]
    AliasedAttachment(Slot),
    #[error("texture upload of {actual} bytes does not match a {size} grid ({expected} bytes)")]
    UploadSize {
        size: GridSize,
        expected: usize,
        actual: usize,
    },
    #[error("seed probability {0} is outside [0, 1]")]
    InvalidProbability(f64),
    #[error("{size} grid exceeds the device texture limit of {max}")]
    TextureTooLarge { size: GridSize, max: u32 },
    #[error("{0} called outside of an open frame")]
    NoFrame(&'static str),
    #[error("graphics context lost: {0}")]
    ContextLost(String),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

