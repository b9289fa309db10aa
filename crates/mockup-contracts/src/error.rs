use uuid::Uuid;

/// Rejected state transitions on the studio container.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("at least one prompt entry must remain")]
    LastPrompt,

    #[error("unknown prompt entry {0}")]
    UnknownPrompt(Uuid),

    #[error("at least one {0} must stay selected")]
    LastSelection(&'static str),

    #[error("unknown result {0}")]
    UnknownResult(Uuid),

    #[error("result {0} is already being upscaled")]
    UpscaleInProgress(Uuid),

    #[error("no source image loaded")]
    NoSourceImage,
}
