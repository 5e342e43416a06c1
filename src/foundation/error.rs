use std::fmt;

/// Convenience result alias used across the crate.
pub type ReelResult<T> = Result<T, ReelError>;

/// Pipeline stage a fatal render error originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderStage {
    /// Opening narration/music/background handles.
    OpenInputs,
    /// Background fit-and-crop.
    Background,
    /// Narration decode and music mixing.
    AudioMix,
    /// Per-frame composition.
    FrameRender,
    /// Streaming frames into the encoder.
    Encode,
    /// Encoder shutdown and container finalization.
    Finalize,
}

impl RenderStage {
    /// Stable lowercase stage name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenInputs => "open-inputs",
            Self::Background => "background",
            Self::AudioMix => "audio-mix",
            Self::FrameRender => "frame-render",
            Self::Encode => "encode",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller supplied unusable input (missing narration, undecodable media, bad path).
    #[error("invalid input at {stage}: {message}")]
    Input { stage: RenderStage, message: String },

    /// The environment failed (encoder missing or crashed, filesystem errors).
    #[error("{stage} failed: {message}")]
    Environment { stage: RenderStage, message: String },

    #[error("render cancelled during {0}")]
    Cancelled(RenderStage),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn input(stage: RenderStage, msg: impl Into<String>) -> Self {
        Self::Input {
            stage,
            message: msg.into(),
        }
    }

    pub fn environment(stage: RenderStage, msg: impl Into<String>) -> Self {
        Self::Environment {
            stage,
            message: msg.into(),
        }
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Stage the error is attributed to, when it came out of the render pipeline.
    pub fn stage(&self) -> Option<RenderStage> {
        match self {
            Self::Input { stage, .. } | Self::Environment { stage, .. } => Some(*stage),
            Self::Cancelled(stage) => Some(*stage),
            _ => None,
        }
    }

    /// `true` when the failure is attributable to caller-provided input.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Input { .. } | Self::Serde(_))
    }

    /// Re-attribute a stage-less error to `stage` as an environment failure.
    ///
    /// Errors that already carry a stage are returned unchanged.
    pub(crate) fn at_stage(self, stage: RenderStage) -> Self {
        match self {
            Self::Validation(message) => Self::Input { stage, message },
            Self::Serde(message) => Self::Input { stage, message },
            Self::Other(e) => Self::Environment {
                stage,
                message: format!("{e:#}"),
            },
            staged => staged,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
