//! Validation errors surfaced by the enhancement operators.

use thiserror::Error;

/// Errors returned by [`enhance`](crate::pipeline::enhance) and the operators it dispatches to.
///
/// Every variant is a caller-correctable input defect. Nothing here is transient,
/// the operators are pure and retrying with the same input fails the same way.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnhanceError {
    /// A numeric setting is outside its allowed domain.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name as it appears in [`EnhancementParams`](crate::params::EnhancementParams).
        name: &'static str,
        /// Constraint that was violated.
        reason: String,
    },

    /// Histogram matching was requested without a reference image.
    #[error("histogram matching requires a reference image")]
    MissingReference,

    /// Source and reference images have a different number of channels.
    #[error("channel mismatch: image has {image} channel(s), reference has {reference}")]
    ChannelMismatch {
        /// Channel count of the image being enhanced.
        image: usize,
        /// Channel count of the reference image.
        reference: usize,
    },

    /// A zero-area image, or a CLAHE tile that would contain no pixels.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// A raw sample buffer does not describe a valid image.
    #[error("invalid image shape: {0}")]
    InvalidShape(String),
}

impl EnhanceError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        EnhanceError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EnhanceError>;
