use thiserror::Error;

use crate::FontDescriptor;

/// Errors surfaced by atlas creation and growth.
#[derive(Error, Debug)]
pub enum AtlasError {
    /// The font resource could not be read or parsed. Fatal for the descriptor.
    #[error("font resource {resource:?} unavailable: {reason}")]
    ResourceUnavailable { resource: String, reason: String },

    /// Packing would grow the texture past the configured limit.
    #[error("atlas for {descriptor} needs {required}px, limit is {limit}px")]
    AtlasOverflow {
        descriptor: FontDescriptor,
        required: u32,
        limit: u32,
    },

    #[error("failed to parse atlas config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("atlas config i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("atlas image: {0}")]
    Image(#[from] image::ImageError),
}

impl AtlasError {
    pub(crate) fn unavailable(resource: &str, reason: impl ToString) -> Self {
        Self::ResourceUnavailable {
            resource: resource.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AtlasError>;
