use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures while building or serializing a glTF document.
#[derive(Debug, Error)]
pub enum Error {
    #[error("mesh data error: {0}")]
    Format(#[from] mst_format::Error),

    #[error("texture image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("document serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
