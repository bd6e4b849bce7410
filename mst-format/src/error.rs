//! Error types for the MST codec.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while encoding or decoding an MST stream.
///
/// Truncated streams surface as [`Error::Io`] with `UnexpectedEof` rather
/// than silently zero-filling fields; partially written files fail loudly
/// at decode time.
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad signature {0:?}, expected \"fwtm\"")]
    BadSignature([u8; 4]),

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),

    #[error("unknown material type tag {0}")]
    UnknownMaterialType(u32),

    #[error("unknown texture format {0}")]
    UnknownTextureFormat(u16),

    #[error("unknown texture pixel type {0}")]
    UnknownPixelType(u16),

    #[error("unknown texture compression {0}")]
    UnknownCompression(u16),

    #[error("malformed properties: {0}")]
    MalformedProperties(&'static str),

    #[error("texture has no decodable pixel layout: {0:?}")]
    UndecodableTexture(crate::texture::TextureFormat),

    #[error("texture payload too short: need {expected} bytes, have {actual}")]
    ShortTexturePayload { expected: usize, actual: usize },

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
}
