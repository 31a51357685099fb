use crate::texture::TextureId;
use thiserror::Error;

/// Errors surfaced by a [`DrawSurface`](crate::DrawSurface) and its collaborators.
///
/// Bad pixel coordinates are normally swallowed; only a surface configured
/// with [`BoundsPolicy::Strict`](crate::BoundsPolicy::Strict) reports them.
/// Context and upload failures are passed through untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("pixel ({x}, {y}) is outside the {width}x{height} surface")]
    OutOfRange {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    #[error("drawing context failed: {0}")]
    Context(String),

    #[error("texture upload failed: {0}")]
    Upload(String),

    #[error("invalid surface dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("color stop offset {0} is outside [0, 1]")]
    InvalidColorStop(f32),

    #[error("invalid surface config: {0}")]
    Config(String),

    #[error("{0} is being read and cannot be written")]
    TextureBusy(TextureId),
}

pub type Result<T> = std::result::Result<T, SurfaceError>;
