//! Error types for slabtrace.

use thiserror::Error;

/// Everything that can go wrong while generating rays, testing hits,
/// shading a frame or talking to the compute backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TraceError {
    /// A direction vector had zero (or non-finite) length and could not be normalized.
    #[error("cannot normalize a zero-length direction")]
    ZeroLengthDirection,

    /// A model matrix could not be inverted.
    #[error("model matrix is singular and has no inverse")]
    SingularTransform,

    /// The sky gradient was sampled before `set_sky_colors` was called.
    #[error("sky colors have not been configured on the camera")]
    SkyNotConfigured,

    /// A texture was looked up by a name that was never registered.
    #[error("no texture named '{name}' is registered")]
    TextureNotFound { name: String },

    /// A framebuffer with a zero dimension was requested.
    #[error("framebuffer must be at least 1x1, got {width}x{height}")]
    EmptyFramebuffer { width: u32, height: u32 },

    /// Adapter, device or buffer-mapping failure in the GPU backend.
    #[error("GPU error: {0}")]
    Gpu(String),
}

pub type Result<T> = std::result::Result<T, TraceError>;
