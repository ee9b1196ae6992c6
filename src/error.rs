use alloc::string::{String, ToString};

/// Longest diagnostic carried across the decode/encode boundary, in bytes.
///
/// Matches the fixed message field of the C ABI (256 bytes including the
/// terminating NUL).
pub const MAX_MESSAGE_LEN: usize = 255;

/// Broad failure category, stable across the C ABI.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input ended before a declared length was satisfied.
    Bounds,
    /// Malformed chunk, header, checksum, or compressed data, or an
    /// unsupported color configuration.
    Format,
    /// Memory exhaustion or a [`crate::Limits`] violation.
    Allocation,
    /// Caller-supplied dimensions or buffer sizes are inconsistent.
    InvalidInput,
}

/// Faults raised inside the pipeline.
///
/// Every fault is propagated with `?` to the orchestrator that owns the
/// call, which converts it exactly once into a [`DecodeError`] or
/// [`EncodeError`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PngError {
    #[error("out of bounds: {requested} bytes requested at offset {offset}, {remaining} remaining")]
    OutOfBounds {
        offset: usize,
        requested: usize,
        remaining: usize,
    },

    #[error("not a PNG file (bad signature)")]
    InvalidSignature,

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("malformed {chunk} chunk: {reason}")]
    MalformedChunk { chunk: String, reason: String },

    #[error("CRC mismatch in {0} chunk")]
    CrcMismatch(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid image data: {0}")]
    InvalidData(String),

    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("image {width}x{height} exceeds the PNG dimension range")]
    DimensionsOutOfRange { width: usize, height: usize },

    #[error("buffer size mismatch: need {needed} bytes, got {actual}")]
    SizeMismatch { needed: usize, actual: usize },

    #[error("allocation of {0} bytes failed")]
    AllocationFailed(usize),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
}

impl PngError {
    /// Category of this fault.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfBounds { .. } => ErrorKind::Bounds,
            Self::InvalidSignature
            | Self::InvalidHeader(_)
            | Self::MalformedChunk { .. }
            | Self::CrcMismatch(_)
            | Self::Unsupported(_)
            | Self::InvalidData(_) => ErrorKind::Format,
            Self::AllocationFailed(_) | Self::LimitExceeded(_) | Self::DimensionsTooLarge { .. } => {
                ErrorKind::Allocation
            }
            Self::InvalidDimensions { .. }
            | Self::DimensionsOutOfRange { .. }
            | Self::SizeMismatch { .. } => ErrorKind::InvalidInput,
        }
    }

    pub(crate) fn malformed(chunk: impl ToString, reason: impl ToString) -> Self {
        Self::MalformedChunk {
            chunk: chunk.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Render `err` and cut it down to [`MAX_MESSAGE_LEN`] bytes on a char
/// boundary.
fn bounded_message(err: &PngError) -> String {
    let mut message = err.to_string();
    if message.len() > MAX_MESSAGE_LEN {
        let mut end = MAX_MESSAGE_LEN;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    message
}

/// Failure surfaced by [`crate::decode`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DecodeError {
    kind: ErrorKind,
    message: String,
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Diagnostic captured at the fault, at most [`MAX_MESSAGE_LEN`] bytes.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<PngError> for DecodeError {
    fn from(err: PngError) -> Self {
        Self {
            kind: err.kind(),
            message: bounded_message(&err),
        }
    }
}

/// Failure surfaced by [`crate::encode`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EncodeError {
    kind: ErrorKind,
    message: String,
}

impl EncodeError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Diagnostic captured at the fault, at most [`MAX_MESSAGE_LEN`] bytes.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<PngError> for EncodeError {
    fn from(err: PngError) -> Self {
        Self {
            kind: err.kind(),
            message: bounded_message(&err),
        }
    }
}
