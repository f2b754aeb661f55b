/*!
    Error types shared across the ffmpeg crates.
*/

use thiserror::Error as ThisError;

/**
    Errors produced while probing, decoding, or sampling media.

    Timeouts and end of stream are not errors. Decoding reports both as
    `Ok(None)`, so callers only see this type for real failures.
*/
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum Error {
    // ── Caller input ──────────────────────────────────────────────────
    #[error("configuration error: {0}")]
    Configuration(String),

    // ── Sampler / format negotiation ──────────────────────────────────
    #[error("format negotiation failed: {0}")]
    FormatNegotiation(String),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    // ── Backend ───────────────────────────────────────────────────────
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("codec error: {0}")]
    Codec(String),
    #[error("invalid data: {0}")]
    InvalidData(String),

    // ── Output records ────────────────────────────────────────────────
    #[error("payload of {actual} bytes does not match declared size of {expected} bytes")]
    Consistency { expected: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn format_negotiation(message: impl Into<String>) -> Self {
        Self::FormatNegotiation(message.into())
    }

    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    /**
        Returns true for errors that only affect a single packet or frame.

        The decoder logs these and keeps going instead of failing the call.
    */
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FormatNegotiation(_) | Self::UnsupportedFormat(_) | Self::Decode(_)
        )
    }
}

/**
    Type alias for results that may return an [`Error`].
*/
pub type Result<T> = std::result::Result<T, Error>;
