/*!
    Reader configuration.
*/

use std::time::Duration;

use serde::Deserialize;

use ffmpeg_types::{DEFAULT_SEEK_ACCURACY_US, DecoderParameters};

/**
    Everything needed to open a [`VideoReader`](crate::VideoReader).

    Missing fields take their defaults when deserialized, so
    `{"uri": "clip.mp4"}` is a complete config.
*/
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Ignored when the reader is built over an in-memory buffer.
    pub uri: String,
    /// Stream selector, e.g. `video` or `audio:1`.
    pub stream: String,
    pub start_offset_secs: f64,
    pub seek_accuracy_us: i64,
    /// Start at the first decodable frame instead of the exact offset.
    pub any_frame: bool,
    /// Upper bound on one `next` call.
    pub timeout_secs: f64,
}

impl ReaderConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = stream.into();
        self
    }

    pub fn with_start_offset_secs(mut self, start_offset_secs: f64) -> Self {
        self.start_offset_secs = start_offset_secs;
        self
    }

    /**
        How far before the seek target, in microseconds, a precise seek may
        land. Negative values count as zero.
    */
    pub fn with_seek_accuracy_us(mut self, seek_accuracy_us: i64) -> Self {
        self.seek_accuracy_us = seek_accuracy_us.max(0);
        self
    }

    pub fn with_any_frame(mut self, any_frame: bool) -> Self {
        self.any_frame = any_frame;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: f64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /**
        The timeout as a duration. Zero, negative or unrepresentable values
        fall back to the decoder default.
    */
    pub fn timeout(&self) -> Duration {
        match Duration::try_from_secs_f64(self.timeout_secs) {
            Ok(timeout) if !timeout.is_zero() => timeout,
            _ => DecoderParameters::DEFAULT_TIMEOUT,
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            stream: "video".to_string(),
            start_offset_secs: 0.0,
            seek_accuracy_us: DEFAULT_SEEK_ACCURACY_US,
            any_frame: false,
            timeout_secs: DecoderParameters::DEFAULT_TIMEOUT.as_secs_f64(),
        }
    }
}
