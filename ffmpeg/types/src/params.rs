/*!
    Decoder session parameters.
*/

use std::collections::BTreeSet;
use std::time::Duration;

use crate::{DEFAULT_SEEK_ACCURACY_US, MediaFormat};

/**
    How a seek decides which decoded frame to emit first.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SeekMode {
    /// Drop frames until the target timestamp is reached.
    #[default]
    Precise,
    /// Emit the first decodable frame after the container seek.
    AnyFrame,
}

/**
    Immutable snapshot of everything a decoder session needs.

    Built once per session and consumed by `Decoder::init`.
*/
#[derive(Clone, Debug)]
pub struct DecoderParameters {
    pub uri: String,
    /// Upper bound on a single `decode` call when the caller passes none.
    pub timeout: Duration,
    /// Where decoding starts, in microseconds. 0 means the beginning.
    pub start_offset_us: i64,
    /// Where decoding ends, in microseconds. 0 means the end of the media.
    pub end_offset_us: i64,
    pub seek_accuracy_us: i64,
    pub seek_mode: SeekMode,
    /// Only read headers; `decode` yields nothing.
    pub header_only: bool,
    /// Keep at most one undelivered record per stream, the newest.
    pub prevent_staleness: bool,
    pub formats: BTreeSet<MediaFormat>,
}

impl DecoderParameters {
    /**
        Default per-call decode timeout.
    */
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            timeout: Self::DEFAULT_TIMEOUT,
            start_offset_us: 0,
            end_offset_us: 0,
            seek_accuracy_us: DEFAULT_SEEK_ACCURACY_US,
            seek_mode: SeekMode::default(),
            header_only: false,
            prevent_staleness: false,
            formats: BTreeSet::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_start_offset_us(mut self, start_offset_us: i64) -> Self {
        self.start_offset_us = start_offset_us.max(0);
        self
    }

    pub fn with_end_offset_us(mut self, end_offset_us: i64) -> Self {
        self.end_offset_us = end_offset_us.max(0);
        self
    }

    pub fn with_seek_accuracy_us(mut self, seek_accuracy_us: i64) -> Self {
        self.seek_accuracy_us = seek_accuracy_us.max(0);
        self
    }

    pub fn with_seek_mode(mut self, seek_mode: SeekMode) -> Self {
        self.seek_mode = seek_mode;
        self
    }

    pub fn with_header_only(mut self, header_only: bool) -> Self {
        self.header_only = header_only;
        self
    }

    pub fn with_prevent_staleness(mut self, prevent_staleness: bool) -> Self {
        self.prevent_staleness = prevent_staleness;
        self
    }

    /**
        Add a stream format. A format for the same `(type, index)` replaces
        the existing one.
    */
    pub fn with_format(mut self, format: MediaFormat) -> Self {
        self.formats.replace(format);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StreamIndex, VideoFormat};

    #[test]
    fn defaults() {
        let params = DecoderParameters::new("clip.mp4");
        assert_eq!(params.timeout, Duration::from_secs(600));
        assert_eq!(params.seek_accuracy_us, 10);
        assert_eq!(params.seek_mode, SeekMode::Precise);
        assert!(params.formats.is_empty());
    }

    #[test]
    fn with_format_replaces_same_stream() {
        let params = DecoderParameters::new("clip.mp4")
            .with_format(MediaFormat::video(
                StreamIndex::Index(0),
                VideoFormat::new(64, 64),
            ))
            .with_format(MediaFormat::video(
                StreamIndex::Index(0),
                VideoFormat::new(32, 32),
            ));
        assert_eq!(params.formats.len(), 1);
        let format = params.formats.iter().next().unwrap();
        assert_eq!(format.as_video().unwrap().width, 32);
    }

    #[test]
    fn negative_offsets_clamp_to_zero() {
        let params = DecoderParameters::new("clip.mp4")
            .with_start_offset_us(-5)
            .with_end_offset_us(-1);
        assert_eq!(params.start_offset_us, 0);
        assert_eq!(params.end_offset_us, 0);
    }
}
