/*!
    Decoder output records and stream metadata.
*/

use serde::Serialize;

use crate::{MediaFormat, Rational};

/**
    Per-record metadata.

    `format` is the format the payload was sampled to, bound to the concrete
    stream index that produced it.
*/
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecoderHeader {
    pub format: MediaFormat,
    /// Presentation timestamp in microseconds.
    pub pts_us: i64,
    pub key_frame: bool,
    /// Frame rate for video, sample rate for audio, 0 otherwise.
    pub fps: f64,
    /// Position of this record in the session's output sequence.
    pub seqno: u64,
}

/**
    Owned, growable byte buffer holding one sampled frame.
*/
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    pub fn reserve(&mut self, additional: usize) {
        self.0.reserve(additional);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload").field("len", &self.0.len()).finish()
    }
}

/**
    One decoded and sampled frame. Ownership moves to whoever receives it.
*/
#[derive(Clone, Debug)]
pub struct DecoderOutputMessage {
    pub header: DecoderHeader,
    pub payload: Payload,
}

/**
    Header-level description of one container stream.

    For video, `format` carries the source size and pixel format. For
    audio, it carries the source sample format, channel count and rate.
*/
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DecoderMetadata {
    pub format: MediaFormat,
    /// Frame rate for video, sample rate for audio.
    pub fps: f64,
    pub time_base: Rational,
    /// Stream duration in microseconds, 0 when unknown.
    pub duration_us: i64,
    pub codec_name: String,
}

impl DecoderMetadata {
    pub fn duration_secs(&self) -> f64 {
        self.duration_us as f64 / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StreamIndex, VideoFormat};

    #[test]
    fn payload_debug_does_not_dump_bytes() {
        let payload = Payload::from(vec![0u8; 4096]);
        assert_eq!(format!("{payload:?}"), "Payload { len: 4096 }");
    }

    #[test]
    fn payload_into_vec_keeps_bytes() {
        let mut payload = Payload::with_capacity(4);
        payload.extend_from_slice(&[1, 2]);
        payload.extend_from_slice(&[3]);
        assert_eq!(payload.len(), 3);
        assert_eq!(payload.into_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn metadata_serializes_stream_as_integer() {
        let metadata = DecoderMetadata {
            format: MediaFormat::video(StreamIndex::Index(0), VideoFormat::new(128, 128)),
            fps: 30.0,
            time_base: Rational::new(1, 30),
            duration_us: 10_000_000,
            codec_name: "mpeg4".into(),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["format"]["stream"], 0);
        assert_eq!(json["format"]["format"]["type"], "video");
        assert_eq!(json["format"]["format"]["width"], 128);
        assert_eq!(json["time_base"]["den"], 30);
        assert_eq!(metadata.duration_secs(), 10.0);
    }
}
