/*!
    Stream selection and requested output formats.
*/

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

use crate::{PixelFormat, SampleFormat};

/**
    Kind of elementary stream.

    Variants are ordered, so sets of formats iterate video first.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Video,
    Audio,
    Subtitle,
    /// Closed captions (EIA-608/708 carried as their own stream)
    #[serde(rename = "cc")]
    Caption,
}

impl MediaType {
    pub const ALL: [MediaType; 4] = [Self::Video, Self::Audio, Self::Subtitle, Self::Caption];

    /**
        Name used in stream selectors such as `video:0` or `cc`.
    */
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Subtitle => "subtitle",
            Self::Caption => "cc",
        }
    }

    /**
        Parse a selector type name. Names are case sensitive.
    */
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/**
    Which container stream(s) of a given type a format applies to.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StreamIndex {
    /// Every stream of the type (raw value -2).
    All,
    /// The backend's best stream of the type (raw value -1).
    Best,
    /// A concrete container stream index.
    Index(u32),
}

impl StreamIndex {
    /**
        Decode the integer encoding, where -2 means all streams and any
        other negative value means the best stream.
    */
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            -2 => Self::All,
            raw if raw < 0 => Self::Best,
            raw => u32::try_from(raw).map_or(Self::Best, Self::Index),
        }
    }

    pub const fn as_raw(self) -> i64 {
        match self {
            Self::All => -2,
            Self::Best => -1,
            Self::Index(index) => index as i64,
        }
    }
}

impl Serialize for StreamIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_raw())
    }
}

/**
    Requested video output.

    Zero width and height with no min/max dimension means "source size".
    An unset pixel format means "whatever the codec decodes to".
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: Option<PixelFormat>,
    /// Scale so the smaller side equals this value (only with zero width/height).
    pub min_dimension: u32,
    /// Scale so the larger side equals this value (only with zero width/height).
    pub max_dimension: u32,
    /// Scale to cover `width` x `height`, then cut the centre.
    pub crop: bool,
}

impl VideoFormat {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_pixel_format(mut self, pixel_format: PixelFormat) -> Self {
        self.pixel_format = Some(pixel_format);
        self
    }

    pub fn with_min_dimension(mut self, min_dimension: u32) -> Self {
        self.min_dimension = min_dimension;
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn with_crop(mut self, crop: bool) -> Self {
        self.crop = crop;
        self
    }
}

/**
    Requested audio output. Zero channels or sample rate means "same as source".
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct AudioFormat {
    pub sample_format: SampleFormat,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioFormat {
    pub fn new(sample_format: SampleFormat, channels: u16, sample_rate: u32) -> Self {
        Self {
            sample_format,
            channels,
            sample_rate,
        }
    }

    /**
        Bytes taken by one sample across all channels.
    */
    pub const fn frame_bytes(&self) -> usize {
        self.channels as usize * self.sample_format.bytes_per_sample()
    }
}

/**
    Per-type output format.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Format {
    Video(VideoFormat),
    Audio(AudioFormat),
    Subtitle,
    #[serde(rename = "cc")]
    Caption,
}

impl Format {
    pub const fn media_type(&self) -> MediaType {
        match self {
            Self::Video(_) => MediaType::Video,
            Self::Audio(_) => MediaType::Audio,
            Self::Subtitle => MediaType::Subtitle,
            Self::Caption => MediaType::Caption,
        }
    }

    /**
        The default request for a type: native-size video, float audio at
        the source layout and rate, raw text otherwise.
    */
    pub fn default_for(media_type: MediaType) -> Self {
        match media_type {
            MediaType::Video => Self::Video(VideoFormat::default()),
            MediaType::Audio => Self::Audio(AudioFormat::default()),
            MediaType::Subtitle => Self::Subtitle,
            MediaType::Caption => Self::Caption,
        }
    }
}

/**
    A stream selection paired with the format its frames are sampled to.

    Identity is `(media type, stream index)`: two values that differ only in
    format compare equal, so a set of these holds one entry per stream.
*/
#[derive(Clone, Copy, Debug, Serialize)]
pub struct MediaFormat {
    pub stream: StreamIndex,
    pub format: Format,
}

impl MediaFormat {
    pub fn new(stream: StreamIndex, format: Format) -> Self {
        Self { stream, format }
    }

    pub fn video(stream: StreamIndex, format: VideoFormat) -> Self {
        Self::new(stream, Format::Video(format))
    }

    pub fn audio(stream: StreamIndex, format: AudioFormat) -> Self {
        Self::new(stream, Format::Audio(format))
    }

    pub fn subtitle(stream: StreamIndex) -> Self {
        Self::new(stream, Format::Subtitle)
    }

    pub fn caption(stream: StreamIndex) -> Self {
        Self::new(stream, Format::Caption)
    }

    pub const fn media_type(&self) -> MediaType {
        self.format.media_type()
    }

    /**
        The same format bound to another stream index.
    */
    pub fn with_stream(self, stream: StreamIndex) -> Self {
        Self { stream, ..self }
    }

    pub fn as_video(&self) -> Option<&VideoFormat> {
        match &self.format {
            Format::Video(format) => Some(format),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioFormat> {
        match &self.format {
            Format::Audio(format) => Some(format),
            _ => None,
        }
    }

    fn key(&self) -> (MediaType, StreamIndex) {
        (self.media_type(), self.stream)
    }
}

impl PartialEq for MediaFormat {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for MediaFormat {}

impl PartialOrd for MediaFormat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaFormat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for MediaFormat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
