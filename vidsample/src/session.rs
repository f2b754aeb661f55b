/*!
    Frame-by-frame reading with seeking and stream switching.

    A [`VideoReader`] owns one [`Decoder`] and decides, on every `next`
    call, whether the decoder session still matches what the caller wants.
    Switching streams or seeking rebuilds the session from scratch; the
    decision itself is the pure function [`plan`].
*/

use std::sync::Arc;
use std::time::Duration;

use ffmpeg_decode::Decoder;
use ffmpeg_source::{DataSource, MemorySource, probe_all, probe_source_all};
use ffmpeg_types::{
    AudioFormat, DecoderMetadata, DecoderParameters, MediaFormat, MediaType, PixelFormat, Result,
    SeekMode, VideoFormat,
};

use crate::config::ReaderConfig;
use crate::frame::Frame;
use crate::selector::StreamSelector;

/**
    Where the session stands with respect to seeking.
*/
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SeekState {
    Idle,
    /// Requested, applied by the next reinit.
    Pending { ts: f64, any_frame: bool },
    /// The current session started at `ts`. Later reinits keep it.
    Applied { ts: f64, any_frame: bool },
}

impl SeekState {
    /**
        Start offset in seconds and whether any frame is acceptable there.
    */
    pub fn target(&self) -> Option<(f64, bool)> {
        match *self {
            Self::Idle => None,
            Self::Pending { ts, any_frame } | Self::Applied { ts, any_frame } => {
                Some((ts, any_frame))
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/**
    What the reader wants from the decoder. Replaced, never mutated.
*/
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionState {
    pub stream: StreamSelector,
    pub seek: SeekState,
    /// Whether the last init succeeded.
    pub initialized: bool,
}

impl SessionState {
    pub fn new(stream: StreamSelector) -> Self {
        Self {
            stream,
            seek: SeekState::Idle,
            initialized: false,
        }
    }

    pub fn with_seek(self, ts: f64, any_frame: bool) -> Self {
        Self {
            seek: SeekState::Pending { ts, any_frame },
            ..self
        }
    }

    pub fn with_initialized(self, initialized: bool) -> Self {
        Self {
            initialized,
            ..self
        }
    }
}

/**
    Outcome of [`plan`].
*/
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plan {
    pub next_state: SessionState,
    pub reinit: bool,
}

/**
    Decide whether a `next` call for `requested` needs a fresh decoder
    session.

    It does when the stream changes, when a seek is pending, or when the
    previous init failed. A pending seek becomes applied.
*/
pub fn plan(previous: &SessionState, requested: Option<StreamSelector>) -> Plan {
    let stream = requested.unwrap_or(previous.stream);
    let stream_changed = stream != previous.stream;

    let seek = match previous.seek {
        SeekState::Pending { ts, any_frame } => SeekState::Applied { ts, any_frame },
        other => other,
    };

    Plan {
        next_state: SessionState {
            stream,
            seek,
            initialized: previous.initialized,
        },
        reinit: stream_changed || previous.seek.is_pending() || !previous.initialized,
    }
}

/**
    Per-call options for [`VideoReader::next_with`].
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NextOptions {
    pub include_timestamp: bool,
    /// Move the payload into the frame instead of copying it.
    pub zero_copy: bool,
}

impl Default for NextOptions {
    fn default() -> Self {
        Self {
            include_timestamp: true,
            zero_copy: false,
        }
    }
}

#[derive(Clone)]
enum Input {
    Uri(String),
    Memory(Arc<[u8]>),
}

impl Input {
    fn data_source(&self) -> Option<Box<dyn DataSource>> {
        match self {
            Self::Uri(_) => None,
            Self::Memory(bytes) => Some(Box::new(MemorySource::new(Arc::clone(bytes)))),
        }
    }

    fn uri(&self) -> &str {
        match self {
            Self::Uri(uri) => uri,
            Self::Memory(_) => "",
        }
    }
}

impl std::fmt::Debug for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uri(uri) => f.debug_tuple("Uri").field(uri).finish(),
            Self::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
        }
    }
}

/**
    Reads decoded frames of one selected stream at a time.

    Video frames come out as RGB24 at the source size, shaped
    `(height, width, 3)`. Audio comes out as interleaved native-endian
    `f32` at the source layout and rate, shaped `(samples, channels)`.
    Subtitle and caption text comes out as raw bytes.

    ```ignore
    let mut reader = VideoReader::open("clip.mp4", "video")?;
    reader.seek(5.0, false);
    let frame = reader.next(None)?;
    assert_eq!(frame.pts, Some(5.0));
    ```
*/
#[derive(Debug)]
pub struct VideoReader {
    input: Input,
    decoder: Decoder,
    state: SessionState,
    metadata: Vec<DecoderMetadata>,
    timeout: Duration,
    seek_accuracy_us: i64,
    init_count: usize,
}

impl VideoReader {
    pub fn open(uri: &str, selector: &str) -> Result<Self> {
        Self::from_config(ReaderConfig::new(uri).with_stream(selector))
    }

    pub fn from_config(config: ReaderConfig) -> Result<Self> {
        let input = Input::Uri(config.uri.clone());
        Self::build(input, &config)
    }

    /**
        Read from an in-memory container. Every session reads its own
        cursor over the shared bytes.
    */
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, selector: &str) -> Result<Self> {
        Self::from_bytes_with_config(bytes, ReaderConfig::default().with_stream(selector))
    }

    pub fn from_bytes_with_config(
        bytes: impl Into<Arc<[u8]>>,
        config: ReaderConfig,
    ) -> Result<Self> {
        Self::build(Input::Memory(bytes.into()), &config)
    }

    fn build(input: Input, config: &ReaderConfig) -> Result<Self> {
        let stream = StreamSelector::parse(&config.stream)?;

        let metadata = match input.data_source() {
            Some(source) => probe_source_all(source)?,
            None => probe_all(input.uri())?,
        };

        let mut state = SessionState::new(stream);
        if config.start_offset_secs > 0.0 {
            state = state.with_seek(config.start_offset_secs, config.any_frame);
        }

        let mut reader = Self {
            input,
            decoder: Decoder::new(),
            state,
            metadata,
            timeout: config.timeout(),
            seek_accuracy_us: config.seek_accuracy_us,
            init_count: 0,
        };

        let Plan { next_state, .. } = plan(&reader.state, None);
        reader.state = next_state;
        reader.reinit()?;

        tracing::debug!(
            input = ?reader.input,
            stream = %stream,
            streams = reader.metadata.len(),
            "reader opened"
        );
        Ok(reader)
    }

    /**
        Request a seek to `ts` seconds. It takes effect on the next `next`
        call, which restarts the session at `ts`.

        With `any_frame` the first decodable frame at or before `ts` is
        returned instead of the exact frame.
    */
    pub fn seek(&mut self, ts: f64, any_frame: bool) {
        self.state = self.state.with_seek(ts, any_frame);
    }

    /**
        Next frame of the selected stream, switching streams first when
        `selector` names a different one. An empty frame means end of
        stream or timeout.
    */
    pub fn next(&mut self, selector: Option<&str>) -> Result<Frame> {
        self.next_with(selector, NextOptions::default())
    }

    pub fn next_with(&mut self, selector: Option<&str>, options: NextOptions) -> Result<Frame> {
        let requested = selector
            .filter(|s| !s.is_empty())
            .map(StreamSelector::parse)
            .transpose()?;

        let Plan { next_state, reinit } = plan(&self.state, requested);
        self.state = next_state;
        if reinit {
            self.reinit()?;
        }

        match self.decoder.decode(Some(self.timeout))? {
            Some(message) => {
                Frame::from_message(message, options.include_timestamp, options.zero_copy)
            }
            None => Ok(Frame::empty()),
        }
    }

    /**
        How many decoder sessions have been started.
    */
    pub fn init_count(&self) -> usize {
        self.init_count
    }

    pub fn current_stream(&self) -> StreamSelector {
        self.state.stream
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /**
        Frame rates of every stream of the selector's type, in stream
        order. `None` means the current stream's type.
    */
    pub fn fps(&self, selector: Option<&str>) -> Result<Vec<f64>> {
        let media_type = self.media_type_of(selector)?;
        Ok(self.of_type(media_type).map(|m| m.fps).collect())
    }

    /**
        Durations in seconds, like [`VideoReader::fps`].
    */
    pub fn duration(&self, selector: Option<&str>) -> Result<Vec<f64>> {
        let media_type = self.media_type_of(selector)?;
        Ok(self
            .of_type(media_type)
            .map(DecoderMetadata::duration_secs)
            .collect())
    }

    /**
        Metadata of every stream in the container, probed at open.
    */
    pub fn metadata(&self) -> &[DecoderMetadata] {
        &self.metadata
    }

    fn media_type_of(&self, selector: Option<&str>) -> Result<MediaType> {
        match selector.filter(|s| !s.is_empty()) {
            Some(selector) => Ok(StreamSelector::parse(selector)?.media_type),
            None => Ok(self.state.stream.media_type),
        }
    }

    fn of_type(&self, media_type: MediaType) -> impl Iterator<Item = &DecoderMetadata> {
        self.metadata
            .iter()
            .filter(move |m| m.format.media_type() == media_type)
    }

    fn reinit(&mut self) -> Result<()> {
        let params = self.parameters();
        tracing::debug!(
            stream = %self.state.stream,
            start_offset_us = params.start_offset_us,
            seek_mode = ?params.seek_mode,
            "reader reinit"
        );

        self.init_count += 1;
        let result = self.decoder.init(params, self.input.data_source());
        self.state = self.state.with_initialized(result.is_ok());
        result.map(|_| ())
    }

    fn parameters(&self) -> DecoderParameters {
        let (start_secs, any_frame) = self.state.seek.target().unwrap_or((0.0, false));
        let start_offset_us = if start_secs.is_finite() && start_secs > 0.0 {
            (start_secs * 1e6).round() as i64
        } else {
            0
        };

        DecoderParameters::new(self.input.uri())
            .with_timeout(self.timeout)
            .with_start_offset_us(start_offset_us)
            .with_seek_accuracy_us(self.seek_accuracy_us)
            .with_seek_mode(if any_frame {
                SeekMode::AnyFrame
            } else {
                SeekMode::Precise
            })
            .with_format(requested_format(self.state.stream))
    }
}

/**
    The output format the reader asks for on a selected stream.
*/
fn requested_format(stream: StreamSelector) -> MediaFormat {
    match stream.media_type {
        MediaType::Video => MediaFormat::video(
            stream.stream,
            VideoFormat::default().with_pixel_format(PixelFormat::Rgb24),
        ),
        MediaType::Audio => MediaFormat::audio(stream.stream, AudioFormat::default()),
        MediaType::Subtitle => MediaFormat::subtitle(stream.stream),
        MediaType::Caption => MediaFormat::caption(stream.stream),
    }
}

/**
    Frames of the current stream until end of stream or timeout.
*/
impl Iterator for VideoReader {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_with(None, NextOptions::default()) {
            Ok(frame) if frame.is_empty() => None,
            other => Some(other),
        }
    }
}
