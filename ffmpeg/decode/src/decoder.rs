/*!
    Session decoder: demux loop, per-stream routing, seeking and draining.
*/

use std::collections::{BTreeSet, VecDeque};
use std::time::{Duration, Instant};

use ffmpeg_source::{DataSource, Demuxed, Source, select_streams, source_metadata};
use ffmpeg_transform::validate_video_format;
use ffmpeg_types::{
    DecoderMetadata, DecoderOutputMessage, DecoderParameters, Error, Result, SeekMode,
};

use crate::seek::SeekController;
use crate::stream::Stream;

/**
    Poll interval while a data source reports it has nothing yet.
*/
const PENDING_BACKOFF: Duration = Duration::from_millis(1);

/**
    Lifecycle of a decoder session.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderState {
    Uninitialized,
    /// Initialized, nothing read yet.
    Ready,
    /// Dropping records until every stream reaches the seek target.
    Seeking,
    Decoding,
    /// Input exhausted; codec buffers are being flushed.
    Draining,
    /// Every record has been produced. Queued ones may still be pending.
    Ended,
}

/**
    Decodes the selected streams of one container into output records.

    Each [`Decoder::init`] starts a new session and drops everything from the
    previous one. Records come out of [`Decoder::decode`] in container order,
    each sampled to its stream's resolved format.

    # Example

    ```ignore
    let params = DecoderParameters::new("clip.mp4")
        .with_format(MediaFormat::video(StreamIndex::Best, VideoFormat::default()));
    let mut decoder = Decoder::new();
    decoder.init(params, None)?;
    while let Some(record) = decoder.decode(None)? {
        println!("{} us, {} bytes", record.header.pts_us, record.payload.len());
    }
    ```
*/
pub struct Decoder {
    // Streams hold codec state fed from `source`; drop them first.
    streams: Vec<Stream>,
    source: Option<Source>,
    params: Option<DecoderParameters>,
    metadata: Vec<DecoderMetadata>,
    pending: VecDeque<DecoderOutputMessage>,
    seek: SeekController,
    /// Streams that went past the end offset.
    finished: BTreeSet<usize>,
    state: DecoderState,
    seqno: u64,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            streams: Vec::new(),
            source: None,
            params: None,
            metadata: Vec::new(),
            pending: VecDeque::new(),
            seek: SeekController::default(),
            finished: BTreeSet::new(),
            state: DecoderState::Uninitialized,
            seqno: 0,
        }
    }

    /**
        Start a new session.

        Opens `params.uri`, or `data_source` when given, and describes every
        stream matching `params.formats`. In header-only mode that is all;
        otherwise a codec is opened per matching stream and the start offset
        seek is applied.
    */
    pub fn init(
        &mut self,
        params: DecoderParameters,
        data_source: Option<Box<dyn DataSource>>,
    ) -> Result<Vec<DecoderMetadata>> {
        self.shutdown();

        for format in &params.formats {
            if let Some(video) = format.as_video() {
                validate_video_format(video)?;
            }
        }

        let source = match data_source {
            Some(data_source) => Source::from_data_source(data_source)?,
            None if params.uri.is_empty() => {
                return Err(Error::configuration("no uri and no data source given"));
            }
            None => Source::open(&params.uri)?,
        };

        let metadata = if params.header_only && params.formats.is_empty() {
            source_metadata(&source, &ffmpeg_source::all_streams())
        } else {
            source_metadata(&source, &params.formats)
        };

        if params.header_only {
            tracing::debug!(streams = metadata.len(), "header-only init");
            self.metadata = metadata.clone();
            self.params = Some(params);
            self.state = DecoderState::Ended;
            return Ok(metadata);
        }

        let selected = select_streams(&source, &params.formats);
        if selected.is_empty() {
            return Err(Error::configuration(format!(
                "no stream in {} matches the requested formats",
                source.description()
            )));
        }

        let mut streams = Vec::with_capacity(selected.len());
        for (config, format) in selected {
            streams.push(Stream::open(config, format)?);
        }

        tracing::debug!(
            source = source.description(),
            streams = streams.len(),
            start_offset_us = params.start_offset_us,
            end_offset_us = params.end_offset_us,
            "decoder init"
        );

        self.seek = SeekController::new(params.seek_accuracy_us, params.seek_mode);
        self.streams = streams;
        self.source = Some(source);
        self.metadata = metadata.clone();
        self.state = DecoderState::Ready;

        let start_offset_us = params.start_offset_us;
        let seek_mode = params.seek_mode;
        self.params = Some(params);

        if start_offset_us > 0 {
            if let Err(e) = self.seek(start_offset_us, seek_mode) {
                // Not fatal at init: filtering still skips to the offset.
                tracing::warn!(error = %e, "start offset seek failed, decoding from the start");
                self.seek.begin(start_offset_us, seek_mode);
                self.state = DecoderState::Seeking;
            }
        }

        Ok(metadata)
    }

    /**
        Produce the next record, waiting at most `timeout` (or the session's
        configured timeout).

        `Ok(None)` means the timeout passed or the session ended; once ended,
        every later call returns `Ok(None)` too. Packets the codec rejects
        and frames the sampler cannot convert are logged and skipped.
    */
    pub fn decode(&mut self, timeout: Option<Duration>) -> Result<Option<DecoderOutputMessage>> {
        let Some(params) = self.params.as_ref() else {
            return Err(Error::configuration("decoder not initialized"));
        };
        let deadline = Instant::now() + timeout.unwrap_or(params.timeout);

        loop {
            if let Some(mut record) = self.pending.pop_front() {
                record.header.seqno = self.seqno;
                self.seqno += 1;
                tracing::trace!(
                    stream = ?record.header.format.stream,
                    pts_us = record.header.pts_us,
                    seqno = record.header.seqno,
                    bytes = record.payload.len(),
                    "record"
                );
                return Ok(Some(record));
            }

            match self.state {
                DecoderState::Uninitialized => {
                    return Err(Error::configuration("decoder not initialized"));
                }
                DecoderState::Ended => return Ok(None),
                DecoderState::Draining => {
                    self.drain();
                    continue;
                }
                DecoderState::Ready => self.state = DecoderState::Decoding,
                DecoderState::Seeking | DecoderState::Decoding => {}
            }

            if Instant::now() >= deadline {
                tracing::debug!("decode timed out");
                return Ok(None);
            }

            let Some(source) = self.source.as_mut() else {
                self.state = DecoderState::Ended;
                continue;
            };

            match source.read_packet() {
                Ok(Demuxed::Packet(packet)) => self.route(&packet),
                Ok(Demuxed::Pending) => std::thread::sleep(PENDING_BACKOFF),
                Ok(Demuxed::End) => {
                    tracing::debug!("end of input, draining");
                    self.state = DecoderState::Draining;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "demux failed, draining");
                    self.state = DecoderState::Draining;
                }
            }
        }
    }

    /**
        Seek within the current session.

        Codec buffers are flushed and undelivered records dropped. Records
        then resume at the target, or at the first decodable frame in
        [`SeekMode::AnyFrame`].
    */
    pub fn seek(&mut self, target_us: i64, mode: SeekMode) -> Result<()> {
        let Some(source) = self.source.as_mut() else {
            return Err(Error::configuration("decoder not initialized"));
        };

        source.seek(SeekController::container_timestamp(target_us))?;
        for stream in &mut self.streams {
            stream.reset();
        }
        self.pending.clear();
        self.finished.clear();
        self.seek.begin(target_us, mode);
        self.state = DecoderState::Seeking;

        tracing::debug!(target_us, ?mode, "decoder seek");
        Ok(())
    }

    /**
        Tear the session down. The decoder can be initialized again.
    */
    pub fn shutdown(&mut self) {
        if self.state != DecoderState::Uninitialized {
            tracing::debug!(records = self.seqno, "decoder shutdown");
        }
        self.streams.clear();
        self.source = None;
        self.params = None;
        self.metadata.clear();
        self.pending.clear();
        self.seek.clear();
        self.finished.clear();
        self.state = DecoderState::Uninitialized;
        self.seqno = 0;
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /**
        Metadata reported by the last successful init.
    */
    pub fn metadata(&self) -> &[DecoderMetadata] {
        &self.metadata
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn params(&self) -> Option<&DecoderParameters> {
        self.params.as_ref()
    }

    fn route(&mut self, packet: &ffmpeg_next::Packet) {
        let index = packet.stream();
        let Some(stream) = self.streams.iter_mut().find(|s| s.index() == index) else {
            return;
        };

        match stream.decode_packet(packet) {
            Ok(records) => self.enqueue(records),
            Err(e) => {
                tracing::warn!(stream = index, pts = ?packet.pts(), error = %e, "packet skipped");
            }
        }
    }

    fn drain(&mut self) {
        let mut records = Vec::new();
        for stream in &mut self.streams {
            match stream.flush() {
                Ok(flushed) => records.extend(flushed),
                Err(e) => tracing::warn!(stream = stream.index(), error = %e, "flush failed"),
            }
        }
        self.enqueue(records);
        self.state = DecoderState::Ended;
    }

    fn enqueue(&mut self, records: Vec<DecoderOutputMessage>) {
        let (end_offset_us, prevent_staleness) = self
            .params
            .as_ref()
            .map_or((0, false), |p| (p.end_offset_us, p.prevent_staleness));

        for record in records {
            let Some(index) = stream_of(&record) else {
                continue;
            };
            if self.finished.contains(&index) {
                continue;
            }

            let pts_us = record.header.pts_us;
            if !self.seek.accept(index, pts_us) {
                tracing::trace!(stream = index, pts_us, "record before seek target dropped");
                continue;
            }

            if end_offset_us > 0 && pts_us > end_offset_us {
                self.finished.insert(index);
                if self.streams.iter().all(|s| self.finished.contains(&s.index())) {
                    tracing::debug!(end_offset_us, "every stream past end offset");
                    self.state = DecoderState::Ended;
                }
                continue;
            }

            if prevent_staleness {
                self.pending.retain(|queued| stream_of(queued) != Some(index));
            }
            self.pending.push_back(record);
        }

        if self.state == DecoderState::Seeking
            && self.seek.settled(self.streams.iter().map(Stream::index))
        {
            self.state = DecoderState::Decoding;
        }
    }
}

fn stream_of(record: &DecoderOutputMessage) -> Option<usize> {
    match record.header.format.stream {
        ffmpeg_types::StreamIndex::Index(index) => Some(index as usize),
        _ => None,
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("state", &self.state)
            .field("streams", &self.streams)
            .field("pending", &self.pending.len())
            .field("seqno", &self.seqno)
            .finish_non_exhaustive()
    }
}
