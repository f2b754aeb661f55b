/*!
    Media source implementation.
*/

use ffmpeg_next::{ffi, format::context::Input as InputContext};

use ffmpeg_types::{Error, Result};

use crate::avio::{CustomIo, open_input};
use crate::codec_config::CodecConfig;
use crate::data_source::DataSource;

/**
    Outcome of one demux step.
*/
pub enum Demuxed {
    /// A packet; `packet.stream()` names the container stream it belongs to.
    Packet(ffmpeg_next::Packet),
    /// The data source asked to be polled again later.
    Pending,
    /// No packets left.
    End,
}

/**
    An opened container that produces encoded packets.

    Created from a URI with [`Source::open`] or from any [`DataSource`] with
    [`Source::from_data_source`].
*/
pub struct Source {
    // Declared before `io` so the input closes before its AVIO is freed.
    input: InputContext,
    io: Option<CustomIo>,
    description: String,
}

impl Source {
    /**
        Open a file or any URI FFmpeg's protocols understand.

        # Example

        ```ignore
        let source = Source::open("video.mp4")?;
        println!("{} streams", source.configs().len());
        ```
    */
    pub fn open(uri: &str) -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::codec(e.to_string()))?;

        let input = ffmpeg_next::format::input(uri).map_err(|e| {
            if e.to_string().contains("No such file") {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{uri}: {e}"),
                ))
            } else {
                Error::codec(format!("{uri}: {e}"))
            }
        })?;

        tracing::debug!(uri, streams = input.streams().count(), "opened source");

        Ok(Self {
            input,
            io: None,
            description: uri.to_string(),
        })
    }

    /**
        Open a container read through a custom data source.
    */
    pub fn from_data_source(source: Box<dyn DataSource>) -> Result<Self> {
        let len = source.len();
        let (input, io) = open_input(source)?;

        tracing::debug!(
            len,
            streams = input.streams().count(),
            "opened data source"
        );

        Ok(Self {
            input,
            io: Some(io),
            description: "<data source>".to_string(),
        })
    }

    /**
        The underlying FFmpeg input context.
    */
    pub fn input(&self) -> &InputContext {
        &self.input
    }

    /**
        The URI this source was opened from, or a placeholder for data sources.
    */
    pub fn description(&self) -> &str {
        &self.description
    }

    /**
        Codec configuration for one container stream.
    */
    pub fn codec_config(&self, index: usize) -> Option<CodecConfig> {
        self.input
            .stream(index)
            .and_then(|stream| CodecConfig::from_stream(&stream))
    }

    /**
        Codec configuration for every decodable stream, in container order.
    */
    pub fn configs(&self) -> Vec<CodecConfig> {
        self.input
            .streams()
            .filter_map(|stream| CodecConfig::from_stream(&stream))
            .collect()
    }

    /**
        Container duration in microseconds, 0 when unknown.
    */
    pub fn duration_us(&self) -> i64 {
        self.input.duration().max(0)
    }

    /**
        Read the next packet, in container order across all streams.
    */
    pub fn read_packet(&mut self) -> Result<Demuxed> {
        let mut packet = ffmpeg_next::Packet::empty();
        let read = packet.read(&mut self.input);
        demuxed(read, packet)
    }

    /**
        Seek every stream to the last keyframe at or before `timestamp_us`.

        Decoders fed from this source must be flushed afterwards.
    */
    pub fn seek(&mut self, timestamp_us: i64) -> Result<()> {
        let timestamp = timestamp_us.max(0);

        self.input
            .seek(timestamp, ..timestamp)
            .map_err(|e| Error::codec(format!("seek to {timestamp}us failed: {e}")))?;

        tracing::debug!(timestamp_us = timestamp, "source seek");
        Ok(())
    }
}

fn demuxed(
    read: std::result::Result<(), ffmpeg_next::Error>,
    packet: ffmpeg_next::Packet,
) -> Result<Demuxed> {
    match read {
        Ok(()) => Ok(Demuxed::Packet(packet)),
        Err(ffmpeg_next::Error::Eof) => Ok(Demuxed::End),
        Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => Ok(Demuxed::Pending),
        Err(e) => Err(Error::decode(format!("demux failed: {e}"))),
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("description", &self.description)
            .field("custom_io", &self.io.is_some())
            .finish_non_exhaustive()
    }
}
