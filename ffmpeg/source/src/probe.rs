/*!
    Probing functionality for extracting stream metadata.
*/

use std::collections::BTreeSet;

use ffmpeg_next::format::context::Input as InputContext;

use ffmpeg_types::{
    AudioFormat, DecoderMetadata, Format, MediaFormat, MediaType, Result, StreamIndex,
    VideoFormat,
};

use crate::codec_config::CodecConfig;
use crate::convert::{media_type_to_ffmpeg, pixel_format_from_ffmpeg, sample_format_from_ffmpeg};
use crate::data_source::DataSource;
use crate::source::Source;

/**
    A request for every stream of every media type.
*/
pub fn all_streams() -> BTreeSet<MediaFormat> {
    MediaType::ALL
        .into_iter()
        .map(|media_type| MediaFormat::new(StreamIndex::All, Format::default_for(media_type)))
        .collect()
}

/**
    Probe a file or URI for the streams matching `formats`.

    Only headers are read. Results come back in container stream order,
    one entry per matching stream.

    # Example

    ```ignore
    for metadata in probe_all("video.mp4")? {
        println!("{:?} at {} fps", metadata.format.media_type(), metadata.fps);
    }
    ```
*/
pub fn probe(uri: &str, formats: &BTreeSet<MediaFormat>) -> Result<Vec<DecoderMetadata>> {
    let source = Source::open(uri)?;
    Ok(source_metadata(&source, formats))
}

/**
    Probe every stream of a file or URI.
*/
pub fn probe_all(uri: &str) -> Result<Vec<DecoderMetadata>> {
    probe(uri, &all_streams())
}

/**
    Probe a custom data source for the streams matching `formats`.
*/
pub fn probe_source(
    data_source: Box<dyn DataSource>,
    formats: &BTreeSet<MediaFormat>,
) -> Result<Vec<DecoderMetadata>> {
    let source = Source::from_data_source(data_source)?;
    Ok(source_metadata(&source, formats))
}

/**
    Probe every stream of a custom data source.
*/
pub fn probe_source_all(data_source: Box<dyn DataSource>) -> Result<Vec<DecoderMetadata>> {
    probe_source(data_source, &all_streams())
}

/**
    Metadata for every stream of an open source that matches `formats`.
*/
pub fn source_metadata(source: &Source, formats: &BTreeSet<MediaFormat>) -> Vec<DecoderMetadata> {
    select_streams(source, formats)
        .into_iter()
        .filter_map(|(config, _)| stream_metadata(source.input(), &config))
        .collect()
}

/**
    Resolve requested formats to concrete container streams.

    `Index(n)` matches stream `n` when its type agrees, `Best` matches the
    backend's preferred stream of the type and `All` matches every stream of
    the type. Each returned format is rebound to the concrete index. A stream
    matched by more than one request keeps the first match.
*/
pub fn select_streams(
    source: &Source,
    formats: &BTreeSet<MediaFormat>,
) -> Vec<(CodecConfig, MediaFormat)> {
    let configs = source.configs();
    let mut selected: Vec<(CodecConfig, MediaFormat)> = Vec::new();

    for requested in formats {
        let media_type = requested.media_type();
        let matches: Vec<&CodecConfig> = match requested.stream {
            StreamIndex::Index(index) => configs
                .iter()
                .filter(|c| c.index() == index as usize && c.media_type() == media_type)
                .collect(),
            StreamIndex::All => configs
                .iter()
                .filter(|c| c.media_type() == media_type)
                .collect(),
            StreamIndex::Best => best_stream(source.input(), &configs, media_type)
                .into_iter()
                .collect(),
        };

        if matches.is_empty() {
            tracing::debug!(
                media_type = %media_type,
                stream = requested.stream.as_raw(),
                "no stream matches request"
            );
        }

        for config in matches {
            if selected.iter().any(|(c, _)| c.index() == config.index()) {
                continue;
            }
            let format = requested.with_stream(StreamIndex::Index(config.index() as u32));
            selected.push((config.clone(), format));
        }
    }

    selected.sort_by_key(|(config, _)| config.index());
    selected
}

fn best_stream<'a>(
    input: &InputContext,
    configs: &'a [CodecConfig],
    media_type: MediaType,
) -> Option<&'a CodecConfig> {
    let best = input
        .streams()
        .best(media_type_to_ffmpeg(media_type))
        .map(|stream| stream.index());

    // The backend ranks subtitles and captions together, so its pick may be
    // the other kind.
    configs
        .iter()
        .find(|c| Some(c.index()) == best && c.media_type() == media_type)
        .or_else(|| configs.iter().find(|c| c.media_type() == media_type))
}

/**
    Describe one stream from its headers.

    Returns `None` when the codec parameters cannot be opened.
*/
pub fn stream_metadata(input: &InputContext, config: &CodecConfig) -> Option<DecoderMetadata> {
    let stream = StreamIndex::Index(config.index() as u32);
    let time_base = config.time_base();

    let stream_duration = input
        .stream(config.index())
        .map(|s| s.duration())
        .unwrap_or(0);
    let duration_us = if stream_duration > 0 {
        time_base.to_micros(stream_duration)
    } else {
        input.duration().max(0)
    };

    let (format, fps) = match config.media_type() {
        MediaType::Video => {
            let context =
                ffmpeg_next::codec::context::Context::from_parameters(config.parameters()).ok()?;
            let decoder = context.decoder().video().ok()?;
            let format = VideoFormat {
                width: decoder.width(),
                height: decoder.height(),
                pixel_format: pixel_format_from_ffmpeg(decoder.format()),
                ..VideoFormat::default()
            };
            (
                MediaFormat::video(stream, format),
                config.frame_rate().to_f64(),
            )
        }
        MediaType::Audio => {
            let context =
                ffmpeg_next::codec::context::Context::from_parameters(config.parameters()).ok()?;
            let decoder = context.decoder().audio().ok()?;
            let format = AudioFormat {
                sample_format: sample_format_from_ffmpeg(decoder.format()).unwrap_or_default(),
                channels: decoder.channels(),
                sample_rate: decoder.rate(),
            };
            (MediaFormat::audio(stream, format), decoder.rate() as f64)
        }
        MediaType::Subtitle => (MediaFormat::subtitle(stream), 0.0),
        MediaType::Caption => (MediaFormat::caption(stream), 0.0),
    };

    Some(DecoderMetadata {
        format,
        fps,
        time_base,
        duration_us,
        codec_name: config.codec_name().to_string(),
    })
}
