/*!
    Per-stream decoding: one codec context plus the sampler that turns its
    frames into output records.
*/

use ffmpeg_next::{
    codec::{
        self,
        decoder::{Audio as AudioDecoderFFmpeg, Subtitle as SubtitleDecoderFFmpeg},
        decoder::{Opened, Video as VideoDecoderFFmpeg},
        subtitle::{Rect, Subtitle},
    },
    ffi,
    util::frame::{audio::Audio as AudioFrameFFmpeg, video::Video as VideoFrameFFmpeg},
};

use ffmpeg_source::{CodecConfig, convert::pixel_format_from_ffmpeg};
use ffmpeg_transform::{
    AudioSampler, VideoInput, VideoSampler, resolve_audio_format, resolve_video_format,
};
use ffmpeg_types::{
    DecoderHeader, DecoderOutputMessage, Error, Format, MediaFormat, MediaType, Payload,
    Rational, Result, StreamIndex,
};

enum Codec {
    Video {
        decoder: VideoDecoderFFmpeg,
        sampler: VideoSampler,
    },
    Audio {
        decoder: AudioDecoderFFmpeg,
        sampler: AudioSampler,
    },
    Text {
        decoder: SubtitleDecoderFFmpeg,
    },
}

/**
    Running timestamp state for one stream.
*/
#[derive(Debug, Default)]
struct Clock {
    /// Expected pts of the next frame, used when a frame carries none.
    next_pts_us: Option<i64>,
}

impl Clock {
    fn stamp(&mut self, time_base: Rational, timestamp: Option<i64>, duration_us: i64) -> i64 {
        let pts_us = match timestamp {
            Some(ts) => time_base.to_micros(ts),
            None => self.next_pts_us.unwrap_or(0),
        };
        self.next_pts_us = Some(pts_us + duration_us);
        pts_us
    }

    fn reset(&mut self) {
        self.next_pts_us = None;
    }
}

/**
    A decoding unit for one container stream.

    Owns the codec context and sampler. Records it produces are stamped
    with the resolved output format bound to this stream's index.
*/
pub struct Stream {
    config: CodecConfig,
    format: MediaFormat,
    codec: Codec,
    fps: f64,
    clock: Clock,
}

impl Stream {
    /**
        Open the codec for `config` and negotiate `requested` against it.
    */
    pub fn open(config: CodecConfig, requested: MediaFormat) -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::codec(e.to_string()))?;

        if requested.media_type() != config.media_type() {
            return Err(Error::configuration(format!(
                "stream {} is {}, requested {}",
                config.index(),
                config.media_type(),
                requested.media_type()
            )));
        }

        let context = codec::context::Context::from_parameters(config.parameters())
            .map_err(|e| Error::codec(e.to_string()))?;
        let stream = StreamIndex::Index(config.index() as u32);

        let (codec, format, fps) = match requested.format {
            Format::Video(video) => {
                let decoder = context
                    .decoder()
                    .video()
                    .map_err(|e| Error::codec(e.to_string()))?;
                let resolved = resolve_video_format(
                    decoder.width(),
                    decoder.height(),
                    pixel_format_from_ffmpeg(decoder.format()),
                    &video,
                )?;
                let sampler = VideoSampler::new(resolved)?;
                (
                    Codec::Video { decoder, sampler },
                    MediaFormat::video(stream, resolved),
                    config.frame_rate().to_f64(),
                )
            }
            Format::Audio(audio) => {
                let decoder = context
                    .decoder()
                    .audio()
                    .map_err(|e| Error::codec(e.to_string()))?;
                let resolved =
                    resolve_audio_format(decoder.channels() as u16, decoder.rate(), &audio)?;
                let sampler = AudioSampler::new(resolved)?;
                (
                    Codec::Audio { decoder, sampler },
                    MediaFormat::audio(stream, resolved),
                    resolved.sample_rate as f64,
                )
            }
            Format::Subtitle | Format::Caption => {
                let decoder = context
                    .decoder()
                    .subtitle()
                    .map_err(|e| Error::codec(e.to_string()))?;
                (Codec::Text { decoder }, requested.with_stream(stream), 0.0)
            }
        };

        tracing::debug!(
            stream = config.index(),
            codec = config.codec_name(),
            format = ?format.format,
            "stream opened"
        );

        Ok(Self {
            config,
            format,
            codec,
            fps,
            clock: Clock::default(),
        })
    }

    pub fn index(&self) -> usize {
        self.config.index()
    }

    pub fn media_type(&self) -> MediaType {
        self.format.media_type()
    }

    /**
        The resolved output format, bound to this stream's index.
    */
    pub fn format(&self) -> &MediaFormat {
        &self.format
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /**
        Feed one packet and collect every record it completes.

        Frames the sampler rejects are logged and skipped. A packet the
        codec rejects is an `Error::Decode`.
    */
    pub fn decode_packet(
        &mut self,
        packet: &ffmpeg_next::Packet,
    ) -> Result<Vec<DecoderOutputMessage>> {
        let mut out = Vec::new();

        if let Codec::Text { .. } = self.codec {
            self.decode_text(packet, &mut out)?;
            return Ok(out);
        }

        // EAGAIN means the codec's output is full: drain it, then retry once.
        match self.opened()?.send_packet(packet) {
            Ok(()) => {}
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => {
                self.receive_frames(&mut out)?;
                match self.opened()?.send_packet(packet) {
                    Ok(()) => {}
                    Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => {
                        tracing::warn!(stream = self.index(), "codec still full, packet dropped");
                    }
                    Err(e) => return Err(Error::decode(e.to_string())),
                }
            }
            Err(e) => return Err(Error::decode(e.to_string())),
        }

        self.receive_frames(&mut out)?;
        Ok(out)
    }

    /**
        Signal end of input and collect the frames the codec still holds.
    */
    pub fn flush(&mut self) -> Result<Vec<DecoderOutputMessage>> {
        let mut out = Vec::new();

        match &mut self.codec {
            Codec::Text { .. } => return Ok(out),
            Codec::Video { decoder, sampler } => {
                // No live frame here, so check the sampler against what the
                // codec context declares.
                let declared = VideoInput {
                    width: decoder.width(),
                    height: decoder.height(),
                    format: decoder.format(),
                };
                if let Err(e) = sampler.ensure_input(declared) {
                    tracing::debug!(
                        stream = self.config.index(),
                        error = %e,
                        "flush without sampler input"
                    );
                }
            }
            Codec::Audio { .. } => {}
        }

        match self.opened()?.send_eof() {
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => {
                self.receive_frames(&mut out)?;
                eof_sent(self.opened()?.send_eof())?;
            }
            result => eof_sent(result)?,
        }

        self.receive_frames(&mut out)?;
        self.drain_sampler(&mut out);
        Ok(out)
    }

    /**
        Drop buffered frames after a container seek.
    */
    pub fn reset(&mut self) {
        match &mut self.codec {
            Codec::Video { decoder, .. } => decoder.flush(),
            Codec::Audio { decoder, sampler } => {
                decoder.flush();
                sampler.reset();
            }
            Codec::Text { decoder } => decoder.flush(),
        }
        self.clock.reset();
    }

    /**
        Emit the samples an audio resampler still holds at end of input.
    */
    fn drain_sampler(&mut self, out: &mut Vec<DecoderOutputMessage>) {
        let Codec::Audio { sampler, .. } = &mut self.codec else {
            return;
        };

        match sampler.sample(None) {
            Ok(payload) if payload.is_empty() => {}
            Ok(payload) => {
                let duration_us = payload.len() as i64 * 1_000_000
                    / (sampler.output().frame_bytes() as i64 * self.fps.max(1.0) as i64);
                let pts_us = self.clock.stamp(self.config.time_base(), None, duration_us);
                out.push(message(self.format, pts_us, true, self.fps, payload));
            }
            Err(e) => {
                tracing::warn!(
                    stream = self.config.index(),
                    error = %e,
                    "resampler tail dropped"
                );
            }
        }
    }

    fn opened(&mut self) -> Result<&mut Opened> {
        match &mut self.codec {
            Codec::Video { decoder, .. } => Ok(&mut **decoder),
            Codec::Audio { decoder, .. } => Ok(&mut **decoder),
            Codec::Text { .. } => Err(Error::decode("text streams have no frame decoder")),
        }
    }

    fn receive_frames(&mut self, out: &mut Vec<DecoderOutputMessage>) -> Result<()> {
        let Self {
            config,
            format,
            codec,
            fps,
            clock,
        } = self;
        let time_base = config.time_base();

        match codec {
            Codec::Video { decoder, sampler } => {
                let frame_duration_us = if *fps > 0.0 {
                    (1_000_000.0 / *fps).round() as i64
                } else {
                    0
                };

                loop {
                    let mut frame = VideoFrameFFmpeg::empty();
                    if !receive(decoder, &mut frame, out.is_empty())? {
                        break;
                    }

                    let pts_us = clock.stamp(time_base, frame.timestamp(), frame_duration_us);
                    match sampler.sample(Some(&frame)) {
                        Ok(payload) => {
                            out.push(message(*format, pts_us, frame.is_key(), *fps, payload));
                        }
                        Err(e) => {
                            tracing::warn!(
                                stream = config.index(),
                                pts_us,
                                error = %e,
                                "video frame skipped"
                            );
                        }
                    }
                }
            }
            Codec::Audio { decoder, sampler } => loop {
                let mut frame = AudioFrameFFmpeg::empty();
                if !receive(decoder, &mut frame, out.is_empty())? {
                    break;
                }

                let duration_us = if frame.rate() > 0 {
                    frame.samples() as i64 * 1_000_000 / frame.rate() as i64
                } else {
                    0
                };
                let pts_us = clock.stamp(time_base, frame.timestamp(), duration_us);
                match sampler.sample(Some(&frame)) {
                    Ok(payload) if payload.is_empty() => {}
                    Ok(payload) => out.push(message(*format, pts_us, true, *fps, payload)),
                    Err(e) => {
                        tracing::warn!(
                            stream = config.index(),
                            pts_us,
                            error = %e,
                            "audio frame skipped"
                        );
                    }
                }
            },
            Codec::Text { .. } => {}
        }

        Ok(())
    }

    fn decode_text(
        &mut self,
        packet: &ffmpeg_next::Packet,
        out: &mut Vec<DecoderOutputMessage>,
    ) -> Result<()> {
        let Codec::Text { decoder } = &mut self.codec else {
            return Ok(());
        };

        let mut subtitle = Subtitle::new();
        let got = decoder
            .decode(packet, &mut subtitle)
            .map_err(|e| Error::decode(e.to_string()))?;
        if !got {
            return Ok(());
        }

        let text: Vec<String> = subtitle
            .rects()
            .filter_map(|rect| match rect {
                Rect::Text(text) => Some(text.get().to_string()),
                Rect::Ass(ass) => Some(ass.get().to_string()),
                _ => None,
            })
            .collect();
        if text.is_empty() {
            return Ok(());
        }

        // Subtitle pts is already in microseconds.
        let base_us = match subtitle.pts() {
            Some(pts) => pts,
            None => self.clock.stamp(self.config.time_base(), packet.pts(), 0),
        };
        let pts_us = display_pts_us(base_us, subtitle.start());

        out.push(message(
            self.format,
            pts_us,
            true,
            0.0,
            Payload::from(text.join("\n").into_bytes()),
        ));
        Ok(())
    }
}

/**
    Pull one frame. Returns false when the codec needs more input or is
    fully drained. Errors only surface when nothing was collected yet.
*/
fn receive(
    decoder: &mut Opened,
    frame: &mut ffmpeg_next::Frame,
    nothing_collected: bool,
) -> Result<bool> {
    match decoder.receive_frame(frame) {
        Ok(()) => Ok(true),
        Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => Ok(false),
        Err(ffmpeg_next::Error::Eof) => Ok(false),
        Err(e) if nothing_collected => Err(Error::decode(e.to_string())),
        Err(e) => {
            tracing::warn!(error = %e, "receive failed after partial output");
            Ok(false)
        }
    }
}

/**
    When a subtitle is shown: its packet time plus the display delay, which
    is given in milliseconds.
*/
fn display_pts_us(base_us: i64, start_display_ms: u32) -> i64 {
    base_us + Rational::new(1, 1000).to_micros(i64::from(start_display_ms))
}

/**
    Check a `send_eof` result. A codec that already saw EOF is fine.
*/
fn eof_sent(result: std::result::Result<(), ffmpeg_next::Error>) -> Result<()> {
    match result {
        Ok(()) | Err(ffmpeg_next::Error::Eof) => Ok(()),
        Err(e) => Err(Error::decode(e.to_string())),
    }
}

fn message(
    format: MediaFormat,
    pts_us: i64,
    key_frame: bool,
    fps: f64,
    payload: Payload,
) -> DecoderOutputMessage {
    DecoderOutputMessage {
        header: DecoderHeader {
            format,
            pts_us,
            key_frame,
            fps,
            seqno: 0,
        },
        payload,
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("index", &self.config.index())
            .field("format", &self.format)
            .field("fps", &self.fps)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtitle_shows_after_display_delay() {
        assert_eq!(display_pts_us(2_000_000, 0), 2_000_000);
        assert_eq!(display_pts_us(2_000_000, 250), 2_250_000);
    }

    #[test]
    fn eof_results() {
        assert!(eof_sent(Ok(())).is_ok());
        assert!(eof_sent(Err(ffmpeg_next::Error::Eof)).is_ok());
        assert!(matches!(
            eof_sent(Err(ffmpeg_next::Error::Other {
                errno: ffi::EAGAIN
            })),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            eof_sent(Err(ffmpeg_next::Error::InvalidData)),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn clock_rescales_known_timestamps() {
        let mut clock = Clock::default();
        let tb = Rational::new(1, 30);
        assert_eq!(clock.stamp(tb, Some(30), 33_333), 1_000_000);
        assert_eq!(clock.stamp(tb, Some(31), 33_333), 1_033_333);
    }

    #[test]
    fn clock_extrapolates_missing_timestamps() {
        let mut clock = Clock::default();
        let tb = Rational::new(1, 1000);
        assert_eq!(clock.stamp(tb, None, 20_000), 0);
        assert_eq!(clock.stamp(tb, Some(100), 20_000), 100_000);
        assert_eq!(clock.stamp(tb, None, 20_000), 120_000);
        clock.reset();
        assert_eq!(clock.stamp(tb, None, 20_000), 0);
    }
}
