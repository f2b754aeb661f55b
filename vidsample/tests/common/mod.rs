//! Synthetic media fixtures.
//!
//! Encodes a 10 s, 30 fps, 128x128 MPEG-4 video track plus a mono 16 kHz
//! PCM track into an AVI file, so tests do not depend on checked-in media.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    ChannelLayout, Packet, Rational, codec, encoder,
    format::{self, Pixel, Sample, sample::Type},
    util::frame::{audio::Audio as AudioFrame, video::Video as VideoFrame},
};
use tempfile::TempDir;

pub const WIDTH: u32 = 128;
pub const HEIGHT: u32 = 128;
pub const FPS: i32 = 30;
pub const FRAMES: i64 = 300;
pub const SAMPLE_RATE: i32 = 16_000;
/// Audio samples per encoded frame, 0.1 s.
pub const AUDIO_FRAME: usize = 1_600;

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// A fixture file that lives as long as its temp directory.
pub struct Fixture {
    _dir: TempDir,
    pub path: PathBuf,
}

impl Fixture {
    pub fn uri(&self) -> &str {
        self.path.to_str().expect("temp path is utf-8")
    }

    pub fn bytes(&self) -> Vec<u8> {
        std::fs::read(&self.path).expect("fixture readable")
    }
}

/// Video plus audio.
pub fn av_clip() -> Fixture {
    write_clip(true)
}

/// Video only.
pub fn video_clip() -> Fixture {
    write_clip(false)
}

fn write_clip(with_audio: bool) -> Fixture {
    init_test_tracing();
    ffmpeg_next::init().expect("ffmpeg init");

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("clip.avi");
    encode(&path, with_audio);
    Fixture { _dir: dir, path }
}

struct Track<E> {
    encoder: E,
    index: usize,
    time_base: Rational,
}

fn encode(path: &Path, with_audio: bool) {
    let mut output = format::output(path).expect("output context");
    let global_header = output
        .format()
        .flags()
        .contains(format::Flags::GLOBAL_HEADER);

    let mut video = {
        let codec = encoder::find(codec::Id::MPEG4).expect("mpeg4 encoder");
        let mut stream = output.add_stream(codec).expect("video stream");
        let mut enc = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .expect("video encoder");
        enc.set_width(WIDTH);
        enc.set_height(HEIGHT);
        enc.set_format(Pixel::YUV420P);
        enc.set_time_base(Rational::new(1, FPS));
        enc.set_frame_rate(Some(Rational::new(FPS, 1)));
        enc.set_gop(10);
        enc.set_max_b_frames(0);
        if global_header {
            enc.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        let enc = enc.open_as(codec).expect("open video encoder");
        stream.set_parameters(&enc);
        stream.set_time_base(Rational::new(1, FPS));
        stream.set_avg_frame_rate(Rational::new(FPS, 1));
        Track {
            index: stream.index(),
            time_base: Rational::new(1, FPS),
            encoder: enc,
        }
    };

    let mut audio = with_audio.then(|| {
        let codec = encoder::find(codec::Id::PCM_S16LE).expect("pcm encoder");
        let mut stream = output.add_stream(codec).expect("audio stream");
        let mut enc = codec::context::Context::new_with_codec(codec)
            .encoder()
            .audio()
            .expect("audio encoder");
        enc.set_rate(SAMPLE_RATE);
        enc.set_channel_layout(ChannelLayout::MONO);
        enc.set_format(Sample::I16(Type::Packed));
        enc.set_time_base(Rational::new(1, SAMPLE_RATE));
        if global_header {
            enc.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        let enc = enc.open_as(codec).expect("open audio encoder");
        stream.set_parameters(&enc);
        stream.set_time_base(Rational::new(1, SAMPLE_RATE));
        Track {
            index: stream.index(),
            time_base: Rational::new(1, SAMPLE_RATE),
            encoder: enc,
        }
    });

    output.write_header().expect("write header");

    let mut frame = VideoFrame::new(Pixel::YUV420P, WIDTH, HEIGHT);
    let frames_per_audio = (AUDIO_FRAME as i64 * FPS as i64) / SAMPLE_RATE as i64;
    let mut audio_pts = 0i64;

    for i in 0..FRAMES {
        paint(&mut frame, i);
        frame.set_pts(Some(i));
        video.encoder.send_frame(&frame).expect("send video frame");
        drain(&mut video.encoder, video.index, video.time_base, &mut output);

        if let Some(audio) = audio.as_mut() {
            if i % frames_per_audio == 0 {
                let mut samples =
                    AudioFrame::new(Sample::I16(Type::Packed), AUDIO_FRAME, ChannelLayout::MONO);
                samples.set_rate(SAMPLE_RATE as u32);
                samples.set_pts(Some(audio_pts));
                tone(&mut samples, audio_pts);
                audio_pts += AUDIO_FRAME as i64;
                audio.encoder.send_frame(&samples).expect("send audio frame");
                drain(&mut audio.encoder, audio.index, audio.time_base, &mut output);
            }
        }
    }

    video.encoder.send_eof().expect("video eof");
    drain(&mut video.encoder, video.index, video.time_base, &mut output);
    if let Some(audio) = audio.as_mut() {
        audio.encoder.send_eof().expect("audio eof");
        drain(&mut audio.encoder, audio.index, audio.time_base, &mut output);
    }

    output.write_trailer().expect("write trailer");
}

fn drain(
    encoder: &mut encoder::Encoder,
    index: usize,
    time_base: Rational,
    output: &mut format::context::Output,
) {
    let stream_time_base = output
        .stream(index)
        .map(|s| s.time_base())
        .expect("stream exists");

    let mut packet = Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(index);
        packet.rescale_ts(time_base, stream_time_base);
        packet.write_interleaved(output).expect("write packet");
    }
}

/// Fills luma with a per-frame level so frames are distinguishable.
fn paint(frame: &mut VideoFrame, index: i64) {
    let level = 16 + (index % 200) as u8;
    let stride = frame.stride(0);
    let plane = frame.data_mut(0);
    for row in 0..HEIGHT as usize {
        plane[row * stride..row * stride + WIDTH as usize].fill(level);
    }
    for p in 1..3 {
        frame.data_mut(p).fill(128);
    }
}

fn tone(frame: &mut AudioFrame, first_sample: i64) {
    let data = frame.data_mut(0);
    for (n, sample) in data.chunks_exact_mut(2).take(AUDIO_FRAME).enumerate() {
        let t = (first_sample + n as i64) as f64 / SAMPLE_RATE as f64;
        let value = ((t * 440.0 * std::f64::consts::TAU).sin() * 8_000.0) as i16;
        sample.copy_from_slice(&value.to_le_bytes());
    }
}
