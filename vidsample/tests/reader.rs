//! End-to-end tests for `VideoReader` over a synthesized AVI clip.

mod common;

use ffmpeg_types::{Error, MediaType, StreamIndex};
use vidsample::{NextOptions, Shape, StreamSelector, VideoReader};

use common::{FPS, FRAMES, HEIGHT, SAMPLE_RATE, WIDTH};

const VIDEO_SHAPE: Shape = Shape::Video {
    height: HEIGHT as usize,
    width: WIDTH as usize,
    channels: 3,
};

#[test]
fn decodes_every_frame_then_signals_end() {
    let clip = common::video_clip();
    let mut reader = VideoReader::open(clip.uri(), "video").expect("open");
    assert_eq!(reader.init_count(), 1);

    let mut count = 0;
    let mut last_pts = f64::NEG_INFINITY;
    loop {
        let frame = reader.next(None).expect("next");
        if frame.is_empty() {
            break;
        }
        assert_eq!(frame.shape, VIDEO_SHAPE);
        assert_eq!(frame.data.len(), frame.shape.element_count());

        let pts = frame.pts.expect("timestamp");
        assert!(pts > last_pts, "pts went from {last_pts} to {pts}");
        last_pts = pts;
        count += 1;
    }
    assert_eq!(count, FRAMES);

    // End of stream is stable.
    for _ in 0..3 {
        let frame = reader.next(None).expect("next after end");
        assert!(frame.is_empty());
        assert_eq!(frame.pts, None);
    }
    assert_eq!(reader.init_count(), 1);
}

#[test]
fn precise_seek_lands_on_target_with_one_reinit() {
    let clip = common::video_clip();
    let mut reader = VideoReader::open(clip.uri(), "video").expect("open");
    reader.next(None).expect("first frame");
    assert_eq!(reader.init_count(), 1);

    reader.seek(5.0, false);
    let frame = reader.next(None).expect("frame after seek");
    assert_eq!(reader.init_count(), 2);

    let pts = frame.pts.expect("timestamp");
    assert!((pts - 5.0).abs() <= 1e-3, "landed at {pts}");
    assert_eq!(frame.shape, VIDEO_SHAPE);

    // Decoding continues from there without another session.
    let next = reader.next(None).expect("following frame");
    let expected = 5.0 + 1.0 / FPS as f64;
    assert!((next.pts.expect("timestamp") - expected).abs() <= 1e-3);
    assert_eq!(reader.init_count(), 2);
}

#[test]
fn any_frame_seek_returns_keyframe_at_or_before_target() {
    let clip = common::video_clip();
    let mut reader = VideoReader::open(clip.uri(), "video").expect("open");

    // GOP of 10 frames: the keyframe before 5.1 s is at 5.0 s.
    reader.seek(5.1, true);
    let frame = reader.next(None).expect("frame after seek");
    let pts = frame.pts.expect("timestamp");
    assert!(pts <= 5.1 + 1e-3, "landed at {pts}");
    assert!(pts >= 5.1 - 10.0 / FPS as f64 - 1e-3, "landed at {pts}");
    assert_eq!(reader.init_count(), 2);
}

#[test]
fn start_offset_from_config() {
    let clip = common::video_clip();
    let config = vidsample::ReaderConfig::new(clip.uri()).with_start_offset_secs(2.0);
    let mut reader = VideoReader::from_config(config).expect("open");
    assert_eq!(reader.init_count(), 1);

    let pts = reader.next(None).expect("frame").pts.expect("timestamp");
    assert!((pts - 2.0).abs() <= 1e-3, "landed at {pts}");
}

#[test]
fn seek_accuracy_from_config_widens_the_landing_window() {
    let clip = common::video_clip();
    let config = vidsample::ReaderConfig::new(clip.uri()).with_seek_accuracy_us(40_000);
    let mut reader = VideoReader::from_config(config).expect("open");
    reader.next(None).expect("first frame");

    // Frame 149 is 33 ms short of 5 s, inside the 40 ms window.
    reader.seek(5.0, false);
    let pts = reader.next(None).expect("frame").pts.expect("timestamp");
    let expected = 149.0 / FPS as f64;
    assert!((pts - expected).abs() <= 1e-3, "landed at {pts}");
}

#[test]
fn stream_switch_reinits_once() {
    let clip = common::av_clip();
    let mut reader = VideoReader::open(clip.uri(), "video").expect("open");

    let video = reader.next(None).expect("video frame");
    assert_eq!(video.shape, VIDEO_SHAPE);
    assert_eq!(reader.init_count(), 1);

    let audio = reader.next(Some("audio")).expect("audio frame");
    assert_eq!(reader.init_count(), 2);
    assert_eq!(
        reader.current_stream(),
        StreamSelector::best(MediaType::Audio)
    );
    match audio.shape {
        Shape::Audio { samples, channels } => {
            assert_eq!(channels, 1);
            assert!(samples > 0);
            assert_eq!(audio.data.len(), samples * channels * 4);
        }
        other => panic!("expected audio, got {other:?}"),
    }

    // Same stream again: no new session.
    reader.next(Some("audio")).expect("audio frame");
    reader.next(None).expect("audio frame");
    assert_eq!(reader.init_count(), 2);
}

#[test]
fn audio_timestamps_are_monotonic() {
    let clip = common::av_clip();
    let mut reader = VideoReader::open(clip.uri(), "audio").expect("open");

    let mut last = f64::NEG_INFINITY;
    let mut total_samples = 0;
    for frame in reader.by_ref() {
        let frame = frame.expect("audio frame");
        let pts = frame.pts.expect("timestamp");
        assert!(pts > last);
        last = pts;
        if let Shape::Audio { samples, .. } = frame.shape {
            total_samples += samples;
        }
    }
    assert_eq!(total_samples, 10 * SAMPLE_RATE as usize);
}

#[test]
fn stream_listing_is_idempotent() {
    let clip = common::av_clip();
    let first = ffmpeg_source::probe_all(clip.uri()).expect("list streams");
    let second = ffmpeg_source::probe_all(clip.uri()).expect("list streams");
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);

    let reader = VideoReader::open(clip.uri(), "video").expect("open");
    assert_eq!(reader.metadata(), first.as_slice());

    let fps = reader.fps(None).expect("fps");
    assert_eq!(fps.len(), 1);
    assert!((fps[0] - FPS as f64).abs() < 1e-6);

    let duration = reader.duration(Some("video")).expect("duration");
    assert!((duration[0] - 10.0).abs() < 0.1, "duration {}", duration[0]);

    let audio_fps = reader.fps(Some("audio")).expect("audio fps");
    assert_eq!(audio_fps, vec![SAMPLE_RATE as f64]);
    assert!(reader.fps(Some("subtitle")).expect("subtitle fps").is_empty());
}

#[test]
fn memory_source_matches_file() {
    let clip = common::video_clip();
    let mut from_file = VideoReader::open(clip.uri(), "video").expect("open file");
    let mut from_memory = VideoReader::from_bytes(clip.bytes(), "video").expect("open memory");

    assert_eq!(from_file.metadata(), from_memory.metadata());
    for _ in 0..15 {
        let a = from_file.next(None).expect("file frame");
        let b = from_memory.next(None).expect("memory frame");
        assert_eq!(a, b);
    }

    from_memory.seek(5.0, false);
    let frame = from_memory.next(None).expect("memory frame after seek");
    assert!((frame.pts.expect("timestamp") - 5.0).abs() <= 1e-3);
}

#[test]
fn zero_copy_and_timestamp_options() {
    let clip = common::video_clip();
    let mut reader = VideoReader::open(clip.uri(), "video").expect("open");

    let frame = reader
        .next_with(
            None,
            NextOptions {
                include_timestamp: false,
                zero_copy: true,
            },
        )
        .expect("frame");
    assert_eq!(frame.pts, None);
    assert_eq!(frame.data.len(), frame.shape.element_count());
}

#[test]
fn selector_errors() {
    let clip = common::video_clip();
    let mut reader = VideoReader::open(clip.uri(), "video").expect("open");

    for bad in ["vid", "video:x", "video:01"] {
        assert!(matches!(
            reader.next(Some(bad)),
            Err(Error::Configuration(_))
        ));
    }
    // A bad selector leaves the session alone.
    assert_eq!(reader.init_count(), 1);
    assert!(!reader.next(None).expect("frame").is_empty());

    assert!(matches!(
        VideoReader::open(clip.uri(), "audio"),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn explicit_stream_index() {
    let clip = common::av_clip();
    let mut reader = VideoReader::open(clip.uri(), "audio:1").expect("open");
    assert_eq!(
        reader.current_stream(),
        StreamSelector::new(MediaType::Audio, StreamIndex::Index(1))
    );
    assert!(matches!(
        reader.next(None).expect("frame").shape,
        Shape::Audio { .. }
    ));

    // Stream 0 is video, so asking for audio on it fails at init.
    assert!(reader.next(Some("audio:0")).is_err());
}
