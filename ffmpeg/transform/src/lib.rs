/*!
    Media frame sampling for the ffmpeg crate ecosystem.

    This crate turns decoded frames into caller-specified fixed formats:
    resized, converted and optionally cropped images for video, and
    interleaved samples at a chosen layout and rate for audio. It also
    negotiates the output size from a request and the stream's native size.
*/

mod audio;
mod video;

pub use audio::{AudioInput, AudioSampler, channel_layout_for, resolve_audio_format};
pub use video::{
    ScalingAlgorithm, VideoInput, VideoSampler, fit_dimensions, resolve_video_format,
    validate_video_format,
};
