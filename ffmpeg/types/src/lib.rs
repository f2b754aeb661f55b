/*!
    Shared types for the ffmpeg crate ecosystem.

    This crate defines the vocabulary of the ecosystem, the types that cross
    crate boundaries. It has no dependency on FFmpeg, so consumers can depend
    on it without pulling in FFmpeg bindings.
*/

mod error;
mod format;
mod media;
mod message;
mod params;
mod time;

pub use error::{Error, Result};
pub use format::{PixelFormat, PlaneLayout, SampleFormat};
pub use media::{AudioFormat, Format, MediaFormat, MediaType, StreamIndex, VideoFormat};
pub use message::{DecoderHeader, DecoderMetadata, DecoderOutputMessage, Payload};
pub use params::{DecoderParameters, SeekMode};
pub use time::{DEFAULT_SEEK_ACCURACY_US, Rational, TIME_BASE_JITTER_US};
