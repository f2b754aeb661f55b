/*!
    Media decoding for the ffmpeg crate ecosystem.

    This crate turns the packets of a [`ffmpeg_source::Source`] into output
    records. A [`Decoder`] session owns one source and a [`Stream`] per
    selected container stream, each sampling its frames to a fixed format.
    Seeks, start and end offsets, and end-of-input draining are handled
    here.
*/

mod decoder;
mod seek;
mod stream;

pub use decoder::{Decoder, DecoderState};
pub use seek::SeekController;
pub use stream::Stream;
