/*!
    Frame-by-frame media reading on top of the ffmpeg crates.

    [`VideoReader`] opens a file or an in-memory container, picks one stream
    with a selector such as `video` or `audio:1`, and hands out decoded
    frames as flat byte buffers with a shape and a timestamp. Seeking and
    switching streams restart the decoder session transparently.
*/

mod config;
mod frame;
mod selector;
mod session;

pub use config::ReaderConfig;
pub use frame::{Frame, Shape};
pub use selector::StreamSelector;
pub use session::{NextOptions, Plan, SeekState, SessionState, VideoReader, plan};
