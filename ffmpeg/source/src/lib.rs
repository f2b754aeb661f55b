/*!
    Media source and demuxing for the ffmpeg crate ecosystem.

    This crate handles the input side of the media pipeline. It opens media
    from files, URIs or caller-supplied byte sources, reads stream headers,
    and produces encoded packets that downstream crates can decode.
*/

mod avio;
mod codec_config;
pub mod convert;
mod data_source;
mod probe;
mod source;

pub use codec_config::CodecConfig;
pub use data_source::{DataSource, MemorySource};
pub use probe::{
    all_streams, probe, probe_all, probe_source, probe_source_all, select_streams,
    source_metadata, stream_metadata,
};
pub use source::{Demuxed, Source};
