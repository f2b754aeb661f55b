/*!
    Per-stream codec configuration handed to decoders.
*/

use ffmpeg_next::{codec, format::stream::Stream};

use ffmpeg_types::{MediaType, Rational};

use crate::convert::{media_type_of, rational_from_ffmpeg};

/**
    Everything a decoder needs to know about one container stream.

    Holds a copy of the stream's codec parameters, so it stays valid after
    the source that produced it is gone.
*/
pub struct CodecConfig {
    parameters: codec::Parameters,
    index: usize,
    media_type: MediaType,
    time_base: Rational,
    frame_rate: Rational,
}

impl CodecConfig {
    /**
        Capture a stream's configuration. Returns `None` for streams that are
        not video, audio, subtitle or caption.
    */
    pub(crate) fn from_stream(stream: &Stream) -> Option<Self> {
        // Detached copy: the stream's own parameters keep the format
        // context alive.
        let parameters = stream.parameters().clone();
        let media_type = media_type_of(&parameters)?;

        let frame_rate = if stream.avg_frame_rate().numerator() != 0 {
            rational_from_ffmpeg(stream.avg_frame_rate())
        } else {
            rational_from_ffmpeg(stream.rate())
        };

        Some(Self {
            parameters,
            index: stream.index(),
            media_type,
            time_base: rational_from_ffmpeg(stream.time_base()),
            frame_rate,
        })
    }

    /**
        A copy of the codec parameters, ready for
        `codec::context::Context::from_parameters`.
    */
    pub fn parameters(&self) -> codec::Parameters {
        self.parameters.clone()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /**
        Average frame rate, falling back to the real base frame rate. Zero
        when the container knows neither.
    */
    pub fn frame_rate(&self) -> Rational {
        self.frame_rate
    }

    pub fn codec_name(&self) -> &'static str {
        self.parameters.id().name()
    }
}

impl Clone for CodecConfig {
    fn clone(&self) -> Self {
        Self {
            parameters: self.parameters.clone(),
            index: self.index,
            media_type: self.media_type,
            time_base: self.time_base,
            frame_rate: self.frame_rate,
        }
    }
}

impl std::fmt::Debug for CodecConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecConfig")
            .field("index", &self.index)
            .field("media_type", &self.media_type)
            .field("codec_id", &self.parameters.id())
            .field("time_base", &self.time_base)
            .finish_non_exhaustive()
    }
}
