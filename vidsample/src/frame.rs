/*!
    Output records shaped for array consumers.
*/

use serde::Serialize;

use ffmpeg_types::{DecoderOutputMessage, Error, Format, Result};

/**
    Dimensions of a frame's data.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Packed pixels, row major.
    Video {
        height: usize,
        width: usize,
        channels: usize,
    },
    /// Interleaved samples.
    Audio { samples: usize, channels: usize },
    /// Raw text bytes.
    Bytes { len: usize },
    /// End of stream or timeout.
    Empty,
}

impl Shape {
    pub fn dims(&self) -> Vec<usize> {
        match *self {
            Self::Video {
                height,
                width,
                channels,
            } => vec![height, width, channels],
            Self::Audio { samples, channels } => vec![samples, channels],
            Self::Bytes { len } => vec![len],
            Self::Empty => vec![0],
        }
    }

    pub fn element_count(&self) -> usize {
        match *self {
            Self::Empty => 0,
            _ => self.dims().iter().product(),
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dims: Vec<String> = self.dims().iter().map(usize::to_string).collect();
        write!(f, "({})", dims.join(", "))
    }
}

/**
    One decoded record: its bytes, their shape, and the presentation time
    in seconds.

    Audio data holds native-endian samples of the session's sample format.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub data: Vec<u8>,
    pub shape: Shape,
    pub pts: Option<f64>,
}

impl Frame {
    /**
        The end-of-stream frame: no data and no timestamp.
    */
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            shape: Shape::Empty,
            pts: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shape == Shape::Empty
    }

    /**
        Shape a decoder record.

        The payload is copied into a buffer of the declared size, or moved
        when `zero_copy` is set. Either way its length must match the shape
        exactly.
    */
    pub fn from_message(
        message: DecoderOutputMessage,
        include_timestamp: bool,
        zero_copy: bool,
    ) -> Result<Self> {
        let DecoderOutputMessage { header, payload } = message;

        let (shape, expected) = match header.format.format {
            Format::Video(video) => {
                let Some(channels) = video
                    .pixel_format
                    .and_then(|pixel_format| pixel_format.packed_channels())
                else {
                    return Err(Error::unsupported_format(format!(
                        "{:?} frames cannot be shaped as (height, width, channels)",
                        video.pixel_format
                    )));
                };
                let shape = Shape::Video {
                    height: video.height as usize,
                    width: video.width as usize,
                    channels,
                };
                (shape, video.width as usize * video.height as usize * channels)
            }
            Format::Audio(audio) => {
                let frame_bytes = audio.frame_bytes();
                if frame_bytes == 0 {
                    return Err(Error::invalid_data("audio record without channels"));
                }
                let samples = payload.len() / frame_bytes;
                let shape = Shape::Audio {
                    samples,
                    channels: audio.channels as usize,
                };
                (shape, samples * frame_bytes)
            }
            Format::Subtitle | Format::Caption => {
                (Shape::Bytes { len: payload.len() }, payload.len())
            }
        };

        if payload.len() != expected {
            return Err(Error::Consistency {
                expected,
                actual: payload.len(),
            });
        }

        let data = if zero_copy {
            payload.into_vec()
        } else {
            let mut data = vec![0u8; expected];
            data.copy_from_slice(payload.as_slice());
            data
        };

        Ok(Self {
            data,
            shape,
            pts: include_timestamp.then(|| header.pts_us as f64 * 1e-6),
        })
    }
}
