/*!
    Audio frame sampling: sample format, channel layout and sample rate
    conversion to packed output.
*/

use std::ffi::c_int;

use ffmpeg_next::{
    ChannelLayout as FFmpegChannelLayout, ffi, format::Sample,
    software::resampling::context::Context as ResamplerContext,
    util::frame::audio::Audio as AudioFrameFFmpeg,
};

use ffmpeg_source::convert::sample_format_to_ffmpeg;
use ffmpeg_types::{AudioFormat, Error, Payload, Result};

/**
    Resolve a requested audio format against a stream's native layout.

    Zero channels or sample rate take the source's value.
*/
pub fn resolve_audio_format(
    src_channels: u16,
    src_sample_rate: u32,
    requested: &AudioFormat,
) -> Result<AudioFormat> {
    let resolved = AudioFormat {
        sample_format: requested.sample_format,
        channels: if requested.channels == 0 {
            src_channels
        } else {
            requested.channels
        },
        sample_rate: if requested.sample_rate == 0 {
            src_sample_rate
        } else {
            requested.sample_rate
        },
    };

    if resolved.channels == 0 || resolved.sample_rate == 0 {
        return Err(Error::format_negotiation(format!(
            "cannot resolve audio output: {} channels at {} Hz",
            resolved.channels, resolved.sample_rate
        )));
    }

    Ok(resolved)
}

/**
    Layout for a channel count, using FFmpeg's default ordering.
*/
pub fn channel_layout_for(channels: u16) -> FFmpegChannelLayout {
    match channels {
        1 => FFmpegChannelLayout::MONO,
        2 => FFmpegChannelLayout::STEREO,
        6 => FFmpegChannelLayout::_5POINT1,
        8 => FFmpegChannelLayout::_7POINT1,
        n => FFmpegChannelLayout::default(n as i32),
    }
}

/**
    Format, layout and rate of the frames fed to a sampler.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioInput {
    pub format: Sample,
    pub layout: FFmpegChannelLayout,
    pub rate: u32,
}

impl AudioInput {
    /**
        Describe a decoded frame. Frames without a layout get the default
        layout for their channel count.
    */
    pub fn of(frame: &AudioFrameFFmpeg) -> Self {
        let layout = frame.channel_layout();
        let layout = if layout.is_empty() {
            channel_layout_for(frame.channels() as u16)
        } else {
            layout
        };

        Self {
            format: frame.format(),
            layout,
            rate: frame.rate(),
        }
    }
}

/**
    Converts decoded audio frames into interleaved samples of one fixed
    format.

    The resampler context is created for the first input seen and
    re-created only when the input format, layout or rate changes. Samples
    the resampler holds back are returned by the flush call.
*/
pub struct AudioSampler {
    output: AudioFormat,
    /// Cached resampler context and the input it was created for.
    resampler_state: Option<ResamplerState>,
    reinit_count: usize,
}

struct ResamplerState {
    context: ResamplerContext,
    input: AudioInput,
}

impl AudioSampler {
    /**
        Create a sampler for a resolved output format, as produced by
        [`resolve_audio_format`].
    */
    pub fn new(output: AudioFormat) -> Result<Self> {
        if output.channels == 0 || output.sample_rate == 0 {
            return Err(Error::configuration(format!(
                "sampler output needs channels and a sample rate, got {} channels at {} Hz",
                output.channels, output.sample_rate
            )));
        }
        sample_format_to_ffmpeg(output.sample_format)?;

        Ok(Self {
            output,
            resampler_state: None,
            reinit_count: 0,
        })
    }

    pub fn output(&self) -> &AudioFormat {
        &self.output
    }

    /**
        How many times a resampler context has been created.
    */
    pub fn reinit_count(&self) -> usize {
        self.reinit_count
    }

    /**
        Make sure the resampler matches `input`, re-creating it if needed.
    */
    pub fn ensure_input(&mut self, input: AudioInput) -> Result<()> {
        if self
            .resampler_state
            .as_ref()
            .is_some_and(|state| state.input == input)
        {
            return Ok(());
        }

        let context = ResamplerContext::get(
            input.format,
            input.layout,
            input.rate,
            sample_format_to_ffmpeg(self.output.sample_format)?,
            channel_layout_for(self.output.channels),
            self.output.sample_rate,
        )
        .map_err(|e| Error::format_negotiation(format!("failed to create resampler: {e}")))?;

        tracing::debug!(
            src_format = ?input.format,
            src_channels = input.layout.channels(),
            src_rate = input.rate,
            format = ?self.output.sample_format,
            channels = self.output.channels,
            rate = self.output.sample_rate,
            "audio sampler init"
        );

        self.resampler_state = Some(ResamplerState { context, input });
        self.reinit_count += 1;

        Ok(())
    }

    /**
        Forget the resampler and anything it buffered, as after a seek.
    */
    pub fn reset(&mut self) {
        self.resampler_state = None;
    }

    /**
        Sample one frame into a freshly allocated payload.

        `None` is a flush: it returns the samples the resampler still holds,
        which is nothing when no rate conversion is involved.
    */
    pub fn sample(&mut self, frame: Option<&AudioFrameFFmpeg>) -> Result<Payload> {
        let Some(frame) = frame else {
            return self.drain();
        };

        let input = AudioInput::of(frame);
        self.ensure_input(input)?;

        // The resampler checks frames against the layout it was built for.
        let patched;
        let frame = if frame.channel_layout() == input.layout {
            frame
        } else {
            let mut copy = frame.clone();
            copy.set_channel_layout(input.layout);
            patched = copy;
            &patched
        };

        let Some(state) = self.resampler_state.as_mut() else {
            return Err(Error::format_negotiation("resampler not initialized"));
        };

        let Some(mut resampled) = output_frame(&mut state.context, &self.output, frame.samples())?
        else {
            return Ok(Payload::new());
        };
        state
            .context
            .run(frame, &mut resampled)
            .map_err(|e| Error::format_negotiation(format!("resampling failed: {e}")))?;

        packed_payload(&resampled, &self.output)
    }

    fn drain(&mut self) -> Result<Payload> {
        let Some(state) = self.resampler_state.as_mut() else {
            return Ok(Payload::new());
        };
        let Some(mut resampled) = output_frame(&mut state.context, &self.output, 0)? else {
            return Ok(Payload::new());
        };
        state
            .context
            .flush(&mut resampled)
            .map_err(|e| Error::format_negotiation(format!("resampler flush failed: {e}")))?;

        packed_payload(&resampled, &self.output)
    }

    /**
        Number of sample frames in a payload this sampler produced.
    */
    pub fn samples_in(&self, payload: &Payload) -> usize {
        payload.len() / self.output.frame_bytes()
    }
}

/**
    An output frame large enough for everything the resampler can produce
    from `in_samples` more input plus what it already buffers. `None` when
    that is nothing.
*/
fn output_frame(
    context: &mut ResamplerContext,
    output: &AudioFormat,
    in_samples: usize,
) -> Result<Option<AudioFrameFFmpeg>> {
    let in_samples = c_int::try_from(in_samples)
        .map_err(|_| Error::invalid_data(format!("{in_samples} samples in one frame")))?;

    // SAFETY: the context pointer stays valid while `context` is borrowed.
    let capacity = unsafe { ffi::swr_get_out_samples(context.as_mut_ptr(), in_samples) };
    if capacity < 0 {
        return Err(Error::format_negotiation(format!(
            "cannot size resampler output: {}",
            ffmpeg_next::Error::from(capacity)
        )));
    }
    if capacity == 0 {
        return Ok(None);
    }

    let mut frame = AudioFrameFFmpeg::new(
        sample_format_to_ffmpeg(output.sample_format)?,
        capacity as usize,
        channel_layout_for(output.channels),
    );
    frame.set_rate(output.sample_rate);
    Ok(Some(frame))
}

/**
    The interleaved bytes of the samples the resampler actually wrote.
*/
fn packed_payload(resampled: &AudioFrameFFmpeg, output: &AudioFormat) -> Result<Payload> {
    let total_bytes = resampled.samples() * output.frame_bytes();
    let Some(bytes) = resampled.data(0).get(..total_bytes) else {
        return Err(Error::invalid_data(format!(
            "resampled frame shorter than {total_bytes} bytes"
        )));
    };
    Ok(Payload::from(bytes.to_vec()))
}

impl std::fmt::Debug for AudioSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSampler")
            .field("output", &self.output)
            .field("initialized", &self.resampler_state.is_some())
            .finish()
    }
}
