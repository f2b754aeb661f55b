/*!
    Video frame sampling: output size negotiation, scaling, pixel format
    conversion and centre cropping.
*/

use ffmpeg_next::{
    format::Pixel,
    software::scaling::{context::Context as ScalerContext, flag::Flags as ScalerFlags},
    util::frame::video::Video as VideoFrameFFmpeg,
};

use ffmpeg_source::convert::pixel_format_to_ffmpeg;
use ffmpeg_types::{Error, Payload, PixelFormat, Result, VideoFormat};

/**
    Scaling algorithm for video resizing.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScalingAlgorithm {
    /// Nearest neighbor - fastest, lowest quality.
    Nearest,
    /// Bilinear interpolation - fast, acceptable quality.
    Bilinear,
    /// Bicubic interpolation - moderate speed, good quality.
    Bicubic,
    /// Area averaging - best for downscaling.
    #[default]
    Area,
}

impl ScalingAlgorithm {
    fn to_ffmpeg_flags(self) -> ScalerFlags {
        match self {
            Self::Nearest => ScalerFlags::POINT,
            Self::Bilinear => ScalerFlags::BILINEAR,
            Self::Bicubic => ScalerFlags::BICUBIC,
            Self::Area => ScalerFlags::AREA,
        }
    }
}

fn scale(value: u32, numerator: u32, denominator: u32) -> u32 {
    (value as f64 * numerator as f64 / denominator as f64).round() as u32
}

/**
    Compute the size frames are scaled to before any crop.

    Rules, in order:
    - no requested size: `min_dim` sets the smaller side, `max_dim` the
      larger side, both together set both sides. With neither, the source
      size is kept.
    - one requested side: the other follows the source aspect ratio.
    - both sides without crop: used as given.
    - both sides with crop: the smallest aspect-preserving size covering
      the requested one.

    Sides are rounded to nearest and never zero.
*/
pub fn fit_dimensions(
    src_width: u32,
    src_height: u32,
    width: u32,
    height: u32,
    min_dimension: u32,
    max_dimension: u32,
    crop: bool,
) -> (u32, u32) {
    let src_width = src_width.max(1);
    let src_height = src_height.max(1);
    let landscape = src_width > src_height;

    let (w, h) = match (width, height) {
        (0, 0) => match (min_dimension, max_dimension) {
            (0, 0) => (src_width, src_height),
            (min, 0) if landscape => (scale(src_width, min, src_height), min),
            (min, 0) => (min, scale(src_height, min, src_width)),
            (0, max) if landscape => (max, scale(src_height, max, src_width)),
            (0, max) => (scale(src_width, max, src_height), max),
            (min, max) if landscape => (max, min),
            (min, max) => (min, max),
        },
        (w, 0) => (w, scale(src_height, w, src_width)),
        (0, h) => (scale(src_width, h, src_height), h),
        (w, h) if crop => {
            let src_slope = src_height as f64 / src_width as f64;
            let slope = h as f64 / w as f64;
            if src_slope < slope {
                (scale(src_width, h, src_height), h)
            } else {
                (w, scale(src_height, w, src_width))
            }
        }
        (w, h) => (w, h),
    };

    (w.max(1), h.max(1))
}

/**
    Check that a requested video format is self-consistent.

    Crop needs both sides. Min/max dimensions only apply when no side is
    requested.
*/
pub fn validate_video_format(format: &VideoFormat) -> Result<()> {
    if format.crop && (format.width == 0 || format.height == 0) {
        return Err(Error::configuration(format!(
            "crop requires both width and height, got {}x{}",
            format.width, format.height
        )));
    }

    if (format.min_dimension > 0 || format.max_dimension > 0)
        && (format.width > 0 || format.height > 0)
    {
        return Err(Error::configuration(
            "min/max dimension cannot be combined with an explicit width or height",
        ));
    }

    Ok(())
}

/**
    Resolve a requested format against a stream's native size and format.

    The result has a nonzero size and a concrete pixel format. With crop the
    size is the requested window; otherwise it is [`fit_dimensions`].
*/
pub fn resolve_video_format(
    src_width: u32,
    src_height: u32,
    src_format: Option<PixelFormat>,
    requested: &VideoFormat,
) -> Result<VideoFormat> {
    validate_video_format(requested)?;

    if src_width == 0 || src_height == 0 {
        return Err(Error::format_negotiation(format!(
            "stream reports invalid size {src_width}x{src_height}"
        )));
    }

    let pixel_format = requested.pixel_format.or(src_format).ok_or_else(|| {
        Error::format_negotiation("no pixel format requested and the codec format is unsupported")
    })?;

    let (width, height) = if requested.crop {
        (requested.width, requested.height)
    } else {
        fit_dimensions(
            src_width,
            src_height,
            requested.width,
            requested.height,
            requested.min_dimension,
            requested.max_dimension,
            false,
        )
    };

    Ok(VideoFormat {
        width,
        height,
        pixel_format: Some(pixel_format),
        min_dimension: 0,
        max_dimension: 0,
        crop: requested.crop,
    })
}

/**
    Geometry and format of the frames fed to a sampler.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoInput {
    pub width: u32,
    pub height: u32,
    pub format: Pixel,
}

impl VideoInput {
    pub fn of(frame: &VideoFrameFFmpeg) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
            format: frame.format(),
        }
    }
}

/**
    Converts decoded frames into tightly packed images of one fixed format.

    The scaler context is created for the first input seen and re-created
    only when the input size or pixel format changes. With crop enabled,
    frames are scaled to cover the output window and the centre is cut out.
*/
pub struct VideoSampler {
    output: VideoFormat,
    pixel_format: PixelFormat,
    algorithm: ScalingAlgorithm,
    /// Cached scaler context and the input it was created for.
    scaler_state: Option<ScalerState>,
    reinit_count: usize,
}

struct ScalerState {
    context: ScalerContext,
    input: VideoInput,
    scaled_width: u32,
    scaled_height: u32,
    scaled: VideoFrameFFmpeg,
}

impl VideoSampler {
    /**
        Create a sampler for a resolved output format, as produced by
        [`resolve_video_format`].
    */
    pub fn new(output: VideoFormat) -> Result<Self> {
        let pixel_format = output
            .pixel_format
            .ok_or_else(|| Error::configuration("sampler output needs a pixel format"))?;
        if output.width == 0 || output.height == 0 {
            return Err(Error::configuration(format!(
                "sampler output needs a nonzero size, got {}x{}",
                output.width, output.height
            )));
        }
        validate_video_format(&output)?;

        Ok(Self {
            output,
            pixel_format,
            algorithm: ScalingAlgorithm::default(),
            scaler_state: None,
            reinit_count: 0,
        })
    }

    /**
        Set the scaling algorithm. Takes effect on the next scaler init.
    */
    pub fn with_algorithm(mut self, algorithm: ScalingAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn output(&self) -> &VideoFormat {
        &self.output
    }

    /**
        Bytes in one sampled image.
    */
    pub fn output_size(&self) -> usize {
        self.pixel_format
            .buffer_size(self.output.width, self.output.height)
    }

    /**
        How many times a scaler context has been created.
    */
    pub fn reinit_count(&self) -> usize {
        self.reinit_count
    }

    /**
        Make sure the scaler matches `input`, re-creating it if needed.
    */
    pub fn ensure_input(&mut self, input: VideoInput) -> Result<()> {
        if self
            .scaler_state
            .as_ref()
            .is_some_and(|state| state.input == input)
        {
            return Ok(());
        }

        if input.width == 0 || input.height == 0 || input.format == Pixel::None {
            return Err(Error::invalid_data(format!(
                "invalid sampler input {}x{} {:?}",
                input.width, input.height, input.format
            )));
        }

        let (scaled_width, scaled_height) = if self.output.crop {
            fit_dimensions(
                input.width,
                input.height,
                self.output.width,
                self.output.height,
                0,
                0,
                true,
            )
        } else {
            (self.output.width, self.output.height)
        };

        let context = ScalerContext::get(
            input.format,
            input.width,
            input.height,
            pixel_format_to_ffmpeg(self.pixel_format)?,
            scaled_width,
            scaled_height,
            self.algorithm.to_ffmpeg_flags(),
        )
        .map_err(|e| Error::format_negotiation(format!("failed to create scaler: {e}")))?;

        tracing::debug!(
            src_width = input.width,
            src_height = input.height,
            src_format = ?input.format,
            scaled_width,
            scaled_height,
            width = self.output.width,
            height = self.output.height,
            format = ?self.pixel_format,
            "video sampler init"
        );

        self.scaler_state = Some(ScalerState {
            context,
            input,
            scaled_width,
            scaled_height,
            scaled: VideoFrameFFmpeg::empty(),
        });
        self.reinit_count += 1;

        Ok(())
    }

    /**
        Sample one frame into a freshly allocated payload.

        `None` is a flush; video samplers buffer nothing, so it yields an
        empty payload.
    */
    pub fn sample(&mut self, frame: Option<&VideoFrameFFmpeg>) -> Result<Payload> {
        let Some(frame) = frame else {
            return Ok(Payload::new());
        };

        self.ensure_input(VideoInput::of(frame))?;
        let Some(state) = self.scaler_state.as_mut() else {
            return Err(Error::format_negotiation("scaler not initialized"));
        };

        state
            .context
            .run(frame, &mut state.scaled)
            .map_err(|e| Error::format_negotiation(format!("scaling failed: {e}")))?;

        let x = (state.scaled_width - self.output.width) / 2;
        let y = (state.scaled_height - self.output.height) / 2;

        let mut payload = Payload::with_capacity(self.output_size());
        copy_window(
            &state.scaled,
            self.pixel_format,
            (x, y),
            (self.output.width, self.output.height),
            &mut payload,
        )?;

        Ok(payload)
    }
}

/**
    Append the `size` window at `origin` of every plane of `frame`, rows
    tightly packed.
*/
fn copy_window(
    frame: &VideoFrameFFmpeg,
    format: PixelFormat,
    origin: (u32, u32),
    size: (u32, u32),
    out: &mut Payload,
) -> Result<()> {
    let (x, y) = (origin.0 as usize, origin.1 as usize);
    let (width, height) = (size.0 as usize, size.1 as usize);

    for (index, plane) in format.planes().iter().enumerate() {
        let stride = frame.stride(index);
        let data = frame.data(index);
        let left = (x >> plane.x_shift) * plane.bytes_per_pixel;
        let top = y >> plane.y_shift;
        let row_bytes = plane.row_bytes(width);

        for row in 0..plane.rows(height) {
            let start = (top + row) * stride + left;
            let Some(bytes) = data.get(start..start + row_bytes) else {
                return Err(Error::invalid_data(format!(
                    "plane {index} row {row} out of bounds"
                )));
            };
            out.extend_from_slice(bytes);
        }
    }

    Ok(())
}

impl std::fmt::Debug for VideoSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSampler")
            .field("output", &self.output)
            .field("algorithm", &self.algorithm)
            .field("initialized", &self.scaler_state.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_keeps_source_size_by_default() {
        assert_eq!(fit_dimensions(640, 480, 0, 0, 0, 0, false), (640, 480));
    }

    #[test]
    fn fit_min_dimension_sets_smaller_side() {
        assert_eq!(fit_dimensions(640, 480, 0, 0, 240, 0, false), (320, 240));
        assert_eq!(fit_dimensions(480, 640, 0, 0, 240, 0, false), (240, 320));
    }

    #[test]
    fn fit_max_dimension_sets_larger_side() {
        assert_eq!(fit_dimensions(640, 480, 0, 0, 0, 320, false), (320, 240));
        assert_eq!(fit_dimensions(480, 640, 0, 0, 0, 320, false), (240, 320));
    }

    #[test]
    fn fit_min_and_max_set_both_sides() {
        assert_eq!(fit_dimensions(640, 480, 0, 0, 100, 300, false), (300, 100));
        assert_eq!(fit_dimensions(480, 640, 0, 0, 100, 300, false), (100, 300));
    }

    #[test]
    fn fit_single_side_keeps_aspect() {
        assert_eq!(fit_dimensions(1920, 1080, 640, 0, 0, 0, false), (640, 360));
        assert_eq!(fit_dimensions(1920, 1080, 0, 360, 0, 0, false), (640, 360));
    }

    #[test]
    fn fit_both_sides_without_crop_stretches() {
        assert_eq!(fit_dimensions(1920, 1080, 100, 100, 0, 0, false), (100, 100));
    }

    #[test]
    fn fit_crop_covers_requested_window() {
        // wide source into a square: height drives
        assert_eq!(fit_dimensions(1920, 1080, 100, 100, 0, 0, true), (178, 100));
        // tall source into a square: width drives
        assert_eq!(fit_dimensions(1080, 1920, 100, 100, 0, 0, true), (100, 178));
        // same aspect: no crop needed
        assert_eq!(fit_dimensions(256, 128, 128, 64, 0, 0, true), (128, 64));
    }

    #[test]
    fn fit_never_returns_zero() {
        assert_eq!(fit_dimensions(4000, 2, 1, 0, 0, 0, false), (1, 1));
        assert_eq!(fit_dimensions(0, 0, 0, 0, 0, 0, false), (1, 1));
    }

    #[test]
    fn validate_rejects_partial_crop() {
        assert!(validate_video_format(&VideoFormat::new(100, 0).with_crop(true)).is_err());
        assert!(validate_video_format(&VideoFormat::new(100, 100).with_crop(true)).is_ok());
    }

    #[test]
    fn validate_rejects_min_with_explicit_size() {
        let format = VideoFormat::new(100, 0).with_min_dimension(50);
        assert!(matches!(
            validate_video_format(&format),
            Err(Error::Configuration(_))
        ));
        assert!(validate_video_format(&VideoFormat::default().with_min_dimension(50)).is_ok());
    }

    #[test]
    fn resolve_fills_pixel_format_from_codec() {
        let resolved =
            resolve_video_format(128, 128, Some(PixelFormat::Yuv420p), &VideoFormat::default())
                .unwrap();
        assert_eq!(resolved.width, 128);
        assert_eq!(resolved.height, 128);
        assert_eq!(resolved.pixel_format, Some(PixelFormat::Yuv420p));
    }

    #[test]
    fn resolve_keeps_crop_window() {
        let requested = VideoFormat::new(64, 32)
            .with_crop(true)
            .with_pixel_format(PixelFormat::Rgb24);
        let resolved = resolve_video_format(128, 128, None, &requested).unwrap();
        assert_eq!((resolved.width, resolved.height), (64, 32));
        assert!(resolved.crop);
    }

    #[test]
    fn resolve_rejects_unknown_sizes_and_formats() {
        assert!(matches!(
            resolve_video_format(0, 0, Some(PixelFormat::Rgb24), &VideoFormat::default()),
            Err(Error::FormatNegotiation(_))
        ));
        assert!(matches!(
            resolve_video_format(128, 128, None, &VideoFormat::default()),
            Err(Error::FormatNegotiation(_))
        ));
    }

    #[test]
    fn sampler_requires_resolved_format() {
        assert!(VideoSampler::new(VideoFormat::new(64, 64)).is_err());
        let sampler =
            VideoSampler::new(VideoFormat::new(64, 48).with_pixel_format(PixelFormat::Rgb24))
                .unwrap();
        assert_eq!(sampler.output_size(), 64 * 48 * 3);
        assert_eq!(sampler.reinit_count(), 0);
    }

    #[test]
    fn sampler_flush_is_empty() {
        let mut sampler =
            VideoSampler::new(VideoFormat::new(8, 8).with_pixel_format(PixelFormat::Gray8))
                .unwrap();
        assert!(sampler.sample(None).unwrap().is_empty());
    }

    #[test]
    fn sampler_reinits_only_on_input_change() {
        ffmpeg_next::init().unwrap();
        let mut sampler =
            VideoSampler::new(VideoFormat::new(8, 8).with_pixel_format(PixelFormat::Rgb24))
                .unwrap();

        let mut frame = VideoFrameFFmpeg::new(Pixel::YUV420P, 16, 16);
        for plane in 0..3 {
            frame.data_mut(plane).fill(128);
        }

        let first = sampler.sample(Some(&frame)).unwrap();
        let second = sampler.sample(Some(&frame)).unwrap();
        assert_eq!(first.len(), 8 * 8 * 3);
        assert_eq!(second.len(), 8 * 8 * 3);
        assert_eq!(sampler.reinit_count(), 1);

        let larger = VideoFrameFFmpeg::new(Pixel::YUV420P, 32, 32);
        sampler.sample(Some(&larger)).unwrap();
        assert_eq!(sampler.reinit_count(), 2);
    }

    #[test]
    fn sampler_crops_centre_window() {
        ffmpeg_next::init().unwrap();
        let mut sampler = VideoSampler::new(
            VideoFormat::new(4, 4)
                .with_pixel_format(PixelFormat::Gray8)
                .with_crop(true),
        )
        .unwrap();

        // 8 wide, 4 tall: already covers 4x4 at full height, so the crop
        // keeps columns 2..6.
        let mut frame = VideoFrameFFmpeg::new(Pixel::GRAY8, 8, 4);
        let stride = frame.stride(0);
        for row in 0..4 {
            for col in 0..8 {
                frame.data_mut(0)[row * stride + col] = if (2..6).contains(&col) { 200 } else { 10 };
            }
        }

        let payload = sampler.sample(Some(&frame)).unwrap();
        assert_eq!(payload.len(), 16);
        assert!(payload.as_slice().iter().all(|&v| v > 100));
    }
}
