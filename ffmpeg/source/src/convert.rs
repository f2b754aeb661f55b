/*!
    Conversion utilities between ffmpeg-next types and ffmpeg-types.
*/

use ffmpeg_next::{codec, media::Type};

use ffmpeg_types::{Error, MediaType, PixelFormat, Rational, Result, SampleFormat};

/**
    Convert ffmpeg_next::Rational to our Rational.
*/
pub fn rational_from_ffmpeg(r: ffmpeg_next::Rational) -> Rational {
    Rational::new(r.numerator(), r.denominator())
}

/**
    Convert ffmpeg_next pixel format to our PixelFormat.
*/
pub fn pixel_format_from_ffmpeg(format: ffmpeg_next::format::Pixel) -> Option<PixelFormat> {
    use ffmpeg_next::format::Pixel;

    match format {
        Pixel::YUV420P | Pixel::YUVJ420P => Some(PixelFormat::Yuv420p),
        Pixel::NV12 => Some(PixelFormat::Nv12),
        Pixel::BGRA => Some(PixelFormat::Bgra),
        Pixel::RGBA => Some(PixelFormat::Rgba),
        Pixel::RGB24 => Some(PixelFormat::Rgb24),
        Pixel::BGR24 => Some(PixelFormat::Bgr24),
        Pixel::GRAY8 => Some(PixelFormat::Gray8),
        Pixel::YUV422P | Pixel::YUVJ422P => Some(PixelFormat::Yuv422p),
        Pixel::YUV444P | Pixel::YUVJ444P => Some(PixelFormat::Yuv444p),
        Pixel::YUV420P10LE => Some(PixelFormat::Yuv420p10),
        _ => None,
    }
}

/**
    Convert our PixelFormat to FFmpeg's Pixel format.
*/
pub fn pixel_format_to_ffmpeg(format: PixelFormat) -> Result<ffmpeg_next::format::Pixel> {
    use ffmpeg_next::format::Pixel;

    match format {
        PixelFormat::Yuv420p => Ok(Pixel::YUV420P),
        PixelFormat::Nv12 => Ok(Pixel::NV12),
        PixelFormat::Bgra => Ok(Pixel::BGRA),
        PixelFormat::Rgba => Ok(Pixel::RGBA),
        PixelFormat::Rgb24 => Ok(Pixel::RGB24),
        PixelFormat::Bgr24 => Ok(Pixel::BGR24),
        PixelFormat::Gray8 => Ok(Pixel::GRAY8),
        PixelFormat::Yuv422p => Ok(Pixel::YUV422P),
        PixelFormat::Yuv444p => Ok(Pixel::YUV444P),
        PixelFormat::Yuv420p10 => Ok(Pixel::YUV420P10LE),
        _ => Err(Error::unsupported_format(format!(
            "pixel format {:?} not supported",
            format
        ))),
    }
}

/**
    Convert ffmpeg_next sample format to our SampleFormat.

    Planar and packed variants map to the same value.
*/
pub fn sample_format_from_ffmpeg(format: ffmpeg_next::format::Sample) -> Option<SampleFormat> {
    use ffmpeg_next::format::Sample;

    match format {
        Sample::F32(_) => Some(SampleFormat::F32),
        Sample::F64(_) => Some(SampleFormat::F64),
        Sample::I16(_) => Some(SampleFormat::S16),
        Sample::I32(_) => Some(SampleFormat::S32),
        Sample::U8(_) => Some(SampleFormat::U8),
        _ => None,
    }
}

/**
    Convert our SampleFormat to FFmpeg's packed Sample format.
*/
pub fn sample_format_to_ffmpeg(format: SampleFormat) -> Result<ffmpeg_next::format::Sample> {
    use ffmpeg_next::format::Sample;
    use ffmpeg_next::format::sample::Type;

    match format {
        SampleFormat::F32 => Ok(Sample::F32(Type::Packed)),
        SampleFormat::F64 => Ok(Sample::F64(Type::Packed)),
        SampleFormat::S16 => Ok(Sample::I16(Type::Packed)),
        SampleFormat::S32 => Ok(Sample::I32(Type::Packed)),
        SampleFormat::U8 => Ok(Sample::U8(Type::Packed)),
        _ => Err(Error::unsupported_format(format!(
            "sample format {:?} not supported",
            format
        ))),
    }
}

/**
    Classify a stream by its codec parameters.

    Closed captions travel as subtitle streams with an EIA-608 codec, so
    they are told apart by codec id. Data and attachment streams have no
    media type.
*/
pub fn media_type_of(parameters: &codec::Parameters) -> Option<MediaType> {
    match parameters.medium() {
        Type::Video => Some(MediaType::Video),
        Type::Audio => Some(MediaType::Audio),
        Type::Subtitle if parameters.id() == codec::Id::EIA_608 => Some(MediaType::Caption),
        Type::Subtitle => Some(MediaType::Subtitle),
        _ => None,
    }
}

/**
    The demuxer-level type a media type is carried as.
*/
pub fn media_type_to_ffmpeg(media_type: MediaType) -> Type {
    match media_type {
        MediaType::Video => Type::Video,
        MediaType::Audio => Type::Audio,
        MediaType::Subtitle | MediaType::Caption => Type::Subtitle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_formats_round_trip() {
        for format in [
            PixelFormat::Yuv420p,
            PixelFormat::Nv12,
            PixelFormat::Rgb24,
            PixelFormat::Bgra,
            PixelFormat::Gray8,
            PixelFormat::Yuv444p,
        ] {
            let ffmpeg = pixel_format_to_ffmpeg(format).unwrap();
            assert_eq!(pixel_format_from_ffmpeg(ffmpeg), Some(format));
        }
    }

    #[test]
    fn full_range_yuv_maps_to_plain_yuv() {
        use ffmpeg_next::format::Pixel;
        assert_eq!(
            pixel_format_from_ffmpeg(Pixel::YUVJ420P),
            Some(PixelFormat::Yuv420p)
        );
        assert_eq!(pixel_format_from_ffmpeg(Pixel::PAL8), None);
    }

    #[test]
    fn planar_samples_map_to_our_format() {
        use ffmpeg_next::format::Sample;
        use ffmpeg_next::format::sample::Type;
        assert_eq!(
            sample_format_from_ffmpeg(Sample::F32(Type::Planar)),
            Some(SampleFormat::F32)
        );
        assert_eq!(
            sample_format_to_ffmpeg(SampleFormat::S16).unwrap(),
            Sample::I16(Type::Packed)
        );
    }

    #[test]
    fn captions_ride_on_subtitle_streams() {
        assert_eq!(media_type_to_ffmpeg(MediaType::Caption), Type::Subtitle);
        assert_eq!(media_type_to_ffmpeg(MediaType::Video), Type::Video);
    }
}
