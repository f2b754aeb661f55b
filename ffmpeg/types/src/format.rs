/*!
    Pixel and sample format types.
*/

use serde::{Deserialize, Serialize};

/**
    Video pixel formats.

    This is the set of formats the samplers can produce and crop. Decoded
    frames in other formats are still accepted as scaler input.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 12bpp (most common video format)
    Yuv420p,
    /// Semi-planar YUV 4:2:0, 12bpp (common hardware decoder output)
    Nv12,
    /// Packed BGRA, 32bpp
    Bgra,
    /// Packed RGBA, 32bpp
    Rgba,
    /// Packed RGB, 24bpp (the default sampling target)
    Rgb24,
    /// Packed BGR, 24bpp
    Bgr24,
    /// Single luma plane, 8bpp
    Gray8,
    /// Planar YUV 4:2:2, 16bpp
    Yuv422p,
    /// Planar YUV 4:4:4, 24bpp
    Yuv444p,
    /// Planar YUV 4:2:0, 10-bit little-endian
    Yuv420p10,
}

/**
    Memory layout of one plane of a pixel format.

    A plane covers `ceil(width / 2^x_shift)` columns and
    `ceil(height / 2^y_shift)` rows, each column `bytes_per_pixel` wide.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneLayout {
    pub bytes_per_pixel: usize,
    pub x_shift: u32,
    pub y_shift: u32,
}

impl PlaneLayout {
    const fn new(bytes_per_pixel: usize, x_shift: u32, y_shift: u32) -> Self {
        Self {
            bytes_per_pixel,
            x_shift,
            y_shift,
        }
    }

    /**
        Number of columns this plane holds for a frame `width` pixels wide.
    */
    pub const fn columns(&self, width: usize) -> usize {
        (width + (1 << self.x_shift) - 1) >> self.x_shift
    }

    /**
        Number of rows this plane holds for a frame `height` pixels tall.
    */
    pub const fn rows(&self, height: usize) -> usize {
        (height + (1 << self.y_shift) - 1) >> self.y_shift
    }

    /**
        Tightly packed row length in bytes.
    */
    pub const fn row_bytes(&self, width: usize) -> usize {
        self.columns(width) * self.bytes_per_pixel
    }
}

const PACKED_1: [PlaneLayout; 1] = [PlaneLayout::new(1, 0, 0)];
const PACKED_3: [PlaneLayout; 1] = [PlaneLayout::new(3, 0, 0)];
const PACKED_4: [PlaneLayout; 1] = [PlaneLayout::new(4, 0, 0)];
const YUV420: [PlaneLayout; 3] = [
    PlaneLayout::new(1, 0, 0),
    PlaneLayout::new(1, 1, 1),
    PlaneLayout::new(1, 1, 1),
];
const YUV420_10: [PlaneLayout; 3] = [
    PlaneLayout::new(2, 0, 0),
    PlaneLayout::new(2, 1, 1),
    PlaneLayout::new(2, 1, 1),
];
const YUV422: [PlaneLayout; 3] = [
    PlaneLayout::new(1, 0, 0),
    PlaneLayout::new(1, 1, 0),
    PlaneLayout::new(1, 1, 0),
];
const YUV444: [PlaneLayout; 3] = [
    PlaneLayout::new(1, 0, 0),
    PlaneLayout::new(1, 0, 0),
    PlaneLayout::new(1, 0, 0),
];
// Interleaved UV pairs: one 2-byte column per two luma columns.
const NV12: [PlaneLayout; 2] = [PlaneLayout::new(1, 0, 0), PlaneLayout::new(2, 1, 1)];

impl PixelFormat {
    /**
        Returns the number of bits per pixel for this format.

        For planar formats, this is the average bits per pixel.
    */
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Gray8 => 8,
            Self::Yuv420p | Self::Nv12 => 12,
            Self::Yuv420p10 => 15,
            Self::Yuv422p => 16,
            Self::Rgb24 | Self::Bgr24 | Self::Yuv444p => 24,
            Self::Bgra | Self::Rgba => 32,
        }
    }

    /**
        Returns true if this is a planar format.
    */
    pub const fn is_planar(self) -> bool {
        self.planes().len() > 1
    }

    /**
        Plane layouts, in FFmpeg plane order.
    */
    pub const fn planes(self) -> &'static [PlaneLayout] {
        match self {
            Self::Gray8 => &PACKED_1,
            Self::Rgb24 | Self::Bgr24 => &PACKED_3,
            Self::Bgra | Self::Rgba => &PACKED_4,
            Self::Yuv420p => &YUV420,
            Self::Yuv420p10 => &YUV420_10,
            Self::Yuv422p => &YUV422,
            Self::Yuv444p => &YUV444,
            Self::Nv12 => &NV12,
        }
    }

    /**
        Channel count of packed formats, the last axis of an
        `(height, width, channels)` image. Planar formats have no such axis.
    */
    pub const fn packed_channels(self) -> Option<usize> {
        match self {
            Self::Gray8 => Some(1),
            Self::Rgb24 | Self::Bgr24 => Some(3),
            Self::Bgra | Self::Rgba => Some(4),
            _ => None,
        }
    }

    /**
        Size in bytes of a tightly packed `width` x `height` image.
    */
    pub fn buffer_size(self, width: u32, height: u32) -> usize {
        let (width, height) = (width as usize, height as usize);
        self.planes()
            .iter()
            .map(|plane| plane.row_bytes(width) * plane.rows(height))
            .sum()
    }
}

/**
    Audio sample formats.

    All sampler output is packed (interleaved), so there are no planar
    variants here.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SampleFormat {
    /// 32-bit floating point, range [-1.0, 1.0]
    #[default]
    F32,
    /// 64-bit floating point
    F64,
    /// Signed 16-bit integer
    S16,
    /// Signed 32-bit integer
    S32,
    /// Unsigned 8-bit integer
    U8,
}

impl SampleFormat {
    /**
        Returns the number of bytes per sample.
    */
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /**
        Returns true if this is a floating-point format.
    */
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}
