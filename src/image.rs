use crate::Error;
use rgb::{FromSlice, RGB16, RGBA16, RGBA8};
use std::convert::TryFrom;

/// Type for `decode`, `encode`, etc. Same as standard PNG color types.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum ColorType {
    /// greyscale: 1, 2, 4, 8, 16 bit
    GREY = 0,
    /// RGB: 8, 16 bit
    RGB = 2,
    /// palette: 1, 2, 4, 8 bit
    PALETTE = 3,
    /// greyscale with alpha: 8, 16 bit
    GREY_ALPHA = 4,
    /// RGB with alpha: 8, 16 bit
    RGBA = 6,
}

impl TryFrom<u8> for ColorType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        Ok(match value {
            0 => ColorType::GREY,
            2 => ColorType::RGB,
            3 => ColorType::PALETTE,
            4 => ColorType::GREY_ALPHA,
            6 => ColorType::RGBA,
            _ => return Err(Error::new(31)),
        })
    }
}

impl ColorType {
    /// Samples per pixel. Palette indices count as one sample.
    #[inline]
    #[must_use]
    pub fn channels(self) -> u8 {
        match self {
            ColorType::GREY | ColorType::PALETTE => 1,
            ColorType::GREY_ALPHA => 2,
            ColorType::RGB => 3,
            ColorType::RGBA => 4,
        }
    }

    /// Bits per pixel at the given bit depth
    #[inline]
    #[must_use]
    pub fn bpp(self, bitdepth: u8) -> usize {
        usize::from(self.channels()) * usize::from(bitdepth)
    }

    #[inline]
    #[must_use]
    pub fn is_palette_type(self) -> bool {
        self == ColorType::PALETTE
    }

    #[inline]
    #[must_use]
    pub fn is_greyscale_type(self) -> bool {
        self == ColorType::GREY || self == ColorType::GREY_ALPHA
    }

    /// Has an alpha channel. Doesn't count palette or color key transparency.
    #[inline]
    #[must_use]
    pub fn is_alpha_type(self) -> bool {
        self == ColorType::GREY_ALPHA || self == ColorType::RGBA
    }

    /// Allowed color type / bit depth combinations
    pub fn check_bitdepth(self, bitdepth: u8) -> Result<(), Error> {
        let ok = match self {
            ColorType::GREY => matches!(bitdepth, 1 | 2 | 4 | 8 | 16),
            ColorType::PALETTE => matches!(bitdepth, 1 | 2 | 4 | 8),
            ColorType::RGB | ColorType::GREY_ALPHA | ColorType::RGBA => matches!(bitdepth, 8 | 16),
        };
        if ok { Ok(()) } else { Err(Error::new(37)) }
    }
}

/// Largest width or height a PNG header may declare
const MAX_DIMENSION: u32 = (1 << 31) - 1;

/*allows up to 2^31-1 bytes of 16-bit RGBA, with room left for filter bytes*/
const MAX_PIXELS: u64 = 268_435_455;

/// Rejects sizes that are zero, not allowed by PNG, or too large to hold in memory
pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<(), Error> {
    if width == 0 || height == 0 {
        return Err(Error::new(93));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION || u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(Error::new(92));
    }
    Ok(())
}

/// Image metadata: the header chunk, amended by `PLTE`, `tRNS` and `gAMA`
#[derive(Clone, Debug, PartialEq)]
pub struct Info {
    pub width: u32,
    pub height: u32,
    /// bits per sample, see PNG standard
    pub bit_depth: u8,
    pub color_type: ColorType,
    /// Adam7
    pub interlaced: bool,
    /// palette (`PLTE` and `tRNS`), only for color type 3
    pub palette: Vec<RGBA8>,
    /// transparent color key (`tRNS`) for color types 0 and 2.
    ///
    /// Uses the same bit depth as the image. For greyscale PNGs, r, g and b are all the same.
    pub key: Option<RGB16>,
    /// `gAMA` chunk value, already divided by 100000
    pub gamma: Option<f64>,
    pub(crate) has_trns: bool,
}

impl Info {
    pub(crate) fn new(width: u32, height: u32, bit_depth: u8, color_type: ColorType, interlaced: bool) -> Self {
        Self {
            width,
            height,
            bit_depth,
            color_type,
            interlaced,
            palette: Vec::new(),
            key: None,
            gamma: None,
            has_trns: false,
        }
    }

    /// Image uses a palette
    #[inline]
    #[must_use]
    pub fn is_palette(&self) -> bool {
        self.color_type.is_palette_type()
    }

    /// Image is not greyscale (palette counts as color)
    #[inline]
    #[must_use]
    pub fn is_color(&self) -> bool {
        !self.color_type.is_greyscale_type()
    }

    /// Has an alpha channel, or a `tRNS` chunk
    #[inline]
    #[must_use]
    pub fn has_alpha(&self) -> bool {
        self.color_type.is_alpha_type() || self.has_trns
    }

    /// Samples per pixel: 1 for grey and palette, 2 for grey+alpha, 3 for RGB, 4 for RGBA
    #[inline]
    #[must_use]
    pub fn bpp(&self) -> u8 {
        self.color_type.channels()
    }

    #[inline]
    #[must_use]
    pub fn bits_per_pixel(&self) -> usize {
        self.color_type.bpp(self.bit_depth)
    }

    /// Size of the inflated image data, including filter bytes
    #[must_use]
    pub fn filtered_size(&self) -> usize {
        crate::adam7::filtered_size(self.width, self.height, self.interlaced, self.bits_per_pixel())
    }
}

/// Canonical pixel buffer: 4 samples (R, G, B, A) per pixel, row by row
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pixels {
    Rgba8(Vec<u8>),
    Rgba16(Vec<u16>),
}

impl Pixels {
    /// Number of samples (4 per pixel)
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Pixels::Rgba8(v) => v.len(),
            Pixels::Rgba16(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 8 or 16
    #[must_use]
    pub fn bit_depth(&self) -> u8 {
        match self {
            Pixels::Rgba8(_) => 8,
            Pixels::Rgba16(_) => 16,
        }
    }
}

/// Decoded image
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    /// Metadata as it was in the file
    pub info: Info,
    pub pixels: Pixels,
}

impl Image {
    /// Pixels, if they're 8-bit
    #[must_use]
    pub fn rgba8(&self) -> Option<&[RGBA8]> {
        match &self.pixels {
            Pixels::Rgba8(v) => Some(v.as_rgba()),
            Pixels::Rgba16(_) => None,
        }
    }

    /// Pixels, if they're 16-bit (only when decoded with rescaling disabled)
    #[must_use]
    pub fn rgba16(&self) -> Option<&[RGBA16]> {
        match &self.pixels {
            Pixels::Rgba8(_) => None,
            Pixels::Rgba16(v) => Some(v.as_rgba()),
        }
    }
}
