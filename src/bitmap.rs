//! Conversion between raw scanline samples and the canonical 4-channel pixel buffer
use crate::adam7::{pixel_offset, Pass};
use crate::bits::{BitPacker, BitUnpacker};
use crate::filter::RowSink;
use crate::image::{ColorType, Info, Pixels};
use crate::{EncoderSettings, Error};
use rgb::RGB16;

/// Samples in the order they appear in a scanline
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Layout {
    /// also used for palette indices
    Grey,
    GreyAlpha,
    Rgb,
    Rgba,
}

impl Layout {
    fn new(color_type: ColorType) -> Self {
        match color_type {
            ColorType::GREY | ColorType::PALETTE => Layout::Grey,
            ColorType::GREY_ALPHA => Layout::GreyAlpha,
            ColorType::RGB => Layout::Rgb,
            ColorType::RGBA => Layout::Rgba,
        }
    }

    #[inline]
    fn channels(self) -> usize {
        match self {
            Layout::Grey => 1,
            Layout::GreyAlpha => 2,
            Layout::Rgb => 3,
            Layout::Rgba => 4,
        }
    }

    /// Missing alpha is opaque at the source bit depth
    #[inline]
    fn to_rgba(self, s: &[u16; 4], max: u16) -> [u16; 4] {
        match self {
            Layout::Grey => [s[0], s[0], s[0], max],
            Layout::GreyAlpha => [s[0], s[0], s[0], s[1]],
            Layout::Rgb => [s[0], s[1], s[2], max],
            Layout::Rgba => *s,
        }
    }
}

/// Samples at the source bit depth, 4 per pixel
enum Canvas {
    /// for 1, 2, 4 and 8-bit images
    Eight(Vec<u8>),
    Sixteen(Vec<u16>),
}

impl Canvas {
    #[inline]
    fn set(&mut self, offset: usize, px: [u16; 4]) {
        match self {
            Canvas::Eight(v) => {
                for (d, s) in v[offset..offset + 4].iter_mut().zip(&px) {
                    *d = *s as u8;
                }
            },
            Canvas::Sixteen(v) => v[offset..offset + 4].copy_from_slice(&px),
        }
    }
}

/// Writes unfiltered scanlines of every pass into a canonical buffer at the image's own bit depth.
pub struct BitmapMapper {
    width: u32,
    layout: Layout,
    depth: u8,
    max: u16,
    canvas: Canvas,
    pixels_left: u64,
}

impl BitmapMapper {
    pub fn new(info: &Info) -> Result<Self, Error> {
        let samples = (info.width as usize).checked_mul(info.height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(Error::new(92))?;
        let canvas = if info.bit_depth == 16 {
            let mut v = Vec::new();
            v.try_reserve_exact(samples)?;
            v.resize(samples, 0);
            Canvas::Sixteen(v)
        } else {
            let mut v = Vec::new();
            v.try_reserve_exact(samples)?;
            v.resize(samples, 0);
            Canvas::Eight(v)
        };
        Ok(Self {
            width: info.width,
            layout: Layout::new(info.color_type),
            depth: info.bit_depth,
            max: ((1u32 << info.bit_depth) - 1) as u16,
            canvas,
            pixels_left: u64::from(info.width) * u64::from(info.height),
        })
    }

    /// Converts to the output format: palette lookup, color key transparency, and rescaling to 8 bits.
    ///
    /// Fails if not every pixel has been written.
    pub fn finish(self, info: &Info, skip_rescale: bool) -> Result<Pixels, Error> {
        if self.pixels_left != 0 {
            return Err(Error::new(101));
        }
        match self.canvas {
            Canvas::Eight(mut v) => {
                if info.is_palette() {
                    depalette(&mut v, &info.palette)?;
                    return Ok(Pixels::Rgba8(v));
                }
                if let Some(key) = info.key {
                    replace_transparent_color(&mut v, key);
                }
                if self.depth != 8 && !skip_rescale {
                    let max = u32::from(self.max);
                    for s in &mut v {
                        *s = scale_sample(u32::from(*s), max) as u8;
                    }
                }
                Ok(Pixels::Rgba8(v))
            },
            Canvas::Sixteen(mut v) => {
                if let Some(key) = info.key {
                    replace_transparent_color(&mut v, key);
                }
                if skip_rescale {
                    return Ok(Pixels::Rgba16(v));
                }
                let mut out = Vec::new();
                out.try_reserve_exact(v.len())?;
                out.extend(v.iter().map(|&s| scale_sample(u32::from(s), 0xFFFF) as u8));
                Ok(Pixels::Rgba8(out))
            },
        }
    }
}

impl RowSink for BitmapMapper {
    fn write_row(&mut self, pass: &Pass, y: u32, row: &[u8]) -> Result<(), Error> {
        let channels = self.layout.channels();
        let mut bits = BitUnpacker::new(row, self.depth);
        let mut samples = [0u16; 4];
        for x in 0..pass.width {
            bits.get(&mut samples[..channels])?;
            let px = self.layout.to_rgba(&samples, self.max);
            self.canvas.set(pixel_offset(self.width, pass, x, y), px);
        }
        bits.reset_after_line();
        bits.end()?;
        self.pixels_left -= u64::from(pass.width);
        Ok(())
    }
}

/// `floor(v * 255 / max + 0.5)`
#[inline]
fn scale_sample(v: u32, max: u32) -> u32 {
    (v * 255 * 2 + max) / (2 * max)
}

/// Palette indices are in the red channel
fn depalette(samples: &mut [u8], palette: &[rgb::RGBA8]) -> Result<(), Error> {
    for px in samples.chunks_exact_mut(4) {
        let color = palette.get(usize::from(px[0])).ok_or(Error::new(46))?;
        px.copy_from_slice(&[color.r, color.g, color.b, color.a]);
    }
    Ok(())
}

/// Pixels equal to the key, compared at the image's bit depth, become transparent black
fn replace_transparent_color<T: Copy + Default + PartialEq + TryFrom16>(samples: &mut [T], key: RGB16) {
    let (r, g, b) = (T::from16(key.r), T::from16(key.g), T::from16(key.b));
    for px in samples.chunks_exact_mut(4) {
        if Some(px[0]) == r && Some(px[1]) == g && Some(px[2]) == b {
            px.fill(T::default());
        }
    }
}

trait TryFrom16: Sized {
    fn from16(v: u16) -> Option<Self>;
}

impl TryFrom16 for u8 {
    #[inline]
    fn from16(v: u16) -> Option<Self> {
        if v <= 0xFF { Some(v as u8) } else { None }
    }
}

impl TryFrom16 for u16 {
    #[inline]
    fn from16(v: u16) -> Option<Self> {
        Some(v)
    }
}

/// Input sample type for the encoder
pub trait Sample: Copy + 'static {
    /// Bit depth of the input
    const BITS: u8;

    fn get(self) -> u16;
}

impl Sample for u8 {
    const BITS: u8 = 8;

    #[inline(always)]
    fn get(self) -> u16 {
        self.into()
    }
}

impl Sample for u16 {
    const BITS: u8 = 16;

    #[inline(always)]
    fn get(self) -> u16 {
        self
    }
}

/// Input samples per pixel, and whether one of them is alpha
fn input_layout(settings: &EncoderSettings) -> Result<(usize, bool), Error> {
    Ok(match settings.input_color_type {
        ColorType::GREY => (1, false),
        ColorType::GREY_ALPHA => (2, true),
        ColorType::RGB => (3, false),
        ColorType::RGBA if settings.input_has_alpha => (4, true),
        ColorType::RGBA => (3, false),
        ColorType::PALETTE => return Err(Error::new(131)),
    })
}

/// Checks that the encoder can produce this color type and bit depth
pub(crate) fn check_output(color_type: ColorType, bit_depth: u8) -> Result<(), Error> {
    match color_type {
        ColorType::PALETTE => Err(Error::new(130)),
        ColorType::GREY if matches!(bit_depth, 1 | 2 | 4 | 8 | 16) => Ok(()),
        _ if matches!(bit_depth, 8 | 16) => Ok(()),
        _ => Err(Error::new(132)),
    }
}

/// Converts input pixels to the output color type and bit depth, and packs them into byte-aligned scanlines (without filter bytes).
///
/// Alpha is flattened onto the background when the input has alpha and the output doesn't.
pub fn pack_pixels<T: Sample>(input: &[T], width: u32, height: u32, settings: &EncoderSettings) -> Result<Vec<u8>, Error> {
    let out_type = settings.color_type;
    let out_depth = settings.bit_depth;
    check_output(out_type, out_depth)?;
    let (in_channels, in_alpha) = input_layout(settings)?;

    let expected = (width as usize).checked_mul(height as usize)
        .and_then(|n| n.checked_mul(in_channels))
        .ok_or(Error::new(92))?;
    if input.len() < expected {
        return Err(Error::new(104));
    }
    if input.len() > expected {
        return Err(Error::new(112));
    }

    let max = ((1u32 << T::BITS) - 1) as u16;
    let background = settings.background.unwrap_or(RGB16 { r: max, g: max, b: max });
    let flatten = in_alpha && !out_type.is_alpha_type();
    let line_bytes = (width as usize * out_type.bpp(out_depth) + 7) / 8;

    let mut packer = BitPacker::new(out_depth, line_bytes * height as usize)?;
    if width == 0 {
        return Ok(packer.into_bytes());
    }
    for line in input.chunks_exact(width as usize * in_channels) {
        for px in line.chunks_exact(in_channels) {
            let (mut r, mut g, mut b, a) = match in_channels {
                1 => (px[0].get(), px[0].get(), px[0].get(), max),
                2 => (px[0].get(), px[0].get(), px[0].get(), px[1].get()),
                3 => (px[0].get(), px[1].get(), px[2].get(), max),
                _ => (px[0].get(), px[1].get(), px[2].get(), px[3].get()),
            };
            if flatten {
                let alpha = f64::from(a) / f64::from(max);
                let blend = |bg: u16, c: u16| {
                    ((1. - alpha) * f64::from(bg) + alpha * f64::from(c)).round().max(0.).min(f64::from(max)) as u16
                };
                r = blend(background.r, r);
                g = blend(background.g, g);
                b = blend(background.b, b);
            }
            let convert = |v: u16| convert_depth(v, T::BITS, out_depth);
            match out_type {
                ColorType::GREY | ColorType::GREY_ALPHA => {
                    let grey = ((u32::from(r) + u32::from(g) + u32::from(b)) / 3) as u16;
                    packer.put(convert(grey));
                    if out_type == ColorType::GREY_ALPHA {
                        packer.put(convert(a));
                    }
                },
                ColorType::RGB | ColorType::RGBA => {
                    packer.put(convert(r));
                    packer.put(convert(g));
                    packer.put(convert(b));
                    if out_type == ColorType::RGBA {
                        packer.put(convert(a));
                    }
                },
                ColorType::PALETTE => return Err(Error::new(130)),
            }
        }
        packer.finish_line();
    }
    log::trace!("packed {}x{} pixels into {}-bit {:?}", width, height, out_depth, out_type);
    Ok(packer.into_bytes())
}

/// Narrowing drops low bits, widening from 8 to 16 bits replicates the byte
#[inline]
fn convert_depth(v: u16, from: u8, to: u8) -> u16 {
    if from == to {
        v
    } else if from > to {
        v >> (from - to)
    } else {
        let from_max = (1u32 << from) - 1;
        let to_max = (1u32 << to) - 1;
        (u32::from(v) * to_max / from_max) as u16
    }
}
