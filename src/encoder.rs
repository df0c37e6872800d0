use crate::bitmap::{check_output, pack_pixels, Sample};
use crate::chunk::{write_gama, write_iend, write_ihdr, IdatWriter, SIGNATURE};
use crate::filter::{filter_image, FilterStrategy};
use crate::image::{check_dimensions, ColorType, Image, Pixels};
use crate::zlib::new_compressor;
use crate::Error;
use rgb::RGB16;
use std::io::Write;

/// Settings for the zlib compressor
#[derive(Clone, Debug)]
pub struct CompressSettings {
    level: u8,
    /// Maximum length of `IDAT` chunk data. Compressed data is split across as many chunks as needed.
    pub chunk_size: usize,
}

impl Default for CompressSettings {
    fn default() -> Self {
        Self {
            level: 9,
            chunk_size: 32 * 1024,
        }
    }
}

impl CompressSettings {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 0 (store only) to 9 (best)
    #[inline]
    #[must_use]
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Values above 9 are treated as 9
    #[inline]
    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(9);
    }
}

/// Settings for the encoder
#[derive(Clone, Debug)]
pub struct EncoderSettings {
    /// settings for the zlib encoder, such as window size, ...
    pub zlibsettings: CompressSettings,
    /// How to pick a filter for each scanline
    pub filter_strategy: FilterStrategy,
    /// Color type of the PNG file. `PALETTE` is not supported.
    pub color_type: ColorType,
    /// Bit depth of the PNG file
    pub bit_depth: u8,
    /// Layout of the pixels given to the encoder. Samples are `u8` or `u16`, depending on what's passed to `encode`.
    pub input_color_type: ColorType,
    /// If false, `RGBA` input is read as `RGB`
    pub input_has_alpha: bool,
    /// Color to blend translucent pixels with when the output has no alpha channel.
    ///
    /// In the same scale as the input samples. White if `None`.
    pub background: Option<RGB16>,
    /// Written as a `gAMA` chunk
    pub gamma: Option<f64>,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            zlibsettings: CompressSettings::default(),
            filter_strategy: FilterStrategy::MinSum,
            color_type: ColorType::RGBA,
            bit_depth: 8,
            input_color_type: ColorType::RGBA,
            input_has_alpha: true,
            background: None,
            gamma: None,
        }
    }
}

impl EncoderSettings {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Color type and bit depth of the PNG file
    #[inline]
    pub fn set_output(&mut self, color_type: ColorType, bit_depth: u8) {
        self.color_type = color_type;
        self.bit_depth = bit_depth;
    }

    /// Layout of the pixels passed to the encoder
    #[inline]
    pub fn set_input(&mut self, color_type: ColorType, has_alpha: bool) {
        self.input_color_type = color_type;
        self.input_has_alpha = has_alpha;
    }
}

/// Encodes pixels into non-interlaced PNG files
#[derive(Clone, Debug, Default)]
pub struct Encoder {
    pub settings: EncoderSettings,
}

impl Encoder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_settings(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    /// Encodes `u8` or `u16` samples laid out as `settings.input_color_type`, returning the PNG file.
    pub fn encode<T: Sample>(&self, image: &[T], width: u32, height: u32) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.encode_to(&mut out, image, width, height).map_err(|e| {
            // writing to a Vec can't fail, so it was the compressor
            if e.code() == 79 { Error::new(121) } else { e }
        })?;
        Ok(out)
    }

    /// Same as `encode`, but streams the file to the writer as it's compressed
    pub fn encode_to<W: Write, T: Sample>(&self, mut writer: W, image: &[T], width: u32, height: u32) -> Result<(), Error> {
        let settings = &self.settings;
        check_dimensions(width, height)?;
        check_output(settings.color_type, settings.bit_depth)?;

        let packed = pack_pixels(image, width, height, settings)?;
        let bits_per_pixel = settings.color_type.bpp(settings.bit_depth);
        let line_bytes = (width as usize * bits_per_pixel + 7) / 8;
        let stride = (bits_per_pixel / 8).max(1);
        let mut filtered = Vec::new();
        filter_image(&mut filtered, &packed, line_bytes, stride, settings.filter_strategy)?;
        drop(packed);

        let mut header = SIGNATURE.to_vec();
        write_ihdr(&mut header, width, height, settings.color_type, settings.bit_depth)?;
        if let Some(gamma) = settings.gamma {
            write_gama(&mut header, gamma)?;
        }
        writer.write_all(&header)?;

        let mut z = new_compressor(IdatWriter::new(writer, settings.zlibsettings.chunk_size), &settings.zlibsettings);
        z.write_all(&filtered)?;
        let (mut writer, chunks) = z.finish()?.finish()?;

        let mut trailer = Vec::with_capacity(12);
        write_iend(&mut trailer)?;
        writer.write_all(&trailer)?;
        writer.flush()?;
        log::debug!("encoded {}x{} {:?} {}-bit, {} bytes of image data in {} IDAT chunks",
            width, height, settings.color_type, settings.bit_depth, filtered.len(), chunks);
        Ok(())
    }

    /// Encodes a decoded image. Uses the image's gamma unless the settings have their own.
    pub fn encode_image(&self, image: &Image) -> Result<Vec<u8>, Error> {
        let mut encoder = self.clone();
        encoder.settings.set_input(ColorType::RGBA, true);
        if encoder.settings.gamma.is_none() {
            encoder.settings.gamma = image.info.gamma;
        }
        match &image.pixels {
            Pixels::Rgba8(px) => encoder.encode(px, image.width, image.height),
            Pixels::Rgba16(px) => encoder.encode(px, image.width, image.height),
        }
    }
}
