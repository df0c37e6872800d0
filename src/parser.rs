//! PNG container state machine
use crate::adam7;
use crate::bitmap::BitmapMapper;
use crate::chunk::{ChunkType, MAX_CHUNK_LENGTH, SIGNATURE};
use crate::crc::Crc32;
use crate::filter::Unfilter;
use crate::image::{check_dimensions, ColorType, Image, Info, Pixels};
use crate::reader::{ByteSink, Demand, StreamReader};
use crate::zlib::Inflater;
use crate::{DecoderSettings, Error};
use rgb::{RGB16, RGBA8};
use std::convert::TryFrom;

/// Where the parser resumes when the next bytes arrive
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum State {
    Signature,
    /// length and chunk type
    ChunkHeader,
    /// chunk data, in pieces as they arrive
    ChunkData { type_: ChunkType, remaining: usize, mode: Payload },
    ChunkCrc { type_: ChunkType, mode: Payload },
    /// `IEND` has been read
    Done,
}

/// What happens to chunk data while it's being read
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Payload {
    /// Kept until the CRC has been checked, then interpreted
    Buffer,
    /// `IDAT` sent to the inflater as it arrives
    Stream,
    /// Unused ancillary chunk, or metadata that came too late
    Discard,
}

/// Inflate → unfilter → bitmap, fed with `IDAT` payload
struct ImageData {
    inflater: Inflater,
    reader: StreamReader,
    unfilter: Unfilter<BitmapMapper>,
}

impl ImageData {
    fn new(info: &Info) -> Result<Self, Error> {
        let mapper = BitmapMapper::new(info)?;
        let passes = adam7::passes(info.width, info.height, info.interlaced);
        Ok(Self {
            inflater: Inflater::new(info.filtered_size()),
            reader: StreamReader::new(),
            unfilter: Unfilter::new(passes, info.bits_per_pixel(), mapper),
        })
    }

    fn push(&mut self, data: &[u8]) -> Result<(), Error> {
        let Self { inflater, reader, unfilter } = self;
        inflater.push(data, &mut |inflated| reader.push(inflated, &mut *unfilter))
    }

    fn finish(mut self, info: &Info, skip_rescale: bool) -> Result<Pixels, Error> {
        self.inflater.finish()?;
        self.reader.finish(&mut self.unfilter)?;
        self.unfilter.into_sink().finish(info, skip_rescale)
    }
}

/// Chunk-level decoder. Feed it with [`crate::reader::process_buffered`] or a [`StreamReader`].
///
/// Metadata chunks are only interpreted after their CRC has been checked. `IDAT` data goes to
/// the inflater as soon as it arrives, and a bad `IDAT` CRC fails the decode at the end of that chunk.
pub struct Parser {
    state: State,
    settings: DecoderSettings,
    crc: Crc32,
    /// data of the current chunk
    pending: Vec<u8>,
    info: Option<Info>,
    data: Option<ImageData>,
    pixels: Option<Pixels>,
}

impl Parser {
    #[must_use]
    pub fn new(settings: DecoderSettings) -> Self {
        Self {
            state: State::Signature,
            settings,
            crc: Crc32::new(),
            pending: Vec::new(),
            info: None,
            data: None,
            pixels: None,
        }
    }

    /// Image metadata, once all chunks before the image data have been read
    #[must_use]
    pub fn info(&self) -> Option<&Info> {
        if self.data.is_some() || self.pixels.is_some() {
            self.info.as_ref()
        } else {
            None
        }
    }

    /// `IEND` has been read and the image is complete
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// The decoded image. Fails if the stream hasn't ended yet.
    pub fn into_image(self) -> Result<Image, Error> {
        match (self.info, self.pixels) {
            (Some(info), Some(pixels)) if self.state == State::Done => Ok(Image {
                width: info.width,
                height: info.height,
                info,
                pixels,
            }),
            _ => Err(Error::new(100)),
        }
    }

    fn read_signature(&mut self, data: &[u8]) -> Result<(), Error> {
        if data != SIGNATURE {
            return Err(Error::new(28));
        }
        self.state = State::ChunkHeader;
        Ok(())
    }

    fn read_chunk_header(&mut self, data: &[u8]) -> Result<(), Error> {
        let length = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        let type_ = ChunkType([data[4], data[5], data[6], data[7]]);
        log::trace!("chunk {:?}, {} bytes", type_, length);
        if length > MAX_CHUNK_LENGTH {
            return Err(Error::new(63));
        }
        if self.info.is_none() && type_ != ChunkType::IHDR {
            return Err(Error::new(29));
        }
        /*length isn't covered by the CRC, so it can be checked right away*/
        match type_ {
            ChunkType::IHDR if length != 13 => return Err(Error::new(94)),
            ChunkType::PLTE if length > 3 * 256 => return Err(Error::new(38)),
            ChunkType::GAMA if length != 4 => return Err(Error::new(96)),
            _ if type_.is_critical() && !is_supported(type_) => return Err(Error::new(69)),
            _ => {},
        }

        self.crc = Crc32::new();
        self.crc.update(&type_.0);
        self.pending.clear();

        let mode = match type_ {
            ChunkType::IDAT => {
                /*everything it depends on has been read and verified already*/
                self.check_order(type_)?;
                self.start_image_data()?;
                Payload::Stream
            },
            ChunkType::PLTE | ChunkType::TRNS | ChunkType::GAMA if self.data.is_some() => {
                log::debug!("ignoring {:?} after the image data started", type_);
                Payload::Discard
            },
            _ if type_.is_ancillary() && !is_known(type_) => Payload::Discard,
            _ => Payload::Buffer,
        };
        self.state = if length == 0 {
            State::ChunkCrc { type_, mode }
        } else {
            State::ChunkData { type_, remaining: length, mode }
        };
        Ok(())
    }

    fn read_chunk_data(&mut self, type_: ChunkType, remaining: usize, mode: Payload, data: &[u8]) -> Result<(), Error> {
        self.crc.update(data);
        match mode {
            Payload::Buffer => {
                self.pending.try_reserve(data.len())?;
                self.pending.extend_from_slice(data);
            },
            Payload::Stream => {
                if let Some(image_data) = self.data.as_mut() {
                    image_data.push(data)?;
                }
            },
            Payload::Discard => {},
        }
        self.state = if remaining > data.len() {
            State::ChunkData { type_, remaining: remaining - data.len(), mode }
        } else {
            State::ChunkCrc { type_, mode }
        };
        Ok(())
    }

    fn read_chunk_crc(&mut self, type_: ChunkType, mode: Payload, data: &[u8]) -> Result<(), Error> {
        let expected = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let actual = self.crc.finish();
        if expected != actual {
            if self.settings.check_crc {
                return Err(Error::new(57));
            }
            log::warn!("CRC mismatch in {:?} chunk: expected {:08x}, got {:08x}", type_, expected, actual);
        }

        self.state = State::ChunkHeader;
        if mode == Payload::Buffer {
            let payload = std::mem::take(&mut self.pending);
            self.process_chunk(type_, &payload)?;
            // keep the allocation for the next chunk
            self.pending = payload;
        }
        Ok(())
    }

    fn check_order(&self, type_: ChunkType) -> Result<(), Error> {
        match (&self.info, type_) {
            (None, ChunkType::IHDR) => Ok(()),
            (None, _) => Err(Error::new(29)),
            (Some(_), ChunkType::IHDR) => Err(Error::new(43)),
            _ => Ok(()),
        }
    }

    fn process_chunk(&mut self, type_: ChunkType, data: &[u8]) -> Result<(), Error> {
        self.check_order(type_)?;
        match type_ {
            ChunkType::IHDR => {
                self.info = Some(read_ihdr(data)?);
            },
            ChunkType::PLTE => {
                let info = self.info.as_mut().ok_or(Error::new(29))?;
                read_plte(info, data)?;
            },
            ChunkType::TRNS => {
                let info = self.info.as_mut().ok_or(Error::new(29))?;
                read_trns(info, data)?;
            },
            ChunkType::GAMA => {
                let info = self.info.as_mut().ok_or(Error::new(29))?;
                info.gamma = Some(f64::from(u32::from_be_bytes([data[0], data[1], data[2], data[3]])) / 100_000.);
            },
            ChunkType::IEND => self.finish_image()?,
            _ => {},
        }
        Ok(())
    }

    /// Metadata is final at the first `IDAT`
    fn start_image_data(&mut self) -> Result<(), Error> {
        if self.data.is_some() {
            return Ok(());
        }
        let info = self.info.as_ref().ok_or(Error::new(29))?;
        if info.is_palette() && info.palette.is_empty() {
            return Err(Error::new(120));
        }
        log::debug!("image data starts: {}x{} {:?} {}-bit, interlaced={}, palette={}, key={:?}, gamma={:?}",
            info.width, info.height, info.color_type, info.bit_depth, info.interlaced, info.palette.len(), info.key, info.gamma);
        self.data = Some(ImageData::new(info)?);
        Ok(())
    }

    fn finish_image(&mut self) -> Result<(), Error> {
        let info = self.info.as_ref().ok_or(Error::new(29))?;
        let data = self.data.take().ok_or(Error::new(103))?;
        let pixels = data.finish(info, self.settings.skip_rescale)?;
        log::debug!("decoded {}x{} image into {}-bit RGBA", info.width, info.height, pixels.bit_depth());
        self.pixels = Some(pixels);
        self.state = State::Done;
        Ok(())
    }
}

/// Ancillary chunks that are interpreted rather than skipped
fn is_known(type_: ChunkType) -> bool {
    type_ == ChunkType::TRNS || type_ == ChunkType::GAMA
}

fn is_supported(type_: ChunkType) -> bool {
    matches!(type_, ChunkType::IHDR | ChunkType::PLTE | ChunkType::IDAT | ChunkType::IEND)
}

impl ByteSink for Parser {
    fn demand(&self) -> Option<Demand> {
        Some(match self.state {
            State::Signature | State::ChunkHeader => Demand::Exact(8),
            State::ChunkData { remaining, .. } => Demand::UpTo(remaining),
            State::ChunkCrc { .. } => Demand::Exact(4),
            State::Done => return None,
        })
    }

    fn supply(&mut self, data: &[u8]) -> Result<(), Error> {
        match self.state {
            State::Signature => self.read_signature(data),
            State::ChunkHeader => self.read_chunk_header(data),
            State::ChunkData { type_, remaining, mode } => self.read_chunk_data(type_, remaining, mode, data),
            State::ChunkCrc { type_, mode } => self.read_chunk_crc(type_, mode, data),
            State::Done => Err(Error::new(110)),
        }
    }
}

fn read_ihdr(data: &[u8]) -> Result<Info, Error> {
    let width = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let height = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
    check_dimensions(width, height)?;
    let bit_depth = data[8];
    if !matches!(bit_depth, 1 | 2 | 4 | 8 | 16) {
        return Err(Error::new(37));
    }
    let color_type = ColorType::try_from(data[9])?;
    color_type.check_bitdepth(bit_depth)?;
    if data[10] != 0 {
        /*error: only compression method 0 is allowed in the specification*/
        return Err(Error::new(32));
    }
    if data[11] != 0 {
        /*error: only filter method 0 is allowed in the specification*/
        return Err(Error::new(33));
    }
    let interlaced = match data[12] {
        0 => false,
        1 => true,
        _ => return Err(Error::new(34)),
    };
    log::debug!("IHDR {}x{} color type {:?} depth {} interlaced {}", width, height, color_type, bit_depth, interlaced);
    Ok(Info::new(width, height, bit_depth, color_type, interlaced))
}

fn read_plte(info: &mut Info, data: &[u8]) -> Result<(), Error> {
    let entries = data.len() / 3;
    if entries > 256 {
        return Err(Error::new(38));
    }
    info.palette.clear();
    info.palette.try_reserve_exact(entries)?;
    info.palette.extend(data.chunks_exact(3).map(|c| RGBA8::new(c[0], c[1], c[2], 255)));
    Ok(())
}

fn read_trns(info: &mut Info, data: &[u8]) -> Result<(), Error> {
    match info.color_type {
        ColorType::PALETTE => {
            if info.palette.is_empty() {
                return Err(Error::new(40));
            }
            if data.len() > info.palette.len() {
                return Err(Error::new(39));
            }
            for (entry, &a) in info.palette.iter_mut().zip(data) {
                entry.a = a;
            }
        },
        ColorType::GREY => {
            if data.len() != 2 {
                return Err(Error::new(30));
            }
            let t = u16::from_be_bytes([data[0], data[1]]);
            info.key = Some(RGB16 { r: t, g: t, b: t });
        },
        ColorType::RGB => {
            if data.len() != 6 {
                return Err(Error::new(41));
            }
            info.key = Some(RGB16 {
                r: u16::from_be_bytes([data[0], data[1]]),
                g: u16::from_be_bytes([data[2], data[3]]),
                b: u16::from_be_bytes([data[4], data[5]]),
            });
        },
        ColorType::GREY_ALPHA | ColorType::RGBA => return Err(Error::new(42)),
    }
    info.has_trns = true;
    Ok(())
}
