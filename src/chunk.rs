use crate::crc::Crc32;
use crate::image::ColorType;
use crate::Error;
use std::fmt;
use std::io::{self, Write};

/// The 8 bytes every PNG file starts with
pub const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Largest chunk length allowed by PNG
pub const MAX_CHUNK_LENGTH: usize = (1 << 31) - 1;

/// Four-letter chunk name
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {
    pub const IHDR: ChunkType = ChunkType(*b"IHDR");
    pub const PLTE: ChunkType = ChunkType(*b"PLTE");
    pub const TRNS: ChunkType = ChunkType(*b"tRNS");
    pub const GAMA: ChunkType = ChunkType(*b"gAMA");
    pub const IDAT: ChunkType = ChunkType(*b"IDAT");
    pub const IEND: ChunkType = ChunkType(*b"IEND");

    /// Ancillary chunks can be skipped by decoders that don't understand them
    #[inline]
    #[must_use]
    pub fn is_ancillary(&self) -> bool {
        self.0[0] & 32 != 0
    }

    #[inline]
    #[must_use]
    pub fn is_critical(&self) -> bool {
        !self.is_ancillary()
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Appends a complete chunk: length, name, data and CRC of name+data
pub fn write_chunk(out: &mut Vec<u8>, type_: ChunkType, data: &[u8]) -> Result<(), Error> {
    if data.len() > MAX_CHUNK_LENGTH {
        return Err(Error::new(63));
    }
    out.try_reserve(data.len() + 12)?;
    /*1: length*/
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    /*2: chunk name (4 letters)*/
    out.extend_from_slice(&type_.0);
    /*3: the data*/
    out.extend_from_slice(data);
    /*4: CRC (of the chunkname characters and the data)*/
    let mut crc = Crc32::new();
    crc.update(&type_.0);
    crc.update(data);
    out.extend_from_slice(&crc.finish().to_be_bytes());
    Ok(())
}

pub fn write_ihdr(out: &mut Vec<u8>, w: u32, h: u32, colortype: ColorType, bitdepth: u8) -> Result<(), Error> {
    let mut header = [0u8; 13];
    header[0..4].copy_from_slice(&w.to_be_bytes());
    header[4..8].copy_from_slice(&h.to_be_bytes());
    header[8] = bitdepth;
    header[9] = colortype as u8;
    /*compression, filter and interlace methods are always 0*/
    write_chunk(out, ChunkType::IHDR, &header)
}

/// Gamma is stored as an integer, multiplied by 100000
pub fn write_gama(out: &mut Vec<u8>, gamma: f64) -> Result<(), Error> {
    let value = (gamma * 100_000.).floor() as u32;
    write_chunk(out, ChunkType::GAMA, &value.to_be_bytes())
}

pub fn write_iend(out: &mut Vec<u8>) -> Result<(), Error> {
    write_chunk(out, ChunkType::IEND, &[])
}

/// `Write` adapter that frames everything written to it as `IDAT` chunks of at most `chunk_size` bytes
pub struct IdatWriter<W: Write> {
    inner: W,
    buf: Vec<u8>,
    chunk_size: usize,
    chunks: usize,
}

impl<W: Write> IdatWriter<W> {
    pub fn new(inner: W, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1).min(MAX_CHUNK_LENGTH);
        Self {
            inner,
            buf: Vec::with_capacity(chunk_size.min(1 << 16)),
            chunk_size,
            chunks: 0,
        }
    }

    fn emit(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let mut chunk = Vec::with_capacity(self.buf.len() + 12);
        write_chunk(&mut chunk, ChunkType::IDAT, &self.buf)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        self.inner.write_all(&chunk)?;
        log::trace!("IDAT chunk of {} bytes", self.buf.len());
        self.chunks += 1;
        self.buf.clear();
        Ok(())
    }

    /// Writes the last, possibly shorter, chunk. Returns the inner writer and number of chunks written.
    pub fn finish(mut self) -> io::Result<(W, usize)> {
        self.emit()?;
        Ok((self.inner, self.chunks))
    }
}

impl<W: Write> Write for IdatWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = self.chunk_size - self.buf.len();
        let n = data.len().min(room);
        self.buf.extend_from_slice(&data[..n]);
        if self.buf.len() >= self.chunk_size {
            self.emit()?;
        }
        Ok(n)
    }

    /// Only flushes the inner writer. Partial chunks are kept until they're full or `finish()` is called.
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc32;

    #[test]
    fn iend_bytes() {
        let mut out = Vec::new();
        write_iend(&mut out).unwrap();
        assert_eq!(out, [0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82]);
    }

    #[test]
    fn ihdr_layout() {
        let mut out = Vec::new();
        write_ihdr(&mut out, 10, 300, ColorType::RGBA, 16).unwrap();
        assert_eq!(&out[..8], &[0, 0, 0, 13, b'I', b'H', b'D', b'R']);
        assert_eq!(&out[8..21], &[0, 0, 0, 10, 0, 0, 1, 44, 16, 6, 0, 0, 0]);
        assert_eq!(&out[21..], &crc32(&out[4..21]).to_be_bytes());
    }

    #[test]
    fn gama_value() {
        let mut out = Vec::new();
        write_gama(&mut out, 1. / 2.2).unwrap();
        assert_eq!(&out[8..12], &45454u32.to_be_bytes());
    }

    #[test]
    fn ancillary_bit() {
        assert!(ChunkType(*b"tEXt").is_ancillary());
        assert!(ChunkType::GAMA.is_ancillary());
        assert!(ChunkType::IDAT.is_critical());
        assert!(ChunkType(*b"XYZW").is_critical());
    }

    #[test]
    fn idat_splitting() {
        let mut w = IdatWriter::new(Vec::new(), 4);
        w.write_all(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap();
        let (out, chunks) = w.finish().unwrap();
        assert_eq!(chunks, 3);
        let mut expected = Vec::new();
        write_chunk(&mut expected, ChunkType::IDAT, &[1, 2, 3, 4]).unwrap();
        write_chunk(&mut expected, ChunkType::IDAT, &[5, 6, 7, 8]).unwrap();
        write_chunk(&mut expected, ChunkType::IDAT, &[9, 10]).unwrap();
        assert_eq!(out, expected);
    }
}
