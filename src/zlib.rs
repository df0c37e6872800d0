use crate::{CompressSettings, Error};
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::Write;

/// Incremental zlib decoder for the concatenated `IDAT` payload.
///
/// Output is capped at the expected size of the image data. Anything the stream
/// produces past that is dropped, and errors after that point are ignored.
pub(crate) struct Inflater {
    z: Decompress,
    limit: usize,
    total_out: usize,
    stream_end: bool,
    buf: Vec<u8>,
}

impl Inflater {
    pub fn new(limit: usize) -> Self {
        Self {
            z: Decompress::new(true),
            limit,
            total_out: 0,
            stream_end: false,
            buf: vec![0; (limit + 1).min(1 << 15)],
        }
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.total_out >= self.limit
    }

    /// Decompresses a piece of the stream, passing output to `out` in order.
    pub fn push(&mut self, mut input: &[u8], out: &mut dyn FnMut(&[u8]) -> Result<(), Error>) -> Result<(), Error> {
        while !self.stream_end && !self.is_full() {
            let before_in = self.z.total_in();
            let before_out = self.z.total_out();
            let status = self.z.decompress(input, &mut self.buf, FlushDecompress::None);
            let consumed = (self.z.total_in() - before_in) as usize;
            let produced = (self.z.total_out() - before_out) as usize;
            input = &input[consumed..];

            let keep = produced.min(self.limit - self.total_out);
            self.total_out += keep;
            if keep > 0 {
                out(&self.buf[..keep])?;
            }

            match status {
                Ok(Status::StreamEnd) => {
                    log::debug!("zlib stream ended after {} bytes of image data", self.total_out);
                    self.stream_end = true;
                },
                Ok(_) => {},
                Err(e) => {
                    if self.is_full() {
                        log::debug!("ignoring zlib error after image data was complete: {}", e);
                        return Ok(());
                    }
                    return Err(Error::new(23));
                },
            }
            if consumed == 0 && produced == 0 {
                break;
            }
            if input.is_empty() && produced < self.buf.len() {
                break;
            }
        }
        Ok(())
    }

    /// Fails if the stream ended early
    pub fn finish(&self) -> Result<(), Error> {
        if self.is_full() {
            return Ok(());
        }
        Err(Error::new(102))
    }
}

pub(crate) fn new_compressor<W: Write>(outv: W, settings: &CompressSettings) -> ZlibEncoder<W> {
    let level = settings.level();
    let level = if level == 0 {
        Compression::none()
    } else {
        Compression::new(level.min(9).into())
    };
    ZlibEncoder::new(outv, level)
}
