use crate::Error;

/// Splits scanline bytes into samples of 1, 2, 4, 8 or 16 bits.
///
/// Sub-byte samples are read most significant bit first. 16-bit samples are big-endian.
pub struct BitUnpacker<'data> {
    data: &'data [u8],
    depth: u8,
    /// position in bits
    bitpointer: usize,
}

impl<'data> BitUnpacker<'data> {
    #[inline]
    #[must_use]
    pub fn new(data: &'data [u8], depth: u8) -> Self {
        debug_assert!(matches!(depth, 1 | 2 | 4 | 8 | 16));
        Self { data, depth, bitpointer: 0 }
    }

    /// Fills `out` with the next `out.len()` samples. Fails if the data runs out.
    pub fn get(&mut self, out: &mut [u16]) -> Result<(), Error> {
        let depth = usize::from(self.depth);
        let end = self.bitpointer + out.len() * depth;
        if end > self.data.len() * 8 {
            return Err(Error::new(101));
        }
        match self.depth {
            8 => {
                let start = self.bitpointer / 8;
                for (o, &b) in out.iter_mut().zip(&self.data[start..]) {
                    *o = u16::from(b);
                }
            },
            16 => {
                let start = self.bitpointer / 8;
                for (o, b) in out.iter_mut().zip(self.data[start..].chunks_exact(2)) {
                    *o = u16::from_be_bytes([b[0], b[1]]);
                }
            },
            _ => {
                let mask = (1u16 << depth) - 1;
                for o in out.iter_mut() {
                    let byte = self.data[self.bitpointer >> 3];
                    let shift = 8 - depth - (self.bitpointer & 7);
                    *o = (u16::from(byte) >> shift) & mask;
                    self.bitpointer += depth;
                }
                return Ok(());
            },
        }
        self.bitpointer = end;
        Ok(())
    }

    /// Skips the padding bits at the end of a scanline. Rows always start on a byte boundary.
    #[inline]
    pub fn reset_after_line(&mut self) {
        self.bitpointer = (self.bitpointer + 7) & !7;
    }

    /// Fails if there are whole bytes that haven't been read
    pub fn end(&self) -> Result<(), Error> {
        if (self.bitpointer + 7) / 8 != self.data.len() {
            return Err(Error::new(111));
        }
        Ok(())
    }
}

/// Inverse of [`BitUnpacker`]: packs samples into bytes, padding each line to a whole byte with zero bits.
pub struct BitPacker {
    out: Vec<u8>,
    depth: u8,
    bitpointer: usize,
}

impl BitPacker {
    pub fn new(depth: u8, capacity: usize) -> Result<Self, Error> {
        debug_assert!(matches!(depth, 1 | 2 | 4 | 8 | 16));
        let mut out = Vec::new();
        out.try_reserve_exact(capacity)?;
        Ok(Self { out, depth, bitpointer: 0 })
    }

    /// Sample must fit in the bit depth
    #[inline]
    pub fn put(&mut self, sample: u16) {
        match self.depth {
            8 => self.out.push(sample as u8),
            16 => self.out.extend_from_slice(&sample.to_be_bytes()),
            depth => {
                let depth = usize::from(depth);
                if self.bitpointer & 7 == 0 {
                    self.out.push(0);
                }
                let shift = 8 - depth - (self.bitpointer & 7);
                if let Some(last) = self.out.last_mut() {
                    *last |= ((sample & ((1 << depth) - 1)) as u8) << shift;
                }
                self.bitpointer += depth;
                return;
            },
        }
        self.bitpointer += usize::from(self.depth);
    }

    #[inline]
    pub fn finish_line(&mut self) {
        self.bitpointer = (self.bitpointer + 7) & !7;
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }
}
