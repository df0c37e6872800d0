use std::collections::TryReserveError;
use std::error;
use std::fmt;
use std::io;
use std::num::NonZeroU32;

/// Numeric error code. Use `kind()` to find out which class of failure it was,
/// and `as_str()` for an English description.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Error(NonZeroU32);

/// Broad classes of failure. Every error code belongs to exactly one of these.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// The stream is not a PNG, or uses an unsupported or invalid feature
    Format,
    /// A chunk CRC did not match its contents
    Integrity,
    /// Input ended before the image was complete
    Truncation,
    /// Input continued after the image was complete
    TrailingData,
    /// The compressor failed, or the image was used in an invalid order
    State,
}

impl Error {
    /// Codes are fixed; 0 is not a valid code.
    #[inline]
    #[must_use]
    pub(crate) fn new(code: u32) -> Self {
        Self(NonZeroU32::new(code).unwrap_or(NonZeroU32::MIN))
    }

    #[inline]
    #[must_use]
    pub fn code(&self) -> u32 {
        self.0.get()
    }

    /// Returns an English description of the numerical error code.
    #[cold]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self.0.get() {
            23 => "zlib data could not be decompressed",
            28 => "incorrect PNG signature, it's no PNG or corrupted",
            29 => "first chunk is not the header chunk",
            30 => "invalid tRNS chunk size for greyscale image",
            31 => "illegal PNG color type",
            32 => "illegal PNG compression method",
            33 => "illegal PNG filter method",
            34 => "illegal PNG interlace method",
            36 => "illegal PNG filter type encountered in scanline",
            37 => "illegal bit depth for this color type given",
            38 => "the palette has more than 256 entries",
            39 => "more transparency values than palette entries",
            40 => "tRNS chunk before PLTE chunk",
            41 => "invalid tRNS chunk size for RGB image",
            42 => "tRNS chunk not allowed for color types with an alpha channel",
            43 => "duplicate header chunk",
            46 => "a value in the indexed image is larger than the palette size",
            57 => "invalid CRC encountered",
            63 => "chunk length is larger than the maximum of 2^31-1",
            69 => "unknown critical chunk",
            79 => "failed to write the encoded output",
            83 => "memory allocation failed",
            92 => "image dimensions are too large",
            93 => "zero width or height is invalid",
            94 => "header chunk must have a size of 13 bytes",
            96 => "invalid gAMA chunk size",
            100 => "input ended before a requested read could be satisfied",
            101 => "not enough image data to fill the declared dimensions",
            102 => "zlib stream ended before the image data was complete",
            103 => "no IDAT chunk before the end of the image",
            104 => "pixel buffer is smaller than the image dimensions require",
            110 => "extra data after the end of the PNG stream",
            111 => "unconsumed image data after the last pixel",
            112 => "pixel buffer is larger than the image dimensions require",
            120 => "palette image data before the PLTE chunk",
            121 => "zlib compression failed",
            122 => "decoding already failed or finished",
            130 => "palette output is not supported by the encoder",
            131 => "unsupported input color type for encoding",
            132 => "unsupported bit depth for encoding",
            _ => "unknown error code",
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self.0.get() {
            57 => ErrorKind::Integrity,
            100..=104 => ErrorKind::Truncation,
            110..=112 => ErrorKind::TrailingData,
            23 | 79 | 83 | 120..=122 => ErrorKind::State,
            _ => ErrorKind::Format,
        }
    }
}

impl fmt::Debug for Error {
    #[cold]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.0)
    }
}

impl fmt::Display for Error {
    #[cold]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    #[cold]
    fn from(_: io::Error) -> Error {
        Error::new(79)
    }
}

impl From<TryReserveError> for Error {
    #[cold]
    fn from(_: TryReserveError) -> Error {
        Error::new(83)
    }
}
