use crate::image::{Image, Info};
use crate::parser::Parser;
use crate::reader::{process_buffered, StreamReader};
use crate::Error;

/// Settings for the decoder
#[derive(Clone, Debug)]
pub struct DecoderSettings {
    /// Verify chunk CRCs. With this off, corrupted chunks are decoded anyway (and a warning is logged).
    pub check_crc: bool,
    /// Keep samples at their original bit depth instead of scaling them to 8 bits.
    ///
    /// 16-bit images are then returned as `Pixels::Rgba16`.
    pub skip_rescale: bool,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            check_crc: true,
            skip_rescale: false,
        }
    }
}

impl DecoderSettings {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set_check_crc(&mut self, check: bool) {
        self.check_crc = check;
    }

    #[inline]
    pub fn set_skip_rescale(&mut self, skip: bool) {
        self.skip_rescale = skip;
    }
}

/// Decodes PNG files into RGBA pixels
#[derive(Clone, Debug, Default)]
pub struct Decoder {
    pub settings: DecoderSettings,
}

impl Decoder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_settings(settings: DecoderSettings) -> Self {
        Self { settings }
    }

    /// Decodes a complete PNG file held in memory.
    ///
    /// The buffer must hold exactly one PNG. Bytes after `IEND` are an error.
    pub fn decode(&self, data: &[u8]) -> Result<Image, Error> {
        let mut parser = Parser::new(self.settings.clone());
        process_buffered(data, &mut parser)?;
        parser.into_image()
    }

    /// Starts an incremental decode. See [`StreamDecoder`].
    #[must_use]
    pub fn stream(&self) -> StreamDecoder {
        StreamDecoder {
            parser: Parser::new(self.settings.clone()),
            reader: StreamReader::new(),
            error: None,
        }
    }
}

/// Decoder for input that arrives in pieces (e.g. from a network socket).
///
/// ```rust
/// # fn main() -> Result<(), pngstream::Error> {
/// # let png = pngstream::encode_memory(&[0, 0, 0, 255], 1, 1)?;
/// let mut decoder = pngstream::Decoder::new().stream();
/// for piece in png.chunks(7) {
///     decoder.push(piece)?;
/// }
/// let image = decoder.finish()?;
/// assert_eq!(image.width, 1);
/// # Ok(()) }
/// ```
///
/// Once a `push` fails, the decoder stays failed: later calls return error 122,
/// and [`StreamDecoder::error`] keeps the original cause.
pub struct StreamDecoder {
    parser: Parser,
    reader: StreamReader,
    error: Option<Error>,
}

impl StreamDecoder {
    /// Feeds the next piece of the file. Pieces can be of any size, including empty.
    pub fn push(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.error.is_some() {
            return Err(Error::new(122));
        }
        let res = self.reader.push(data, &mut self.parser);
        if let Err(err) = res {
            log::debug!("stream decoding failed: {}", err);
            self.error = Some(err);
        }
        res
    }

    /// Image metadata, available once all chunks before the image data have been read
    #[must_use]
    pub fn info(&self) -> Option<&Info> {
        self.parser.info()
    }

    /// The error that stopped decoding, if any
    #[must_use]
    pub fn error(&self) -> Option<Error> {
        self.error
    }

    /// The whole image has been received
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.error.is_none() && self.parser.is_done()
    }

    /// Signals the end of input and returns the image.
    ///
    /// Fails if the file was incomplete, or if any earlier `push` failed.
    pub fn finish(self) -> Result<Image, Error> {
        if self.error.is_some() {
            return Err(Error::new(122));
        }
        let Self { mut parser, reader, .. } = self;
        reader.finish(&mut parser)?;
        parser.into_image()
    }
}
