//! Streaming PNG decoder and encoder.
//!
//! Decoding is driven by a pull-based parser: every stage states how many bytes it needs next,
//! so the same code decodes a complete file in memory ([`Decoder::decode`]) or a file that arrives
//! in pieces ([`StreamDecoder`]). All PNG color types, bit depths and Adam7 interlacing are supported.
//! Decoded pixels are always RGBA, 8 bits per sample (or 16 with [`DecoderSettings::skip_rescale`]).
//!
//! The encoder writes non-interlaced files in any color type except palette.
//!
//! ```rust
//! # fn main() -> Result<(), pngstream::Error> {
//! let pixels = [255, 0, 0, 255, 0, 0, 255, 128];
//! let png = pngstream::encode_memory(&pixels, 2, 1)?;
//! let image = pngstream::decode_memory(&png)?;
//! assert_eq!(image.rgba8().unwrap()[1].a, 128);
//! # Ok(()) }
//! ```

pub mod adam7;
pub mod bits;
pub mod chunk;
pub mod crc;
pub mod filter;
pub mod reader;

mod bitmap;
mod decoder;
mod encoder;
mod error;
mod image;
mod parser;
mod zlib;

pub use crate::bitmap::Sample;
pub use crate::decoder::{Decoder, DecoderSettings, StreamDecoder};
pub use crate::encoder::{CompressSettings, Encoder, EncoderSettings};
pub use crate::error::{Error, ErrorKind};
pub use crate::filter::{FilterStrategy, FilterType};
pub use crate::image::{ColorType, Image, Info, Pixels};
pub use crate::parser::Parser;

pub use rgb::{RGB16, RGBA16, RGBA8};

/// Decodes a PNG file held in memory, using default settings.
///
/// Pixels are converted to 8-bit RGBA.
pub fn decode_memory(input: &[u8]) -> Result<Image, Error> {
    Decoder::new().decode(input)
}

/// Encodes 8-bit RGBA pixels as an RGBA PNG file, using default settings.
pub fn encode_memory(image: &[u8], w: u32, h: u32) -> Result<Vec<u8>, Error> {
    Encoder::new().encode(image, w, h)
}
