//! Decoding of raw, strip based raster pixel data
//!
//! Many image containers (TIFF first among them) store pixels as one or more
//! independently compressed strips. Given a [`PixelLayout`] describing the
//! pixel format, compression, byte order and strip table, this crate reads
//! the strips from any [`std::io::Read`], undoes PackBits, LZW and
//! horizontal differencing, normalises byte order and returns the samples as
//! a [`DecodingResult`].
//!
//! Parsing the container, colour tables and JPEG entropy decoding are left to
//! the caller; the latter plugs in through [`JpegCodec`].
//!
//! ```
//! use rawstrip::{read_pixels, tags::FileType, DecodingResult, PixelLayout};
//!
//! let layout = PixelLayout::new(FileType::Gray8, 2, 2);
//! let pixels = read_pixels(&[1u8, 2, 3, 4][..], &layout).unwrap();
//! assert_eq!(pixels, Some(DecodingResult::U8(vec![1, 2, 3, 4])));
//! ```
//!
//! # Related Links
//! * <https://web.archive.org/web/20210108073850/https://www.adobe.io/open/standards/TIFF.html> -
//!   The TIFF specification, sections 9 (PackBits), 13 (LZW) and 14 (Differencing Predictor)

extern crate weezl;

pub use self::{
  decoder::{
    lzw_decode, packbits_decode, read_pixels, undifference, ByteOrder, Decoder, DecodingResult,
    JpegCodec, JpegOptions, Limits, PixelLayout,
  },
  error::{PixelError, PixelFormatError, PixelResult, PixelUnsupportedError},
};

pub mod decoder;
mod error;
pub mod tags;
