use std::{
  fmt,
  io::{self, Read},
};

use self::stream::{LZWReader, PackBitsReader};
use crate::{
  tags::{CompressionMethod, FileType},
  PixelError, PixelResult, PixelUnsupportedError,
};

pub use self::{image::PixelLayout, stream::ByteOrder};

mod image;
mod samples;
pub mod stream;

/// Result of a decoding process
///
/// The variant is fixed by the [`FileType`] of the layout; compression and
/// byte order never change it.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodingResult {
  /// Gray8, Color8 (palette indices) and Bitmap (0 or 255 per pixel)
  U8(Vec<u8>),
  /// Gray16 (signed data biased by 32768) and Gray12
  U16(Vec<u16>),
  /// Packed `0xAARRGGBB` pixels of the 8-bit colour layouts
  U32(Vec<u32>),
  /// Gray24 and all 32/64-bit gray layouts
  F32(Vec<f32>),
  /// Red, green and blue planes of the 48-bit layouts
  Planes16([Vec<u16>; 3]),
}

impl DecodingResult {
  fn new_u8(size: usize, limits: &Limits) -> PixelResult<DecodingResult> {
    if size > limits.decoding_buffer_size {
      Err(PixelError::LimitsExceeded)
    } else {
      Ok(DecodingResult::U8(vec![0; size]))
    }
  }

  fn new_u16(size: usize, limits: &Limits) -> PixelResult<DecodingResult> {
    if size > limits.decoding_buffer_size / 2 {
      Err(PixelError::LimitsExceeded)
    } else {
      Ok(DecodingResult::U16(vec![0; size]))
    }
  }

  fn new_u32(size: usize, limits: &Limits) -> PixelResult<DecodingResult> {
    if size > limits.decoding_buffer_size / 4 {
      Err(PixelError::LimitsExceeded)
    } else {
      Ok(DecodingResult::U32(vec![0; size]))
    }
  }

  fn new_f32(size: usize, limits: &Limits) -> PixelResult<DecodingResult> {
    if size > limits.decoding_buffer_size / std::mem::size_of::<f32>() {
      Err(PixelError::LimitsExceeded)
    } else {
      Ok(DecodingResult::F32(vec![0.0; size]))
    }
  }

  fn new_planes16(size: usize, limits: &Limits) -> PixelResult<DecodingResult> {
    if size > limits.decoding_buffer_size / 6 {
      Err(PixelError::LimitsExceeded)
    } else {
      Ok(DecodingResult::Planes16([vec![0; size], vec![0; size], vec![0; size]]))
    }
  }

  /// Number of pixels held, counting one pixel per position across planes.
  pub fn len(&self) -> usize {
    match self {
      DecodingResult::U8(buf) => buf.len(),
      DecodingResult::U16(buf) => buf.len(),
      DecodingResult::U32(buf) => buf.len(),
      DecodingResult::F32(buf) => buf.len(),
      DecodingResult::Planes16(planes) => planes[0].len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Decoding limits
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Limits {
  /// The maximum size of any `DecodingResult` in bytes, the default is
  /// 256MiB. The assembled strip buffer and every single decompressed strip
  /// are held to the same bound.
  pub decoding_buffer_size: usize,
  /// Maximum size of one compressed strip as read from the stream, the
  /// default is 128MiB.
  pub intermediate_buffer_size: usize,
}

impl Limits {
  /// A configuration that does not impose any limits.
  ///
  /// This is a good start if the caller only wants to impose selective limits, contrary to the
  /// default limits which allows selectively disabling limits.
  ///
  /// Note that this configuration is likely to crash on excessively large images since,
  /// naturally, the machine running the program does not have infinite memory.
  pub fn unlimited() -> Limits {
    Limits { decoding_buffer_size: usize::MAX, intermediate_buffer_size: usize::MAX }
  }
}

impl Default for Limits {
  fn default() -> Limits {
    Limits { decoding_buffer_size: 256 * 1024 * 1024, intermediate_buffer_size: 128 * 1024 * 1024 }
  }
}

/// Geometry handed to a [`JpegCodec`] together with the concatenated strips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JpegOptions {
  pub width: u32,
  pub height: u32,
  pub samples_per_pixel: usize,
  pub bits_per_sample: u8,
  /// `false` when each channel is stored as its own plane
  pub interleaved: bool,
  pub byte_order: ByteOrder,
}

/// An external JPEG decoder.
///
/// JPEG strips are not decompressed here. The codec receives the raw bytes
/// of all strips in order and returns the finished samples, which are passed
/// to the caller untouched.
pub trait JpegCodec: Send + Sync {
  fn decode(&self, data: &[u8], options: &JpegOptions) -> PixelResult<DecodingResult>;
}

/// Decodes a PackBits stream, producing at most `expected_len` bytes.
///
/// Decoding stops exactly at `expected_len`, even in the middle of a run, so
/// trailing bytes in `compressed` are ignored. A truncated stream yields the
/// bytes decoded before the truncation.
pub fn packbits_decode(compressed: &[u8], expected_len: usize) -> Vec<u8> {
  let mut out = Vec::with_capacity(expected_len.min(compressed.len().saturating_mul(128)));
  let mut reader =
    PackBitsReader::new(compressed, compressed.len() as u64).take(expected_len as u64);
  if let Err(err) = reader.read_to_end(&mut out) {
    log::warn!("packbits data truncated after {} of {} bytes: {}", out.len(), expected_len, err);
  }
  out
}

/// Decodes a TIFF LZW stream.
///
/// Malformed input is decoded as far as possible: the bytes produced before
/// an invalid code are returned, and a missing end code is accepted.
pub fn lzw_decode(compressed: &[u8]) -> Vec<u8> {
  lzw_decode_limited(compressed, usize::MAX)
}

pub(crate) fn lzw_decode_limited(compressed: &[u8], max_len: usize) -> Vec<u8> {
  let mut out = Vec::with_capacity(compressed.len().saturating_mul(2).min(max_len));
  let mut reader = LZWReader::new(compressed, compressed.len()).take(max_len as u64);
  if let Err(err) = reader.read_to_end(&mut out) {
    log::warn!("lzw data corrupt after {} decoded bytes: {}", out.len(), err);
  }
  out
}

trait Wrapping {
  fn wrapping_add(&self, other: Self) -> Self;
}

impl Wrapping for u8 {
  fn wrapping_add(&self, other: Self) -> Self {
    u8::wrapping_add(*self, other)
  }
}

impl Wrapping for u16 {
  fn wrapping_add(&self, other: Self) -> Self {
    u16::wrapping_add(*self, other)
  }
}

impl Wrapping for u32 {
  fn wrapping_add(&self, other: Self) -> Self {
    u32::wrapping_add(*self, other)
  }
}

impl Wrapping for u64 {
  fn wrapping_add(&self, other: Self) -> Self {
    u64::wrapping_add(*self, other)
  }
}

/// An unsigned sample as stored in the byte stream.
trait Word: Copy + Wrapping {
  const BYTES: usize;

  fn read(bytes: &[u8], byte_order: ByteOrder) -> Self;

  fn write(self, bytes: &mut [u8], byte_order: ByteOrder);
}

macro_rules! impl_word {
  ($t:ty) => {
    impl Word for $t {
      const BYTES: usize = std::mem::size_of::<$t>();

      #[inline(always)]
      fn read(bytes: &[u8], byte_order: ByteOrder) -> Self {
        let mut n = [0u8; std::mem::size_of::<$t>()];
        n.copy_from_slice(bytes);
        match byte_order {
          ByteOrder::LittleEndian => <$t>::from_le_bytes(n),
          ByteOrder::BigEndian => <$t>::from_be_bytes(n),
        }
      }

      #[inline(always)]
      fn write(self, bytes: &mut [u8], byte_order: ByteOrder) {
        let n = match byte_order {
          ByteOrder::LittleEndian => self.to_le_bytes(),
          ByteOrder::BigEndian => self.to_be_bytes(),
        };
        bytes.copy_from_slice(&n);
      }
    }
  };
}

impl_word!(u8);
impl_word!(u16);
impl_word!(u32);
impl_word!(u64);

fn rev_hpredict_nsamp<T: Copy + Wrapping>(image: &mut [T], samples: usize) {
  for col in samples..image.len() {
    image[col] = image[col].wrapping_add(image[col - samples]);
  }
}

fn rev_hpredict_rows<T: Word>(buf: &mut [u8], offset: usize, row_samples: usize, byte_order: ByteOrder) {
  let mut row: Vec<T> = Vec::with_capacity(row_samples);
  for chunk in buf.chunks_mut(row_samples * T::BYTES) {
    row.clear();
    row.extend(chunk.chunks_exact(T::BYTES).map(|b| T::read(b, byte_order)));
    rev_hpredict_nsamp(&mut row, offset);
    for (sample, bytes) in row.iter().zip(chunk.chunks_exact_mut(T::BYTES)) {
      sample.write(bytes, byte_order);
    }
  }
}

/// Undoes horizontal differencing in place.
///
/// Every sample except the first `offset` of each row holds the difference
/// to the sample `offset` positions before it, where `offset` is
/// `samples_per_pixel` for chunky data and 1 when `planes > 1`. The running
/// sum restarts at every row, so `buf` must begin on a row boundary. Sums are
/// taken on whole samples read in `byte_order`, wrapping on overflow.
///
/// Only 8, 16, 32 and 64 bit samples carry differences; other widths are
/// left unchanged.
pub fn undifference(
  buf: &mut [u8], samples_per_pixel: usize, planes: usize, width: usize, bits_per_sample: u8,
  byte_order: ByteOrder,
) {
  let offset = if planes > 1 { 1 } else { samples_per_pixel };
  let row_samples = width * offset;
  if offset == 0 || row_samples == 0 {
    return;
  }

  match bits_per_sample {
    8 => rev_hpredict_rows::<u8>(buf, offset, row_samples, byte_order),
    16 => rev_hpredict_rows::<u16>(buf, offset, row_samples, byte_order),
    32 => rev_hpredict_rows::<u32>(buf, offset, row_samples, byte_order),
    64 => rev_hpredict_rows::<u64>(buf, offset, row_samples, byte_order),
    n => log::warn!("differencing of {}-bit samples is not supported, data left as is", n),
  }
}

/// Brings multi-byte samples into big-endian order. If `byte_order` is
/// already big-endian, or samples are not 16, 32 or 64 bits wide, this is a
/// no-op.
fn fix_endianness(buf: &mut [u8], bits_per_sample: u8, byte_order: ByteOrder) {
  let width = match bits_per_sample {
    16 | 32 | 64 => usize::from(bits_per_sample / 8),
    _ => return,
  };
  if byte_order == ByteOrder::LittleEndian {
    log::trace!("swapping {} bytes in {}-byte groups", buf.len(), width);
    buf.chunks_exact_mut(width).for_each(|sample| sample.reverse());
  }
}

/// Decodes raw strip data into typed pixels
///
/// A `Decoder` only carries configuration. Every call to
/// [`read_pixels`](Decoder::read_pixels) works on its own buffers, so one
/// decoder can serve any number of streams, also from several threads.
pub struct Decoder {
  limits: Limits,
  jpeg: Option<Box<dyn JpegCodec>>,
}

impl fmt::Debug for Decoder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Decoder")
      .field("limits", &self.limits)
      .field("jpeg", &self.jpeg.is_some())
      .finish()
  }
}

impl Default for Decoder {
  fn default() -> Self {
    Decoder::new()
  }
}

impl Decoder {
  pub fn new() -> Decoder {
    Decoder { limits: Limits::default(), jpeg: None }
  }

  pub fn with_limits(mut self, limits: Limits) -> Decoder {
    self.limits = limits;
    self
  }

  pub fn with_jpeg_codec<C: JpegCodec + 'static>(mut self, codec: C) -> Decoder {
    self.jpeg = Some(Box::new(codec));
    self
  }

  pub fn limits(&self) -> &Limits {
    &self.limits
  }

  /// Reads the pixels described by `layout` from `reader`.
  ///
  /// The stream is consumed forwards only: `header_offset` bytes are skipped
  /// once, then each strip is read at its offset relative to the first
  /// strip.
  ///
  /// Returns `Ok(None)` when the layout cannot describe any pixels: a zero
  /// width or height, an unknown file type or an unknown compression.
  /// Errors are reserved for I/O failures, inconsistent strip tables,
  /// exceeded limits and unsupported combinations.
  pub fn read_pixels<R: Read>(
    &self, mut reader: R, layout: &PixelLayout,
  ) -> PixelResult<Option<DecodingResult>> {
    if layout.width == 0 || layout.height == 0 {
      log::warn!("refusing to decode {}x{} pixels", layout.width, layout.height);
      return Ok(None);
    }
    if !layout.file_type.is_known() {
      log::warn!("refusing to decode unknown file type {:?}", layout.file_type);
      return Ok(None);
    }
    if let CompressionMethod::Unknown(code) = layout.compression {
      log::warn!("refusing to decode unknown compression {}", code);
      return Ok(None);
    }
    layout.check_strip_table()?;

    log::debug!(
      "decoding {:?} {}x{}, {:?}, {:?}, {} strip(s) after {} header bytes",
      layout.file_type,
      layout.width,
      layout.height,
      layout.compression,
      layout.byte_order,
      layout.strip_offsets.len(),
      layout.header_offset
    );

    if layout.compression == CompressionMethod::JPEG {
      let codec = self.jpeg.as_ref().ok_or(PixelUnsupportedError::JpegCodecMissing)?;
      let data = layout.read_raw_strips(&mut reader, &self.limits)?;
      return codec.decode(&data, &layout.jpeg_options()).map(Some);
    }

    if layout.compression == CompressionMethod::LZWDifferencing
      && !layout.supports_differencing()
    {
      return Err(PixelUnsupportedError::DifferencingNotSupported(layout.file_type).into());
    }

    let mut assembled = layout.assemble_strips(&mut reader, &self.limits)?;
    if let Some(bits) = layout.file_type.bits_per_sample() {
      for plane in assembled.data.chunks_mut(assembled.plane_stride.max(1)) {
        fix_endianness(plane, bits, layout.byte_order);
      }
    }

    samples::reconstruct(layout, &assembled, &self.limits).map(Some)
  }
}

/// Reads the pixels described by `layout` with default limits and no JPEG
/// codec. See [`Decoder::read_pixels`].
pub fn read_pixels<R: Read>(reader: R, layout: &PixelLayout) -> PixelResult<Option<DecodingResult>> {
  Decoder::new().read_pixels(reader, layout)
}

/// Discards `count` bytes, failing if the stream ends first.
fn skip_bytes<R: Read>(reader: &mut R, count: u64) -> io::Result<()> {
  if count == 0 {
    return Ok(());
  }
  let skipped = io::copy(&mut reader.by_ref().take(count), &mut io::sink())?;
  if skipped < count {
    return Err(io::Error::new(
      io::ErrorKind::UnexpectedEof,
      format!("stream ended after skipping {} of {} bytes", skipped, count),
    ));
  }
  Ok(())
}
