use std::{convert::TryFrom, io::Read};

use super::{
  lzw_decode_limited, packbits_decode, skip_bytes, stream::ByteOrder, undifference, JpegOptions,
  Limits,
};
use crate::{
  tags::{CompressionMethod, FileType},
  PixelError, PixelFormatError, PixelResult, PixelUnsupportedError,
};

/// Describes how the pixels of one image are laid out in a byte stream.
///
/// The layout is plain data filled in by whoever parsed the surrounding
/// container. Strip offsets are only compared with each other: the first
/// strip starts right after the `header_offset` leading bytes, and every
/// other strip lies `strip_offsets[i] - strip_offsets[0]` bytes further.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelLayout {
  pub file_type: FileType,
  pub width: u32,
  pub height: u32,
  pub compression: CompressionMethod,
  pub byte_order: ByteOrder,
  pub strip_offsets: Vec<u64>,
  pub strip_lengths: Vec<u64>,
  /// Rows held by each strip; 0 if unknown.
  pub rows_per_strip: u32,
  pub header_offset: u64,
}

/// Decompressed strips, ready for byte order normalisation.
#[derive(Debug)]
pub(crate) struct AssembledStrips {
  pub data: Vec<u8>,
  /// Distance between the starts of consecutive planes. Equals the whole
  /// buffer length for chunky data.
  pub plane_stride: usize,
}

impl PixelLayout {
  /// An uncompressed, big-endian layout with one strip covering the image.
  pub fn new(file_type: FileType, width: u32, height: u32) -> PixelLayout {
    let mut layout = PixelLayout {
      file_type,
      width,
      height,
      compression: CompressionMethod::None,
      byte_order: ByteOrder::BigEndian,
      strip_offsets: vec![0],
      strip_lengths: vec![0],
      rows_per_strip: height,
      header_offset: 0,
    };
    layout.strip_lengths[0] = layout.decoded_byte_len().map(|len| len as u64).unwrap_or(0);
    layout
  }

  pub fn with_compression(mut self, compression: CompressionMethod) -> PixelLayout {
    self.compression = compression;
    self
  }

  pub fn with_byte_order(mut self, byte_order: ByteOrder) -> PixelLayout {
    self.byte_order = byte_order;
    self
  }

  pub fn with_strips(mut self, offsets: Vec<u64>, lengths: Vec<u64>) -> PixelLayout {
    self.strip_offsets = offsets;
    self.strip_lengths = lengths;
    self
  }

  pub fn with_rows_per_strip(mut self, rows_per_strip: u32) -> PixelLayout {
    self.rows_per_strip = rows_per_strip;
    self
  }

  pub fn with_header_offset(mut self, header_offset: u64) -> PixelLayout {
    self.header_offset = header_offset;
    self
  }

  pub fn samples_per_pixel(&self) -> usize {
    self.file_type.samples_per_pixel().unwrap_or(0)
  }

  pub fn bits_per_sample(&self) -> u8 {
    self.file_type.bits_per_sample().unwrap_or(0)
  }

  /// Samples per pixel within one plane.
  ///
  /// Example with three 8 bit channels:
  /// * [`FileType::RGB`] -> 3 (RGBRGBRGB...)
  /// * [`FileType::RGBPlanar`] -> 1 (RRR...) (GGG...) (BBB...)
  fn samples_per_plane_pixel(&self) -> usize {
    if self.file_type.planes() > 1 {
      1
    } else {
      self.samples_per_pixel()
    }
  }

  /// Stored bytes of one row of one plane. Rows of packed formats are
  /// padded to a whole byte.
  pub fn row_bytes(&self) -> PixelResult<usize> {
    let bits = u64::from(self.width)
      .checked_mul(self.samples_per_plane_pixel() as u64)
      .and_then(|n| n.checked_mul(u64::from(self.bits_per_sample())))
      .ok_or(PixelError::IntSizeError)?;
    Ok(usize::try_from((bits + 7) / 8)?)
  }

  /// Stored bytes of one whole plane.
  pub fn plane_bytes(&self) -> PixelResult<usize> {
    self
      .row_bytes()?
      .checked_mul(usize::try_from(self.height)?)
      .ok_or(PixelError::IntSizeError)
  }

  /// Length of the decompressed strip data of the whole image.
  pub fn decoded_byte_len(&self) -> PixelResult<usize> {
    self.plane_bytes()?.checked_mul(self.file_type.planes()).ok_or(PixelError::IntSizeError)
  }

  pub(crate) fn check_strip_table(&self) -> PixelResult<()> {
    if self.strip_offsets.is_empty() || self.strip_offsets.len() != self.strip_lengths.len() {
      return Err(PixelError::FormatError(PixelFormatError::InconsistentStripTable {
        offsets: self.strip_offsets.len(),
        lengths: self.strip_lengths.len(),
      }));
    }
    Ok(())
  }

  /// Whether stored samples are whole integers that horizontal differencing
  /// can be undone on.
  pub(crate) fn supports_differencing(&self) -> bool {
    use FileType::*;
    match self.file_type {
      Gray8 | Color8 | RGB | BGR | RGBPlanar | ARGB | ABGR | BARG => true,
      Gray16Signed | Gray16Unsigned | RGB48 | RGB48Planar => true,
      Gray32Int | Gray32Unsigned => true,
      Gray32Float | Gray64Float | Bitmap | Gray12Unsigned | Gray24Unsigned | Unknown(_) => false,
    }
  }

  pub(crate) fn jpeg_options(&self) -> JpegOptions {
    JpegOptions {
      width: self.width,
      height: self.height,
      samples_per_pixel: self.samples_per_pixel(),
      bits_per_sample: self.bits_per_sample(),
      interleaved: self.file_type.planes() == 1,
      byte_order: self.byte_order,
    }
  }

  /// Walks the strip table in order, handing each strip's raw bytes to `f`.
  ///
  /// The header is skipped once before the first strip; gaps between strips
  /// are skipped as well.
  fn for_each_strip<R, F>(&self, reader: &mut R, limits: &Limits, mut f: F) -> PixelResult<()>
  where
    R: Read,
    F: FnMut(usize, Vec<u8>) -> PixelResult<()>,
  {
    skip_bytes(reader, self.header_offset)?;

    let first = self.strip_offsets[0];
    let mut position = 0u64;
    for (strip, (&offset, &length)) in
      self.strip_offsets.iter().zip(self.strip_lengths.iter()).enumerate()
    {
      let start = offset
        .checked_sub(first)
        .filter(|&start| start >= position)
        .ok_or(PixelFormatError::StripOffsetsNotIncreasing { strip })?;
      skip_bytes(reader, start - position)?;

      if length > limits.intermediate_buffer_size as u64 {
        return Err(PixelError::LimitsExceeded);
      }
      let mut raw = vec![0u8; usize::try_from(length)?];
      reader.read_exact(&mut raw)?;
      position = start + length;

      f(strip, raw)?;
    }
    Ok(())
  }

  /// Concatenates the strips as stored, for the external JPEG codec.
  pub(crate) fn read_raw_strips<R: Read>(
    &self, reader: &mut R, limits: &Limits,
  ) -> PixelResult<Vec<u8>> {
    let mut data = Vec::new();
    self.for_each_strip(reader, limits, |_, raw| {
      if data.len() + raw.len() > limits.decoding_buffer_size {
        return Err(PixelError::LimitsExceeded);
      }
      data.extend_from_slice(&raw);
      Ok(())
    })?;
    Ok(data)
  }

  /// Decompresses one strip. `expected` bounds PackBits output, which has no
  /// end marker of its own.
  fn expand_strip(&self, raw: Vec<u8>, expected: usize, limits: &Limits) -> PixelResult<Vec<u8>> {
    let mut data = match self.compression {
      CompressionMethod::None => raw,
      CompressionMethod::PackBits => packbits_decode(&raw, expected),
      CompressionMethod::LZW | CompressionMethod::LZWDifferencing => {
        lzw_decode_limited(&raw, limits.decoding_buffer_size)
      }
      CompressionMethod::JPEG | CompressionMethod::Unknown(_) => {
        return Err(PixelUnsupportedError::UnsupportedCompressionMethod(self.compression).into())
      }
    };

    if self.compression == CompressionMethod::LZWDifferencing {
      undifference(
        &mut data,
        self.samples_per_pixel(),
        self.file_type.planes(),
        self.width as usize,
        self.bits_per_sample(),
        self.byte_order,
      );
    }
    Ok(data)
  }

  /// Bytes a PackBits strip may produce when `filled` bytes of a run of
  /// `total` bytes are already decoded. A lone strip holds everything.
  fn strip_budget(&self, row_bytes: usize, filled: usize, total: usize) -> usize {
    let left = total.saturating_sub(filled);
    match self.rows_per_strip {
      _ if self.strip_offsets.len() == 1 => left,
      0 => left,
      rows => row_bytes.saturating_mul(rows as usize).min(left),
    }
  }

  /// Reads and decompresses all strips into one buffer.
  ///
  /// Strips are appended in table order. Data beyond the expected length is
  /// dropped and missing data stays zero. 16-bit planar RGB is the exception:
  /// see [`assemble_planes`](Self::assemble_planes).
  pub(crate) fn assemble_strips<R: Read>(
    &self, reader: &mut R, limits: &Limits,
  ) -> PixelResult<AssembledStrips> {
    let strips = self.strip_offsets.len();
    if self.file_type == FileType::RGB48Planar && strips >= 3 && strips % 3 == 0 {
      return self.assemble_planes(reader, limits);
    }

    let total = self.decoded_byte_len()?;
    if total > limits.decoding_buffer_size {
      return Err(PixelError::LimitsExceeded);
    }
    let row_bytes = self.row_bytes()?;

    let mut data = vec![0u8; total];
    let mut filled = 0;
    self.for_each_strip(reader, limits, |strip, raw| {
      let compressed = raw.len();
      let expanded = self.expand_strip(raw, self.strip_budget(row_bytes, filled, total), limits)?;
      log::debug!("strip {}: {} bytes expanded to {}", strip, compressed, expanded.len());

      let take = expanded.len().min(total - filled);
      data[filled..filled + take].copy_from_slice(&expanded[..take]);
      filled += take;
      Ok(())
    })?;

    if filled < total {
      log::warn!("strips held {} of {} expected bytes, the rest reads as zero", filled, total);
    }
    Ok(AssembledStrips { data, plane_stride: self.plane_bytes()? })
  }

  /// Assembles three planes whose strips share one strip table.
  ///
  /// The table holds the strips of the red, green and blue plane one after
  /// another in three equal groups. Every plane gets a slot as large as the
  /// largest decompressed plane, so the planes start at `0`, `stride` and
  /// `2 * stride`.
  fn assemble_planes<R: Read>(&self, reader: &mut R, limits: &Limits) -> PixelResult<AssembledStrips> {
    let per_plane = self.strip_offsets.len() / 3;
    let plane_bytes = self.plane_bytes()?;
    let row_bytes = self.row_bytes()?;

    let mut planes: [Vec<u8>; 3] = Default::default();
    self.for_each_strip(reader, limits, |strip, raw| {
      let plane = &mut planes[strip / per_plane];
      let compressed = raw.len();
      let expanded =
        self.expand_strip(raw, self.strip_budget(row_bytes, plane.len(), plane_bytes), limits)?;
      log::debug!(
        "plane {} strip {}: {} bytes expanded to {}",
        strip / per_plane,
        strip % per_plane,
        compressed,
        expanded.len()
      );

      if plane.len() + expanded.len() > limits.decoding_buffer_size / 3 {
        return Err(PixelError::LimitsExceeded);
      }
      plane.extend_from_slice(&expanded);
      Ok(())
    })?;

    let stride = planes.iter().map(Vec::len).max().unwrap_or(0);
    if stride < plane_bytes {
      log::warn!("planes hold at most {} of {} expected bytes, the rest reads as zero", stride, plane_bytes);
    }

    let mut data = vec![0u8; 3 * stride];
    for (slot, plane) in data.chunks_mut(stride.max(1)).zip(planes.iter()) {
      slot[..plane.len()].copy_from_slice(plane);
    }
    Ok(AssembledStrips { data, plane_stride: stride })
  }
}
