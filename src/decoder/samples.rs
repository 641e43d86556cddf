//! Turns assembled, big-endian strip bytes into typed pixels.

use std::convert::TryFrom;

use super::{image::AssembledStrips, ByteOrder, DecodingResult, Limits, PixelLayout};
use crate::{tags::FileType, PixelError, PixelResult};

const OPAQUE: u32 = 0xFF00_0000;

/// Bias that moves signed 16-bit samples into the unsigned range.
const SIGNED_16_BIAS: u16 = 32768;

#[inline]
fn rgb(r: u8, g: u8, b: u8) -> u32 {
  OPAQUE | u32::from(r) << 16 | u32::from(g) << 8 | u32::from(b)
}

/// Fills `out` from consecutive `width`-byte groups of `src`. Samples past
/// the end of `src` keep their zero value.
fn fill<T>(out: &mut [T], src: &[u8], width: usize, f: impl Fn(&[u8]) -> T) {
  for (sample, bytes) in out.iter_mut().zip(src.chunks_exact(width)) {
    *sample = f(bytes);
  }
}

pub(crate) fn reconstruct(
  layout: &PixelLayout, assembled: &AssembledStrips, limits: &Limits,
) -> PixelResult<DecodingResult> {
  let width = usize::try_from(layout.width)?;
  let pixels =
    width.checked_mul(usize::try_from(layout.height)?).ok_or(PixelError::IntSizeError)?;
  let data = assembled.data.as_slice();

  use FileType::*;
  let result = match layout.file_type {
    Gray8 | Color8 => {
      let mut result = DecodingResult::new_u8(pixels, limits)?;
      if let DecodingResult::U8(ref mut out) = result {
        fill(out, data, 1, |b| b[0]);
      }
      result
    }
    Bitmap => {
      let mut result = DecodingResult::new_u8(pixels, limits)?;
      if let DecodingResult::U8(ref mut out) = result {
        unpack_bitmap(out, data, width, layout.row_bytes()?);
      }
      result
    }
    Gray16Unsigned | Gray16Signed => {
      let bias = if layout.file_type == Gray16Signed { SIGNED_16_BIAS } else { 0 };
      let mut result = DecodingResult::new_u16(pixels, limits)?;
      if let DecodingResult::U16(ref mut out) = result {
        fill(out, data, 2, |b| u16::from_be_bytes([b[0], b[1]]).wrapping_add(bias));
      }
      result
    }
    Gray12Unsigned => {
      let mut result = DecodingResult::new_u16(pixels, limits)?;
      if let DecodingResult::U16(ref mut out) = result {
        unpack_12bit(out, data, width, layout.row_bytes()?);
      }
      result
    }
    Gray24Unsigned => {
      let mut result = DecodingResult::new_f32(pixels, limits)?;
      if let DecodingResult::F32(ref mut out) = result {
        fill(out, data, 3, |b| {
          (u32::from(b[0]) | u32::from(b[1]) << 8 | u32::from(b[2]) << 16) as f32
        });
      }
      result
    }
    Gray32Int | Gray32Unsigned | Gray32Float | Gray64Float => {
      let mut result = DecodingResult::new_f32(pixels, limits)?;
      if let DecodingResult::F32(ref mut out) = result {
        match layout.file_type {
          Gray32Int => fill(out, data, 4, |b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f32),
          Gray32Unsigned => {
            fill(out, data, 4, |b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f32)
          }
          Gray32Float => fill(out, data, 4, |b| f32::from_be_bytes([b[0], b[1], b[2], b[3]])),
          _ => fill(out, data, 8, |b| {
            f64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
          }),
        }
      }
      result
    }
    RGB | BGR | ARGB | ABGR | BARG => {
      let mut result = DecodingResult::new_u32(pixels, limits)?;
      if let DecodingResult::U32(ref mut out) = result {
        match layout.file_type {
          RGB => fill(out, data, 3, |b| rgb(b[0], b[1], b[2])),
          BGR => fill(out, data, 3, |b| rgb(b[2], b[1], b[0])),
          // Read as one word, so byte order decides where alpha sits.
          ARGB => fill(out, data, 4, |b| {
            let word = [b[0], b[1], b[2], b[3]];
            match layout.byte_order {
              ByteOrder::BigEndian => u32::from_be_bytes(word),
              ByteOrder::LittleEndian => u32::from_le_bytes(word),
            }
          }),
          ABGR => fill(out, data, 4, |b| rgb(b[3], b[2], b[1])),
          _ => fill(out, data, 4, |b| rgb(b[2], b[3], b[0])),
        }
      }
      result
    }
    RGBPlanar => {
      let mut result = DecodingResult::new_u32(pixels, limits)?;
      if let DecodingResult::U32(ref mut out) = result {
        let stride = assembled.plane_stride;
        for (i, pixel) in out.iter_mut().enumerate() {
          let at = |plane: usize| data.get(plane * stride + i).copied().unwrap_or(0);
          *pixel = rgb(at(0), at(1), at(2));
        }
      }
      result
    }
    RGB48 => {
      let mut result = DecodingResult::new_planes16(pixels, limits)?;
      if let DecodingResult::Planes16(ref mut planes) = result {
        let [red, green, blue] = planes;
        for (i, bytes) in data.chunks_exact(6).take(pixels).enumerate() {
          red[i] = u16::from_be_bytes([bytes[0], bytes[1]]);
          green[i] = u16::from_be_bytes([bytes[2], bytes[3]]);
          blue[i] = u16::from_be_bytes([bytes[4], bytes[5]]);
        }
      }
      result
    }
    RGB48Planar => {
      let mut result = DecodingResult::new_planes16(pixels, limits)?;
      if let DecodingResult::Planes16(ref mut planes) = result {
        let stride = assembled.plane_stride;
        for (index, plane) in planes.iter_mut().enumerate() {
          let start = (index * stride).min(data.len());
          let end = (start + stride).min(data.len());
          fill(plane, &data[start..end], 2, |b| u16::from_be_bytes([b[0], b[1]]));
        }
      }
      result
    }
    Unknown(_) => unreachable!("Caller should have validated arguments. Please file a bug."),
  };

  Ok(result)
}

/// One bit per pixel, most significant bit first, `row_bytes` per row.
fn unpack_bitmap(out: &mut [u8], data: &[u8], width: usize, row_bytes: usize) {
  for (row, src) in out.chunks_mut(width).zip(data.chunks(row_bytes)) {
    for (x, pixel) in row.iter_mut().enumerate() {
      let Some(&byte) = src.get(x / 8) else { break };
      *pixel = if byte & (0x80 >> (x % 8)) != 0 { 255 } else { 0 };
    }
  }
}

/// Two 12-bit samples in three bytes: `AB CD EF` holds `ABC` and `DEF`. A
/// row of odd width ends in two bytes holding one sample.
fn unpack_12bit(out: &mut [u16], data: &[u8], width: usize, row_bytes: usize) {
  for (row, src) in out.chunks_mut(width).zip(data.chunks(row_bytes)) {
    for (pair, bytes) in row.chunks_mut(2).zip(src.chunks(3)) {
      if bytes.len() >= 2 {
        pair[0] = u16::from(bytes[0]) << 4 | u16::from(bytes[1]) >> 4;
      }
      if pair.len() == 2 && bytes.len() == 3 {
        pair[1] = u16::from(bytes[1] & 0x0F) << 8 | u16::from(bytes[2]);
      }
    }
  }
}
