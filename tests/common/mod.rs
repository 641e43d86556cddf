#![allow(dead_code)]

use rand::{rngs::StdRng, Rng, SeedableRng};
use rawstrip::{tags::CompressionMethod, tags::FileType, ByteOrder, DecodingResult, PixelLayout};

pub const ALL_FILE_TYPES: [FileType; 19] = [
  FileType::Gray8,
  FileType::Gray16Signed,
  FileType::Gray16Unsigned,
  FileType::Gray32Int,
  FileType::Gray32Float,
  FileType::Color8,
  FileType::RGB,
  FileType::RGBPlanar,
  FileType::Bitmap,
  FileType::ARGB,
  FileType::BGR,
  FileType::Gray32Unsigned,
  FileType::RGB48,
  FileType::Gray12Unsigned,
  FileType::Gray24Unsigned,
  FileType::BARG,
  FileType::Gray64Float,
  FileType::RGB48Planar,
  FileType::ABGR,
];

/// An image as a writer would store it uncompressed and big-endian, with
/// the result the decoder has to produce for it.
pub struct TestImage {
  pub file_type: FileType,
  pub width: u32,
  pub height: u32,
  pub stored: Vec<u8>,
  pub expected: DecodingResult,
}

fn opaque(r: u8, g: u8, b: u8) -> u32 {
  0xFF00_0000 | u32::from(r) << 16 | u32::from(g) << 8 | u32::from(b)
}

pub fn random_image(file_type: FileType, width: u32, height: u32, seed: u64) -> TestImage {
  let mut rng = StdRng::seed_from_u64(seed);
  let (w, h) = (width as usize, height as usize);
  let n = w * h;

  let (stored, expected) = match file_type {
    FileType::Gray8 | FileType::Color8 => {
      let v: Vec<u8> = (0..n).map(|_| rng.gen()).collect();
      (v.clone(), DecodingResult::U8(v))
    }
    FileType::Bitmap => {
      let bits: Vec<bool> = (0..n).map(|_| rng.gen()).collect();
      let row_bytes = (w + 7) / 8;
      let mut stored = vec![0u8; row_bytes * h];
      for (i, &bit) in bits.iter().enumerate() {
        if bit {
          let (x, y) = (i % w, i / w);
          stored[y * row_bytes + x / 8] |= 0x80 >> (x % 8);
        }
      }
      (stored, DecodingResult::U8(bits.iter().map(|&b| if b { 255 } else { 0 }).collect()))
    }
    FileType::Gray16Unsigned => {
      let v: Vec<u16> = (0..n).map(|_| rng.gen()).collect();
      (v.iter().flat_map(|s| s.to_be_bytes()).collect(), DecodingResult::U16(v))
    }
    FileType::Gray16Signed => {
      let v: Vec<i16> = (0..n).map(|_| rng.gen()).collect();
      (
        v.iter().flat_map(|s| s.to_be_bytes()).collect(),
        DecodingResult::U16(v.iter().map(|&s| (s as u16).wrapping_add(32768)).collect()),
      )
    }
    FileType::Gray12Unsigned => {
      let v: Vec<u16> = (0..n).map(|_| rng.gen_range(0..4096)).collect();
      let mut stored = Vec::new();
      for row in v.chunks(w) {
        for pair in row.chunks(2) {
          stored.push((pair[0] >> 4) as u8);
          match pair.get(1) {
            Some(&second) => {
              stored.push(((pair[0] & 0xF) << 4 | second >> 8) as u8);
              stored.push(second as u8);
            }
            None => stored.push(((pair[0] & 0xF) << 4) as u8),
          }
        }
      }
      (stored, DecodingResult::U16(v))
    }
    FileType::Gray24Unsigned => {
      let v: Vec<u32> = (0..n).map(|_| rng.gen_range(0..1 << 24)).collect();
      (
        v.iter().flat_map(|s| s.to_le_bytes()[..3].to_vec()).collect(),
        DecodingResult::F32(v.iter().map(|&s| s as f32).collect()),
      )
    }
    FileType::Gray32Int => {
      let v: Vec<i32> = (0..n).map(|_| rng.gen_range(-(1 << 24)..1 << 24)).collect();
      (
        v.iter().flat_map(|s| s.to_be_bytes()).collect(),
        DecodingResult::F32(v.iter().map(|&s| s as f32).collect()),
      )
    }
    FileType::Gray32Unsigned => {
      let v: Vec<u32> = (0..n).map(|_| rng.gen_range(0..1 << 24)).collect();
      (
        v.iter().flat_map(|s| s.to_be_bytes()).collect(),
        DecodingResult::F32(v.iter().map(|&s| s as f32).collect()),
      )
    }
    FileType::Gray32Float => {
      let v: Vec<f32> = (0..n).map(|_| rng.gen_range(-4000i32..4000) as f32 / 8.0).collect();
      (v.iter().flat_map(|s| s.to_be_bytes()).collect(), DecodingResult::F32(v))
    }
    FileType::Gray64Float => {
      let v: Vec<f32> = (0..n).map(|_| rng.gen_range(-4000i32..4000) as f32 / 8.0).collect();
      (v.iter().flat_map(|&s| f64::from(s).to_be_bytes()).collect(), DecodingResult::F32(v))
    }
    FileType::RGB | FileType::BGR | FileType::RGBPlanar => {
      let px: Vec<[u8; 3]> = (0..n).map(|_| rng.gen()).collect();
      let stored: Vec<u8> = match file_type {
        FileType::RGB => px.iter().flat_map(|p| [p[0], p[1], p[2]]).collect(),
        FileType::BGR => px.iter().flat_map(|p| [p[2], p[1], p[0]]).collect(),
        _ => (0..3).flat_map(|c| px.iter().map(move |p| p[c])).collect(),
      };
      (stored, DecodingResult::U32(px.iter().map(|p| opaque(p[0], p[1], p[2])).collect()))
    }
    FileType::ARGB | FileType::ABGR | FileType::BARG => {
      // a, r, g, b
      let px: Vec<[u8; 4]> = (0..n).map(|_| rng.gen()).collect();
      let (stored, expected): (Vec<u8>, Vec<u32>) = match file_type {
        FileType::ARGB => (
          px.iter().flat_map(|p| *p).collect(),
          px.iter().map(|p| u32::from_be_bytes(*p)).collect(),
        ),
        FileType::ABGR => (
          px.iter().flat_map(|p| [p[0], p[3], p[2], p[1]]).collect(),
          px.iter().map(|p| opaque(p[1], p[2], p[3])).collect(),
        ),
        _ => (
          px.iter().flat_map(|p| [p[3], p[0], p[1], p[2]]).collect(),
          px.iter().map(|p| opaque(p[1], p[2], p[3])).collect(),
        ),
      };
      (stored, DecodingResult::U32(expected))
    }
    FileType::RGB48 | FileType::RGB48Planar => {
      let planes: [Vec<u16>; 3] = [
        (0..n).map(|_| rng.gen()).collect(),
        (0..n).map(|_| rng.gen()).collect(),
        (0..n).map(|_| rng.gen()).collect(),
      ];
      let stored: Vec<u8> = if file_type == FileType::RGB48 {
        (0..n)
          .flat_map(|i| {
            let mut px = Vec::with_capacity(6);
            for plane in planes.iter() {
              px.extend_from_slice(&plane[i].to_be_bytes());
            }
            px
          })
          .collect()
      } else {
        planes.iter().flat_map(|plane| plane.iter().flat_map(|s| s.to_be_bytes())).collect()
      };
      (stored, DecodingResult::Planes16(planes))
    }
    other => panic!("no generator for {:?}", other),
  };

  TestImage { file_type, width, height, stored, expected }
}

/// Converts big-endian stored bytes to `byte_order`.
pub fn to_byte_order(stored: &[u8], file_type: FileType, byte_order: ByteOrder) -> Vec<u8> {
  let mut out = stored.to_vec();
  if byte_order == ByteOrder::BigEndian {
    return out;
  }
  let word = match (file_type, file_type.bits_per_sample()) {
    (FileType::ARGB, _) => 4,
    (_, Some(bits @ (16 | 32 | 64))) => usize::from(bits / 8),
    _ => 1,
  };
  out.chunks_exact_mut(word).for_each(|w| w.reverse());
  out
}

/// A PackBits writer that prefers runs, splitting them at 128 bytes.
pub fn packbits_encode(data: &[u8]) -> Vec<u8> {
  let mut out = Vec::new();
  let mut i = 0;
  while i < data.len() {
    let mut run = 1;
    while i + run < data.len() && run < 128 && data[i + run] == data[i] {
      run += 1;
    }

    if run >= 2 {
      out.push((1 - run as i16) as i8 as u8);
      out.push(data[i]);
      i += run;
    } else {
      let start = i;
      while i < data.len() && i - start < 128 {
        if i + 1 < data.len() && data[i] == data[i + 1] && i > start {
          break;
        }
        i += 1;
      }
      out.push((i - start - 1) as u8);
      out.extend_from_slice(&data[start..i]);
    }
  }
  out
}

pub fn lzw_encode(data: &[u8]) -> Vec<u8> {
  weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
    .encode(data)
    .expect("lzw encoding of a buffer cannot fail")
}

/// Replaces every sample but the first `offset` of each row by its
/// difference to the sample `offset` positions before it.
pub fn difference(data: &mut [u8], offset: usize, row_samples: usize, bytes: usize, byte_order: ByteOrder) {
  let mask = if bytes == 8 { u64::MAX } else { (1u64 << (8 * bytes)) - 1 };
  let read = |b: &[u8]| -> u64 {
    let fold = |v: u64, &x: &u8| v << 8 | u64::from(x);
    match byte_order {
      ByteOrder::BigEndian => b.iter().fold(0, fold),
      ByteOrder::LittleEndian => b.iter().rev().fold(0, fold),
    }
  };

  for row in data.chunks_mut(row_samples * bytes) {
    let samples: Vec<u64> = row.chunks_exact(bytes).map(|b| read(b)).collect();
    for (i, out) in row.chunks_exact_mut(bytes).enumerate().skip(offset) {
      let delta = samples[i].wrapping_sub(samples[i - offset]) & mask;
      for (k, byte) in out.iter_mut().enumerate() {
        let shift = match byte_order {
          ByteOrder::BigEndian => 8 * (bytes - 1 - k),
          ByteOrder::LittleEndian => 8 * k,
        };
        *byte = (delta >> shift) as u8;
      }
    }
  }
}

pub fn supports_differencing(file_type: FileType) -> bool {
  !matches!(
    file_type,
    FileType::Gray32Float
      | FileType::Gray64Float
      | FileType::Bitmap
      | FileType::Gray12Unsigned
      | FileType::Gray24Unsigned
  )
}

/// How the encoded strips are written into the stream.
#[derive(Clone, Copy, Debug)]
pub struct Stripping {
  /// `None` writes the whole image as a single strip.
  pub rows_per_strip: Option<u32>,
  pub header_offset: usize,
  /// Junk bytes written after every strip.
  pub gap: usize,
}

pub fn compress_strip(strip: &[u8], compression: CompressionMethod, image: &TestImage, byte_order: ByteOrder) -> Vec<u8> {
  match compression {
    CompressionMethod::None => strip.to_vec(),
    CompressionMethod::PackBits => packbits_encode(strip),
    CompressionMethod::LZW => lzw_encode(strip),
    CompressionMethod::LZWDifferencing => {
      let spp = image.file_type.samples_per_pixel().unwrap();
      let offset = if image.file_type.planes() > 1 { 1 } else { spp };
      let bytes = usize::from(image.file_type.bits_per_sample().unwrap() / 8);
      let mut strip = strip.to_vec();
      difference(&mut strip, offset, image.width as usize * offset, bytes, byte_order);
      lzw_encode(&strip)
    }
    other => panic!("cannot encode {:?}", other),
  }
}

/// Writes `image` as a strip based stream and returns it with its layout.
pub fn encode(
  image: &TestImage, compression: CompressionMethod, byte_order: ByteOrder, stripping: Stripping,
) -> (Vec<u8>, PixelLayout) {
  let data = to_byte_order(&image.stored, image.file_type, byte_order);
  let planes = image.file_type.planes();
  let plane_bytes = data.len() / planes;
  let row_bytes = plane_bytes / image.height as usize;

  let strips: Vec<&[u8]> = match stripping.rows_per_strip {
    None => vec![&data[..]],
    Some(rows) => data
      .chunks(plane_bytes)
      .flat_map(|plane| plane.chunks(row_bytes * rows as usize))
      .collect(),
  };

  let mut stream = vec![0xA5; stripping.header_offset];
  let mut offsets = Vec::new();
  let mut lengths = Vec::new();
  for strip in strips {
    let encoded = compress_strip(strip, compression, image, byte_order);
    offsets.push(stream.len() as u64);
    lengths.push(encoded.len() as u64);
    stream.extend_from_slice(&encoded);
    stream.extend(std::iter::repeat(0x5A).take(stripping.gap));
  }

  let layout = PixelLayout::new(image.file_type, image.width, image.height)
    .with_compression(compression)
    .with_byte_order(byte_order)
    .with_strips(offsets, lengths)
    .with_rows_per_strip(stripping.rows_per_strip.unwrap_or(image.height))
    .with_header_offset(stripping.header_offset as u64);
  (stream, layout)
}
