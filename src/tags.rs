//! Numeric codes for pixel layouts and compression schemes.
//!
//! Callers that persist a layout (or receive one from a container parser)
//! store these codes; anything unmapped decodes to an `Unknown` variant so
//! the decoder can refuse it without guessing.

macro_rules! tags {
  {
    // Permit arbitrary meta items, which include documentation.
    $( #[$enum_attr:meta] )*
    $vis:vis enum $name:ident($ty:tt) $(unknown($unknown_doc:literal))* {
      // Each of the `Name = Val,` permitting documentation.
      $($(#[$ident_attr:meta])* $tag:ident = $val:expr,)*
    }
  } => {
    $( #[$enum_attr] )*
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[non_exhaustive]
    pub enum $name {
      $($(#[$ident_attr])* $tag,)*
      $(
        #[doc = $unknown_doc]
        Unknown($ty),
      )*
    }

    impl $name {
      #[inline(always)]
      fn __from_inner_type(n: $ty) -> Result<Self, $ty> {
        match n {
          $( $val => Ok($name::$tag), )*
          n => Err(n),
        }
      }

      #[inline(always)]
      fn __to_inner_type(&self) -> $ty {
        match *self {
          $( $name::$tag => $val, )*
          $( $name::Unknown(n) => { $unknown_doc; n }, )*
        }
      }
    }

    tags!($name, $ty, $($unknown_doc)*);
  };
  // For u16 codes, provide direct inherent primitive conversion methods.
  ($name:tt, u16, $($unknown_doc:literal)*) => {
    impl $name {
      #[inline(always)]
      pub fn from_u16(val: u16) -> Option<Self> {
        Self::__from_inner_type(val).ok()
      }

      $(
      #[inline(always)]
      pub fn from_u16_exhaustive(val: u16) -> Self {
        $unknown_doc;
        Self::__from_inner_type(val).unwrap_or_else(|_| $name::Unknown(val))
      }
      )*

      #[inline(always)]
      pub fn to_u16(&self) -> u16 {
        Self::__to_inner_type(self)
      }
    }
  };
  ($name:tt, $ty:tt, $($unknown_doc:literal)*) => {};
}

tags! {
/// How the pixels of one image are stored.
///
/// Each variant fixes the samples per pixel, the bits per sample and the
/// number of planes; see [`FileType::samples_per_pixel`] and friends.
pub enum FileType(u16) unknown("A pixel layout this crate does not know") {
  /// 8-bit unsigned gray.
  Gray8 = 0,
  /// 16-bit signed gray, returned biased into the unsigned range.
  Gray16Signed = 1,
  Gray16Unsigned = 2,
  Gray32Int = 3,
  Gray32Float = 4,
  /// 8-bit palette indices; the palette is applied by the caller.
  Color8 = 5,
  /// Interleaved 8-bit R, G, B.
  RGB = 6,
  /// Three 8-bit planes R, G, B.
  RGBPlanar = 7,
  /// 1-bit, MSB first, rows padded to a whole byte.
  Bitmap = 8,
  ARGB = 9,
  BGR = 10,
  Gray32Unsigned = 11,
  /// Interleaved 16-bit R, G, B.
  RGB48 = 12,
  /// 12-bit gray, two samples packed into three bytes.
  Gray12Unsigned = 13,
  /// 24-bit gray, three little-endian bytes per sample.
  Gray24Unsigned = 14,
  BARG = 15,
  Gray64Float = 16,
  /// Three 16-bit planes R, G, B.
  RGB48Planar = 17,
  ABGR = 18,
}
}

tags! {
pub enum CompressionMethod(u16) unknown("A compression scheme this crate does not know") {
  None = 1,
  LZW = 2,
  /// LZW applied after horizontal differencing.
  LZWDifferencing = 3,
  /// Delegated to an external [`JpegCodec`](crate::decoder::JpegCodec).
  JPEG = 4,
  PackBits = 5,
}
}

impl FileType {
  /// Returns `None` for [`FileType::Unknown`].
  pub fn samples_per_pixel(&self) -> Option<usize> {
    use self::FileType::*;
    Some(match *self {
      Gray8 | Color8 | Gray16Signed | Gray16Unsigned | Gray32Int | Gray32Unsigned | Gray32Float
      | Gray64Float | Bitmap | Gray12Unsigned | Gray24Unsigned => 1,
      RGB | BGR | RGBPlanar | RGB48 | RGB48Planar => 3,
      ARGB | ABGR | BARG => 4,
      Unknown(_) => return None,
    })
  }

  /// Returns `None` for [`FileType::Unknown`].
  pub fn bits_per_sample(&self) -> Option<u8> {
    use self::FileType::*;
    Some(match *self {
      Bitmap => 1,
      Gray8 | Color8 | RGB | BGR | RGBPlanar | ARGB | ABGR | BARG => 8,
      Gray12Unsigned => 12,
      Gray16Signed | Gray16Unsigned | RGB48 | RGB48Planar => 16,
      Gray24Unsigned => 24,
      Gray32Int | Gray32Unsigned | Gray32Float => 32,
      Gray64Float => 64,
      Unknown(_) => return None,
    })
  }

  /// Number of separately stored planes; 1 for chunky data.
  pub fn planes(&self) -> usize {
    match *self {
      FileType::RGBPlanar | FileType::RGB48Planar => 3,
      _ => 1,
    }
  }

  pub fn is_known(&self) -> bool {
    !matches!(self, FileType::Unknown(_))
  }
}
