use std::{error::Error, fmt, io, num::TryFromIntError};

use crate::tags::{CompressionMethod, FileType};

/// Raw pixel decoding error kinds.
#[derive(Debug)]
pub enum PixelError {
  /// The layout or the stream is inconsistent.
  FormatError(PixelFormatError),

  /// The layout is valid but asks for something this crate cannot do.
  UnsupportedError(PixelUnsupportedError),

  /// An I/O error occurred while reading the pixel stream.
  IoError(io::Error),

  /// The limits of the decoder are exceeded.
  LimitsExceeded,

  /// An integer conversion to or from a platform size failed, either due to
  /// limits of the platform size or limits of the format.
  IntSizeError,
}

/// The layout and the data it describes do not agree.
///
/// This is distinct from the "no result" case of
/// [`read_pixels`](crate::decoder::read_pixels), which covers layouts that are
/// recognisably not decodable (zero geometry, unknown type or compression).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PixelFormatError {
  InconsistentStripTable { offsets: usize, lengths: usize },
  StripOffsetsNotIncreasing { strip: usize },
  JpegCodecFailed(String),
}

impl fmt::Display for PixelFormatError {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    use self::PixelFormatError::*;
    match *self {
      InconsistentStripTable { offsets, lengths } => {
        write!(fmt, "strip table has {} offsets but {} lengths", offsets, lengths)
      }
      StripOffsetsNotIncreasing { strip } => {
        write!(fmt, "strip {} starts before the end of the previous strip", strip)
      }
      JpegCodecFailed(ref msg) => write!(fmt, "external JPEG codec failed: {}", msg),
    }
  }
}

/// The layout uses a combination this crate does not handle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PixelUnsupportedError {
  UnsupportedCompressionMethod(CompressionMethod),
  DifferencingNotSupported(FileType),
  JpegCodecMissing,
}

impl fmt::Display for PixelUnsupportedError {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    use self::PixelUnsupportedError::*;
    match *self {
      UnsupportedCompressionMethod(method) => {
        write!(fmt, "compression method {:?} is unsupported here", method)
      }
      DifferencingNotSupported(file_type) => {
        write!(fmt, "horizontal differencing is not supported for {:?} data", file_type)
      }
      JpegCodecMissing => fmt.write_str("JPEG compressed strips need an external JPEG codec"),
    }
  }
}

impl fmt::Display for PixelError {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      PixelError::FormatError(ref e) => write!(fmt, "Format error: {}", e),
      PixelError::UnsupportedError(ref f) => write!(
        fmt,
        "The decoder does not support the \
         pixel layout ({})",
        f
      ),
      PixelError::IoError(ref e) => e.fmt(fmt),
      PixelError::LimitsExceeded => write!(fmt, "The decoder limits are exceeded"),
      PixelError::IntSizeError => write!(fmt, "Platform or format size limits exceeded"),
    }
  }
}

impl Error for PixelError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match *self {
      PixelError::IoError(ref e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for PixelError {
  fn from(err: io::Error) -> PixelError {
    PixelError::IoError(err)
  }
}

impl From<PixelFormatError> for PixelError {
  fn from(err: PixelFormatError) -> PixelError {
    PixelError::FormatError(err)
  }
}

impl From<PixelUnsupportedError> for PixelError {
  fn from(err: PixelUnsupportedError) -> PixelError {
    PixelError::UnsupportedError(err)
  }
}

impl From<TryFromIntError> for PixelError {
  fn from(_err: TryFromIntError) -> PixelError {
    PixelError::IntSizeError
  }
}

/// Result of a raw pixel decoding process
pub type PixelResult<T> = Result<T, PixelError>;
