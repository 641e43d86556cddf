//! Read adapters that undo strip compression

use std::io::{self, BufRead, BufReader, Read, Take};

/// Byte order of multi-byte samples in the pixel stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
  /// little endian byte order ("Intel")
  LittleEndian,
  /// big endian byte order ("Motorola")
  BigEndian,
}

///
/// # READERS

///
/// ## LZW Reader

/// Reader that decompresses TIFF flavoured LZW streams
///
/// Codes are read MSB first, starting at 9 bits. The code width grows one
/// code early (at 511, 1023 and 2047) as TIFF writers do, and a CLEAR code
/// resets both the dictionary and the width.
pub struct LZWReader<R: Read> {
  reader: BufReader<Take<R>>,
  decoder: weezl::decode::Decoder,
}

impl<R: Read> LZWReader<R> {
  /// Wraps a reader
  pub fn new(reader: R, compressed_length: usize) -> LZWReader<R> {
    Self {
      reader: BufReader::with_capacity(
        (32 * 1024).min(compressed_length).max(1),
        reader.take(compressed_length as u64),
      ),
      decoder: weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8),
    }
  }
}

impl<R: Read> Read for LZWReader<R> {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    if buf.is_empty() {
      return Ok(0);
    }

    loop {
      let result = self.decoder.decode_bytes(self.reader.fill_buf()?, buf);
      self.reader.consume(result.consumed_in);

      match result.status {
        Ok(weezl::LzwStatus::Ok) => {
          if result.consumed_out == 0 {
            continue;
          } else {
            return Ok(result.consumed_out);
          }
        }
        Ok(weezl::LzwStatus::NoProgress) => {
          // Input exhausted without an end code. Writers in the wild omit it,
          // so treat it as the end of the strip.
          log::warn!("lzw stream ended without an end-of-information code");
          return Ok(result.consumed_out);
        }
        Ok(weezl::LzwStatus::Done) => {
          return Ok(result.consumed_out);
        }
        Err(err) => return Err(io::Error::new(io::ErrorKind::InvalidData, err)),
      }
    }
  }
}

///
/// ## PackBits Reader

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PackBitsReaderState {
  Header,
  Literal,
  Repeat { value: u8 },
}

/// Reader that unpacks Apple's `PackBits` run-length format
///
/// A signed header byte `n` announces either `n + 1` literal bytes
/// (`0..=127`) or one byte repeated `1 - n` times (`-127..=-1`); `-128` is
/// skipped. The format has no terminator, so callers bound the output with
/// [`Read::take`].
#[derive(Debug)]
pub struct PackBitsReader<R: Read> {
  reader: Take<R>,
  state: PackBitsReaderState,
  count: usize,
}

impl<R: Read> PackBitsReader<R> {
  /// Wraps a reader
  pub fn new(reader: R, length: u64) -> Self {
    Self { reader: reader.take(length), state: PackBitsReaderState::Header, count: 0 }
  }
}

impl<R: Read> Read for PackBitsReader<R> {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    if buf.is_empty() {
      return Ok(0);
    }

    while let PackBitsReaderState::Header = self.state {
      if self.reader.limit() == 0 {
        return Ok(0);
      }
      let mut header: [u8; 1] = [0];
      self.reader.read_exact(&mut header)?;
      let h = header[0] as i8;
      if (-127..=-1).contains(&h) {
        let mut data: [u8; 1] = [0];
        self.reader.read_exact(&mut data)?;
        self.state = PackBitsReaderState::Repeat { value: data[0] };
        self.count = (1 - h as isize) as usize;
      } else if h >= 0 {
        self.state = PackBitsReaderState::Literal;
        self.count = h as usize + 1;
      } else {
        // h = -128 is a no-op.
      }
    }

    let length = buf.len().min(self.count);
    let actual = match self.state {
      PackBitsReaderState::Literal => self.reader.read(&mut buf[..length])?,
      PackBitsReaderState::Repeat { value } => {
        buf[..length].iter_mut().for_each(|b| *b = value);
        length
      }
      PackBitsReaderState::Header => unreachable!(),
    };

    self.count -= actual;
    if self.count == 0 {
      self.state = PackBitsReaderState::Header;
    }
    Ok(actual)
  }
}
