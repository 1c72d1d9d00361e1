//! Bit-level output/input streams with the entropy codes used by the
//! posting bitstream.
//!
//! Bits are written MSB-first. Three codes are provided on top of raw
//! fixed-width writes: unary, Elias gamma and Elias delta, all over
//! non-negative integers. Gamma and delta encode `n` as the codeword of
//! `n + 1`, so zero is representable.

use std::io::{Read, Write};

use crate::error::{LunariaError, Result};

/// MSB-first bit writer over any byte sink.
pub struct BitWriter<W: Write> {
    inner: W,
    current: u64,
    filled: u32,
    written: u64,
}

impl<W: Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        BitWriter {
            inner,
            current: 0,
            filled: 0,
            written: 0,
        }
    }

    /// Total number of bits written so far.
    pub fn written_bits(&self) -> u64 {
        self.written
    }

    /// Write the low `width` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u64, width: u32) -> Result<()> {
        debug_assert!(width <= 64);
        if width == 0 {
            return Ok(());
        }
        self.written += u64::from(width);

        let mut value = if width < 64 {
            value & ((1u64 << width) - 1)
        } else {
            value
        };
        let mut width = width;
        while width > 0 {
            let free = 64 - self.filled;
            let take = free.min(width);
            let chunk = value >> (width - take);
            self.current |= chunk << (free - take);
            self.filled += take;
            width -= take;
            if width > 0 {
                value &= (1u64 << width) - 1;
            }
            if self.filled == 64 {
                self.inner.write_all(&self.current.to_be_bytes())?;
                self.current = 0;
                self.filled = 0;
            }
        }
        Ok(())
    }

    /// Write `n` in unary: `n` zeroes followed by a one.
    pub fn write_unary(&mut self, n: u64) -> Result<()> {
        let mut n = n;
        while n >= 64 {
            self.write_bits(0, 64)?;
            n -= 64;
        }
        self.write_bits(1, n as u32 + 1)
    }

    /// Write `n` in gamma code.
    pub fn write_gamma(&mut self, n: u64) -> Result<()> {
        debug_assert!(n < u64::MAX);
        let v = n + 1;
        let b = 63 - v.leading_zeros();
        self.write_unary(u64::from(b))?;
        self.write_bits(v, b)
    }

    /// Write `n` in delta code.
    pub fn write_delta(&mut self, n: u64) -> Result<()> {
        debug_assert!(n < u64::MAX);
        let v = n + 1;
        let b = 63 - v.leading_zeros();
        self.write_gamma(u64::from(b))?;
        self.write_bits(v, b)
    }

    /// Append a finished bit buffer at the current bit position.
    pub fn append(&mut self, buffer: &BitBuffer) -> Result<()> {
        let mut remaining = buffer.len_bits;
        for &byte in &buffer.bytes {
            if remaining >= 8 {
                self.write_bits(u64::from(byte), 8)?;
                remaining -= 8;
            } else {
                if remaining > 0 {
                    self.write_bits(u64::from(byte) >> (8 - remaining), remaining as u32)?;
                }
                break;
            }
        }
        Ok(())
    }

    /// Pad to a byte boundary with zeroes and return the inner sink and the
    /// number of payload bits written.
    pub fn finish(mut self) -> Result<(W, u64)> {
        if self.filled > 0 {
            let bytes = self.current.to_be_bytes();
            let n = self.filled.div_ceil(8) as usize;
            self.inner.write_all(&bytes[..n])?;
        }
        Ok((self.inner, self.written))
    }
}

/// A finished in-memory bit sequence, appendable at arbitrary bit alignment.
#[derive(Debug, Clone, Default)]
pub struct BitBuffer {
    bytes: Vec<u8>,
    len_bits: u64,
}

impl BitBuffer {
    /// Number of bits in the buffer.
    pub fn len_bits(&self) -> u64 {
        self.len_bits
    }

    pub fn is_empty(&self) -> bool {
        self.len_bits == 0
    }
}

impl BitWriter<Vec<u8>> {
    /// Finish an in-memory writer into an appendable buffer.
    pub fn into_buffer(self) -> Result<BitBuffer> {
        let (bytes, len_bits) = self.finish()?;
        Ok(BitBuffer { bytes, len_bits })
    }
}

/// MSB-first bit reader over any byte source.
pub struct BitReader<R: Read> {
    inner: R,
    current: u8,
    avail: u32,
    consumed: u64,
}

impl<R: Read> BitReader<R> {
    pub fn new(inner: R) -> Self {
        BitReader {
            inner,
            current: 0,
            avail: 0,
            consumed: 0,
        }
    }

    /// Total number of bits consumed so far.
    pub fn consumed_bits(&self) -> u64 {
        self.consumed
    }

    fn read_bit(&mut self) -> Result<u64> {
        if self.avail == 0 {
            let mut byte = [0u8; 1];
            let n = self.inner.read(&mut byte)?;
            if n == 0 {
                return Err(LunariaError::index("unexpected end of bitstream"));
            }
            self.current = byte[0];
            self.avail = 8;
        }
        self.avail -= 1;
        self.consumed += 1;
        Ok(u64::from((self.current >> self.avail) & 1))
    }

    /// Read `width` bits as an unsigned integer.
    pub fn read_bits(&mut self, width: u32) -> Result<u64> {
        debug_assert!(width <= 64);
        let mut value = 0u64;
        for _ in 0..width {
            value = (value << 1) | self.read_bit()?;
        }
        Ok(value)
    }

    /// Read a unary-coded value.
    pub fn read_unary(&mut self) -> Result<u64> {
        let mut n = 0u64;
        while self.read_bit()? == 0 {
            n += 1;
        }
        Ok(n)
    }

    /// Read a gamma-coded value.
    pub fn read_gamma(&mut self) -> Result<u64> {
        let b = self.read_unary()?;
        let v = (1u64 << b) | self.read_bits(b as u32)?;
        Ok(v - 1)
    }

    /// Read a delta-coded value.
    pub fn read_delta(&mut self) -> Result<u64> {
        let b = self.read_gamma()?;
        let v = (1u64 << b) | self.read_bits(b as u32)?;
        Ok(v - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip<F, G>(write: F, read: G)
    where
        F: Fn(&mut BitWriter<Vec<u8>>, u64),
        G: Fn(&mut BitReader<Cursor<Vec<u8>>>) -> u64,
    {
        let values = [0u64, 1, 2, 3, 7, 8, 63, 64, 1000, 123_456_789];
        let mut writer = BitWriter::new(Vec::new());
        for &v in &values {
            write(&mut writer, v);
        }
        let (bytes, _) = writer.finish().unwrap();
        let mut reader = BitReader::new(Cursor::new(bytes));
        for &v in &values {
            assert_eq!(read(&mut reader), v);
        }
    }

    #[test]
    fn test_unary_roundtrip() {
        let mut writer = BitWriter::new(Vec::new());
        for n in [0u64, 1, 5, 70, 200] {
            writer.write_unary(n).unwrap();
        }
        let (bytes, _) = writer.finish().unwrap();
        let mut reader = BitReader::new(Cursor::new(bytes));
        for n in [0u64, 1, 5, 70, 200] {
            assert_eq!(reader.read_unary().unwrap(), n);
        }
    }

    #[test]
    fn test_gamma_roundtrip() {
        roundtrip(
            |w, v| w.write_gamma(v).unwrap(),
            |r| r.read_gamma().unwrap(),
        );
    }

    #[test]
    fn test_delta_roundtrip() {
        roundtrip(
            |w, v| w.write_delta(v).unwrap(),
            |r| r.read_delta().unwrap(),
        );
    }

    #[test]
    fn test_fixed_width_roundtrip() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b101, 3).unwrap();
        writer.write_bits(u64::MAX, 64).unwrap();
        writer.write_bits(42, 17).unwrap();
        let (bytes, bits) = writer.finish().unwrap();
        assert_eq!(bits, 3 + 64 + 17);
        let mut reader = BitReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(64).unwrap(), u64::MAX);
        assert_eq!(reader.read_bits(17).unwrap(), 42);
    }

    #[test]
    fn test_append_at_bit_alignment() {
        let mut buffered = BitWriter::new(Vec::new());
        buffered.write_gamma(9).unwrap();
        buffered.write_delta(100).unwrap();
        let buffer = buffered.into_buffer().unwrap();

        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b1, 1).unwrap(); // misalign
        writer.append(&buffer).unwrap();
        let (bytes, bits) = writer.finish().unwrap();
        assert_eq!(bits, 1 + buffer.len_bits());

        let mut reader = BitReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_gamma().unwrap(), 9);
        assert_eq!(reader.read_delta().unwrap(), 100);
    }

    #[test]
    fn test_end_of_stream() {
        let mut reader = BitReader::new(Cursor::new(vec![]));
        assert!(reader.read_gamma().is_err());
    }
}
