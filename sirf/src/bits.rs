//! Bounds-checked field cursors.
//!
//! [`WireReader`] and [`WireWriter`] move over big-endian byte payloads one
//! field at a time; every step checks the remaining length first so a short
//! buffer ends in [`CodecError::Length`] instead of a partial value.
//! [`BitReader`] and [`BitWriter`] pack MSB-first fields of arbitrary width
//! as needed by RTCM3.

use crate::error::{BitError, CodecError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A value with a fixed big-endian wire size
pub trait WireField: Sized {
    const WIRE_LEN: usize;

    fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError>;
    fn write(&self, w: &mut WireWriter<'_>) -> Result<(), CodecError>;
}

/// Read cursor over one message body, tagged with the message name for errors
pub struct WireReader<'a> {
    packet: &'static str,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(packet: &'static str, buf: &'a [u8]) -> Self {
        Self { packet, buf, pos: 0 }
    }

    pub fn packet(&self) -> &'static str {
        self.packet
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Fails unless `n` more bytes are available
    pub fn require(&self, n: usize) -> Result<(), CodecError> {
        match self.pos.checked_add(n) {
            Some(end) if end <= self.buf.len() => Ok(()),
            _ => Err(CodecError::Length {
                packet: self.packet,
                expect: self.pos.saturating_add(n),
                got: self.buf.len(),
            }),
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        self.require(n)?;
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn take<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    #[inline]
    pub fn read<T: WireField>(&mut self) -> Result<T, CodecError> {
        T::read(self)
    }

    /// Reads `count` records; the whole group plus `trailing` fixed bytes
    /// must fit before the first record is touched
    pub fn read_group<T: WireField>(
        &mut self,
        count: usize,
        trailing: usize,
    ) -> Result<Vec<T>, CodecError> {
        let need = count
            .checked_mul(T::WIRE_LEN)
            .and_then(|n| n.checked_add(trailing))
            .ok_or(CodecError::Length {
                packet: self.packet,
                expect: usize::MAX,
                got: self.buf.len(),
            })?;
        self.require(need)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(T::read(self)?);
        }
        Ok(out)
    }

    /// Everything left except `trailing` bytes
    pub fn read_rest(&mut self, trailing: usize) -> Result<Vec<u8>, CodecError> {
        self.require(trailing)?;
        let n = self.remaining() - trailing;
        Ok(self.read_bytes(n)?.to_vec())
    }

    /// The body must be consumed exactly
    pub fn finish(self) -> Result<(), CodecError> {
        if self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(CodecError::Length {
                packet: self.packet,
                expect: self.pos,
                got: self.buf.len(),
            })
        }
    }
}

/// Write cursor over a destination buffer
pub struct WireWriter<'a> {
    packet: &'static str,
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WireWriter<'a> {
    pub fn new(packet: &'static str, buf: &'a mut [u8]) -> Self {
        Self { packet, buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn require(&self, n: usize) -> Result<(), CodecError> {
        match self.pos.checked_add(n) {
            Some(end) if end <= self.buf.len() => Ok(()),
            _ => Err(CodecError::Length {
                packet: self.packet,
                expect: self.pos.saturating_add(n),
                got: self.buf.len(),
            }),
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.require(bytes.len())?;
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    #[inline]
    pub fn put<const N: usize>(&mut self, bytes: [u8; N]) -> Result<(), CodecError> {
        self.write_bytes(&bytes)
    }

    #[inline]
    pub fn write<T: WireField>(&mut self, value: &T) -> Result<(), CodecError> {
        value.write(self)
    }

    pub fn write_group<T: WireField>(&mut self, group: &[T]) -> Result<(), CodecError> {
        self.require(group.len().saturating_mul(T::WIRE_LEN))?;
        for item in group {
            item.write(self)?;
        }
        Ok(())
    }
}

macro_rules! impl_wire_field_for_num {
    ($($ty:ty),*) => {
        $(
            impl WireField for $ty {
                const WIRE_LEN: usize = core::mem::size_of::<$ty>();

                #[inline]
                fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
                    Ok(<$ty>::from_be_bytes(r.take()?))
                }

                #[inline]
                fn write(&self, w: &mut WireWriter<'_>) -> Result<(), CodecError> {
                    w.put(self.to_be_bytes())
                }
            }
        )*
    };
}

impl_wire_field_for_num!(u8, i8, u16, i16, u32, i32, f32, f64);

impl<T: WireField + Default + Copy, const N: usize> WireField for [T; N] {
    const WIRE_LEN: usize = T::WIRE_LEN * N;

    fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        r.require(Self::WIRE_LEN)?;
        let mut out = [T::default(); N];
        for v in out.iter_mut() {
            *v = T::read(r)?;
        }
        Ok(out)
    }

    fn write(&self, w: &mut WireWriter<'_>) -> Result<(), CodecError> {
        w.require(Self::WIRE_LEN)?;
        for v in self {
            v.write(w)?;
        }
        Ok(())
    }
}

/// Unsigned 24-bit wire integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct U24(u32);

impl U24 {
    pub const MAX: u32 = 0x00ff_ffff;

    /// `None` when the value needs more than 24 bits
    pub const fn new(value: u32) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<U24> for u32 {
    fn from(x: U24) -> Self {
        x.0
    }
}

impl From<U24> for f64 {
    fn from(x: U24) -> Self {
        f64::from(x.0)
    }
}

impl WireField for U24 {
    const WIRE_LEN: usize = 3;

    fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        let [b0, b1, b2] = r.take()?;
        Ok(Self(u32::from_be_bytes([0, b0, b1, b2])))
    }

    fn write(&self, w: &mut WireWriter<'_>) -> Result<(), CodecError> {
        let [_, b0, b1, b2] = self.0.to_be_bytes();
        w.put([b0, b1, b2])
    }
}

/// Two's-complement 24-bit wire integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct I24(i32);

impl I24 {
    pub const MIN: i32 = -0x0080_0000;
    pub const MAX: i32 = 0x007f_ffff;

    pub const fn new(value: i32) -> Option<Self> {
        if value >= Self::MIN && value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<I24> for i32 {
    fn from(x: I24) -> Self {
        x.0
    }
}

impl From<I24> for f64 {
    fn from(x: I24) -> Self {
        f64::from(x.0)
    }
}

impl WireField for I24 {
    const WIRE_LEN: usize = 3;

    fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        let [b0, b1, b2] = r.take()?;
        // sign extension through the arithmetic shift
        Ok(Self(i32::from_be_bytes([b0, b1, b2, 0]) >> 8))
    }

    fn write(&self, w: &mut WireWriter<'_>) -> Result<(), CodecError> {
        let [_, b0, b1, b2] = self.0.to_be_bytes();
        w.put([b0, b1, b2])
    }
}

/// MSB-first writer of arbitrary width fields into a borrowed buffer
pub struct BitWriter<'a> {
    buffer: &'a mut [u8],
    bit_cursor: usize,
}

impl<'a> BitWriter<'a> {
    /// The buffer is expected to be zeroed; only `1` bits are or-ed in
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            bit_cursor: 0,
        }
    }

    pub fn bit_cursor(&self) -> usize {
        self.bit_cursor
    }

    /// Bytes touched so far, the last one possibly padded with zeros
    pub fn byte_len(&self) -> usize {
        self.bit_cursor.div_ceil(8)
    }

    /// Writes the low `num_bits` of `value`; higher bits are dropped
    pub fn write_u64(&mut self, value: u64, num_bits: u8) -> Result<(), BitError> {
        if !(1..=64).contains(&num_bits) {
            return Err(BitError::TooLongForType {
                max: 64,
                asked: num_bits,
            });
        }
        let buffer_len_bits = self.buffer.len() * 8;
        if self.bit_cursor + usize::from(num_bits) > buffer_len_bits {
            return Err(BitError::OutOfBounds {
                asked: usize::from(num_bits),
                available: buffer_len_bits - self.bit_cursor,
            });
        }

        for i in (0..num_bits).rev() {
            if (value >> i) & 1 == 1 {
                let byte = self.bit_cursor / 8;
                self.buffer[byte] |= 0x80 >> (self.bit_cursor % 8);
            }
            self.bit_cursor += 1;
        }
        Ok(())
    }

    /// Two's-complement write; values outside the signed range are rejected
    pub fn write_i64(&mut self, value: i64, num_bits: u8) -> Result<(), BitError> {
        if !(1..=64).contains(&num_bits) {
            return Err(BitError::TooLongForType {
                max: 64,
                asked: num_bits,
            });
        }
        if num_bits < 64 {
            let min = -(1i64 << (num_bits - 1));
            let max = (1i64 << (num_bits - 1)) - 1;
            if value < min || value > max {
                return Err(BitError::Overflow {
                    value,
                    bits: num_bits,
                });
            }
        }
        self.write_u64(value as u64, num_bits)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), BitError> {
        self.write_u64(u64::from(value), 1)
    }
}

/// MSB-first reader matching [`BitWriter`]
pub struct BitReader<'a> {
    buffer: &'a [u8],
    bit_cursor: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            bit_cursor: 0,
        }
    }

    pub fn bit_cursor(&self) -> usize {
        self.bit_cursor
    }

    pub fn remaining_bits(&self) -> usize {
        self.buffer.len() * 8 - self.bit_cursor
    }

    pub fn read_u64(&mut self, num_bits: u8) -> Result<u64, BitError> {
        if !(1..=64).contains(&num_bits) {
            return Err(BitError::TooLongForType {
                max: 64,
                asked: num_bits,
            });
        }
        if usize::from(num_bits) > self.remaining_bits() {
            return Err(BitError::OutOfBounds {
                asked: usize::from(num_bits),
                available: self.remaining_bits(),
            });
        }
        let mut result = 0u64;
        for _ in 0..num_bits {
            let byte = self.buffer[self.bit_cursor / 8];
            let bit = (byte >> (7 - self.bit_cursor % 8)) & 1;
            result = (result << 1) | u64::from(bit);
            self.bit_cursor += 1;
        }
        Ok(result)
    }

    pub fn read_i64(&mut self, num_bits: u8) -> Result<i64, BitError> {
        let raw = self.read_u64(num_bits)?;
        let shift = 64 - u32::from(num_bits);
        Ok(((raw << shift) as i64) >> shift)
    }

    pub fn read_bool(&mut self) -> Result<bool, BitError> {
        Ok(self.read_u64(1)? == 1)
    }
}
