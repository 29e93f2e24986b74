//! The Avro-style binary form.
//!
//! Integers are zig-zag varints, floats little-endian, strings and byte
//! strings length-prefixed, and unions are a varint index followed by the
//! selected branch.

mod composite;
mod extension;
mod identifier;
mod scalar;
mod variant;

use crate::context::EncodingContext;
use crate::{EncoderError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Maps a signed integer to an unsigned one so small magnitudes stay small.
#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Writes binary values into a buffer under an encoding context.
pub struct BinaryWriter<'a> {
    buffer: &'a mut BytesMut,
    context: &'a EncodingContext,
    nesting: u32,
}

impl<'a> BinaryWriter<'a> {
    pub fn new(buffer: &'a mut BytesMut, context: &'a EncodingContext) -> Self {
        Self {
            buffer,
            context,
            nesting: 0,
        }
    }

    pub fn context(&self) -> &'a EncodingContext {
        self.context
    }

    /// Runs `f` one nesting level deeper. The level is restored on every exit.
    pub fn with_nesting<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.nesting += 1;
        let result = self
            .context
            .limits
            .check_nesting(self.nesting)
            .and_then(|_| f(self));
        self.nesting -= 1;
        result
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.put_u8(value as u8);
    }

    /// Zig-zag varint.
    pub fn write_long(&mut self, value: i64) {
        let mut n = zigzag_encode(value);
        while n >= 0x80 {
            self.buffer.put_u8((n as u8) | 0x80);
            n >>= 7;
        }
        self.buffer.put_u8(n as u8);
    }

    pub fn write_int(&mut self, value: i32) {
        self.write_long(i64::from(value));
    }

    pub fn write_union_index(&mut self, index: u32) {
        self.write_long(i64::from(index));
    }

    pub fn write_float(&mut self, value: f32) {
        self.buffer.put_f32_le(value);
    }

    pub fn write_double(&mut self, value: f64) {
        self.buffer.put_f64_le(value);
    }

    pub fn write_fixed(&mut self, value: &[u8]) {
        self.buffer.put_slice(value);
    }

    /// Writes a length-prefixed byte string.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.context.limits.check_byte_string_length(value.len())?;
        self.write_block_raw(value);
        Ok(())
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.context.limits.check_string_length(value.len())?;
        self.write_block_raw(value.as_bytes());
        Ok(())
    }

    /// Writes an array length, checked against the array limit.
    pub fn write_array_length(&mut self, length: usize) -> Result<()> {
        self.context.limits.check_array_length(length)?;
        self.write_long(length as i64);
        Ok(())
    }

    /// Encodes into a separate buffer with `f` and writes the result
    /// length-prefixed.
    pub fn write_block(
        &mut self,
        f: impl FnOnce(&mut BinaryWriter<'_>) -> Result<()>,
    ) -> Result<()> {
        let mut block = BytesMut::new();
        {
            let mut inner = BinaryWriter {
                buffer: &mut block,
                context: self.context,
                nesting: self.nesting,
            };
            f(&mut inner)?;
        }
        self.write_block_raw(&block);
        Ok(())
    }

    fn write_block_raw(&mut self, value: &[u8]) {
        self.write_long(value.len() as i64);
        self.buffer.put_slice(value);
    }
}

/// Reads binary values from a buffer under an encoding context.
pub struct BinaryReader<'a> {
    buffer: Bytes,
    context: &'a EncodingContext,
    nesting: u32,
}

impl<'a> BinaryReader<'a> {
    pub fn new(buffer: Bytes, context: &'a EncodingContext) -> Self {
        Self {
            buffer,
            context,
            nesting: 0,
        }
    }

    pub fn context(&self) -> &'a EncodingContext {
        self.context
    }

    pub fn remaining(&self) -> usize {
        self.buffer.remaining()
    }

    /// The unread part of the buffer.
    pub fn into_remaining(self) -> Bytes {
        self.buffer
    }

    /// Runs `f` one nesting level deeper. The level is restored on every exit.
    pub fn with_nesting<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.nesting += 1;
        let result = self
            .context
            .limits
            .check_nesting(self.nesting)
            .and_then(|_| f(self));
        self.nesting -= 1;
        result
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        if self.buffer.remaining() == 0 {
            return Err(EncoderError::InsufficientData);
        }
        match self.buffer.get_u8() {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(EncoderError::Decoding(format!(
                "Expected boolean 0 or 1, got {}",
                other
            ))),
        }
    }

    pub fn read_long(&mut self) -> Result<i64> {
        let mut value: u64 = 0;
        let mut shift = 0;
        loop {
            if self.buffer.remaining() == 0 {
                return Err(EncoderError::InsufficientData);
            }
            let byte = self.buffer.get_u8();
            if shift == 63 && byte > 1 {
                return Err(EncoderError::Decoding(
                    "Variable length integer overflows 64 bits".to_string(),
                ));
            }
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(zigzag_decode(value));
            }
            shift += 7;
            if shift > 63 {
                return Err(EncoderError::Decoding(
                    "Variable length integer overflows 64 bits".to_string(),
                ));
            }
        }
    }

    pub fn read_int(&mut self) -> Result<i32> {
        let value = self.read_long()?;
        i32::try_from(value)
            .map_err(|_| EncoderError::Decoding(format!("Expected 32-bit integer, got {}", value)))
    }

    pub fn read_union_index(&mut self) -> Result<i64> {
        self.read_long()
    }

    pub fn read_float(&mut self) -> Result<f32> {
        if self.buffer.remaining() < 4 {
            return Err(EncoderError::InsufficientData);
        }
        Ok(self.buffer.get_f32_le())
    }

    pub fn read_double(&mut self) -> Result<f64> {
        if self.buffer.remaining() < 8 {
            return Err(EncoderError::InsufficientData);
        }
        Ok(self.buffer.get_f64_le())
    }

    pub fn read_fixed(&mut self, length: usize) -> Result<Bytes> {
        if self.buffer.remaining() < length {
            return Err(EncoderError::InsufficientData);
        }
        Ok(self.buffer.split_to(length))
    }

    /// Reads a length-prefixed byte string.
    pub fn read_bytes(&mut self) -> Result<Bytes> {
        let length = self.read_length("ByteString")?;
        self.context.limits.check_byte_string_length(length)?;
        self.read_fixed(length)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let length = self.read_length("String")?;
        self.context.limits.check_string_length(length)?;
        let bytes = self.read_fixed(length)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| EncoderError::Decoding(format!("Invalid UTF-8 in string: {}", e)))
    }

    /// Reads an array length, checked against the array limit before any
    /// element is read.
    pub fn read_array_length(&mut self) -> Result<usize> {
        let length = self.read_length("Array")?;
        self.context.limits.check_array_length(length)?;
        Ok(length)
    }

    /// Reads a length-prefixed block and decodes it with `f` in a separate
    /// reader. Bytes left over in the block are ignored.
    pub fn read_block<T>(&mut self, f: impl FnOnce(&mut BinaryReader<'_>) -> Result<T>) -> Result<T> {
        let block = self.read_raw_block()?;
        let mut inner = BinaryReader {
            buffer: block,
            context: self.context,
            nesting: self.nesting,
        };
        f(&mut inner)
    }

    /// Reads a length-prefixed block without the byte string limit.
    pub fn read_raw_block(&mut self) -> Result<Bytes> {
        let length = self.read_length("Block")?;
        self.read_fixed(length)
    }

    fn read_length(&mut self, what: &str) -> Result<usize> {
        let length = self.read_long()?;
        usize::try_from(length)
            .map_err(|_| EncoderError::Decoding(format!("Negative {} length {}", what, length)))
    }
}
