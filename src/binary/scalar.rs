use super::{BinaryReader, BinaryWriter};
use crate::composite::XmlElement;
use crate::date_time::DateTime;
use crate::status_code::StatusCode;
use crate::{Decoder, Encoder, EncoderError, Result};
use bytes::Bytes;
use uuid::Uuid;

// --- bool ---
impl Encoder for bool {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        writer.write_bool(*self);
        Ok(())
    }
}

impl Decoder for bool {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.read_bool()
    }
}

// --- integers ---
// Every integer width travels as a zig-zag varint; narrowing is checked on decode.
macro_rules! impl_varint {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Encoder for $ty {
                fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
                    writer.write_long(i64::from(*self));
                    Ok(())
                }
            }

            impl Decoder for $ty {
                fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
                    let value = reader.read_long()?;
                    <$ty>::try_from(value).map_err(|_| {
                        EncoderError::Decoding(format!(
                            "Expected {}, got {}",
                            $name, value
                        ))
                    })
                }
            }
        )*
    };
}

impl_varint! {
    i8 => "SByte",
    u8 => "Byte",
    i16 => "Int16",
    u16 => "UInt16",
    i32 => "Int32",
    u32 => "UInt32",
    i64 => "Int64",
}

// --- u64 ---
// A union: index 0 carries a long for values below i64::MAX, index 1 the
// eight little-endian bytes of larger values.
impl Encoder for u64 {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        if *self < i64::MAX as u64 {
            writer.write_union_index(0);
            writer.write_long(*self as i64);
        } else {
            writer.write_union_index(1);
            writer.write_fixed(&self.to_le_bytes());
        }
        Ok(())
    }
}

impl Decoder for u64 {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        match reader.read_union_index()? {
            0 => {
                let value = reader.read_long()?;
                u64::try_from(value)
                    .map_err(|_| EncoderError::Decoding(format!("Expected UInt64, got {}", value)))
            }
            1 => {
                let bytes = reader.read_fixed(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes);
                Ok(u64::from_le_bytes(raw))
            }
            other => Err(EncoderError::Decoding(format!(
                "Cannot decode unknown UInt64 union field: {}",
                other
            ))),
        }
    }
}

// --- floats ---
impl Encoder for f32 {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        writer.write_float(*self);
        Ok(())
    }
}

impl Decoder for f32 {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.read_float()
    }
}

impl Encoder for f64 {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        writer.write_double(*self);
        Ok(())
    }
}

impl Decoder for f64 {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.read_double()
    }
}

// --- strings and bytes ---
impl Encoder for String {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        writer.write_string(self)
    }
}

impl Decoder for String {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.read_string()
    }
}

impl Encoder for XmlElement {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        writer.write_string(&self.0)
    }
}

impl Decoder for XmlElement {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.read_string().map(XmlElement)
    }
}

impl Encoder for Bytes {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        writer.write_bytes(self)
    }
}

impl Decoder for Bytes {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.read_bytes()
    }
}

// --- Guid ---
// 16 bytes with the first three groups little-endian.
impl Encoder for Uuid {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        writer.write_fixed(&self.to_bytes_le());
        Ok(())
    }
}

impl Decoder for Uuid {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let bytes = reader.read_fixed(16)?;
        let mut raw = [0u8; 16];
        raw.copy_from_slice(&bytes);
        Ok(Uuid::from_bytes_le(raw))
    }
}

// --- DateTime ---
impl Encoder for DateTime {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        let ticks = if self.is_max() { i64::MAX } else { self.ticks() };
        writer.write_long(ticks);
        Ok(())
    }
}

impl Decoder for DateTime {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.read_long().map(DateTime::from_ticks)
    }
}

// --- StatusCode ---
impl Encoder for StatusCode {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        self.0.encode(writer)
    }
}

impl Decoder for StatusCode {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        u32::decode(reader).map(StatusCode)
    }
}
