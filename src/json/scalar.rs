use super::{unexpected, JsonReader, JsonWriter};
use crate::composite::XmlElement;
use crate::date_time::DateTime;
use crate::{EncoderError, JsonDecoder, JsonEncoder, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde_json::{Number, Value};
use uuid::Uuid;

// --- bool ---
impl JsonEncoder for bool {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        writer.write_value(field, Value::Bool(*self))
    }
}

impl JsonDecoder for bool {
    fn decode_json(token: &Value, _reader: &mut JsonReader<'_>) -> Result<Self> {
        match token {
            Value::Null => Ok(false),
            Value::Bool(value) => Ok(*value),
            other => Err(unexpected("Boolean", other)),
        }
    }
}

/// Reads an integer from a number or a numeric string.
pub(crate) fn read_i128(token: &Value, name: &str) -> Result<i128> {
    match token {
        Value::Null => Ok(0),
        Value::Number(number) => number
            .as_i64()
            .map(i128::from)
            .or_else(|| number.as_u64().map(i128::from))
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 1e19)
                    .map(|f| f as i128)
            })
            .ok_or_else(|| unexpected(name, token)),
        Value::String(text) => text
            .trim()
            .parse::<i128>()
            .map_err(|_| unexpected(name, token)),
        other => Err(unexpected(name, other)),
    }
}

// --- integers up to 32 bits ---
macro_rules! impl_json_int {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl JsonEncoder for $ty {
                fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
                    writer.write_value(field, Value::from(*self))
                }
            }

            impl JsonDecoder for $ty {
                fn decode_json(token: &Value, _reader: &mut JsonReader<'_>) -> Result<Self> {
                    let value = read_i128(token, $name)?;
                    <$ty>::try_from(value).map_err(|_| {
                        EncoderError::Decoding(format!("Expected {}, got {}", $name, value))
                    })
                }
            }
        )*
    };
}

impl_json_int! {
    i8 => "SByte",
    u8 => "Byte",
    i16 => "Int16",
    u16 => "UInt16",
    i32 => "Int32",
    u32 => "UInt32",
}

// --- 64-bit integers ---
// Decimal strings unless compact; decode accepts both.
macro_rules! impl_json_long {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl JsonEncoder for $ty {
                fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
                    let value = if writer.is_compact() {
                        Value::from(*self)
                    } else {
                        Value::String(self.to_string())
                    };
                    writer.write_value(field, value)
                }
            }

            impl JsonDecoder for $ty {
                fn decode_json(token: &Value, _reader: &mut JsonReader<'_>) -> Result<Self> {
                    let value = read_i128(token, $name)?;
                    <$ty>::try_from(value).map_err(|_| {
                        EncoderError::Decoding(format!("Expected {}, got {}", $name, value))
                    })
                }
            }
        )*
    };
}

impl_json_long! {
    i64 => "Int64",
    u64 => "UInt64",
}

// --- floats ---
pub(crate) fn float_token(value: f64) -> Value {
    if value.is_nan() {
        Value::String("NaN".to_string())
    } else if value == f64::INFINITY {
        Value::String("Infinity".to_string())
    } else if value == f64::NEG_INFINITY {
        Value::String("-Infinity".to_string())
    } else {
        Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

pub(crate) fn read_f64(token: &Value, name: &str) -> Result<f64> {
    match token {
        Value::Null => Ok(0.0),
        Value::Number(number) => number.as_f64().ok_or_else(|| unexpected(name, token)),
        Value::String(text) => match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other.parse::<f64>().map_err(|_| unexpected(name, token)),
        },
        other => Err(unexpected(name, other)),
    }
}

impl JsonEncoder for f32 {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        writer.write_value(field, float_token(f64::from(*self)))
    }
}

impl JsonDecoder for f32 {
    fn decode_json(token: &Value, _reader: &mut JsonReader<'_>) -> Result<Self> {
        read_f64(token, "Float").map(|value| value as f32)
    }
}

impl JsonEncoder for f64 {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        writer.write_value(field, float_token(*self))
    }
}

impl JsonDecoder for f64 {
    fn decode_json(token: &Value, _reader: &mut JsonReader<'_>) -> Result<Self> {
        read_f64(token, "Double")
    }
}

// --- strings ---
impl JsonEncoder for String {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        writer.context().limits.check_string_length(self.len())?;
        writer.write_value(field, Value::String(self.clone()))
    }
}

impl JsonDecoder for String {
    fn decode_json(token: &Value, reader: &mut JsonReader<'_>) -> Result<Self> {
        match token {
            Value::Null => Ok(String::new()),
            Value::String(value) => {
                reader.check_string_length(value.len())?;
                Ok(value.clone())
            }
            other => Err(unexpected("String", other)),
        }
    }
}

impl JsonEncoder for XmlElement {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        if self.0.is_empty() {
            return writer.write_null(field);
        }
        self.0.encode_json(writer, field)
    }
}

impl JsonDecoder for XmlElement {
    fn decode_json(token: &Value, reader: &mut JsonReader<'_>) -> Result<Self> {
        String::decode_json(token, reader).map(XmlElement)
    }
}

// --- ByteString ---
impl JsonEncoder for Bytes {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        if self.is_empty() {
            return writer.write_null(field);
        }
        writer.context().limits.check_byte_string_length(self.len())?;
        writer.write_value(field, Value::String(STANDARD.encode(self)))
    }
}

impl JsonDecoder for Bytes {
    fn decode_json(token: &Value, reader: &mut JsonReader<'_>) -> Result<Self> {
        match token {
            Value::Null => Ok(Bytes::new()),
            Value::String(text) => {
                let bytes = STANDARD
                    .decode(text)
                    .map_err(|e| EncoderError::Decoding(format!("Invalid base64 text: {}", e)))?;
                reader.check_byte_string_length(bytes.len())?;
                Ok(Bytes::from(bytes))
            }
            other => Err(unexpected("ByteString", other)),
        }
    }
}

// --- Guid ---
impl JsonEncoder for Uuid {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        if self.is_nil() {
            return writer.write_null(field);
        }
        writer.write_value(field, Value::String(self.hyphenated().to_string()))
    }
}

impl JsonDecoder for Uuid {
    fn decode_json(token: &Value, _reader: &mut JsonReader<'_>) -> Result<Self> {
        match token {
            Value::Null => Ok(Uuid::nil()),
            Value::String(text) => Uuid::parse_str(text)
                .map_err(|e| EncoderError::Decoding(format!("Invalid guid {}: {}", text, e))),
            other => Err(unexpected("Guid", other)),
        }
    }
}

// --- DateTime ---
impl JsonEncoder for DateTime {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        if self.is_min() {
            return writer.write_null(field);
        }
        writer.write_value(field, Value::String(self.to_rfc3339()))
    }
}

impl JsonDecoder for DateTime {
    fn decode_json(token: &Value, _reader: &mut JsonReader<'_>) -> Result<Self> {
        match token {
            Value::Null => Ok(DateTime::MIN),
            Value::String(text) => DateTime::parse_rfc3339(text)
                .ok_or_else(|| EncoderError::Decoding(format!("Invalid DateTime {}", text))),
            other => Err(unexpected("DateTime", other)),
        }
    }
}
