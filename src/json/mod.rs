//! The OPC UA JSON form over a `serde_json::Value` token tree.
//!
//! [`JsonWriter`] builds the tree push-style; [`JsonReader`] hands out
//! tokens and carries the context while values pick their fields.

mod composite;
mod extension;
mod identifier;
mod scalar;
mod variant;

pub(crate) use composite::encode_data_value_members;
pub(crate) use scalar::{float_token, read_f64};
pub(crate) use variant::encode_variant_body;

use crate::context::EncodingContext;
use crate::{EncoderError, Result};
use serde_json::{Map, Value};
use std::collections::VecDeque;

/// Selects the JSON dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonEncodingMode {
    /// Keep enough type information to decode the exact value back.
    pub reversible: bool,
    /// Prefer short forms: string node ids, numeric 64-bit integers.
    pub compact: bool,
}

impl Default for JsonEncodingMode {
    fn default() -> Self {
        Self {
            reversible: true,
            compact: false,
        }
    }
}

impl JsonEncodingMode {
    pub fn reversible() -> Self {
        Self::default()
    }

    pub fn non_reversible() -> Self {
        Self {
            reversible: false,
            compact: false,
        }
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }
}

enum Frame {
    Object(Map<String, Value>, Option<String>),
    Array(Vec<Value>, Option<String>),
}

/// Builds a JSON tree from push-style calls.
pub struct JsonWriter<'a> {
    context: &'a EncodingContext,
    mode: JsonEncodingMode,
    stack: Vec<Frame>,
    root: Option<Value>,
    nesting: u32,
}

impl<'a> JsonWriter<'a> {
    pub fn new(context: &'a EncodingContext, mode: JsonEncodingMode) -> Self {
        Self {
            context,
            mode,
            stack: Vec::new(),
            root: None,
            nesting: 0,
        }
    }

    pub fn context(&self) -> &'a EncodingContext {
        self.context
    }

    pub fn mode(&self) -> JsonEncodingMode {
        self.mode
    }

    pub fn is_reversible(&self) -> bool {
        self.mode.reversible
    }

    pub fn is_compact(&self) -> bool {
        self.mode.compact
    }

    /// True while the innermost open container is an array.
    pub fn in_array(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::Array(..)))
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

    /// Opens an object as the field `field` of the current object, or as the
    /// next array element or root value.
    pub fn push_object(&mut self, field: Option<&str>) -> Result<()> {
        self.context
            .limits
            .check_nesting(self.stack.len() as u32 + 1)?;
        self.stack
            .push(Frame::Object(Map::new(), field.map(str::to_string)));
        Ok(())
    }

    pub fn pop_object(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Object(map, field)) => self.place(field.as_deref(), Value::Object(map)),
            Some(frame) => {
                self.stack.push(frame);
                Err(EncoderError::Encoding(
                    "pop_object called while an array is open".to_string(),
                ))
            }
            None => Err(EncoderError::Encoding(
                "pop_object called without an open object".to_string(),
            )),
        }
    }

    /// Opens an array of `length` elements, checked against the array limit.
    pub fn push_array(&mut self, field: Option<&str>, length: usize) -> Result<()> {
        self.context.limits.check_array_length(length)?;
        self.context
            .limits
            .check_nesting(self.stack.len() as u32 + 1)?;
        self.stack.push(Frame::Array(
            Vec::with_capacity(length),
            field.map(str::to_string),
        ));
        Ok(())
    }

    pub fn pop_array(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Array(items, field)) => self.place(field.as_deref(), Value::Array(items)),
            Some(frame) => {
                self.stack.push(frame);
                Err(EncoderError::Encoding(
                    "pop_array called while an object is open".to_string(),
                ))
            }
            None => Err(EncoderError::Encoding(
                "pop_array called without an open array".to_string(),
            )),
        }
    }

    /// Writes a token as a field, array element or root value.
    pub fn write_value(&mut self, field: Option<&str>, value: Value) -> Result<()> {
        self.place(field, value)
    }

    /// Writes `null`. Inside an object the field is omitted instead.
    pub fn write_null(&mut self, field: Option<&str>) -> Result<()> {
        if field.is_some() && matches!(self.stack.last(), Some(Frame::Object(..))) {
            return Ok(());
        }
        self.place(field, Value::Null)
    }

    /// Closes the writer and returns the root value.
    pub fn finish(self) -> Result<Value> {
        if !self.stack.is_empty() {
            return Err(EncoderError::Encoding(format!(
                "{} containers left open",
                self.stack.len()
            )));
        }
        Ok(self.root.unwrap_or(Value::Null))
    }

    fn place(&mut self, field: Option<&str>, value: Value) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Object(map, _)) => {
                let field = field.ok_or_else(|| {
                    EncoderError::Encoding("A field name is required inside an object".to_string())
                })?;
                map.insert(field.to_string(), value);
            }
            Some(Frame::Array(items, _)) => items.push(value),
            None => self.root = Some(value),
        }
        Ok(())
    }
}

/// Hands out JSON tokens under an encoding context.
///
/// A reader is created for a single value, or for a stream where a top-level
/// array yields its items one by one and any other token is a stream of one.
pub struct JsonReader<'a> {
    context: &'a EncodingContext,
    pending: VecDeque<Value>,
    nesting: u32,
}

impl<'a> JsonReader<'a> {
    pub fn single(context: &'a EncodingContext, value: Value) -> Self {
        Self {
            context,
            pending: VecDeque::from([value]),
            nesting: 0,
        }
    }

    pub fn stream(context: &'a EncodingContext, value: Value) -> Self {
        let pending = match value {
            Value::Array(items) => items.into(),
            other => VecDeque::from([other]),
        };
        Self {
            context,
            pending,
            nesting: 0,
        }
    }

    /// Parses `text` and opens a stream over it.
    pub fn stream_from_str(context: &'a EncodingContext, text: &str) -> Result<Self> {
        Ok(Self::stream(context, serde_json::from_str(text)?))
    }

    pub fn context(&self) -> &'a EncodingContext {
        self.context
    }

    /// The next top-level value, if any.
    pub fn next_value(&mut self) -> Option<Value> {
        self.pending.pop_front()
    }

    pub fn has_next(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The field `name` of an object token; `None` when absent or `null`.
    pub fn try_get_field<'v>(&self, token: &'v Value, name: &str) -> Option<&'v Value> {
        token.get(name).filter(|value| !value.is_null())
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

    pub(crate) fn check_array_length(&self, length: usize) -> Result<()> {
        self.context.limits.check_array_length(length)
    }

    pub(crate) fn check_string_length(&self, length: usize) -> Result<()> {
        self.context.limits.check_string_length(length)
    }

    pub(crate) fn check_byte_string_length(&self, length: usize) -> Result<()> {
        self.context.limits.check_byte_string_length(length)
    }
}

/// The "Expected X, got Y" decoding error for a token of the wrong shape.
pub(crate) fn unexpected(expected: &str, token: &Value) -> EncoderError {
    EncoderError::Decoding(format!("Expected {}, got {}", expected, token))
}
