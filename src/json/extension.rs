use super::scalar::read_i128;
use super::{unexpected, JsonReader, JsonWriter};
use crate::extension::{BodyEncoding, EncodedBody, ExtensionBody, ExtensionObject};
use crate::node_id::ExpandedNodeId;
use crate::{EncoderError, JsonDecoder, JsonEncoder, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde_json::Value;

// Reversible: `{TypeId, Encoding, Body}` where Encoding is 0 for a JSON
// structure (left out), 1 for a base64 byte string and 2 for XML text.
// Non-reversible: the body alone.

const ENCODING_STRUCTURE: u8 = 0;
const ENCODING_BYTES: u8 = 1;
const ENCODING_XML: u8 = 2;

impl JsonEncoder for ExtensionObject {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        if self.is_null() {
            return writer.write_null(field);
        }
        let reversible = writer.is_reversible();
        let body_field = if reversible {
            writer.push_object(field)?;
            let type_id = match &self.body {
                ExtensionBody::Encodeable(value) => value.json_encoding_id(),
                _ => self.type_id.clone(),
            };
            type_id.encode_json(writer, Some("TypeId"))?;
            Some("Body")
        } else {
            field
        };
        match &self.body {
            ExtensionBody::None => {
                if !reversible {
                    writer.write_null(body_field)?;
                }
            }
            ExtensionBody::Encodeable(value) => {
                writer.with_nesting(|w| {
                    w.push_object(body_field)?;
                    value.encode_json(w)?;
                    w.pop_object()
                })?;
            }
            ExtensionBody::Encoded(body) => match body.encoding {
                BodyEncoding::Structure | BodyEncoding::Binary => {
                    if reversible {
                        writer.write_value(Some("Encoding"), Value::from(ENCODING_BYTES))?;
                    }
                    writer.write_value(body_field, Value::String(STANDARD.encode(&body.bytes)))?;
                }
                BodyEncoding::Xml => {
                    if reversible {
                        writer.write_value(Some("Encoding"), Value::from(ENCODING_XML))?;
                    }
                    writer.write_value(body_field, Value::String(body_text(&body.bytes)?))?;
                }
                BodyEncoding::Json => {
                    let value: Value = serde_json::from_slice(&body.bytes).map_err(|e| {
                        EncoderError::Encoding(format!("Invalid JSON extension body: {}", e))
                    })?;
                    writer.write_value(body_field, value)?;
                }
            },
        }
        if reversible {
            writer.pop_object()?;
        }
        Ok(())
    }
}

fn body_text(bytes: &Bytes) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| EncoderError::Encoding(format!("Extension body is not UTF-8: {}", e)))
}

impl JsonDecoder for ExtensionObject {
    fn decode_json(token: &Value, reader: &mut JsonReader<'_>) -> Result<Self> {
        match token {
            Value::Null => Ok(ExtensionObject::null()),
            Value::Object(map) if map.contains_key("TypeId") || map.contains_key("Body") => {
                decode_reversible(token, reader)
            }
            // A bare body: nothing to resolve it with.
            other => Ok(ExtensionObject::from_encoded(
                ExpandedNodeId::null(),
                EncodedBody::new(BodyEncoding::Json, serde_json::to_vec(other)?),
            )),
        }
    }
}

fn decode_reversible(token: &Value, reader: &mut JsonReader<'_>) -> Result<ExtensionObject> {
    let null = Value::Null;
    let type_id = ExpandedNodeId::decode_json(
        reader.try_get_field(token, "TypeId").unwrap_or(&null),
        reader,
    )?;
    let encoding = match reader.try_get_field(token, "Encoding") {
        Some(value) => u8::try_from(read_i128(value, "Encoding")?)
            .map_err(|_| unexpected("Encoding", value))?,
        None => ENCODING_STRUCTURE,
    };
    let Some(body) = reader.try_get_field(token, "Body") else {
        return Ok(ExtensionObject {
            type_id,
            body: ExtensionBody::None,
        });
    };
    let body = match encoding {
        ENCODING_STRUCTURE => {
            let absolute = type_id.to_absolute(&reader.context().namespaces);
            match reader.context().catalog().resolve(&absolute) {
                Some(factory) => {
                    let value = reader.with_nesting(|r| factory.decode_json(body, r))?;
                    return Ok(ExtensionObject {
                        type_id,
                        body: ExtensionBody::Encodeable(value),
                    });
                }
                None => {
                    tracing::debug!(%type_id, "unresolved structure kept as JSON text");
                    EncodedBody::new(BodyEncoding::Json, serde_json::to_vec(body)?)
                }
            }
        }
        ENCODING_BYTES => {
            let bytes = Bytes::decode_json(body, reader)?;
            EncodedBody::new(BodyEncoding::Binary, bytes)
        }
        ENCODING_XML => {
            let text = String::decode_json(body, reader)?;
            EncodedBody::new(BodyEncoding::Xml, text.into_bytes())
        }
        other => {
            return Err(EncoderError::Decoding(format!(
                "Unknown extension object encoding {}",
                other
            )))
        }
    };
    Ok(ExtensionObject::from_encoded(type_id, body))
}
