use super::scalar::read_i128;
use super::{unexpected, JsonReader, JsonWriter};
use crate::composite::{DataValue, DiagnosticInfo, LocalizedText, QualifiedName};
use crate::date_time::DateTime;
use crate::status_code::StatusCode;
use crate::variant::Variant;
use crate::{EncoderError, JsonDecoder, JsonEncoder, Result};
use serde_json::Value;

// --- StatusCode ---
// Good is left out except as an array slot, where every position needs a token.
impl JsonEncoder for StatusCode {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        if *self == StatusCode::GOOD && !writer.in_array() {
            return writer.write_null(field);
        }
        let symbol = self.symbol();
        let as_record = if writer.is_reversible() {
            writer.is_compact() && symbol.is_some()
        } else {
            true
        };
        if !as_record {
            return writer.write_value(field, Value::from(self.0));
        }
        writer.push_object(field)?;
        if let Some(symbol) = symbol {
            writer.write_value(Some("Symbol"), Value::String(symbol.to_string()))?;
        }
        writer.write_value(Some("Code"), Value::from(self.0))?;
        writer.pop_object()
    }
}

impl JsonDecoder for StatusCode {
    fn decode_json(token: &Value, reader: &mut JsonReader<'_>) -> Result<Self> {
        match token {
            Value::Null => Ok(StatusCode::GOOD),
            Value::Number(_) => read_code(token),
            Value::String(text) => StatusCode::from_symbol(text)
                .map(Ok)
                .unwrap_or_else(|| read_code(token)),
            Value::Object(_) => match reader.try_get_field(token, "Code") {
                Some(code) => read_code(code),
                None => match reader.try_get_field(token, "Symbol") {
                    Some(Value::String(symbol)) => StatusCode::from_symbol(symbol).ok_or_else(
                        || EncoderError::Decoding(format!("Unknown status symbol {}", symbol)),
                    ),
                    _ => Ok(StatusCode::GOOD),
                },
            },
            other => Err(unexpected("StatusCode", other)),
        }
    }
}

fn read_code(token: &Value) -> Result<StatusCode> {
    u32::try_from(read_i128(token, "StatusCode")?)
        .map(StatusCode)
        .map_err(|_| unexpected("StatusCode", token))
}

// --- QualifiedName ---
impl JsonEncoder for QualifiedName {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        if self.is_null() {
            return writer.write_null(field);
        }
        writer.push_object(field)?;
        writer.write_value(Some("Name"), Value::String(self.name.clone()))?;
        let index = writer.context().map_namespace(self.namespace_index);
        if writer.is_reversible() {
            if index > 0 {
                writer.write_value(Some("Uri"), Value::from(index))?;
            }
        } else {
            let uri = (index > 1)
                .then(|| writer.context().namespaces.uri_of(u32::from(index)))
                .flatten()
                .map(str::to_string);
            match uri {
                Some(uri) => writer.write_value(Some("Uri"), Value::String(uri))?,
                None if index != 0 => writer.write_value(Some("Index"), Value::from(index))?,
                None => {}
            }
        }
        writer.pop_object()
    }
}

impl JsonDecoder for QualifiedName {
    fn decode_json(token: &Value, reader: &mut JsonReader<'_>) -> Result<Self> {
        match token {
            Value::Null => Ok(QualifiedName::default()),
            Value::String(name) => Ok(QualifiedName::new(0, name.clone())),
            Value::Object(_) => {
                let name = match reader.try_get_field(token, "Name") {
                    Some(value) => String::decode_json(value, reader)?,
                    None => String::new(),
                };
                let namespace_index = match reader
                    .try_get_field(token, "Uri")
                    .or_else(|| reader.try_get_field(token, "Index"))
                {
                    None => 0,
                    Some(Value::String(uri)) => reader
                        .context()
                        .namespaces
                        .index_of(uri)
                        .and_then(|index| u16::try_from(index).ok())
                        .ok_or_else(|| {
                            EncoderError::Decoding(format!("Unknown namespace {}", uri))
                        })?,
                    Some(value) => u16::try_from(read_i128(value, "namespace index")?)
                        .map(|index| reader.context().map_namespace(index))
                        .map_err(|_| unexpected("namespace index", value))?,
                };
                Ok(QualifiedName {
                    namespace_index,
                    name,
                })
            }
            other => Err(unexpected("QualifiedName", other)),
        }
    }
}

// --- LocalizedText ---
impl JsonEncoder for LocalizedText {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        if self.is_null() {
            return writer.write_null(field);
        }
        if !writer.is_reversible() {
            return writer.write_value(field, Value::String(self.text.clone()));
        }
        writer.push_object(field)?;
        if !self.locale.is_empty() {
            writer.write_value(Some("Locale"), Value::String(self.locale.clone()))?;
        }
        writer.write_value(Some("Text"), Value::String(self.text.clone()))?;
        writer.pop_object()
    }
}

impl JsonDecoder for LocalizedText {
    fn decode_json(token: &Value, reader: &mut JsonReader<'_>) -> Result<Self> {
        match token {
            Value::Null => Ok(LocalizedText::default()),
            Value::String(text) => Ok(LocalizedText::new("", text.clone())),
            Value::Object(_) => {
                let mut field = |name: &str| match reader.try_get_field(token, name) {
                    Some(value) => String::decode_json(value, reader),
                    None => Ok(String::new()),
                };
                Ok(LocalizedText {
                    locale: field("Locale")?,
                    text: field("Text")?,
                })
            }
            other => Err(unexpected("LocalizedText", other)),
        }
    }
}

// --- DiagnosticInfo ---
fn within_diagnostic_depth(max_depth: u32, depth: u32) -> bool {
    max_depth == 0 || depth < max_depth
}

fn encode_diagnostic(
    writer: &mut JsonWriter<'_>,
    info: &DiagnosticInfo,
    field: Option<&str>,
    depth: u32,
) -> Result<()> {
    writer.with_nesting(|w| {
        w.push_object(field)?;
        for (name, index) in [
            ("SymbolicId", info.symbolic_id),
            ("NamespaceUri", info.namespace_uri),
            ("Locale", info.locale),
            ("LocalizedText", info.localized_text),
        ] {
            if index >= 0 {
                w.write_value(Some(name), Value::from(index))?;
            }
        }
        if let Some(additional_info) = &info.additional_info {
            w.write_value(Some("AdditionalInfo"), Value::String(additional_info.clone()))?;
        }
        if info.inner_status_code != StatusCode::GOOD {
            info.inner_status_code.encode_json(w, Some("InnerStatusCode"))?;
        }
        if let Some(inner) = &info.inner_diagnostic_info {
            if within_diagnostic_depth(w.context().limits.max_diagnostic_depth, depth + 1) {
                encode_diagnostic(w, inner, Some("InnerDiagnosticInfo"), depth + 1)?;
            } else {
                tracing::debug!(depth, "diagnostic info chain truncated on encode");
            }
        }
        w.pop_object()
    })
}

fn decode_diagnostic(token: &Value, reader: &mut JsonReader<'_>, depth: u32) -> Result<DiagnosticInfo> {
    reader.with_nesting(|r| {
        let index = |name: &str| -> Result<i32> {
            match r.try_get_field(token, name) {
                Some(value) => i32::try_from(read_i128(value, name)?)
                    .map_err(|_| unexpected(name, value)),
                None => Ok(-1),
            }
        };
        let mut info = DiagnosticInfo {
            symbolic_id: index("SymbolicId")?,
            namespace_uri: index("NamespaceUri")?,
            locale: index("Locale")?,
            localized_text: index("LocalizedText")?,
            ..Default::default()
        };
        if let Some(value) = r.try_get_field(token, "AdditionalInfo") {
            info.additional_info = Some(String::decode_json(value, r)?);
        }
        if let Some(value) = r.try_get_field(token, "InnerStatusCode") {
            info.inner_status_code = StatusCode::decode_json(value, r)?;
        }
        if let Some(inner) = r.try_get_field(token, "InnerDiagnosticInfo") {
            if within_diagnostic_depth(r.context().limits.max_diagnostic_depth, depth + 1) {
                info.inner_diagnostic_info = Some(Box::new(decode_diagnostic(inner, r, depth + 1)?));
            } else {
                tracing::debug!(depth, "diagnostic info chain truncated on decode");
            }
        }
        Ok(info)
    })
}

impl JsonEncoder for DiagnosticInfo {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        if self.is_null() {
            return writer.write_null(field);
        }
        encode_diagnostic(writer, self, field, 0)
    }
}

impl JsonDecoder for DiagnosticInfo {
    fn decode_json(token: &Value, reader: &mut JsonReader<'_>) -> Result<Self> {
        match token {
            Value::Null => Ok(DiagnosticInfo::default()),
            Value::Object(_) => decode_diagnostic(token, reader, 0),
            other => Err(unexpected("DiagnosticInfo", other)),
        }
    }
}

// --- DataValue ---
const DATA_VALUE_FIELDS: [&str; 6] = [
    "Value",
    "StatusCode",
    "SourceTimestamp",
    "SourcePicoseconds",
    "ServerTimestamp",
    "ServerPicoseconds",
];

impl JsonEncoder for DataValue {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        if self.is_value_only() {
            return self.value.encode_json(writer, field);
        }
        writer.push_object(field)?;
        self.value.encode_json(writer, Some("Value"))?;
        encode_data_value_members(writer, self)?;
        writer.pop_object()
    }
}

/// Writes the members of an open data value record other than `Value`.
pub(crate) fn encode_data_value_members(writer: &mut JsonWriter<'_>, value: &DataValue) -> Result<()> {
    value.status.encode_json(writer, Some("StatusCode"))?;
    value
        .source_timestamp
        .encode_json(writer, Some("SourceTimestamp"))?;
    if value.source_picoseconds != 0 {
        value
            .source_picoseconds
            .encode_json(writer, Some("SourcePicoseconds"))?;
    }
    value
        .server_timestamp
        .encode_json(writer, Some("ServerTimestamp"))?;
    if value.server_picoseconds != 0 {
        value
            .server_picoseconds
            .encode_json(writer, Some("ServerPicoseconds"))?;
    }
    Ok(())
}

/// True for an object written in the record form of a data value.
pub(crate) fn is_data_value_record(token: &Value) -> bool {
    match token {
        Value::Object(map) => DATA_VALUE_FIELDS.iter().any(|name| map.contains_key(*name)),
        _ => false,
    }
}

impl JsonDecoder for DataValue {
    fn decode_json(token: &Value, reader: &mut JsonReader<'_>) -> Result<Self> {
        if !is_data_value_record(token) {
            return Ok(DataValue::new(Variant::decode_json(token, reader)?));
        }
        let null = Value::Null;
        let field = |name: &str| reader.try_get_field(token, name).unwrap_or(&null);
        let (value, status, source, source_ps, server, server_ps) = (
            field("Value"),
            field("StatusCode"),
            field("SourceTimestamp"),
            field("SourcePicoseconds"),
            field("ServerTimestamp"),
            field("ServerPicoseconds"),
        );
        Ok(DataValue {
            value: Variant::decode_json(value, reader)?,
            status: StatusCode::decode_json(status, reader)?,
            source_timestamp: DateTime::decode_json(source, reader)?,
            source_picoseconds: u16::decode_json(source_ps, reader)?,
            server_timestamp: DateTime::decode_json(server, reader)?,
            server_picoseconds: u16::decode_json(server_ps, reader)?,
        })
    }
}
