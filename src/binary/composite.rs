use super::{BinaryReader, BinaryWriter};
use crate::composite::{DataValue, DiagnosticInfo, LocalizedText, QualifiedName};
use crate::date_time::DateTime;
use crate::status_code::StatusCode;
use crate::variant::Variant;
use crate::{Decoder, Encoder, EncoderError, Result};

impl Encoder for QualifiedName {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        let namespace = writer.context().map_namespace(self.namespace_index);
        writer.write_long(i64::from(namespace));
        writer.write_string(&self.name)
    }
}

impl Decoder for QualifiedName {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let namespace = u16::decode(reader)?;
        Ok(QualifiedName {
            namespace_index: reader.context().map_namespace(namespace),
            name: reader.read_string()?,
        })
    }
}

impl Encoder for LocalizedText {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        writer.write_string(&self.locale)?;
        writer.write_string(&self.text)
    }
}

impl Decoder for LocalizedText {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(LocalizedText {
            locale: reader.read_string()?,
            text: reader.read_string()?,
        })
    }
}

/// Whether an inner record at `depth` may still be written or read.
fn within_diagnostic_depth(max_depth: u32, depth: u32) -> bool {
    max_depth == 0 || depth < max_depth
}

fn encode_diagnostic(writer: &mut BinaryWriter<'_>, info: &DiagnosticInfo, depth: u32) -> Result<()> {
    writer.with_nesting(|w| {
        w.write_int(info.symbolic_id);
        w.write_int(info.namespace_uri);
        w.write_int(info.locale);
        w.write_int(info.localized_text);
        w.write_string(info.additional_info.as_deref().unwrap_or(""))?;
        info.inner_status_code.encode(w)?;
        match &info.inner_diagnostic_info {
            Some(inner) if within_diagnostic_depth(w.context().limits.max_diagnostic_depth, depth + 1) => {
                w.write_union_index(1);
                encode_diagnostic(w, inner, depth + 1)
            }
            Some(_) => {
                tracing::debug!(depth, "diagnostic info chain truncated on encode");
                w.write_union_index(0);
                Ok(())
            }
            None => {
                w.write_union_index(0);
                Ok(())
            }
        }
    })
}

/// Reads one record and its inner-record union index.
fn read_diagnostic_record(reader: &mut BinaryReader<'_>) -> Result<(DiagnosticInfo, bool)> {
    let symbolic_id = reader.read_int()?;
    let namespace_uri = reader.read_int()?;
    let locale = reader.read_int()?;
    let localized_text = reader.read_int()?;
    let additional_info = reader.read_string()?;
    let inner_status_code = StatusCode::decode(reader)?;
    let has_inner = match reader.read_union_index()? {
        0 => false,
        1 => true,
        other => {
            return Err(EncoderError::Decoding(format!(
                "Cannot decode unknown diagnostic info union field: {}",
                other
            )))
        }
    };
    let info = DiagnosticInfo {
        symbolic_id,
        namespace_uri,
        locale,
        localized_text,
        additional_info: (!additional_info.is_empty()).then_some(additional_info),
        inner_status_code,
        inner_diagnostic_info: None,
    };
    Ok((info, has_inner))
}

// Records past the maximum depth are read and dropped in a loop, so a long
// chain neither recurses nor misaligns the stream.
fn decode_diagnostic(reader: &mut BinaryReader<'_>) -> Result<DiagnosticInfo> {
    reader.with_nesting(|r| {
        let max_depth = r.context().limits.max_diagnostic_depth;
        let (first, mut has_inner) = read_diagnostic_record(r)?;
        let mut chain = vec![first];
        let mut depth = 0u32;
        while has_inner {
            depth = depth.saturating_add(1);
            let (record, more) = read_diagnostic_record(r)?;
            if within_diagnostic_depth(max_depth, depth) {
                chain.push(record);
            } else if depth == max_depth {
                tracing::debug!(depth, "diagnostic info chain truncated on decode");
            }
            has_inner = more;
        }

        let mut result: Option<DiagnosticInfo> = None;
        while let Some(mut info) = chain.pop() {
            info.inner_diagnostic_info = result.map(Box::new);
            result = Some(info);
        }
        result.ok_or_else(|| EncoderError::Decoding("Empty diagnostic info chain".into()))
    })
}

impl Encoder for DiagnosticInfo {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        encode_diagnostic(writer, self, 0)
    }
}

impl Decoder for DiagnosticInfo {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        decode_diagnostic(reader)
    }
}

impl Encoder for DataValue {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        self.value.encode(writer)?;
        self.status.encode(writer)?;
        self.source_timestamp.encode(writer)?;
        self.source_picoseconds.encode(writer)?;
        self.server_timestamp.encode(writer)?;
        self.server_picoseconds.encode(writer)
    }
}

impl Decoder for DataValue {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(DataValue {
            value: Variant::decode(reader)?,
            status: StatusCode::decode(reader)?,
            source_timestamp: DateTime::decode(reader)?,
            source_picoseconds: u16::decode(reader)?,
            server_timestamp: DateTime::decode(reader)?,
            server_picoseconds: u16::decode(reader)?,
        })
    }
}
