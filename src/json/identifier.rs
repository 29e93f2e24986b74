use super::scalar::read_i128;
use super::{unexpected, JsonReader, JsonWriter};
use crate::context::EncodingContext;
use crate::node_id::{ExpandedNodeId, Identifier, NodeId};
use crate::{EncoderError, JsonDecoder, JsonEncoder, Result};
use serde_json::Value;

// Node ids are written either as their string form (compact) or as a record
// `{IdType, Id, Namespace, ServerUri}` with default members left out. Both
// forms are accepted on decode. Namespace and server indexes pass through the
// context's mapping tables as in the binary form; URIs resolve against the
// local tables.

fn id_token(identifier: &Identifier) -> Value {
    match identifier {
        Identifier::Numeric(id) => Value::from(*id),
        other => Value::String(other.value_string()),
    }
}

/// The `Namespace` member for a namespace index.
fn namespace_token(writer: &JsonWriter<'_>, namespace: u16) -> Option<Value> {
    match namespace {
        0 => None,
        1 => Some(Value::from(namespace)),
        _ => {
            let uri = writer
                .context()
                .namespaces
                .uri_of(u32::from(namespace))
                .filter(|_| !writer.is_reversible());
            Some(match uri {
                Some(uri) => Value::String(uri.to_string()),
                None => Value::from(namespace),
            })
        }
    }
}

/// The `nsu=` prefix used by the compact non-reversible string form.
fn namespace_uri_for_string(writer: &JsonWriter<'_>, namespace: u16) -> Option<String> {
    if writer.is_reversible() || namespace == 0 {
        return None;
    }
    writer
        .context()
        .namespaces
        .uri_of(u32::from(namespace))
        .map(str::to_string)
}

fn write_record(
    writer: &mut JsonWriter<'_>,
    identifier: &Identifier,
    namespace: Option<Value>,
    server: Option<Value>,
) -> Result<()> {
    if identifier.id_type() != 0 {
        writer.write_value(Some("IdType"), Value::from(identifier.id_type()))?;
    }
    writer.write_value(Some("Id"), id_token(identifier))?;
    if let Some(namespace) = namespace {
        writer.write_value(Some("Namespace"), namespace)?;
    }
    if let Some(server) = server {
        writer.write_value(Some("ServerUri"), server)?;
    }
    Ok(())
}

impl JsonEncoder for NodeId {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        if self.is_null() {
            return writer.write_null(field);
        }
        let mapped = writer.context().map_namespace(self.namespace);
        if writer.is_compact() {
            let text = match namespace_uri_for_string(writer, mapped) {
                Some(uri) => format!("nsu={};{}", uri, self.identifier),
                None => NodeId::new(mapped, self.identifier.clone()).to_string(),
            };
            return writer.write_value(field, Value::String(text));
        }
        let namespace = namespace_token(writer, mapped);
        writer.push_object(field)?;
        write_record(writer, &self.identifier, namespace, None)?;
        writer.pop_object()
    }
}

impl JsonEncoder for ExpandedNodeId {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        if self.is_null() {
            return writer.write_null(field);
        }
        let context = writer.context();
        let mapped = ExpandedNodeId {
            node_id: match self.namespace_uri {
                Some(_) => self.node_id.clone(),
                None => NodeId::new(
                    context.map_namespace(self.node_id.namespace),
                    self.node_id.identifier.clone(),
                ),
            },
            namespace_uri: self.namespace_uri.clone(),
            server_index: context.map_server(self.server_index),
        };
        if writer.is_compact() {
            let text = match (&mapped.namespace_uri, namespace_uri_for_string(writer, mapped.node_id.namespace)) {
                (None, Some(uri)) => ExpandedNodeId {
                    node_id: NodeId::new(0, mapped.node_id.identifier.clone()),
                    namespace_uri: Some(uri),
                    server_index: mapped.server_index,
                }
                .to_string(),
                _ => mapped.to_string(),
            };
            return writer.write_value(field, Value::String(text));
        }
        let namespace = match &mapped.namespace_uri {
            Some(uri) => Some(Value::String(uri.clone())),
            None => namespace_token(writer, mapped.node_id.namespace),
        };
        let server = match mapped.server_index {
            0 => None,
            index => Some(match writer.context().server_uris.uri_of(index) {
                Some(uri) => Value::String(uri.to_string()),
                None => Value::from(index),
            }),
        };
        writer.push_object(field)?;
        write_record(writer, &mapped.node_id.identifier, namespace, server)?;
        writer.pop_object()
    }
}

/// Reads `{IdType, Id}` of a record token.
fn read_identifier(token: &Value, reader: &JsonReader<'_>) -> Result<Identifier> {
    let id_type = match reader.try_get_field(token, "IdType") {
        Some(value) => u8::try_from(read_i128(value, "IdType")?)
            .map_err(|_| unexpected("IdType", value))?,
        None => 0,
    };
    let id = reader.try_get_field(token, "Id");
    match (id_type, id) {
        (0, None) => Ok(Identifier::Numeric(0)),
        (0, Some(value)) => u32::try_from(read_i128(value, "numeric id")?)
            .map(Identifier::Numeric)
            .map_err(|_| unexpected("numeric id", value)),
        (_, Some(Value::String(text))) => Identifier::parse(id_type, text),
        (_, None) => Identifier::parse(id_type, ""),
        (_, Some(other)) => Err(unexpected("identifier text", other)),
    }
}

enum NamespaceRef {
    Index(u16),
    Uri(String),
}

fn read_namespace(token: &Value, reader: &JsonReader<'_>) -> Result<NamespaceRef> {
    match reader.try_get_field(token, "Namespace") {
        None => Ok(NamespaceRef::Index(0)),
        Some(Value::String(uri)) => Ok(NamespaceRef::Uri(uri.clone())),
        Some(value) => u16::try_from(read_i128(value, "Namespace")?)
            .map(NamespaceRef::Index)
            .map_err(|_| unexpected("Namespace", value)),
    }
}

fn resolve_namespace(context: &EncodingContext, uri: &str) -> Result<u16> {
    context
        .namespaces
        .index_of(uri)
        .and_then(|index| u16::try_from(index).ok())
        .ok_or_else(|| EncoderError::Decoding(format!("Unknown namespace {}", uri)))
}

impl JsonDecoder for NodeId {
    fn decode_json(token: &Value, reader: &mut JsonReader<'_>) -> Result<Self> {
        match token {
            Value::Null => Ok(NodeId::null()),
            Value::String(text) => {
                let context = reader.context();
                let node_id = NodeId::parse_with(text, &context.namespaces)?;
                if !text.starts_with("ns=") {
                    return Ok(node_id);
                }
                Ok(NodeId::new(context.map_namespace(node_id.namespace), node_id.identifier))
            }
            Value::Object(_) => {
                let identifier = read_identifier(token, reader)?;
                let namespace = match read_namespace(token, reader)? {
                    NamespaceRef::Index(index) => reader.context().map_namespace(index),
                    NamespaceRef::Uri(uri) => resolve_namespace(reader.context(), &uri)?,
                };
                Ok(NodeId {
                    namespace,
                    identifier,
                })
            }
            other => Err(unexpected("NodeId", other)),
        }
    }
}

impl JsonDecoder for ExpandedNodeId {
    fn decode_json(token: &Value, reader: &mut JsonReader<'_>) -> Result<Self> {
        match token {
            Value::Null => Ok(ExpandedNodeId::null()),
            Value::String(text) => {
                let context = reader.context();
                let parsed: ExpandedNodeId = text.parse()?;
                let namespace = match parsed.namespace_uri {
                    Some(_) => parsed.node_id.namespace,
                    None => context.map_namespace(parsed.node_id.namespace),
                };
                Ok(ExpandedNodeId {
                    node_id: NodeId::new(namespace, parsed.node_id.identifier),
                    namespace_uri: parsed.namespace_uri,
                    server_index: context.map_server(parsed.server_index),
                })
            }
            Value::Object(_) => {
                let identifier = read_identifier(token, reader)?;
                let (namespace, namespace_uri) = match read_namespace(token, reader)? {
                    NamespaceRef::Index(index) => (reader.context().map_namespace(index), None),
                    NamespaceRef::Uri(uri) => (0, Some(uri)),
                };
                let server_index = match reader.try_get_field(token, "ServerUri") {
                    None => 0,
                    Some(Value::String(uri)) => {
                        reader.context().server_uris.index_of(uri).ok_or_else(|| {
                            EncoderError::Decoding(format!("Unknown server uri {}", uri))
                        })?
                    }
                    Some(value) => u32::try_from(read_i128(value, "ServerUri")?)
                        .map(|index| reader.context().map_server(index))
                        .map_err(|_| unexpected("ServerUri", value))?,
                };
                Ok(ExpandedNodeId {
                    node_id: NodeId {
                        namespace,
                        identifier,
                    },
                    namespace_uri,
                    server_index,
                })
            }
            other => Err(unexpected("ExpandedNodeId", other)),
        }
    }
}
