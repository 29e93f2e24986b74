use super::{BinaryReader, BinaryWriter};
use crate::extension::{BodyEncoding, EncodedBody, ExtensionBody, ExtensionObject};
use crate::node_id::{ExpandedNodeId, NodeId};
use crate::{Decoder, Encoder, EncoderError, Result};

// Layout: local type id, then a union of
//   0 no body,
//   1 structure (its binary encoding, length-prefixed),
//   2 raw body (encoding kind, then the bytes).

impl Encoder for ExtensionObject {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        match &self.body {
            ExtensionBody::Encodeable(value) => {
                let encoding_id = value.binary_encoding_id();
                let type_id = encoding_id
                    .to_node_id(&writer.context().namespaces)
                    .ok_or_else(|| {
                        EncoderError::Encoding(format!(
                            "Unknown namespace uri for type {}",
                            encoding_id
                        ))
                    })?;
                type_id.encode(writer)?;
                writer.write_union_index(1);
                writer.with_nesting(|w| w.write_block(|block| value.encode_binary(block)))
            }
            ExtensionBody::Encoded(body) => {
                local_type_id(writer, &self.type_id).encode(writer)?;
                match body.encoding {
                    BodyEncoding::Structure => {
                        writer.write_union_index(1);
                        writer.write_block(|block| {
                            block.write_fixed(&body.bytes);
                            Ok(())
                        })
                    }
                    encoding => {
                        writer.write_union_index(2);
                        writer.write_long(encoding.wire_kind());
                        writer.write_bytes(&body.bytes)
                    }
                }
            }
            ExtensionBody::None => {
                local_type_id(writer, &self.type_id).encode(writer)?;
                writer.write_union_index(0);
                Ok(())
            }
        }
    }
}

/// The type id as a local node id. An unknown namespace degrades to the null id.
fn local_type_id(writer: &BinaryWriter<'_>, type_id: &ExpandedNodeId) -> NodeId {
    type_id
        .to_node_id(&writer.context().namespaces)
        .unwrap_or_else(|| {
            tracing::debug!(%type_id, "unknown namespace, writing null type id");
            NodeId::null()
        })
}

impl Decoder for ExtensionObject {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let type_id = ExpandedNodeId::from(NodeId::decode(reader)?);
        let body = match reader.read_union_index()? {
            0 => ExtensionBody::None,
            1 => {
                let absolute = type_id.to_absolute(&reader.context().namespaces);
                match reader.context().catalog().resolve(&absolute) {
                    Some(factory) => {
                        let value = reader.with_nesting(|r| {
                            r.read_block(|block| factory.decode_binary(block))
                        })?;
                        return Ok(ExtensionObject {
                            type_id,
                            body: ExtensionBody::Encodeable(value),
                        });
                    }
                    None => {
                        tracing::debug!(%type_id, "unresolved structure kept encoded");
                        let bytes = reader.read_raw_block()?;
                        ExtensionBody::Encoded(EncodedBody::new(BodyEncoding::Structure, bytes))
                    }
                }
            }
            2 => {
                let kind = reader.read_long()?;
                let encoding = BodyEncoding::from_wire_kind(kind).ok_or_else(|| {
                    EncoderError::Decoding(format!("Unknown extension body encoding {}", kind))
                })?;
                ExtensionBody::Encoded(EncodedBody::new(encoding, reader.read_bytes()?))
            }
            other => {
                return Err(EncoderError::Decoding(format!(
                    "Cannot decode unknown extension object union field: {}",
                    other
                )))
            }
        };
        Ok(ExtensionObject { type_id, body })
    }
}
