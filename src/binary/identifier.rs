use super::{BinaryReader, BinaryWriter};
use crate::node_id::{ExpandedNodeId, Identifier, NodeId};
use crate::{Decoder, Encoder, EncoderError, Result};
use bytes::Bytes;
use uuid::Uuid;

impl Encoder for NodeId {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        let namespace = writer.context().map_namespace(self.namespace);
        writer.write_long(i64::from(namespace));
        writer.write_union_index(u32::from(self.identifier.id_type()));
        match &self.identifier {
            Identifier::Numeric(id) => id.encode(writer),
            Identifier::String(id) => writer.write_string(id),
            Identifier::Guid(id) => id.encode(writer),
            Identifier::Opaque(id) => writer.write_bytes(id),
        }
    }
}

impl Decoder for NodeId {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let namespace = u16::decode(reader)?;
        let namespace = reader.context().map_namespace(namespace);
        let identifier = match reader.read_union_index()? {
            0 => Identifier::Numeric(u32::decode(reader)?),
            1 => Identifier::String(reader.read_string()?),
            2 => Identifier::Guid(Uuid::decode(reader)?),
            3 => Identifier::Opaque(Bytes::decode(reader)?),
            other => {
                return Err(EncoderError::Decoding(format!(
                    "Cannot decode unknown identifier union field: {}",
                    other
                )))
            }
        };
        Ok(NodeId {
            namespace,
            identifier,
        })
    }
}

impl Encoder for ExpandedNodeId {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        let node_id = self
            .to_node_id(&writer.context().namespaces)
            .unwrap_or_else(|| self.node_id.clone());
        node_id.encode(writer)?;
        writer.write_string(self.namespace_uri.as_deref().unwrap_or(""))?;
        let server_index = writer.context().map_server(self.server_index);
        writer.write_long(i64::from(server_index));
        Ok(())
    }
}

impl Decoder for ExpandedNodeId {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let mut node_id = NodeId::decode(reader)?;
        let namespace_uri = reader.read_string()?;
        let server_index = u32::decode(reader)?;
        if node_id.is_null() {
            return Ok(ExpandedNodeId::null());
        }
        let namespace_uri = if namespace_uri.is_empty() {
            None
        } else {
            // The URI names the namespace; the index written next to it is advisory.
            node_id.namespace = 0;
            Some(namespace_uri)
        };
        Ok(ExpandedNodeId {
            node_id,
            namespace_uri,
            server_index: reader.context().map_server(server_index),
        })
    }
}
