//! Structured payloads wrapped with a type id, and the catalog that knows how
//! to decode them.

use crate::binary::{BinaryReader, BinaryWriter};
use crate::context::UriTable;
use crate::json::{JsonReader, JsonWriter};
use crate::node_id::ExpandedNodeId;
use crate::Result;
use bytes::Bytes;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A structured value with its own field codecs.
pub trait Encodeable: fmt::Debug + Send + Sync {
    /// The data type id.
    fn data_type_id(&self) -> ExpandedNodeId;
    /// The id written in front of the binary encoding.
    fn binary_encoding_id(&self) -> ExpandedNodeId;
    /// The id written in front of the JSON encoding.
    fn json_encoding_id(&self) -> ExpandedNodeId;
    fn encode_binary(&self, writer: &mut BinaryWriter<'_>) -> Result<()>;
    /// Writes the fields into the object the writer currently has open.
    fn encode_json(&self, writer: &mut JsonWriter<'_>) -> Result<()>;
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn Encodeable>;
    fn eq_encodeable(&self, other: &dyn Encodeable) -> bool;
}

impl Clone for Box<dyn Encodeable> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl PartialEq for Box<dyn Encodeable> {
    fn eq(&self, other: &Self) -> bool {
        self.eq_encodeable(other.as_ref())
    }
}

/// Decodes one structured type.
pub trait EncodeableFactory: Send + Sync {
    fn decode_binary(&self, reader: &mut BinaryReader<'_>) -> Result<Box<dyn Encodeable>>;
    /// Decodes from the `Body` object of an extension object.
    fn decode_json(&self, body: &Value, reader: &mut JsonReader<'_>)
        -> Result<Box<dyn Encodeable>>;
}

/// Looks up the factory for a type or encoding id.
///
/// Ids are passed in absolute form (see [`ExpandedNodeId::to_absolute`]).
pub trait TypeCatalog: Send + Sync {
    fn resolve(&self, type_id: &ExpandedNodeId) -> Option<Arc<dyn EncodeableFactory>>;
}

/// A map based [`TypeCatalog`].
#[derive(Default, Clone)]
pub struct TypeRegistry {
    namespaces: UriTable,
    factories: HashMap<ExpandedNodeId, Arc<dyn EncodeableFactory>>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            namespaces: UriTable::namespaces(),
            factories: HashMap::new(),
        }
    }

    /// A registry that resolves namespace indexes of registered ids through
    /// `namespaces`.
    pub fn with_namespaces(namespaces: UriTable) -> Self {
        Self {
            namespaces,
            factories: HashMap::new(),
        }
    }

    /// Registers `factory` under every id in `ids`, typically the data type
    /// id and the binary and JSON encoding ids.
    pub fn register<I>(&mut self, ids: I, factory: Arc<dyn EncodeableFactory>)
    where
        I: IntoIterator<Item = ExpandedNodeId>,
    {
        for id in ids {
            let id = id.to_absolute(&self.namespaces);
            tracing::trace!(%id, "registering structured type");
            self.factories.insert(id, factory.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl TypeCatalog for TypeRegistry {
    fn resolve(&self, type_id: &ExpandedNodeId) -> Option<Arc<dyn EncodeableFactory>> {
        self.factories
            .get(&type_id.to_absolute(&self.namespaces))
            .cloned()
    }
}

/// How a raw extension body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyEncoding {
    /// The binary encoding of a structure whose type is not in the catalog.
    Structure,
    Binary,
    Xml,
    Json,
}

impl BodyEncoding {
    /// The encoding kind written in front of a raw binary body.
    pub(crate) fn wire_kind(self) -> i64 {
        match self {
            BodyEncoding::Structure | BodyEncoding::Binary => 1,
            BodyEncoding::Xml => 2,
            BodyEncoding::Json => 4,
        }
    }

    pub(crate) fn from_wire_kind(kind: i64) -> Option<Self> {
        match kind {
            1 => Some(BodyEncoding::Binary),
            2 => Some(BodyEncoding::Xml),
            4 => Some(BodyEncoding::Json),
            _ => None,
        }
    }
}

/// A body kept in its encoded form. Xml and Json bodies hold UTF-8 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub encoding: BodyEncoding,
    pub bytes: Bytes,
}

impl EncodedBody {
    pub fn new(encoding: BodyEncoding, bytes: impl Into<Bytes>) -> Self {
        Self {
            encoding,
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ExtensionBody {
    #[default]
    None,
    Encodeable(Box<dyn Encodeable>),
    Encoded(EncodedBody),
}

/// A structured value and its type id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionObject {
    pub type_id: ExpandedNodeId,
    pub body: ExtensionBody,
}

impl ExtensionObject {
    pub fn null() -> Self {
        Self::default()
    }

    pub fn from_encodeable(value: Box<dyn Encodeable>) -> Self {
        Self {
            type_id: value.data_type_id(),
            body: ExtensionBody::Encodeable(value),
        }
    }

    pub fn from_encoded(type_id: ExpandedNodeId, body: EncodedBody) -> Self {
        Self {
            type_id,
            body: ExtensionBody::Encoded(body),
        }
    }

    pub fn is_null(&self) -> bool {
        self.type_id.is_null() && matches!(self.body, ExtensionBody::None)
    }

    /// Downcasts a decoded structure.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.body {
            ExtensionBody::Encodeable(value) => value.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}
