//! Node identifiers and their text form (`ns=2;s=Motor`, `svr=1;nsu=urn:x;i=5`).

use crate::context::{UriTable, OPC_UA_NAMESPACE_URI};
use crate::{EncoderError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The identifier part of a node id. The discriminant order is the wire
/// union index and the JSON `IdType`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Numeric(u32),
    String(String),
    Guid(Uuid),
    Opaque(Bytes),
}

impl Identifier {
    pub fn id_type(&self) -> u8 {
        match self {
            Identifier::Numeric(_) => 0,
            Identifier::String(_) => 1,
            Identifier::Guid(_) => 2,
            Identifier::Opaque(_) => 3,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Identifier::Numeric(id) => *id == 0,
            Identifier::String(id) => id.is_empty(),
            Identifier::Guid(id) => id.is_nil(),
            Identifier::Opaque(id) => id.is_empty(),
        }
    }

    /// Parses the identifier value for a given `IdType`.
    pub fn parse(id_type: u8, text: &str) -> Result<Self> {
        match id_type {
            0 => text
                .parse::<u32>()
                .map(Identifier::Numeric)
                .map_err(|e| EncoderError::Decoding(format!("Invalid numeric id {}: {}", text, e))),
            1 => Ok(Identifier::String(text.to_string())),
            2 => Uuid::parse_str(text)
                .map(Identifier::Guid)
                .map_err(|e| EncoderError::Decoding(format!("Invalid guid id {}: {}", text, e))),
            3 => STANDARD
                .decode(text)
                .map(|b| Identifier::Opaque(Bytes::from(b)))
                .map_err(|e| EncoderError::Decoding(format!("Invalid opaque id {}: {}", text, e))),
            other => Err(EncoderError::Decoding(format!(
                "Unknown identifier type {}",
                other
            ))),
        }
    }

    /// The value part of the text form without its `i=`/`s=`/`g=`/`b=` prefix.
    pub fn value_string(&self) -> String {
        match self {
            Identifier::Numeric(id) => id.to_string(),
            Identifier::String(id) => id.clone(),
            Identifier::Guid(id) => id.to_string(),
            Identifier::Opaque(id) => STANDARD.encode(id),
        }
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Identifier::Numeric(0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self {
            Identifier::Numeric(_) => "i",
            Identifier::String(_) => "s",
            Identifier::Guid(_) => "g",
            Identifier::Opaque(_) => "b",
        };
        write!(f, "{}={}", prefix, self.value_string())
    }
}

impl FromStr for Identifier {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self> {
        let id_type = match s.get(..2) {
            Some("i=") => 0,
            Some("s=") => 1,
            Some("g=") => 2,
            Some("b=") => 3,
            _ => {
                return Err(EncoderError::Decoding(format!(
                    "Invalid identifier: {}",
                    s
                )))
            }
        };
        Identifier::parse(id_type, &s[2..])
    }
}

impl From<u32> for Identifier {
    fn from(value: u32) -> Self {
        Identifier::Numeric(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::String(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::String(value)
    }
}

impl From<Uuid> for Identifier {
    fn from(value: Uuid) -> Self {
        Identifier::Guid(value)
    }
}

impl From<Bytes> for Identifier {
    fn from(value: Bytes) -> Self {
        Identifier::Opaque(value)
    }
}

/// A node id local to one server: namespace index plus identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub namespace: u16,
    pub identifier: Identifier,
}

impl NodeId {
    pub fn new(namespace: u16, identifier: impl Into<Identifier>) -> Self {
        Self {
            namespace,
            identifier: identifier.into(),
        }
    }

    /// `i=0`, the null node id.
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.namespace == 0 && self.identifier.is_null()
    }

    /// Parses the text form, resolving `nsu=` against `namespaces`.
    pub fn parse_with(text: &str, namespaces: &UriTable) -> Result<Self> {
        let expanded: ExpandedNodeId = text.parse()?;
        if expanded.server_index != 0 {
            return Err(EncoderError::Decoding(format!(
                "Node id {} must not carry a server index",
                text
            )));
        }
        expanded.to_node_id(namespaces).ok_or_else(|| {
            EncoderError::Decoding(format!("Unknown namespace in node id {}", text))
        })
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};", self.namespace)?;
        }
        write!(f, "{}", self.identifier)
    }
}

impl FromStr for NodeId {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self> {
        let (namespace, rest) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns, rest) = rest.split_once(';').ok_or_else(|| {
                    EncoderError::Decoding(format!("Invalid node id: {}", s))
                })?;
                let ns = ns.parse::<u16>().map_err(|e| {
                    EncoderError::Decoding(format!("Invalid namespace index {}: {}", ns, e))
                })?;
                (ns, rest)
            }
            None => (0, s),
        };
        Ok(NodeId {
            namespace,
            identifier: rest.parse()?,
        })
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        NodeId::new(0, value)
    }
}

/// A node id that may name its namespace by URI and point to another server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExpandedNodeId {
    pub node_id: NodeId,
    /// When set, takes precedence over `node_id.namespace`.
    pub namespace_uri: Option<String>,
    pub server_index: u32,
}

impl ExpandedNodeId {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            namespace_uri: None,
            server_index: 0,
        }
    }

    pub fn with_namespace_uri(
        namespace_uri: impl Into<String>,
        identifier: impl Into<Identifier>,
    ) -> Self {
        Self {
            node_id: NodeId::new(0, identifier),
            namespace_uri: Some(namespace_uri.into()),
            server_index: 0,
        }
    }

    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.node_id.is_null() && self.namespace_uri.is_none() && self.server_index == 0
    }

    /// The local node id, if the namespace is resolvable.
    pub fn to_node_id(&self, namespaces: &UriTable) -> Option<NodeId> {
        match &self.namespace_uri {
            Some(uri) => {
                let namespace = namespaces.index_of(uri)?;
                Some(NodeId {
                    namespace: u16::try_from(namespace).ok()?,
                    identifier: self.node_id.identifier.clone(),
                })
            }
            None => Some(self.node_id.clone()),
        }
    }

    /// The canonical form: the namespace named by URI whenever the URI is known,
    /// with index 0 for the OPC UA namespace. Two ids naming the same node
    /// through index or URI have equal absolute forms.
    pub fn to_absolute(&self, namespaces: &UriTable) -> ExpandedNodeId {
        let uri = match &self.namespace_uri {
            Some(uri) => Some(uri.clone()),
            None if self.node_id.namespace == 0 => None,
            None => namespaces
                .uri_of(self.node_id.namespace as u32)
                .map(str::to_string),
        };
        match uri {
            Some(uri) if uri == OPC_UA_NAMESPACE_URI => ExpandedNodeId {
                node_id: NodeId::new(0, self.node_id.identifier.clone()),
                namespace_uri: None,
                server_index: self.server_index,
            },
            Some(uri) => ExpandedNodeId {
                node_id: NodeId::new(0, self.node_id.identifier.clone()),
                namespace_uri: Some(uri),
                server_index: self.server_index,
            },
            None => self.clone(),
        }
    }
}

impl From<NodeId> for ExpandedNodeId {
    fn from(value: NodeId) -> Self {
        ExpandedNodeId::new(value)
    }
}

impl From<u32> for ExpandedNodeId {
    fn from(value: u32) -> Self {
        ExpandedNodeId::new(NodeId::from(value))
    }
}

impl fmt::Display for ExpandedNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.server_index != 0 {
            write!(f, "svr={};", self.server_index)?;
        }
        match &self.namespace_uri {
            Some(uri) => write!(f, "nsu={};{}", uri, self.node_id.identifier),
            None => write!(f, "{}", self.node_id),
        }
    }
}

impl FromStr for ExpandedNodeId {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self> {
        let mut rest = s;
        let mut server_index = 0;
        if let Some(tail) = rest.strip_prefix("svr=") {
            let (svr, tail) = tail
                .split_once(';')
                .ok_or_else(|| EncoderError::Decoding(format!("Invalid node id: {}", s)))?;
            server_index = svr.parse::<u32>().map_err(|e| {
                EncoderError::Decoding(format!("Invalid server index {}: {}", svr, e))
            })?;
            rest = tail;
        }
        if let Some(tail) = rest.strip_prefix("nsu=") {
            let (uri, tail) = tail
                .split_once(';')
                .ok_or_else(|| EncoderError::Decoding(format!("Invalid node id: {}", s)))?;
            return Ok(ExpandedNodeId {
                node_id: NodeId::new(0, tail.parse::<Identifier>()?),
                namespace_uri: Some(uri.to_string()),
                server_index,
            });
        }
        Ok(ExpandedNodeId {
            node_id: rest.parse()?,
            namespace_uri: None,
            server_index,
        })
    }
}
