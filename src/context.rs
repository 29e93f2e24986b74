//! Encoding configuration shared by readers and writers of one pass.

use crate::extension::{TypeCatalog, TypeRegistry};
use crate::{EncoderError, Result};
use std::fmt;
use std::sync::Arc;

/// The OPC UA namespace, always index 0 of a namespace table.
pub const OPC_UA_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

/// Bounds enforced while encoding and decoding. A value of 0 disables a bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingLimits {
    pub max_array_length: usize,
    pub max_string_length: usize,
    pub max_byte_string_length: usize,
    /// Maximum depth of nested variants, diagnostic infos and structures.
    pub max_nesting_depth: u32,
    /// Maximum length of a chain of inner diagnostic infos.
    pub max_diagnostic_depth: u32,
}

impl Default for EncodingLimits {
    fn default() -> Self {
        Self {
            max_array_length: 65_535,
            max_string_length: 4 * 1024 * 1024,
            max_byte_string_length: 4 * 1024 * 1024,
            max_nesting_depth: 200,
            max_diagnostic_depth: 4,
        }
    }
}

impl EncodingLimits {
    /// Limits with every bound disabled except the diagnostic depth.
    pub fn unlimited() -> Self {
        Self {
            max_array_length: 0,
            max_string_length: 0,
            max_byte_string_length: 0,
            max_nesting_depth: 0,
            max_diagnostic_depth: Self::default().max_diagnostic_depth,
        }
    }

    pub fn with_max_array_length(mut self, value: usize) -> Self {
        self.max_array_length = value;
        self
    }

    pub fn with_max_string_length(mut self, value: usize) -> Self {
        self.max_string_length = value;
        self
    }

    pub fn with_max_byte_string_length(mut self, value: usize) -> Self {
        self.max_byte_string_length = value;
        self
    }

    pub fn with_max_nesting_depth(mut self, value: u32) -> Self {
        self.max_nesting_depth = value;
        self
    }

    pub fn with_max_diagnostic_depth(mut self, value: u32) -> Self {
        self.max_diagnostic_depth = value;
        self
    }

    pub(crate) fn check_array_length(&self, length: usize) -> Result<()> {
        check(self.max_array_length, length, "MaxArrayLength")
    }

    pub(crate) fn check_string_length(&self, length: usize) -> Result<()> {
        check(self.max_string_length, length, "MaxStringLength")
    }

    pub(crate) fn check_byte_string_length(&self, length: usize) -> Result<()> {
        check(self.max_byte_string_length, length, "MaxByteStringLength")
    }

    pub(crate) fn check_nesting(&self, level: u32) -> Result<()> {
        if self.max_nesting_depth > 0 && level > self.max_nesting_depth {
            tracing::warn!(level, max = self.max_nesting_depth, "nesting limit exceeded");
            return Err(EncoderError::LimitExceeded(format!(
                "Maximum nesting level of {} was exceeded",
                self.max_nesting_depth
            )));
        }
        Ok(())
    }
}

fn check(max: usize, length: usize, name: &str) -> Result<()> {
    if max > 0 && max < length {
        tracing::warn!(limit = name, max, length, "encoding limit exceeded");
        return Err(EncoderError::LimitExceeded(format!(
            "{} {} < {}",
            name, max, length
        )));
    }
    Ok(())
}

/// An ordered table of URIs addressed by index: the namespace array or the
/// server array of an OPC UA server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriTable {
    uris: Vec<String>,
}

impl UriTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A namespace table holding only the OPC UA namespace at index 0.
    pub fn namespaces() -> Self {
        Self {
            uris: vec![OPC_UA_NAMESPACE_URI.to_string()],
        }
    }

    pub fn from_uris<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            uris: uris.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds a URI unless present and returns its index.
    pub fn append(&mut self, uri: impl Into<String>) -> u32 {
        let uri = uri.into();
        if let Some(index) = self.index_of(&uri) {
            return index;
        }
        self.uris.push(uri);
        (self.uris.len() - 1) as u32
    }

    pub fn index_of(&self, uri: &str) -> Option<u32> {
        self.uris.iter().position(|u| u == uri).map(|i| i as u32)
    }

    pub fn uri_of(&self, index: u32) -> Option<&str> {
        self.uris.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.uris.iter().map(String::as_str)
    }

    /// Maps every index of this table to the index of the same URI in `target`.
    /// URIs unknown to `target` keep their index.
    pub fn create_mapping(&self, target: &UriTable) -> Vec<u32> {
        self.uris
            .iter()
            .enumerate()
            .map(|(i, uri)| target.index_of(uri).unwrap_or(i as u32))
            .collect()
    }
}

/// Everything a reader or writer needs besides the bytes: limits, URI tables,
/// index remappings and the catalog of structured types.
///
/// A context is read-only during a pass; independent readers and writers may
/// borrow the same context.
#[derive(Clone)]
pub struct EncodingContext {
    pub limits: EncodingLimits,
    pub namespaces: UriTable,
    pub server_uris: UriTable,
    namespace_mappings: Option<Vec<u16>>,
    server_mappings: Option<Vec<u32>>,
    catalog: Arc<dyn TypeCatalog>,
}

impl Default for EncodingContext {
    fn default() -> Self {
        Self {
            limits: EncodingLimits::default(),
            namespaces: UriTable::namespaces(),
            server_uris: UriTable::new(),
            namespace_mappings: None,
            server_mappings: None,
            catalog: Arc::new(TypeRegistry::new()),
        }
    }
}

impl fmt::Debug for EncodingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodingContext")
            .field("limits", &self.limits)
            .field("namespaces", &self.namespaces)
            .field("server_uris", &self.server_uris)
            .field("namespace_mappings", &self.namespace_mappings)
            .field("server_mappings", &self.server_mappings)
            .finish_non_exhaustive()
    }
}

impl EncodingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: EncodingLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_namespaces(mut self, namespaces: UriTable) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn with_server_uris(mut self, server_uris: UriTable) -> Self {
        self.server_uris = server_uris;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn TypeCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Installs index remappings from the tables of a peer (`namespace_uris`,
    /// `server_uris`) into this context's tables. Every namespace and server
    /// index read or written afterwards goes through the mapping.
    pub fn with_mapping_tables(
        mut self,
        namespace_uris: Option<&UriTable>,
        server_uris: Option<&UriTable>,
    ) -> Self {
        self.namespace_mappings = namespace_uris.map(|table| {
            table
                .create_mapping(&self.namespaces)
                .into_iter()
                .map(|index| u16::try_from(index).unwrap_or(u16::MAX))
                .collect()
        });
        self.server_mappings = server_uris.map(|table| table.create_mapping(&self.server_uris));
        self
    }

    pub fn catalog(&self) -> &dyn TypeCatalog {
        self.catalog.as_ref()
    }

    pub(crate) fn map_namespace(&self, index: u16) -> u16 {
        match &self.namespace_mappings {
            Some(mappings) => mappings.get(index as usize).copied().unwrap_or(index),
            None => index,
        }
    }

    pub(crate) fn map_server(&self, index: u32) -> u32 {
        match &self.server_mappings {
            Some(mappings) => mappings.get(index as usize).copied().unwrap_or(index),
            None => index,
        }
    }
}
