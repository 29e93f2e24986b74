//! Structured built-in records: qualified names, localized text, diagnostics
//! and data values.

use crate::date_time::DateTime;
use crate::status_code::StatusCode;
use crate::variant::Variant;
use std::fmt;

/// An XML fragment carried as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct XmlElement(pub String);

impl XmlElement {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for XmlElement {
    fn from(value: &str) -> Self {
        XmlElement(value.to_string())
    }
}

impl From<String> for XmlElement {
    fn from(value: String) -> Self {
        XmlElement(value)
    }
}

/// A name qualified by a namespace index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub namespace_index: u16,
    pub name: String,
}

impl QualifiedName {
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && self.name.is_empty()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index != 0 {
            write!(f, "{}:", self.namespace_index)?;
        }
        f.write_str(&self.name)
    }
}

impl From<&str> for QualifiedName {
    fn from(value: &str) -> Self {
        QualifiedName::new(0, value)
    }
}

/// Human readable text with an optional locale. An empty locale means none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LocalizedText {
    pub locale: String,
    pub text: String,
}

impl LocalizedText {
    pub fn new(locale: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            text: text.into(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.locale.is_empty() && self.text.is_empty()
    }
}

impl From<&str> for LocalizedText {
    fn from(value: &str) -> Self {
        LocalizedText::new("", value)
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Vendor diagnostics attached to a result. The four indexes point into a
/// string table of the enclosing message; -1 means absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiagnosticInfo {
    pub symbolic_id: i32,
    pub namespace_uri: i32,
    pub locale: i32,
    pub localized_text: i32,
    pub additional_info: Option<String>,
    pub inner_status_code: StatusCode,
    pub inner_diagnostic_info: Option<Box<DiagnosticInfo>>,
}

impl Default for DiagnosticInfo {
    fn default() -> Self {
        Self {
            symbolic_id: -1,
            namespace_uri: -1,
            locale: -1,
            localized_text: -1,
            additional_info: None,
            inner_status_code: StatusCode::GOOD,
            inner_diagnostic_info: None,
        }
    }
}

impl DiagnosticInfo {
    /// Number of records in the chain, this one included.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self;
        while let Some(inner) = &current.inner_diagnostic_info {
            depth += 1;
            current = inner;
        }
        depth
    }

    pub fn is_null(&self) -> bool {
        *self == DiagnosticInfo::default()
    }
}

/// A value with quality and timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataValue {
    pub value: Variant,
    pub status: StatusCode,
    pub source_timestamp: DateTime,
    pub source_picoseconds: u16,
    pub server_timestamp: DateTime,
    pub server_picoseconds: u16,
}

impl DataValue {
    pub fn new(value: impl Into<Variant>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_source_timestamp(mut self, timestamp: DateTime, picoseconds: u16) -> Self {
        self.source_timestamp = timestamp;
        self.source_picoseconds = picoseconds;
        self
    }

    pub fn with_server_timestamp(mut self, timestamp: DateTime, picoseconds: u16) -> Self {
        self.server_timestamp = timestamp;
        self.server_picoseconds = picoseconds;
        self
    }

    /// True when everything except the value has its default.
    pub fn is_value_only(&self) -> bool {
        self.status == StatusCode::GOOD
            && self.source_timestamp.is_min()
            && self.source_picoseconds == 0
            && self.server_timestamp.is_min()
            && self.server_picoseconds == 0
    }
}

impl From<Variant> for DataValue {
    fn from(value: Variant) -> Self {
        DataValue::new(value)
    }
}
