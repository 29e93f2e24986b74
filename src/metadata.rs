//! Dataset metadata: the field list and the type descriptions that the
//! schema deriver and the dataset codec work from.

use crate::builtin::BuiltInType;
use crate::context::UriTable;
use crate::node_id::{ExpandedNodeId, NodeId};

/// One field of a dataset or of a structure.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMetaData {
    pub name: String,
    pub data_type: ExpandedNodeId,
    /// -1 for scalars, 1 or more for arrays.
    pub value_rank: i32,
    pub array_dimensions: Vec<u32>,
}

impl FieldMetaData {
    /// A scalar field of the given data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<ExpandedNodeId>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            value_rank: -1,
            array_dimensions: Vec::new(),
        }
    }

    /// A scalar field of a built-in type.
    pub fn built_in(name: impl Into<String>, built_in_type: BuiltInType) -> Self {
        Self::new(name, NodeId::from(u32::from(built_in_type.id())))
    }

    pub fn with_value_rank(mut self, value_rank: i32) -> Self {
        self.value_rank = value_rank;
        self
    }

    pub fn with_array_dimensions(mut self, array_dimensions: Vec<u32>) -> Self {
        self.array_dimensions = array_dimensions;
        self
    }

    /// True when values of this field are arrays or matrices.
    pub fn is_array(&self) -> bool {
        self.value_rank >= 1 || !self.array_dimensions.is_empty()
    }

    /// Number of array levels: the dimension count when dimensions are
    /// given, otherwise the value rank; 0 for scalars.
    pub fn array_rank(&self) -> usize {
        if !self.array_dimensions.is_empty() {
            return self.array_dimensions.len();
        }
        usize::try_from(self.value_rank).unwrap_or(0)
    }
}

/// A structured data type and its ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureDescription {
    pub data_type_id: ExpandedNodeId,
    pub name: String,
    pub fields: Vec<FieldMetaData>,
}

impl StructureDescription {
    pub fn new(
        data_type_id: impl Into<ExpandedNodeId>,
        name: impl Into<String>,
        fields: Vec<FieldMetaData>,
    ) -> Self {
        Self {
            data_type_id: data_type_id.into(),
            name: name.into(),
            fields,
        }
    }
}

/// A data type that narrows a base type without changing its encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleTypeDescription {
    pub data_type_id: ExpandedNodeId,
    pub name: String,
    pub base_data_type: Option<ExpandedNodeId>,
    /// The built-in type the values are encoded as. String when absent.
    pub built_in_type: Option<BuiltInType>,
}

impl SimpleTypeDescription {
    pub fn new(data_type_id: impl Into<ExpandedNodeId>, name: impl Into<String>) -> Self {
        Self {
            data_type_id: data_type_id.into(),
            name: name.into(),
            base_data_type: None,
            built_in_type: None,
        }
    }

    pub fn with_base_data_type(mut self, base: impl Into<ExpandedNodeId>) -> Self {
        self.base_data_type = Some(base.into());
        self
    }

    pub fn with_built_in_type(mut self, built_in_type: BuiltInType) -> Self {
        self.built_in_type = Some(built_in_type);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumField {
    pub name: String,
    pub value: i64,
}

/// An enumerated data type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescription {
    pub data_type_id: ExpandedNodeId,
    pub name: String,
    pub fields: Vec<EnumField>,
    pub is_option_set: bool,
}

impl EnumDescription {
    pub fn new<I, S>(data_type_id: impl Into<ExpandedNodeId>, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            data_type_id: data_type_id.into(),
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(name, value)| EnumField {
                    name: name.into(),
                    value,
                })
                .collect(),
            is_option_set: false,
        }
    }
}

/// The shape of a dataset: its fields in wire order plus every type
/// description they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSetMetaData {
    pub name: Option<String>,
    pub fields: Vec<FieldMetaData>,
    pub structures: Vec<StructureDescription>,
    pub simple_types: Vec<SimpleTypeDescription>,
    pub enums: Vec<EnumDescription>,
    /// The namespace table the data type ids are relative to.
    pub namespaces: UriTable,
}

impl DataSetMetaData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            namespaces: UriTable::namespaces(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: FieldMetaData) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_structure(mut self, structure: StructureDescription) -> Self {
        self.structures.push(structure);
        self
    }

    pub fn with_simple_type(mut self, simple_type: SimpleTypeDescription) -> Self {
        self.simple_types.push(simple_type);
        self
    }

    pub fn with_enum(mut self, description: EnumDescription) -> Self {
        self.enums.push(description);
        self
    }

    pub fn with_namespaces(mut self, namespaces: UriTable) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Field names in wire order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }
}
