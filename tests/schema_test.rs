use opcua_encoder::metadata::{
    DataSetMetaData, EnumDescription, FieldMetaData, SimpleTypeDescription, StructureDescription,
};
use bytes::BytesMut;
use opcua_encoder::schema::{
    escape, AvroDatum, BuiltInSchemas, Field, PrimitiveType, SchemaName, NAMESPACE_ZERO,
};
use opcua_encoder::{
    BinaryReader, BinaryWriter, BuiltInType, DataSetFieldContentMask, EncodingContext, ErrorKind,
    ExpandedNodeId, NodeId, Schema, SchemaDeriver, UriTable,
};
use serde_json::{json, Value};

const VENDOR: &str = "http://vendor.example.com/Machines/";

fn vendor_metadata(name: &str) -> DataSetMetaData {
    DataSetMetaData::new(name).with_namespaces(UriTable::from_uris([
        "http://opcfoundation.org/UA/",
        VENDOR,
    ]))
}

fn built_in_id(built_in_type: BuiltInType) -> ExpandedNodeId {
    ExpandedNodeId::from(u32::from(built_in_type.id()))
}

fn derive(metadata: &DataSetMetaData, mask: DataSetFieldContentMask) -> Schema {
    SchemaDeriver::new(metadata, mask).derive().unwrap()
}

// --- Built-in shapes ---

#[test]
fn test_int64_field_is_a_nullable_string() {
    let metadata = DataSetMetaData::new("Counter")
        .with_field(FieldMetaData::built_in("Total", BuiltInType::Int64));
    let avro = derive(&metadata, DataSetFieldContentMask::NONE).to_avro();
    assert_eq!(avro["type"], json!("record"));
    assert_eq!(avro["name"], json!("Counter"));
    assert_eq!(
        avro["fields"][0],
        json!({
            "name": "Total",
            "type": ["null", {
                "type": "string",
                "name": "Int64",
                "namespace": NAMESPACE_ZERO,
                "aliases": ["i_8"]
            }]
        })
    );
}

#[test]
fn test_named_types_render_once() {
    let metadata = DataSetMetaData::new("Pair")
        .with_field(FieldMetaData::built_in("A", BuiltInType::Int32))
        .with_field(FieldMetaData::built_in("B", BuiltInType::Int32));
    let avro = derive(&metadata, DataSetFieldContentMask::NONE).to_avro();
    assert_eq!(avro["fields"][0]["type"][1]["name"], json!("Int32"));
    assert_eq!(avro["fields"][1]["type"], json!(["null", "org.opcfoundation.ua.Int32"]));
}

#[test]
fn test_diagnostic_info_refers_to_itself() {
    let metadata = DataSetMetaData::new("Diagnostics")
        .with_field(FieldMetaData::built_in("Info", BuiltInType::DiagnosticInfo));
    let avro = derive(&metadata, DataSetFieldContentMask::NONE).to_avro();
    let record = &avro["fields"][0]["type"][1];
    assert_eq!(record["name"], json!("DiagnosticInfo"));
    let inner = record["fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|field| field["name"] == json!("InnerDiagnosticInfo"))
        .unwrap();
    assert_eq!(inner["type"], json!(["null", "org.opcfoundation.ua.DiagnosticInfo"]));
}

#[test]
fn test_status_code_shape_follows_the_mode() {
    let mut reversible = BuiltInSchemas::new(true);
    let status = reversible.get(BuiltInType::StatusCode);
    assert_eq!(status.primitive_type(), Some(PrimitiveType::Int));

    let mut plain = BuiltInSchemas::new(false);
    let status = plain.get(BuiltInType::StatusCode);
    assert!(status.field("Code").is_some());
    assert!(status.field("Symbol").is_some());
}

#[test]
fn test_variant_schema() {
    let mut reversible = BuiltInSchemas::new(true);
    let variant = reversible.get(BuiltInType::Variant);
    assert_eq!(variant.fields().len(), 3);
    assert!(variant.field("Dimensions").unwrap().schema.is_nullable());
    assert!(matches!(variant.field("Body").unwrap().schema, Schema::Union(_)));

    let mut plain = BuiltInSchemas::new(false);
    assert!(matches!(plain.get(BuiltInType::Variant), Schema::Union(_)));
}

#[test]
fn test_nullable_built_ins() {
    let mut schemas = BuiltInSchemas::new(true);
    assert!(!schemas.get_nullable(BuiltInType::Int32).is_nullable());
    assert!(schemas.get_nullable(BuiltInType::String).is_nullable());
    assert!(schemas.get_nullable(BuiltInType::NodeId).is_nullable());
    assert!(schemas.get(BuiltInType::Null).is_nullable());
}

#[test]
fn test_array_fields() {
    let metadata = DataSetMetaData::new("Series")
        .with_field(FieldMetaData::built_in("Samples", BuiltInType::Double).with_value_rank(1));
    let avro = derive(&metadata, DataSetFieldContentMask::NONE).to_avro();
    let field_type = &avro["fields"][0]["type"];
    assert_eq!(field_type[0], json!("null"));
    assert_eq!(field_type[1]["type"], json!("array"));
    assert_eq!(field_type[1]["items"]["name"], json!("Double"));
}

// --- Described types ---

#[test]
fn test_structure_in_vendor_namespace() {
    let point = ExpandedNodeId::from(NodeId::new(1, 3001u32));
    let metadata = vendor_metadata("Machine")
        .with_structure(StructureDescription::new(
            point.clone(),
            "Point",
            vec![
                FieldMetaData::built_in("X", BuiltInType::Double),
                FieldMetaData::built_in("Y", BuiltInType::Double),
            ],
        ))
        .with_field(FieldMetaData::new("Position", point.clone()))
        .with_field(FieldMetaData::new("Target", point));
    let schema = derive(&metadata, DataSetFieldContentMask::RAW_DATA);

    let position = &schema.field("Position").unwrap().schema;
    assert!(position.is_nullable());
    let avro = schema.to_avro();
    let record = &avro["fields"][0]["type"][1];
    assert_eq!(record["name"], json!("Point"));
    assert_eq!(record["namespace"], json!("com.example.vendor.Machines"));
    assert_eq!(record["aliases"], json!(["i_3001"]));
    assert_eq!(avro["fields"][1]["type"], json!(["null", "com.example.vendor.Machines.Point"]));

    // Reversible payloads keep the extension object around the structure.
    let avro = derive(&metadata, DataSetFieldContentMask::NONE).to_avro();
    let envelope = &avro["fields"][0]["type"][1];
    assert_eq!(envelope["name"], json!("PointExtensionObject"));
    assert_eq!(envelope["namespace"], json!("com.example.vendor.Machines"));
    assert_eq!(envelope["fields"][0]["name"], json!("TypeId"));
    assert_eq!(envelope["fields"][1]["name"], json!("Body"));
    assert_eq!(envelope["fields"][1]["type"][1]["name"], json!("Point"));
    assert_eq!(
        avro["fields"][1]["type"],
        json!(["null", "com.example.vendor.Machines.PointExtensionObject"])
    );
}

#[test]
fn test_index_and_uri_ids_name_the_same_type() {
    let metadata = vendor_metadata("Machine")
        .with_structure(StructureDescription::new(
            ExpandedNodeId::with_namespace_uri(VENDOR, "Valve"),
            "Valve",
            vec![FieldMetaData::built_in("Open", BuiltInType::Boolean)],
        ))
        .with_field(FieldMetaData::new("Inlet", NodeId::new(1, "Valve")));
    let schema = derive(&metadata, DataSetFieldContentMask::RAW_DATA);
    let avro = schema.to_avro();
    assert_eq!(avro["fields"][0]["type"][1]["aliases"], json!(["s_Valve"]));
}

#[test]
fn test_self_referencing_structure_is_an_error() {
    let node = ExpandedNodeId::from(NodeId::new(1, 3100u32));
    let metadata = vendor_metadata("Tree")
        .with_structure(StructureDescription::new(
            node.clone(),
            "Node",
            vec![FieldMetaData::new("Child", node.clone())],
        ))
        .with_field(FieldMetaData::new("Root", node));
    let err = SchemaDeriver::new(&metadata, DataSetFieldContentMask::NONE)
        .derive()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(err.to_string().contains("refers to itself"));
}

#[test]
fn test_unknown_type_is_an_error() {
    let metadata = vendor_metadata("Broken")
        .with_field(FieldMetaData::new("Mystery", NodeId::new(1, 4242u32)));
    let err = SchemaDeriver::new(&metadata, DataSetFieldContentMask::NONE)
        .derive()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(err.to_string().contains("No schema found"));
}

#[test]
fn test_enumeration_description() {
    let state = ExpandedNodeId::from(NodeId::new(1, 3200u32));
    let metadata = vendor_metadata("Machine")
        .with_enum(EnumDescription::new(
            state.clone(),
            "State",
            [("Idle", 0), ("Running", 1), ("Out of order", 2)],
        ))
        .with_field(FieldMetaData::new("State", state));
    let avro = derive(&metadata, DataSetFieldContentMask::NONE).to_avro();
    let enumeration = &avro["fields"][0]["type"][1];
    assert_eq!(enumeration["type"], json!("enum"));
    assert_eq!(enumeration["symbols"], json!(["Idle", "Running", "Out__32of__32order"]));
    assert_eq!(enumeration["default"], json!("Idle"));

    let empty = vendor_metadata("Machine").with_enum(EnumDescription::new(
        NodeId::new(1, 3201u32),
        "Empty",
        Vec::<(&str, i64)>::new(),
    ));
    assert!(SchemaDeriver::new(&empty, DataSetFieldContentMask::NONE).derive().is_err());
}

#[test]
fn test_simple_types() {
    let percent = ExpandedNodeId::from(NodeId::new(1, 3300u32));
    let metadata = vendor_metadata("Machine")
        .with_simple_type(
            SimpleTypeDescription::new(percent.clone(), "Percent")
                .with_base_data_type(built_in_id(BuiltInType::Double)),
        )
        .with_simple_type(
            SimpleTypeDescription::new(built_in_id(BuiltInType::Double), "Double")
                .with_built_in_type(BuiltInType::Double),
        )
        .with_field(FieldMetaData::new("Load", percent.clone()));
    let mut deriver = SchemaDeriver::new(&metadata, DataSetFieldContentMask::NONE);

    let load = deriver.type_schema(&percent).unwrap();
    assert_eq!(load.name().unwrap().name, "Percent");
    assert_eq!(load.primitive_type(), Some(PrimitiveType::Double));

    let double = deriver.type_schema(&built_in_id(BuiltInType::Double)).unwrap();
    assert_eq!(double, BuiltInSchemas::new(true).get(BuiltInType::Double));
}

// --- Payload shapes ---

#[test]
fn test_single_field_degrades_to_the_value() {
    let mask = DataSetFieldContentMask::SINGLE_FIELD_DEGRADE_TO_VALUE;
    let single = DataSetMetaData::new("Speed")
        .with_field(FieldMetaData::built_in("Speed", BuiltInType::Double));
    let schema = derive(&single, mask);
    let Schema::Nullable(inner) = &schema else {
        panic!("a degraded field may carry no value");
    };
    assert_eq!(inner.name().unwrap().name, "Double");

    // Two fields keep the record, as the codec keeps the object.
    let pair = single.with_field(FieldMetaData::built_in("Label", BuiltInType::String));
    let schema = derive(&pair, mask);
    assert_eq!(schema.fields().len(), 2);
}

#[test]
fn test_data_value_fields_are_wrapped() {
    let metadata = DataSetMetaData::new("Motor")
        .with_field(FieldMetaData::built_in("Speed", BuiltInType::Double));
    let mask = DataSetFieldContentMask::STATUS_CODE | DataSetFieldContentMask::SOURCE_TIMESTAMP;
    let schema = derive(&metadata, mask);
    let speed = &schema.field("Speed").unwrap().schema;
    assert!(speed.is_nullable());
    let avro = schema.to_avro();
    let wrapper = &avro["fields"][0]["type"][1];
    assert_eq!(wrapper["name"], json!("SpeedDataValue"));
    let names: Vec<_> = wrapper["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|field| field["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        names,
        [
            "Value",
            "StatusCode",
            "SourceTimestamp",
            "SourcePicoseconds",
            "ServerTimestamp",
            "ServerPicoseconds"
        ]
    );
}

#[test]
fn test_raw_data_uses_non_reversible_shapes() {
    let metadata = DataSetMetaData::new("Raw")
        .with_field(FieldMetaData::built_in("Status", BuiltInType::StatusCode));
    let schema = derive(&metadata, DataSetFieldContentMask::RAW_DATA);
    let Schema::Nullable(status) = &schema.field("Status").unwrap().schema else {
        panic!("StatusCode fields are nullable in JSON");
    };
    assert!(status.field("Code").is_some());
}

#[test]
fn test_unnamed_payload() {
    let metadata = DataSetMetaData {
        name: None,
        ..DataSetMetaData::new("ignored")
    }
    .with_field(FieldMetaData::built_in("Flag", BuiltInType::Boolean));
    let schema = derive(&metadata, DataSetFieldContentMask::NONE);
    assert_eq!(schema.name().unwrap().full_name(), "Payload");
}

// --- Names ---

#[test]
fn test_escape() {
    assert_eq!(escape("Plain_Name1"), "Plain_Name1");
    assert_eq!(escape("a/b"), "a_b");
    assert_eq!(escape("a b"), "a__32b");
    assert_eq!(escape("Größe"), "Gr__246__223e");
    assert_eq!(escape("x.y"), "x__46y");
}

// --- Avro datum ---

fn sample_record() -> Schema {
    Schema::Record {
        name: SchemaName::new("Sample", Some("test")),
        aliases: Vec::new(),
        fields: vec![
            Field::new("Id", Schema::primitive(PrimitiveType::Int)),
            Field::new("Label", Schema::primitive(PrimitiveType::String).nullable()),
            Field::new(
                "Value",
                Schema::union([
                    Schema::null(),
                    Schema::primitive(PrimitiveType::Boolean),
                    Schema::primitive(PrimitiveType::String),
                ]),
            ),
            Field::new(
                "Samples",
                Schema::array(Schema::primitive(PrimitiveType::Double)),
            ),
            Field::new(
                "Mode",
                Schema::Enum {
                    name: SchemaName::new("Mode", Some("test")),
                    aliases: Vec::new(),
                    symbols: vec!["Off".to_string(), "On".to_string()],
                    default: None,
                },
            ),
        ],
    }
}

fn write_datum(schema: &Schema, value: &Value) -> opcua_encoder::Result<bytes::Bytes> {
    let context = EncodingContext::default();
    let mut buffer = BytesMut::new();
    let mut writer = BinaryWriter::new(&mut buffer, &context);
    AvroDatum::new(schema).write(&mut writer, value)?;
    Ok(buffer.freeze())
}

fn read_datum(schema: &Schema, bytes: bytes::Bytes) -> opcua_encoder::Result<Value> {
    let context = EncodingContext::default();
    let mut reader = BinaryReader::new(bytes, &context);
    let value = AvroDatum::new(schema).read(&mut reader)?;
    assert_eq!(reader.remaining(), 0);
    Ok(value)
}

#[test]
fn test_datum_writes_fields_in_schema_order() {
    let schema = sample_record();
    let value = json!({ "Mode": "On", "Samples": [0.5], "Value": true, "Id": -1 });
    let bytes = write_datum(&schema, &value).unwrap();
    assert_eq!(
        &bytes[..],
        &[
            0x01, // Id -1
            0x00, // Label: null branch
            0x02, 0x01, // Value: boolean branch, true
            0x02, 0, 0, 0, 0, 0, 0, 0xe0, 0x3f, // one double
            0x02, // Mode: ordinal 1
        ][..]
    );
    // Null members are left out and enums read back as their symbol.
    assert_eq!(read_datum(&schema, bytes).unwrap(), value);
}

#[test]
fn test_datum_rejects_tokens_outside_the_schema() {
    let schema = sample_record();
    let err = write_datum(&schema, &json!({ "Id": 1, "Samples": [], "Mode": "Off", "Extra": 1 }))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encoding);
    assert!(err.to_string().contains("Extra"));

    let err = write_datum(&schema, &json!({ "Id": 1, "Samples": [], "Mode": "Sideways" })).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encoding);

    let err = write_datum(&schema, &json!({ "Id": 1, "Samples": [], "Mode": "Off", "Value": 3 }))
        .unwrap_err();
    assert!(err.to_string().contains("No union member accepts"));

    let datum = AvroDatum::new(&schema);
    assert!(datum.accepts(&schema, &json!({ "Id": 1, "Samples": [], "Mode": 0 })));
    assert!(!datum.accepts(&schema, &json!({ "Samples": [], "Mode": 0 })));
}

#[test]
fn test_datum_rejects_unknown_branches_and_ordinals() {
    let nullable = Schema::primitive(PrimitiveType::String).nullable();
    let err = read_datum(&nullable, bytes::Bytes::from_static(&[0x04])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);

    let schema = sample_record();
    let mode = &schema.field("Mode").unwrap().schema;
    let err = read_datum(mode, bytes::Bytes::from_static(&[0x04])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);
    assert!(err.to_string().contains("out of range"));
}

#[test]
fn test_datum_follows_references() {
    let metadata = DataSetMetaData::new("Diagnostics")
        .with_field(FieldMetaData::built_in("Info", BuiltInType::DiagnosticInfo));
    let schema = derive(&metadata, DataSetFieldContentMask::RAW_DATA);
    let value = json!({
        "Info": {
            "SymbolicId": 3,
            "InnerDiagnosticInfo": { "AdditionalInfo": "inner" }
        }
    });
    assert!(AvroDatum::new(&schema).accepts(&schema, &value));
    let bytes = write_datum(&schema, &value).unwrap();
    assert_eq!(read_datum(&schema, bytes).unwrap(), value);
}

// --- JSON Schema ---

#[test]
fn test_json_schema_of_a_dataset() {
    let metadata = DataSetMetaData::new("Motor")
        .with_field(FieldMetaData::built_in("Speed", BuiltInType::Double))
        .with_field(FieldMetaData::built_in("Motor Name", BuiltInType::String))
        .with_field(FieldMetaData::built_in("Total", BuiltInType::Int64));
    let document = derive(&metadata, DataSetFieldContentMask::RAW_DATA).to_json_schema();

    assert_eq!(document["$schema"], json!("https://json-schema.org/draft/2020-12/schema"));
    assert_eq!(document["$ref"], json!("#/$defs/Motor"));
    let record = &document["$defs"]["Motor"];
    assert_eq!(record["type"], json!("object"));
    assert_eq!(record["additionalProperties"], json!(false));
    // Every field may carry no value.
    assert!(record.get("required").is_none());

    let properties = &record["properties"];
    assert_eq!(
        properties["Speed"],
        json!({ "anyOf": [{ "type": "null" }, { "$ref": "#/$defs/org.opcfoundation.ua.Double" }] })
    );
    // JSON member names, not the escaped record names.
    assert!(properties.get("Motor Name").is_some());
    assert!(properties.get("Motor__32Name").is_none());

    let int64 = &document["$defs"]["org.opcfoundation.ua.Int64"];
    assert_eq!(int64["type"], json!("string"));
    assert_eq!(int64["format"], json!("int64"));
    assert_eq!(int64["title"], json!("Int64"));
}

#[test]
fn test_json_schema_follows_the_mode() {
    let metadata = DataSetMetaData::new("Sample")
        .with_field(FieldMetaData::built_in("Value", BuiltInType::Variant))
        .with_field(FieldMetaData::built_in("Status", BuiltInType::StatusCode));

    let reversible = derive(&metadata, DataSetFieldContentMask::NONE).to_json_schema();
    let variant = &reversible["$defs"]["org.opcfoundation.ua.Variant"];
    assert_eq!(variant["type"], json!("object"));
    assert!(variant["properties"].get("Type").is_some());
    assert!(variant["properties"].get("Body").is_some());
    assert_eq!(variant["required"], json!(["Type"]));
    let status = &reversible["$defs"]["org.opcfoundation.ua.StatusCode"];
    assert_eq!(status["type"], json!("integer"));
    assert_eq!(status["maximum"], json!(u32::MAX));

    let plain = derive(&metadata, DataSetFieldContentMask::RAW_DATA).to_json_schema();
    assert!(plain["$defs"].get("org.opcfoundation.ua.Variant").is_none());
    let status = &plain["$defs"]["org.opcfoundation.ua.StatusCode"];
    assert_eq!(status["type"], json!("object"));
    assert!(status["properties"].get("Code").is_some());
    assert!(status["properties"].get("Symbol").is_some());
}

#[test]
fn test_json_schema_closes_self_references() {
    let metadata = DataSetMetaData::new("Diagnostics")
        .with_field(FieldMetaData::built_in("Info", BuiltInType::DiagnosticInfo));
    let document = derive(&metadata, DataSetFieldContentMask::NONE).to_json_schema();
    let info = &document["$defs"]["org.opcfoundation.ua.DiagnosticInfo"];
    assert_eq!(info["type"], json!("object"));
    assert_eq!(
        info["properties"]["InnerDiagnosticInfo"],
        json!({
            "anyOf": [
                { "type": "null" },
                { "$ref": "#/$defs/org.opcfoundation.ua.DiagnosticInfo" }
            ]
        })
    );
}

#[test]
fn test_json_schema_of_enumerations_and_arrays() {
    let mut schemas = BuiltInSchemas::new(false);
    let document = Schema::array(schemas.get(BuiltInType::Byte)).to_json_schema();
    assert_eq!(document["type"], json!("array"));
    assert_eq!(document["items"], json!({ "$ref": "#/$defs/org.opcfoundation.ua.Byte" }));
    let byte = &document["$defs"]["org.opcfoundation.ua.Byte"];
    assert_eq!(byte["minimum"], json!(0));
    assert_eq!(byte["maximum"], json!(255));

    let mode = Schema::Enum {
        name: SchemaName::new("Mode", Some("test")),
        aliases: Vec::new(),
        symbols: vec!["Off".to_string(), "On".to_string()],
        default: None,
    };
    let document = mode.to_json_schema();
    assert_eq!(document["$ref"], json!("#/$defs/test.Mode"));
    assert_eq!(document["$defs"]["test.Mode"]["enum"], json!(["Off", "On"]));

    // Unnamed roots are rendered in place.
    let document = Schema::primitive(PrimitiveType::Bytes).to_json_schema();
    assert_eq!(document["type"], json!("string"));
    assert_eq!(document["contentEncoding"], json!("base64"));
    assert!(document.get("$defs").is_none());
}
