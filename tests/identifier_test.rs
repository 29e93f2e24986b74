use bytes::Bytes;
use opcua_encoder::{
    decode, decode_json, encode, encode_json, EncodingContext, ErrorKind, ExpandedNodeId,
    Identifier, JsonEncodingMode, NodeId, QualifiedName, UriTable, Variant,
};
use serde_json::json;
use uuid::Uuid;

fn context_with_namespaces() -> EncodingContext {
    EncodingContext::default().with_namespaces(UriTable::from_uris([
        "http://opcfoundation.org/UA/",
        "urn:plant:a",
        "urn:plant:b",
    ]))
}

// --- Text form ---

#[test]
fn test_node_id_text_form() {
    let cases = [
        ("i=85", NodeId::new(0, 85u32)),
        ("ns=2;s=Motor", NodeId::new(2, "Motor")),
        (
            "ns=1;g=72962b91-fa75-4ae6-8d28-b404dc7daf63",
            NodeId::new(1, Uuid::parse_str("72962b91-fa75-4ae6-8d28-b404dc7daf63").unwrap()),
        ),
        ("ns=3;b=AQID", NodeId::new(3, Bytes::from_static(&[1, 2, 3]))),
    ];
    for (text, node_id) in cases {
        assert_eq!(text.parse::<NodeId>().unwrap(), node_id);
        assert_eq!(node_id.to_string(), text);
    }
}

#[test]
fn test_invalid_node_id_text() {
    assert!("x=1".parse::<NodeId>().is_err());
    assert!("ns=two;i=1".parse::<NodeId>().is_err());
    assert!("i=abc".parse::<NodeId>().is_err());
    assert!("ns=1".parse::<NodeId>().is_err());
}

#[test]
fn test_expanded_node_id_text_form() {
    let text = "svr=1;nsu=urn:plant:b;i=5";
    let parsed: ExpandedNodeId = text.parse().unwrap();
    assert_eq!(parsed.server_index, 1);
    assert_eq!(parsed.namespace_uri.as_deref(), Some("urn:plant:b"));
    assert_eq!(parsed.node_id.identifier, Identifier::Numeric(5));
    assert_eq!(parsed.to_string(), text);

    let local: ExpandedNodeId = "ns=2;s=Pump".parse().unwrap();
    assert_eq!(local, ExpandedNodeId::from(NodeId::new(2, "Pump")));
}

#[test]
fn test_parse_with_resolves_namespace_uri() {
    let context = context_with_namespaces();
    let node_id = NodeId::parse_with("nsu=urn:plant:b;s=Motor", &context.namespaces).unwrap();
    assert_eq!(node_id, NodeId::new(2, "Motor"));

    let err = NodeId::parse_with("nsu=urn:unknown;s=Motor", &context.namespaces).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);
    assert!(NodeId::parse_with("svr=1;i=5", &context.namespaces).is_err());
}

#[test]
fn test_absolute_form_unifies_index_and_uri() {
    let context = context_with_namespaces();
    let by_index = ExpandedNodeId::from(NodeId::new(2, 7u32));
    let by_uri = ExpandedNodeId::with_namespace_uri("urn:plant:b", 7u32);
    assert_eq!(
        by_index.to_absolute(&context.namespaces),
        by_uri.to_absolute(&context.namespaces)
    );

    let core = ExpandedNodeId::with_namespace_uri("http://opcfoundation.org/UA/", 11u32);
    assert_eq!(core.to_absolute(&context.namespaces), ExpandedNodeId::from(11u32));
}

// --- Binary ---

#[test]
fn test_identifiers_round_trip_in_binary() {
    let context = context_with_namespaces();
    let values = vec![
        Variant::NodeId(NodeId::new(0, 85u32)),
        Variant::NodeId(NodeId::new(2, "Motor")),
        Variant::NodeId(NodeId::new(1, Bytes::from_static(b"opaque"))),
        Variant::ExpandedNodeId(ExpandedNodeId::with_namespace_uri("urn:plant:b", "Pump")),
        Variant::ExpandedNodeId(ExpandedNodeId {
            node_id: NodeId::new(1, 3u32),
            namespace_uri: None,
            server_index: 4,
        }),
    ];
    for value in values {
        let mut bytes = encode(&value, &context).unwrap();
        let decoded: Variant = decode(&mut bytes, &context).unwrap();
        assert_eq!(decoded, value);
    }
}

#[test]
fn test_null_expanded_node_id() {
    let context = EncodingContext::default();
    let mut bytes = encode(&ExpandedNodeId::null(), &context).unwrap();
    let decoded: ExpandedNodeId = decode(&mut bytes, &context).unwrap();
    assert!(decoded.is_null());
    assert_eq!(
        encode_json(&ExpandedNodeId::null(), &context, JsonEncodingMode::reversible()).unwrap(),
        json!(null)
    );
}

#[test]
fn test_unknown_identifier_union_index() {
    let context = EncodingContext::default();
    // Namespace 0, identifier index 4.
    let mut bytes = Bytes::from_static(&[0x00, 0x08, 0x00]);
    let err = decode::<NodeId>(&mut bytes, &context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);
}

#[test]
fn test_namespace_mapping_on_encode() {
    let peer = UriTable::from_uris(["http://opcfoundation.org/UA/", "urn:plant:b", "urn:plant:a"]);
    let mapped = context_with_namespaces().with_mapping_tables(Some(&peer), None);
    let plain = context_with_namespaces();

    // Index 1 of the peer names urn:plant:b, which is index 2 locally.
    let mut bytes = encode(&NodeId::new(1, 9u32), &mapped).unwrap();
    let decoded: NodeId = decode(&mut bytes, &plain).unwrap();
    assert_eq!(decoded, NodeId::new(2, 9u32));

    let mut bytes = encode(&NodeId::new(1, 9u32), &plain).unwrap();
    let decoded: NodeId = decode(&mut bytes, &mapped).unwrap();
    assert_eq!(decoded, NodeId::new(2, 9u32));
}

#[test]
fn test_server_mapping() {
    let servers = UriTable::from_uris(["urn:server:self", "urn:server:other"]);
    let peer = UriTable::from_uris(["urn:server:other", "urn:server:self"]);
    let mapped = EncodingContext::default()
        .with_server_uris(servers.clone())
        .with_mapping_tables(None, Some(&peer));
    let plain = EncodingContext::default().with_server_uris(servers);

    let value = ExpandedNodeId {
        node_id: NodeId::new(0, 5u32),
        namespace_uri: None,
        server_index: 0,
    };
    let mut bytes = encode(&value, &mapped).unwrap();
    let decoded: ExpandedNodeId = decode(&mut bytes, &plain).unwrap();
    assert_eq!(decoded.server_index, 1);
}

// --- JSON ---

#[test]
fn test_namespace_mapping_in_json() {
    let peer = UriTable::from_uris(["http://opcfoundation.org/UA/", "urn:plant:b", "urn:plant:a"]);
    let mapped = context_with_namespaces().with_mapping_tables(Some(&peer), None);
    let plain = context_with_namespaces();
    let mode = JsonEncodingMode::reversible();

    let json = encode_json(&NodeId::new(1, 9u32), &mapped, mode).unwrap();
    assert_eq!(json, json!({ "Id": 9, "Namespace": 2 }));
    assert_eq!(decode_json::<NodeId>(&json, &plain).unwrap(), NodeId::new(2, 9u32));

    for token in [json!({ "Id": 9, "Namespace": 1 }), json!("ns=1;i=9")] {
        assert_eq!(decode_json::<NodeId>(&token, &mapped).unwrap(), NodeId::new(2, 9u32));
        let expanded: ExpandedNodeId = decode_json(&token, &mapped).unwrap();
        assert_eq!(expanded.node_id, NodeId::new(2, 9u32));
    }

    // URIs resolve against the local table without a mapping.
    let token = json!("nsu=urn:plant:a;i=9");
    assert_eq!(decode_json::<NodeId>(&token, &mapped).unwrap(), NodeId::new(1, 9u32));

    let name = QualifiedName::new(1, "Speed");
    let json = encode_json(&name, &mapped, mode).unwrap();
    assert_eq!(json, json!({ "Name": "Speed", "Uri": 2 }));
    let decoded: QualifiedName = decode_json(&json!({ "Name": "Speed", "Uri": 1 }), &mapped).unwrap();
    assert_eq!(decoded, QualifiedName::new(2, "Speed"));
}

#[test]
fn test_server_mapping_in_json() {
    let servers = UriTable::from_uris(["urn:server:self", "urn:server:other"]);
    let peer = UriTable::from_uris(["urn:server:other", "urn:server:self"]);
    let mapped = EncodingContext::default()
        .with_server_uris(servers.clone())
        .with_mapping_tables(None, Some(&peer));
    let plain = EncodingContext::default().with_server_uris(servers);

    let value = ExpandedNodeId {
        node_id: NodeId::new(0, 5u32),
        namespace_uri: None,
        server_index: 0,
    };
    let json = encode_json(&value, &mapped, JsonEncodingMode::reversible()).unwrap();
    assert_eq!(json, json!({ "Id": 5, "ServerUri": "urn:server:other" }));
    let decoded: ExpandedNodeId = decode_json(&json, &plain).unwrap();
    assert_eq!(decoded.server_index, 1);

    let decoded: ExpandedNodeId = decode_json(&json!({ "Id": 5, "ServerUri": 0 }), &mapped).unwrap();
    assert_eq!(decoded.server_index, 1);
}

#[test]
fn test_node_id_json_record() {
    let context = context_with_namespaces();
    let node_id = NodeId::new(2, "Motor");

    let reversible = encode_json(&node_id, &context, JsonEncodingMode::reversible()).unwrap();
    assert_eq!(reversible, json!({ "IdType": 1, "Id": "Motor", "Namespace": 2 }));

    let plain = encode_json(&node_id, &context, JsonEncodingMode::non_reversible()).unwrap();
    assert_eq!(plain, json!({ "IdType": 1, "Id": "Motor", "Namespace": "urn:plant:b" }));

    for token in [reversible, plain] {
        assert_eq!(decode_json::<NodeId>(&token, &context).unwrap(), node_id);
    }

    let numeric = encode_json(&NodeId::new(1, 42u32), &context, JsonEncodingMode::non_reversible())
        .unwrap();
    assert_eq!(numeric, json!({ "Id": 42, "Namespace": 1 }));
}

#[test]
fn test_node_id_json_string_form() {
    let context = context_with_namespaces();
    let node_id = NodeId::new(2, "Motor");

    let compact = JsonEncodingMode::reversible().with_compact(true);
    let text = encode_json(&node_id, &context, compact).unwrap();
    assert_eq!(text, json!("ns=2;s=Motor"));

    let compact = JsonEncodingMode::non_reversible().with_compact(true);
    let text = encode_json(&node_id, &context, compact).unwrap();
    assert_eq!(text, json!("nsu=urn:plant:b;s=Motor"));

    for token in [json!("ns=2;s=Motor"), json!("nsu=urn:plant:b;s=Motor")] {
        assert_eq!(decode_json::<NodeId>(&token, &context).unwrap(), node_id);
    }
}

#[test]
fn test_unknown_namespace_uri_in_json() {
    let context = context_with_namespaces();
    let token = json!({ "Id": 1, "Namespace": "urn:nowhere" });
    let err = decode_json::<NodeId>(&token, &context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);
    assert!(err.to_string().contains("urn:nowhere"));

    // An expanded node id keeps the URI it cannot resolve.
    let expanded: ExpandedNodeId = decode_json(&token, &context).unwrap();
    assert_eq!(expanded.namespace_uri.as_deref(), Some("urn:nowhere"));
}

#[test]
fn test_expanded_node_id_json() {
    let context = context_with_namespaces()
        .with_server_uris(UriTable::from_uris(["urn:server:self", "urn:server:other"]));
    let value = ExpandedNodeId {
        node_id: NodeId::new(0, "Valve"),
        namespace_uri: Some("urn:plant:a".to_string()),
        server_index: 1,
    };
    let json = encode_json(&value, &context, JsonEncodingMode::non_reversible()).unwrap();
    assert_eq!(
        json,
        json!({ "IdType": 1, "Id": "Valve", "Namespace": "urn:plant:a", "ServerUri": "urn:server:other" })
    );
    assert_eq!(decode_json::<ExpandedNodeId>(&json, &context).unwrap(), value);
}

#[test]
fn test_identifier_json_types() {
    let context = EncodingContext::default();
    let guid = Uuid::parse_str("72962b91-fa75-4ae6-8d28-b404dc7daf63").unwrap();
    let token = json!({ "IdType": 2, "Id": "72962b91-fa75-4ae6-8d28-b404dc7daf63" });
    assert_eq!(decode_json::<NodeId>(&token, &context).unwrap(), NodeId::new(0, guid));

    let token = json!({ "IdType": 3, "Id": "AQID" });
    assert_eq!(
        decode_json::<NodeId>(&token, &context).unwrap(),
        NodeId::new(0, Bytes::from_static(&[1, 2, 3]))
    );

    let token = json!({ "IdType": 9, "Id": "x" });
    assert!(decode_json::<NodeId>(&token, &context).is_err());
}
