use bytes::{Bytes, BytesMut};
use opcua_encoder::discriminator;
use opcua_encoder::{
    decode, decode_json, encode, encode_json, Array, BinaryWriter, BuiltInType, EncoderError,
    EncodingContext, EncodingLimits, Encoder, ErrorKind, JsonEncodingMode, LocalizedText, Matrix,
    StatusCode, ValueRank, Variant,
};
use serde_json::json;

fn binary_round_trip(value: &Variant) -> Variant {
    let context = EncodingContext::default();
    let mut bytes = encode(value, &context).unwrap();
    decode(&mut bytes, &context).unwrap()
}

// --- Arrays ---

#[test]
fn test_arrays_round_trip_in_binary() {
    let values = vec![
        Variant::from(vec![1i32, -2, 3]),
        Variant::from(vec![true, false]),
        Variant::from(vec![1u8, 2, 3]),
        Variant::from(vec!["a".to_string(), String::new(), "c".to_string()]),
        Variant::from(vec![u64::MAX, 0]),
        Variant::Array(Array::Variant(vec![
            Variant::Int32(1),
            Variant::String("two".to_string()),
            Variant::Null,
        ])),
        Variant::Array(Array::LocalizedText(vec![
            LocalizedText::new("en", "one"),
            LocalizedText::default(),
        ])),
    ];
    for value in values {
        assert_eq!(binary_round_trip(&value), value);
    }
}

#[test]
fn test_byte_array_stays_an_array() {
    let value = Variant::from(vec![7u8, 8, 9]);
    let decoded = binary_round_trip(&value);
    assert_eq!(decoded.built_in_type(), BuiltInType::Byte);
    assert!(decoded.is_array());
}

#[test]
fn test_array_length_limit_trips_before_elements() {
    let context = EncodingContext::default()
        .with_limits(EncodingLimits::default().with_max_array_length(2));
    let value = Variant::from(vec![1i32, 2, 3]);
    assert_eq!(encode(&value, &context).unwrap_err().kind(), ErrorKind::LimitExceeded);

    let unlimited = EncodingContext::default();
    let mut bytes = encode(&value, &unlimited).unwrap();
    let err = decode::<Variant>(&mut bytes, &context).unwrap_err();
    assert!(matches!(err, EncoderError::LimitExceeded(_)));
}

// --- Matrices ---

fn matrix_2x3() -> Matrix {
    Matrix::new(vec![2, 3], Array::Int32(vec![1, 2, 3, 4, 5, 6])).unwrap()
}

#[test]
fn test_matrix_round_trips_in_binary() {
    let value = Variant::Matrix(matrix_2x3());
    assert_eq!(binary_round_trip(&value), value);
    assert_eq!(value.value_rank(), 2);
}

#[test]
fn test_matrix_dimension_mismatch_is_an_encoding_error() {
    let err = Matrix::new(vec![2, 3], Array::Int32(vec![1, 2, 3, 4, 5])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encoding);

    let value = Variant::Matrix(Matrix {
        dimensions: vec![2, 3],
        elements: Array::Int32(vec![1, 2, 3, 4, 5]),
    });
    let context = EncodingContext::default();
    let mut buffer = BytesMut::new();
    let mut writer = BinaryWriter::new(&mut buffer, &context);
    let err = value.encode(&mut writer).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encoding);
    assert!(buffer.is_empty(), "nothing is written for an invalid matrix");

    let err = encode_json(&value, &context, JsonEncodingMode::reversible()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encoding);
}

#[test]
fn test_matrix_dimension_mismatch_is_a_decoding_error() {
    let context = EncodingContext::default();
    let mut buffer = BytesMut::new();
    let mut writer = BinaryWriter::new(&mut buffer, &context);
    writer.write_array_length(2).unwrap();
    writer.write_int(2);
    writer.write_int(3);
    let index = discriminator::index_of(ValueRank::OneDimension, BuiltInType::Int32).unwrap();
    writer.write_union_index(index);
    writer.write_array_length(5).unwrap();
    for value in 1..=5 {
        writer.write_int(value);
    }
    let mut bytes: Bytes = buffer.freeze();
    let err = decode::<Variant>(&mut bytes, &context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);
    assert!(err.to_string().contains("ArrayDimensions does not match"));
}

#[test]
fn test_stray_dimensions_are_a_decoding_error() {
    let context = EncodingContext::default();

    // A single dimension in front of an array.
    let mut buffer = BytesMut::new();
    let mut writer = BinaryWriter::new(&mut buffer, &context);
    writer.write_array_length(1).unwrap();
    writer.write_int(3);
    let index = discriminator::index_of(ValueRank::OneDimension, BuiltInType::Int32).unwrap();
    writer.write_union_index(index);
    writer.write_array_length(3).unwrap();
    for value in 1..=3 {
        writer.write_int(value);
    }
    let mut bytes: Bytes = buffer.freeze();
    let err = decode::<Variant>(&mut bytes, &context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);
    assert!(err.to_string().contains("array dimensions"));

    // Dimensions in front of a scalar.
    let mut buffer = BytesMut::new();
    let mut writer = BinaryWriter::new(&mut buffer, &context);
    writer.write_array_length(2).unwrap();
    writer.write_int(1);
    writer.write_int(1);
    let index = discriminator::index_of(ValueRank::Scalar, BuiltInType::Int32).unwrap();
    writer.write_union_index(index);
    writer.write_int(7);
    let mut bytes: Bytes = buffer.freeze();
    let err = decode::<Variant>(&mut bytes, &context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);
}

#[test]
fn test_matrix_json_is_nested_arrays() {
    let context = EncodingContext::default();
    let value = Variant::Matrix(matrix_2x3());

    let reversible = encode_json(&value, &context, JsonEncodingMode::reversible()).unwrap();
    assert_eq!(reversible, json!({ "Type": 6, "Body": [[1, 2, 3], [4, 5, 6]] }));
    assert_eq!(decode_json::<Variant>(&reversible, &context).unwrap(), value);

    let plain = encode_json(&value, &context, JsonEncodingMode::non_reversible()).unwrap();
    assert_eq!(plain, json!([[1, 2, 3], [4, 5, 6]]));
    let inferred: Variant = decode_json(&plain, &context).unwrap();
    assert_eq!(
        inferred,
        Variant::Matrix(Matrix::new(vec![2, 3], Array::Int64(vec![1, 2, 3, 4, 5, 6])).unwrap())
    );
}

#[test]
fn test_jagged_json_matrix_is_rejected() {
    let context = EncodingContext::default();
    let smaller = json!({ "Type": 6, "Body": [[1, 2, 3], [4, 5]] });
    let err = decode_json::<Variant>(&smaller, &context).unwrap_err();
    assert!(err.to_string().contains("smaller than array dimensions"));

    let larger = json!({ "Type": 6, "Body": [[1, 2], [3, 4, 5]] });
    let err = decode_json::<Variant>(&larger, &context).unwrap_err();
    assert!(err.to_string().contains("larger than array dimensions"));
}

// --- StatusCode ---

#[test]
fn test_good_status_code_is_the_null_marker() {
    let context = EncodingContext::default();
    let bytes = encode(&Variant::StatusCode(StatusCode::GOOD), &context).unwrap();
    assert_eq!(&bytes[..], &[0x00, 0x00]);

    let bad = Variant::StatusCode(StatusCode::BAD);
    assert_eq!(binary_round_trip(&bad), bad);

    // Inside an array every slot carries its code.
    let array = Variant::Array(Array::StatusCode(vec![StatusCode::GOOD, StatusCode::BAD]));
    assert_eq!(binary_round_trip(&array), array);
}

#[test]
fn test_good_status_code_is_omitted_in_json() {
    let context = EncodingContext::default();
    let mode = JsonEncodingMode::reversible();
    let good = Variant::StatusCode(StatusCode::GOOD);
    let json = encode_json(&good, &context, mode).unwrap();
    assert_eq!(json, json!({ "Type": 19 }));
    assert_eq!(decode_json::<Variant>(&json, &context).unwrap(), good);

    let array = Variant::Array(Array::StatusCode(vec![StatusCode::GOOD, StatusCode(0x8001_0000)]));
    let json = encode_json(&array, &context, mode).unwrap();
    assert_eq!(json, json!({ "Type": 19, "Body": [0, 0x8001_0000u32] }));
}

#[test]
fn test_non_reversible_status_code_record() {
    let context = EncodingContext::default();
    let json = encode_json(&StatusCode::BAD, &context, JsonEncodingMode::non_reversible()).unwrap();
    assert_eq!(json["Code"], json!(0x8000_0000u32));
    assert_eq!(decode_json::<StatusCode>(&json, &context).unwrap(), StatusCode::BAD);
}

// --- JSON forms ---

#[test]
fn test_reversible_json_carries_the_type() {
    let context = EncodingContext::default();
    let mode = JsonEncodingMode::reversible();
    assert_eq!(
        encode_json(&Variant::Int32(5), &context, mode).unwrap(),
        json!({ "Type": 6, "Body": 5 })
    );
    assert_eq!(encode_json(&Variant::Null, &context, mode).unwrap(), json!(null));
    assert_eq!(
        encode_json(&Variant::from(vec![1u16, 2]), &context, mode).unwrap(),
        json!({ "Type": 5, "Body": [1, 2] })
    );
}

#[test]
fn test_non_reversible_json_is_inferred_on_decode() {
    let context = EncodingContext::default();
    let cases = [
        (json!(true), Variant::Boolean(true)),
        (json!(-3), Variant::Int64(-3)),
        (json!(18_446_744_073_709_551_615u64), Variant::UInt64(u64::MAX)),
        (json!(2.5), Variant::Double(2.5)),
        (json!("text"), Variant::String("text".to_string())),
        (json!([1, 2]), Variant::from(vec![1i64, 2])),
        (
            json!([1, "a"]),
            Variant::Array(Array::Variant(vec![Variant::Int64(1), Variant::from("a")])),
        ),
    ];
    for (token, expected) in cases {
        assert_eq!(decode_json::<Variant>(&token, &context).unwrap(), expected, "{}", token);
    }
}

#[test]
fn test_enumeration_accepts_name_and_value() {
    let context = EncodingContext::default();
    let value: Variant = decode_json(&json!({ "Type": 29, "Body": "Running_4" }), &context).unwrap();
    assert_eq!(value, Variant::Enumeration(4));
    let value: Variant = decode_json(&json!({ "Type": 29, "Body": 4 }), &context).unwrap();
    assert_eq!(value, Variant::Enumeration(4));
}

#[test]
fn test_unknown_json_type_is_rejected() {
    let context = EncodingContext::default();
    let err = decode_json::<Variant>(&json!({ "Type": 77, "Body": 1 }), &context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);
}

// --- Nesting ---

fn nested(depth: usize) -> Variant {
    let mut value = Variant::Int32(1);
    for _ in 0..depth {
        value = Variant::Array(Array::Variant(vec![value]));
    }
    value
}

#[test]
fn test_nesting_limit_in_binary() {
    let strict = EncodingContext::default()
        .with_limits(EncodingLimits::default().with_max_nesting_depth(4));
    assert!(encode(&nested(2), &strict).is_ok());
    let err = encode(&nested(8), &strict).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);

    let relaxed = EncodingContext::default();
    let mut bytes = encode(&nested(8), &relaxed).unwrap();
    let err = decode::<Variant>(&mut bytes, &strict).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);
}

#[test]
fn test_nesting_limit_in_json() {
    let strict = EncodingContext::default()
        .with_limits(EncodingLimits::default().with_max_nesting_depth(4));
    let err = encode_json(&nested(8), &strict, JsonEncodingMode::reversible()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);

    let relaxed = EncodingContext::default();
    let json = encode_json(&nested(8), &relaxed, JsonEncodingMode::reversible()).unwrap();
    assert_eq!(decode_json::<Variant>(&json, &relaxed).unwrap(), nested(8));
    let err = decode_json::<Variant>(&json, &strict).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);
}

fn nested_arrays(depth: usize) -> serde_json::Value {
    let mut token = json!(1);
    for _ in 0..depth {
        token = json!([token]);
    }
    token
}

#[test]
fn test_nesting_limit_on_bare_json_arrays() {
    let strict = EncodingContext::default()
        .with_limits(EncodingLimits::default().with_max_nesting_depth(4));
    assert!(decode_json::<Variant>(&nested_arrays(2), &strict).is_ok());

    let err = decode_json::<Variant>(&nested_arrays(10), &strict).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);

    let typed = json!({ "Type": 6, "Body": nested_arrays(10) });
    let err = decode_json::<Variant>(&typed, &strict).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);

    // A jagged tail below the first element is inferred level by level too.
    let jagged = json!([[1], [nested_arrays(10)]]);
    let err = decode_json::<Variant>(&jagged, &strict).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);
}

#[test]
fn test_deep_bare_json_arrays_under_default_limits() {
    let context = EncodingContext::default();
    let err = decode_json::<Variant>(&nested_arrays(300), &context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);
}
