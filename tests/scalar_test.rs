use bytes::Bytes;
use opcua_encoder::{
    decode, decode_json, encode, encode_json, BinaryReader, DateTime, EncoderError,
    EncodingContext, EncodingLimits, ErrorKind, JsonEncodingMode, LocalizedText, QualifiedName,
    StatusCode, Variant, XmlElement,
};
use proptest::prelude::*;
use serde_json::json;
use uuid::Uuid;

fn binary_round_trip(value: &Variant) -> Variant {
    let context = EncodingContext::default();
    let mut bytes = encode(value, &context).unwrap();
    let decoded = decode(&mut bytes, &context).unwrap();
    assert!(bytes.is_empty(), "trailing bytes after {:?}", value);
    decoded
}

fn json_round_trip(value: &Variant, mode: JsonEncodingMode) -> Variant {
    let context = EncodingContext::default();
    let json = encode_json(value, &context, mode).unwrap();
    decode_json(&json, &context).unwrap()
}

fn scalars() -> Vec<Variant> {
    vec![
        Variant::Boolean(true),
        Variant::SByte(-7),
        Variant::Byte(200),
        Variant::Int16(-1234),
        Variant::UInt16(54321),
        Variant::Int32(i32::MIN),
        Variant::UInt32(u32::MAX),
        Variant::Int64(i64::MIN),
        Variant::UInt64(u64::MAX),
        Variant::Float(1.5),
        Variant::Double(-2.25e10),
        Variant::String("hello wörld".to_string()),
        Variant::DateTime(DateTime::from_ticks(133_000_000_000_000_000)),
        Variant::Guid(Uuid::parse_str("72962b91-fa75-4ae6-8d28-b404dc7daf63").unwrap()),
        Variant::ByteString(Bytes::from_static(&[1, 2, 3, 255])),
        Variant::XmlElement(XmlElement::from("<a>1</a>")),
        Variant::StatusCode(StatusCode::BAD),
        Variant::QualifiedName(QualifiedName::new(2, "Name")),
        Variant::LocalizedText(LocalizedText::new("en-US", "Text")),
        Variant::Enumeration(3),
    ]
}

#[test]
fn test_binary_round_trip_every_scalar() {
    for value in scalars() {
        assert_eq!(binary_round_trip(&value), value);
    }
}

#[test]
fn test_reversible_json_round_trip_every_scalar() {
    for value in scalars() {
        assert_eq!(json_round_trip(&value, JsonEncodingMode::reversible()), value);
    }
}

#[test]
fn test_boolean_wire_bytes() {
    let bytes = encode(&Variant::Boolean(true), &EncodingContext::default()).unwrap();
    assert_eq!(&bytes[..], &[0x00, 0x02, 0x01]);
}

#[test]
fn test_boolean_rejects_other_bytes() {
    let context = EncodingContext::default();
    let mut reader = BinaryReader::new(Bytes::from_static(&[0x02]), &context);
    let err = reader.read_bool().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);
}

#[test]
fn test_int32_wire_bytes() {
    let bytes = encode(&Variant::Int32(5), &EncodingContext::default()).unwrap();
    // No dimensions, index 6, zig-zag 5.
    assert_eq!(&bytes[..], &[0x00, 0x0C, 0x0A]);
}

#[test]
fn test_uint64_union_branches() {
    let context = EncodingContext::default();

    let small = encode(&5u64, &context).unwrap();
    assert_eq!(&small[..], &[0x00, 0x0A]);

    let large = encode(&u64::MAX, &context).unwrap();
    assert_eq!(large[0], 0x02);
    assert_eq!(&large[1..], &[0xFF; 8]);

    for value in [0u64, i64::MAX as u64, i64::MAX as u64 + 1000, u64::MAX] {
        let mut bytes = encode(&value, &context).unwrap();
        let decoded: u64 = decode(&mut bytes, &context).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(binary_round_trip(&Variant::UInt64(value)), Variant::UInt64(value));
    }
}

#[test]
fn test_uint64_unknown_union_index() {
    let context = EncodingContext::default();
    let mut bytes = Bytes::from_static(&[0x04, 0x00]);
    let err = decode::<u64>(&mut bytes, &context).unwrap_err();
    assert!(matches!(err, EncoderError::Decoding(_)));
}

#[test]
fn test_truncated_input() {
    let context = EncodingContext::default();
    let mut bytes = Bytes::from_static(&[0x00, 0x16]);
    let err = decode::<Variant>(&mut bytes, &context).unwrap_err();
    assert!(matches!(err, EncoderError::InsufficientData));
    assert_eq!(err.kind(), ErrorKind::Decoding);
}

#[test]
fn test_date_time_sentinels() {
    assert_eq!(DateTime::from_ticks(-5), DateTime::MIN);
    assert_eq!(DateTime::from_ticks(i64::MAX), DateTime::MAX);

    let context = EncodingContext::default();
    let mut bytes = encode(&DateTime::MAX, &context).unwrap();
    let decoded: DateTime = decode(&mut bytes, &context).unwrap();
    assert_eq!(decoded, DateTime::MAX);
}

#[test]
fn test_date_time_json() {
    let context = EncodingContext::default();
    let mode = JsonEncodingMode::non_reversible();
    let epoch = DateTime::from(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH);
    assert_eq!(encode_json(&epoch, &context, mode).unwrap(), json!("1970-01-01T00:00:00Z"));
    assert_eq!(encode_json(&DateTime::MIN, &context, mode).unwrap(), json!(null));

    let decoded: DateTime = decode_json(&json!("1970-01-01T00:00:00.5Z"), &context).unwrap();
    assert_eq!(decoded.ticks(), epoch.ticks() + 5_000_000);
    assert!(decode_json::<DateTime>(&json!("yesterday"), &context).is_err());
}

#[test]
fn test_int64_is_a_string_unless_compact() {
    let context = EncodingContext::default();
    let value = Variant::Int64(-42);
    assert_eq!(
        encode_json(&value, &context, JsonEncodingMode::reversible()).unwrap(),
        json!({ "Type": 8, "Body": "-42" })
    );
    assert_eq!(
        encode_json(&value, &context, JsonEncodingMode::non_reversible().with_compact(true))
            .unwrap(),
        json!(-42)
    );
}

#[test]
fn test_float_specials_in_json() {
    let context = EncodingContext::default();
    let mode = JsonEncodingMode::non_reversible();
    assert_eq!(encode_json(&f64::NAN, &context, mode).unwrap(), json!("NaN"));
    assert_eq!(encode_json(&f64::INFINITY, &context, mode).unwrap(), json!("Infinity"));
    assert_eq!(encode_json(&f32::NEG_INFINITY, &context, mode).unwrap(), json!("-Infinity"));
    let decoded: f64 = decode_json(&json!("-Infinity"), &context).unwrap();
    assert_eq!(decoded, f64::NEG_INFINITY);
}

#[test]
fn test_byte_string_json_is_base64() {
    let context = EncodingContext::default();
    let mode = JsonEncodingMode::reversible();
    let value = Bytes::from_static(b"hello");
    assert_eq!(encode_json(&value, &context, mode).unwrap(), json!("aGVsbG8="));
    assert_eq!(encode_json(&Bytes::new(), &context, mode).unwrap(), json!(null));
    assert!(decode_json::<Bytes>(&json!("not base64!"), &context).is_err());
}

#[test]
fn test_string_limit_on_encode_and_decode() {
    let context = EncodingContext::default()
        .with_limits(EncodingLimits::default().with_max_string_length(4));
    let err = encode(&"too long".to_string(), &context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);

    let unlimited = EncodingContext::default();
    let mut bytes = encode(&"too long".to_string(), &unlimited).unwrap();
    let err = decode::<String>(&mut bytes, &context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);

    let err = decode_json::<String>(&json!("too long"), &context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);
}

#[test]
fn test_byte_string_limit_before_reading() {
    let context = EncodingContext::default()
        .with_limits(EncodingLimits::default().with_max_byte_string_length(2));
    // Claims 1000 bytes but carries none: the limit trips before the read.
    let mut bytes = Bytes::from_static(&[0xD0, 0x0F]);
    let err = decode::<Bytes>(&mut bytes, &context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);
}

#[test]
fn test_negative_length_is_rejected() {
    let context = EncodingContext::default();
    let mut bytes = Bytes::from_static(&[0x01]);
    let err = decode::<String>(&mut bytes, &context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);
}

proptest! {
    #[test]
    fn uint64_union_round_trips(value in any::<u64>()) {
        let context = EncodingContext::default();
        let mut bytes = encode(&value, &context).unwrap();
        // Union index 0 (a long) below i64::MAX, index 1 (fixed bytes) above.
        prop_assert_eq!(bytes[0], if value < i64::MAX as u64 { 0x00 } else { 0x02 });
        prop_assert_eq!(decode::<u64>(&mut bytes, &context).unwrap(), value);
        prop_assert!(bytes.is_empty());
    }
}
