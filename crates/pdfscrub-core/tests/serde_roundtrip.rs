//! Serde round-trip tests for the serializable core types.

#![cfg(feature = "serde")]

use pdfscrub_core::*;

/// Helper: serialize to JSON string, deserialize back, assert equality.
fn roundtrip<T>(value: &T)
where
    T: serde::Serialize + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let json = serde_json::to_string(value).expect("serialize failed");
    let restored: T = serde_json::from_str(&json).expect("deserialize failed");
    assert_eq!(*value, restored, "round-trip mismatch for JSON: {json}");
}

#[test]
fn geometry_types() {
    roundtrip(&Point::new(3.5, -2.25));
    roundtrip(&Matrix::new(2.0, 0.0, 0.0, 3.0, 10.0, 20.0));
    roundtrip(&Matrix::identity());
    roundtrip(&Rect::new(0.0, 0.0, 612.0, 792.0));
}

#[test]
fn error_codes() {
    roundtrip(&ErrorCode::Syntax);
    roundtrip(&ErrorCode::FrameStackExhausted);
}

#[test]
fn matrix_fields_named() {
    let json = serde_json::to_value(Matrix::translate(5.0, 7.0)).unwrap();
    assert_eq!(json["e"], 5.0);
    assert_eq!(json["f"], 7.0);
}
