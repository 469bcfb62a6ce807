//! Tests for value.rs - value/type mapping and display sizes.

use bytes::Bytes;
use chrono::NaiveDate;

use crate::value::{TypeCode, Value};

#[test]
fn test_type_code_follows_variant() {
    assert_eq!(Value::Int64(1).type_code(), TypeCode::Int64);
    assert_eq!(Value::Float64(1.5).type_code(), TypeCode::Float64);
    assert_eq!(Value::String("x".into()).type_code(), TypeCode::String);
    assert_eq!(Value::Bool(true).type_code(), TypeCode::Bool);
    assert_eq!(
        Value::Bytes(Bytes::from_static(b"x")).type_code(),
        TypeCode::Bytes
    );
    assert_eq!(Value::Null.type_code(), TypeCode::Unspecified);
}

#[test]
fn test_fixed_display_sizes() {
    assert_eq!(TypeCode::Bool.display_size(), Some(1));
    assert_eq!(TypeCode::Date.display_size(), Some(4));
    assert_eq!(TypeCode::Float64.display_size(), Some(8));
    assert_eq!(TypeCode::Int64.display_size(), Some(8));
    assert_eq!(TypeCode::Timestamp.display_size(), Some(12));
}

#[test]
fn test_dynamic_types_have_no_display_size() {
    assert_eq!(TypeCode::String.display_size(), None);
    assert_eq!(TypeCode::Bytes.display_size(), None);
    assert_eq!(TypeCode::Unspecified.display_size(), None);
}

#[test]
fn test_option_conversions_map_none_to_null() {
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some(3i64)), Value::Int64(3));
    assert!(Value::from(None::<String>).is_null());
}

#[test]
fn test_common_conversions() {
    assert_eq!(Value::from("x"), Value::String("x".into()));
    assert_eq!(Value::from(vec![1u8, 2]), Value::Bytes(Bytes::from(vec![1u8, 2])));
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    assert_eq!(Value::from(date), Value::Date(date));
}
