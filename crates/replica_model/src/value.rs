//! Tagged field values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared kind of a schema field.
///
/// The kind is fixed where the schema is declared; nothing in the engine
/// inspects runtime types to decide how a column is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Boolean column.
    Bool,
    /// Signed 64-bit integer column.
    Int,
    /// 64-bit floating point column.
    Double,
    /// UTF-8 text column.
    Text,
    /// Raw byte column.
    Bytes,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Double => "double",
            FieldKind::Text => "text",
            FieldKind::Bytes => "bytes",
        };
        write!(f, "{name}")
    }
}

/// A single typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (full i64 range).
    Int(i64),
    /// Floating point value.
    Double(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns the kind of this value, or `None` for null.
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(_) => Some(FieldKind::Bool),
            FieldValue::Int(_) => Some(FieldKind::Int),
            FieldValue::Double(_) => Some(FieldKind::Double),
            FieldValue::Text(_) => Some(FieldKind::Text),
            FieldValue::Bytes(_) => Some(FieldKind::Bytes),
        }
    }

    /// Returns true if this value can be stored in a column of `kind`.
    ///
    /// Null is storable in any column.
    pub fn matches(&self, kind: FieldKind) -> bool {
        match self.kind() {
            None => true,
            Some(own) => own == kind,
        }
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a double, if it is one.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            FieldValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Int(i64::from(n))
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Int(i64::from(n))
    }
}

impl From<f64> for FieldValue {
    fn from(d: f64) -> Self {
        FieldValue::Double(d)
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(b: Vec<u8>) -> Self {
        FieldValue::Bytes(b)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(b: &[u8]) -> Self {
        FieldValue::Bytes(b.to_vec())
    }
}

impl From<()> for FieldValue {
    fn from((): ()) -> Self {
        FieldValue::Null
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => FieldValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_of_each_variant() {
        assert_eq!(FieldValue::Null.kind(), None);
        assert_eq!(FieldValue::Bool(true).kind(), Some(FieldKind::Bool));
        assert_eq!(FieldValue::Int(1).kind(), Some(FieldKind::Int));
        assert_eq!(FieldValue::Double(1.5).kind(), Some(FieldKind::Double));
        assert_eq!(FieldValue::Text("x".into()).kind(), Some(FieldKind::Text));
        assert_eq!(FieldValue::Bytes(vec![0]).kind(), Some(FieldKind::Bytes));
    }

    #[test]
    fn null_matches_any_kind() {
        assert!(FieldValue::Null.matches(FieldKind::Bool));
        assert!(FieldValue::Null.matches(FieldKind::Text));
        assert!(FieldValue::Null.matches(FieldKind::Bytes));
    }

    #[test]
    fn matches_rejects_other_kinds() {
        assert!(FieldValue::Int(3).matches(FieldKind::Int));
        assert!(!FieldValue::Int(3).matches(FieldKind::Text));
        assert!(!FieldValue::Text("3".into()).matches(FieldKind::Int));
    }

    #[test]
    fn accessors() {
        assert_eq!(FieldValue::Bool(true).as_bool(), Some(true));
        assert_eq!(FieldValue::Int(42).as_int(), Some(42));
        assert_eq!(FieldValue::Double(2.5).as_double(), Some(2.5));
        assert_eq!(FieldValue::Text("hi".into()).as_text(), Some("hi"));
        assert_eq!(
            FieldValue::Bytes(vec![1, 2]).as_bytes(),
            Some(&[1u8, 2][..])
        );
        assert_eq!(FieldValue::Int(42).as_text(), None);
    }

    #[test]
    fn from_impls() {
        assert_eq!(FieldValue::from(true), FieldValue::Bool(true));
        assert_eq!(FieldValue::from(42i64), FieldValue::Int(42));
        assert_eq!(FieldValue::from(42i32), FieldValue::Int(42));
        assert_eq!(FieldValue::from(2.5f64), FieldValue::Double(2.5));
        assert_eq!(FieldValue::from("x"), FieldValue::Text("x".into()));
        assert_eq!(FieldValue::from(vec![1u8]), FieldValue::Bytes(vec![1]));
        assert_eq!(FieldValue::from(()), FieldValue::Null);
        assert_eq!(FieldValue::from(None::<i64>), FieldValue::Null);
        assert_eq!(FieldValue::from(Some(7i64)), FieldValue::Int(7));
    }

    #[test]
    fn serde_round_trip() {
        let value = FieldValue::Text("hello".into());
        let json = serde_json::to_string(&value).unwrap();
        let back: FieldValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
