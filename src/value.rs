//! The `Value` tree: ChainPack's dynamically typed payload (spec §3).
//!
//! List, Map and IMap elements are full recursive nodes (each may carry its
//! own metadata, because the wire format reads/writes them via the same
//! top-level `read`/`write` routine used for the root value — see
//! `rpcvalue.py`'s `readData_List`/`readData_IMap`, which call `s.read()`
//! for every element). Array elements are payload-only: a homogeneous array
//! has one shared tag for all its elements, so an element can never carry
//! its own metadata block (`readData_Array` calls `s.readData(...)`
//! directly, never `s.read()`). Metadata entries are restricted the same
//! way (§3.3): `Metadata` maps to plain [`Value`], not [`MetaValue`], so a
//! metadata value cannot itself carry metadata — the type system enforces
//! the "no metadata-of-metadata" invariant rather than a runtime check.

use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fmt;

/// A logical type discriminator, independent of wire tag encoding (§3.1).
///
/// `Array`'s own element type is never `Array` itself — an array of arrays
/// has no representation in this wire format (§3.1, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Type {
    Null,
    Bool,
    Int,
    UInt,
    Double,
    Decimal,
    Blob,
    String,
    DateTime,
    List,
    Map,
    IMap,
    Array,
}

/// A decimal number represented as `mantissa * 10^exponent` (§3.1, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decimal {
    pub mantissa: i64,
    pub exponent: i64,
}

impl Decimal {
    pub fn new(mantissa: i64, exponent: i64) -> Self {
        Decimal { mantissa, exponent }
    }
}

/// An instant in UTC plus a display-only timezone offset (§3.1, §4.3).
///
/// `epoch_msec` is milliseconds since the Unix epoch; `tz_offset_quarter_hours`
/// is a display hint in units of 15 minutes, range `[-64, 63]` (§3.3). It
/// never changes the encoded instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DateTime {
    pub epoch_msec: i64,
    pub tz_offset_quarter_hours: i8,
}

impl DateTime {
    pub fn new(epoch_msec: i64, tz_offset_quarter_hours: i8) -> Self {
        DateTime {
            epoch_msec,
            tz_offset_quarter_hours,
        }
    }

    pub fn from_epoch_msec(epoch_msec: i64) -> Self {
        DateTime {
            epoch_msec,
            tz_offset_quarter_hours: 0,
        }
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DateTime {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        DateTime::from_epoch_msec(dt.timestamp_millis())
    }
}

impl TryFrom<&DateTime> for chrono::DateTime<chrono::Utc> {
    type Error = crate::error::Error;

    fn try_from(dt: &DateTime) -> Result<Self, Self::Error> {
        use chrono::TimeZone;
        match chrono::Utc.timestamp_millis_opt(dt.epoch_msec) {
            chrono::LocalResult::Single(v) => Ok(v),
            _ => Err(crate::error::Error::Overflow(
                "DateTime instant out of chrono's representable range",
            )),
        }
    }
}

/// A homogeneous, ordered sequence of payload-only values sharing one
/// [`Type`] (§3.1, §4.6). Elements carry no metadata of their own — see the
/// module doc comment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Array {
    pub element_type: Type,
    pub elements: Vec<Value>,
}

impl Array {
    pub fn new(element_type: Type) -> Self {
        Array {
            element_type,
            elements: Vec::new(),
        }
    }
}

/// The non-negative-integer-keyed map shape of `IMap` (§3.1). Values are
/// full recursive nodes, each with its own optional metadata.
pub type IMap = BTreeMap<u64, MetaValue>;

/// The string-keyed map shape of `Map` (§3.1). Values are full recursive
/// nodes, each with its own optional metadata.
pub type Map = BTreeMap<String, MetaValue>;

/// A value's optional metadata attachment: an `IMap`-shaped map of
/// non-negative-integer keys to plain values (§3.2). Absence and emptiness
/// are equivalent; both serialize to nothing. Metadata values carry no
/// further metadata block (§3.3) — enforced here by mapping to [`Value`]
/// rather than [`MetaValue`].
pub type Metadata = BTreeMap<u64, Value>;

/// The dynamically typed payload at the heart of ChainPack (§3.1).
///
/// Variant identity is part of a value's meaning: `Value::Int(5)` and
/// `Value::UInt(5)` are unequal and must not merge on round trip (§3.3, §9).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Decimal(Decimal),
    Blob(Vec<u8>),
    String(String),
    DateTime(DateTime),
    List(Vec<MetaValue>),
    Map(Map),
    IMap(IMap),
    Array(Array),
}

impl Value {
    /// The logical [`Type`] of this value.
    pub fn value_type(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::UInt(_) => Type::UInt,
            Value::Double(_) => Type::Double,
            Value::Decimal(_) => Type::Decimal,
            Value::Blob(_) => Type::Blob,
            Value::String(_) => Type::String,
            Value::DateTime(_) => Type::DateTime,
            Value::List(_) => Type::List,
            Value::Map(_) => Type::Map,
            Value::IMap(_) => Type::IMap,
            Value::Array(_) => Type::Array,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Wraps `self` with empty metadata, the common case for building a
    /// tree programmatically.
    pub fn into_meta_value(self) -> MetaValue {
        MetaValue::new(self)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Null => "Null",
            Type::Bool => "Bool",
            Type::Int => "Int",
            Type::UInt => "UInt",
            Type::Double => "Double",
            Type::Decimal => "Decimal",
            Type::Blob => "Blob",
            Type::String => "String",
            Type::DateTime => "DateTime",
            Type::List => "List",
            Type::Map => "Map",
            Type::IMap => "IMap",
            Type::Array => "Array",
        };
        f.write_str(name)
    }
}

/// A value paired with its metadata — the unit `read`/`write` operate on,
/// and the element type of `List`/`Map`/`IMap` (§3.2, §4.4, §4.5).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetaValue {
    pub meta: Metadata,
    pub value: Value,
}

impl MetaValue {
    pub fn new(value: Value) -> Self {
        MetaValue {
            meta: Metadata::new(),
            value,
        }
    }

    pub fn with_meta(meta: Metadata, value: Value) -> Self {
        MetaValue { meta, value }
    }

    pub fn has_meta(&self) -> bool {
        !self.meta.is_empty()
    }
}

impl From<Value> for MetaValue {
    fn from(value: Value) -> Self {
        MetaValue::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_uint_with_same_magnitude_are_unequal() {
        assert_ne!(Value::Int(5), Value::UInt(5));
    }

    #[test]
    fn value_type_matches_each_variant() {
        assert_eq!(Value::Null.value_type(), Type::Null);
        assert_eq!(Value::Bool(true).value_type(), Type::Bool);
        assert_eq!(
            Value::Array(Array::new(Type::Int)).value_type(),
            Type::Array
        );
    }

    #[test]
    fn meta_value_default_is_empty_meta_and_null() {
        let mv = MetaValue::default();
        assert!(mv.meta.is_empty());
        assert_eq!(mv.value, Value::Null);
    }

    #[test]
    fn list_elements_can_each_carry_distinct_metadata() {
        let mut meta = Metadata::new();
        meta.insert(1, Value::Bool(true));
        let list = Value::List(vec![
            MetaValue::new(Value::UInt(1)),
            MetaValue::with_meta(meta, Value::UInt(2)),
        ]);
        if let Value::List(items) = &list {
            assert!(!items[0].has_meta());
            assert!(items[1].has_meta());
        } else {
            panic!("expected a list");
        }
    }
}
