//! The ChainPack writer: top-level `write`, metadata blocks, and container
//! codecs (spec §4.5, §4.6, §4.7).

use std::io::Write;

use tracing::trace;

use crate::datetime;
use crate::error::{Error, Result};
use crate::tag;
use crate::value::{Array, IMap, Map, MetaValue, Metadata, Type, Value};
use crate::varint;

/// Configuration for [`Writer`]. Only a depth limit is needed: unlike the
/// reader, the writer never preallocates based on untrusted input.
#[derive(Debug, Clone, Copy)]
pub struct WriterOptions {
    /// Maximum nesting depth before [`Error::DepthExceeded`] replaces
    /// further recursion (§5, §3.4 — the writer's half of the "no cycles"
    /// invariant, since an owned `Value` tree built deep enough can still
    /// exhaust the stack even without a true cycle).
    pub max_depth: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions { max_depth: 64 }
    }
}

/// Writes [`MetaValue`]s in ChainPack's binary form to any [`Write`] sink.
pub struct Writer<W: Write> {
    inner: W,
    options: WriterOptions,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Writer::with_options(inner, WriterOptions::default())
    }

    pub fn with_options(inner: W, options: WriterOptions) -> Self {
        Writer { inner, options }
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.options.max_depth {
            return Err(Error::DepthExceeded(self.options.max_depth));
        }
        Ok(())
    }

    /// Writes one top-level value, preceded by its metadata block if
    /// non-empty (§4.5, §4.7).
    pub fn write(&mut self, mv: &MetaValue) -> Result<()> {
        self.write_tagged(mv, 0)
    }

    fn write_tagged(&mut self, mv: &MetaValue, depth: usize) -> Result<()> {
        self.check_depth(depth)?;
        self.write_metadata(&mv.meta, depth + 1)?;
        self.write_value(&mv.value, depth + 1)
    }

    fn write_metadata(&mut self, meta: &Metadata, depth: usize) -> Result<()> {
        if meta.is_empty() {
            return Ok(());
        }
        trace!(entries = meta.len(), "writing metadata block");
        self.inner.write_all(&[tag::META_IMAP])?;
        self.write_plain_imap_body(meta, depth)
    }

    fn write_plain_imap_body(&mut self, meta: &Metadata, depth: usize) -> Result<()> {
        self.check_depth(depth)?;
        for (key, value) in meta {
            varint::write_uint(&mut self.inner, *key)?;
            self.write_value(value, depth + 1)?;
        }
        self.inner.write_all(&[tag::TERMINATION])?;
        Ok(())
    }

    fn write_value(&mut self, value: &Value, depth: usize) -> Result<()> {
        self.check_depth(depth)?;
        // "Optimize-into-tag" fast path (§4.5): Null, Bool and tiny
        // UInt/Int collapse their tag byte and payload into one byte.
        match value {
            Value::Null => return self.inner.write_all(&[tag::NULL]).map_err(Error::from),
            Value::Bool(b) => {
                let t = if *b { tag::TRUE } else { tag::FALSE };
                return self.inner.write_all(&[t]).map_err(Error::from);
            }
            Value::UInt(n) if *n < 64 => {
                return self.inner.write_all(&[*n as u8]).map_err(Error::from);
            }
            Value::Int(n) if (0..64).contains(n) => {
                return self
                    .inner
                    .write_all(&[tag::TINY_INT_FLAG | *n as u8])
                    .map_err(Error::from);
            }
            _ => {}
        }

        if let Value::Array(array) = value {
            return self.write_array_tagged(array, depth);
        }

        let core_tag = type_to_core_tag(value.value_type())?;
        self.inner.write_all(&[core_tag])?;
        self.write_payload(value, depth)
    }

    fn write_payload(&mut self, value: &Value, depth: usize) -> Result<()> {
        match value {
            Value::Null | Value::Bool(_) => unreachable!("handled by the tiny-form fast path"),
            Value::Array(_) => unreachable!("handled by write_array_tagged"),
            Value::UInt(n) => varint::write_uint(&mut self.inner, *n),
            Value::Int(n) => varint::write_int(&mut self.inner, *n),
            Value::Double(d) => self.inner.write_all(&d.to_be_bytes()).map_err(Error::from),
            Value::Decimal(d) => {
                varint::write_int(&mut self.inner, d.mantissa)?;
                varint::write_int(&mut self.inner, d.exponent)
            }
            Value::Blob(bytes) => self.write_blob(bytes),
            Value::String(s) => self.write_blob(s.as_bytes()),
            Value::DateTime(dt) => varint::write_int(&mut self.inner, datetime::pack(dt)),
            Value::List(items) => self.write_list_body(items, depth),
            Value::Map(map) => self.write_map_body(map, depth),
            Value::IMap(map) => self.write_imap_body(map, depth),
        }
    }

    fn write_list_body(&mut self, items: &[MetaValue], depth: usize) -> Result<()> {
        self.check_depth(depth)?;
        for item in items {
            self.write_tagged(item, depth + 1)?;
        }
        self.inner.write_all(&[tag::TERMINATION])?;
        Ok(())
    }

    fn write_map_body(&mut self, map: &Map, depth: usize) -> Result<()> {
        self.check_depth(depth)?;
        for (key, value) in map {
            self.write_blob(key.as_bytes())?;
            self.write_tagged(value, depth + 1)?;
        }
        self.inner.write_all(&[tag::TERMINATION])?;
        Ok(())
    }

    fn write_imap_body(&mut self, map: &IMap, depth: usize) -> Result<()> {
        self.check_depth(depth)?;
        for (key, value) in map {
            varint::write_uint(&mut self.inner, *key)?;
            self.write_tagged(value, depth + 1)?;
        }
        self.inner.write_all(&[tag::TERMINATION])?;
        Ok(())
    }

    fn write_array(&mut self, array: &Array, depth: usize) -> Result<()> {
        self.check_depth(depth)?;
        varint::write_uint(&mut self.inner, array.elements.len() as u64)?;
        for element in &array.elements {
            if element.value_type() != array.element_type {
                return Err(Error::TypeMismatch(
                    "Array element variant does not match the array's declared element type",
                ));
            }
            self.write_payload(element, depth + 1)?;
        }
        Ok(())
    }

    fn write_blob(&mut self, bytes: &[u8]) -> Result<()> {
        varint::write_uint(&mut self.inner, bytes.len() as u64)?;
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Writes the array's tag byte — its element type's own tag OR'd with
    /// the array flag (§4.5, §6.1) — then its length-prefixed body.
    ///
    /// A `DateTime` array uses the *current* `DateTime` tag (141) here, not
    /// the deprecated `DateTimeEpoch` tag (135) that the wire format's own
    /// description names for historic reasons: the only concrete reference
    /// code path (`rpcvalue.py`'s `pack()`) computes every array's tag
    /// uniformly via `typeToTypeInfo(element_type) | ARRAY_FLAG_MASK`,
    /// which resolves `DateTime` to 141 — the `DateTime_Array` constant
    /// aliasing 135 is never actually produced. See DESIGN.md.
    fn write_array_tagged(&mut self, array: &Array, depth: usize) -> Result<()> {
        if array.element_type == Type::Array {
            return Err(Error::TypeMismatch(
                "an Array's element type cannot itself be Array",
            ));
        }
        let core_tag = type_to_core_tag(array.element_type)?;
        self.inner.write_all(&[core_tag | tag::ARRAY_FLAG])?;
        self.write_array(array, depth)
    }
}

fn type_to_core_tag(t: Type) -> Result<u8> {
    match t {
        Type::Null => Ok(tag::NULL),
        Type::Bool => Ok(tag::BOOL),
        Type::Int => Ok(tag::INT),
        Type::UInt => Ok(tag::UINT),
        Type::Double => Ok(tag::DOUBLE),
        Type::Decimal => Ok(tag::DECIMAL),
        Type::Blob => Ok(tag::BLOB),
        Type::String => Ok(tag::STRING),
        Type::DateTime => Ok(tag::DATETIME),
        Type::List => Ok(tag::LIST),
        Type::Map => Ok(tag::MAP),
        Type::IMap => Ok(tag::IMAP),
        Type::Array => Err(Error::InvalidValue),
    }
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_one(mv: &MetaValue) -> Vec<u8> {
        let mut out = Vec::new();
        Writer::new(&mut out).write(mv).unwrap();
        out
    }

    #[test]
    fn tiny_uint_is_a_single_byte() {
        assert_eq!(write_one(&MetaValue::new(Value::UInt(5))), vec![0x05]);
    }

    #[test]
    fn tiny_int_sets_the_tiny_int_flag() {
        assert_eq!(write_one(&MetaValue::new(Value::Int(5))), vec![0x45]);
    }

    #[test]
    fn bool_writes_singleton_tags() {
        assert_eq!(write_one(&MetaValue::new(Value::Bool(true))), vec![0xFE]);
        assert_eq!(write_one(&MetaValue::new(Value::Bool(false))), vec![0xFD]);
    }

    #[test]
    fn array_rejects_mismatched_element_variant() {
        let mut array = Array::new(Type::UInt);
        array.elements.push(Value::Int(1));
        let mut out = Vec::new();
        let err = Writer::new(&mut out)
            .write(&MetaValue::new(Value::Array(array)))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn array_of_arrays_is_rejected() {
        let mut out = Vec::new();
        let err = Writer::new(&mut out)
            .write(&MetaValue::new(Value::Array(Array::new(Type::Array))))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn non_empty_metadata_is_written_before_the_value() {
        let mut meta = Metadata::new();
        meta.insert(1, Value::UInt(1));
        let bytes = write_one(&MetaValue::with_meta(meta, Value::UInt(5)));
        assert_eq!(bytes[0], tag::META_IMAP);
        assert_eq!(*bytes.last().unwrap(), 0x05);
    }
}
