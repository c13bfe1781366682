//! The ChainPack reader: top-level `read`, metadata blocks, and container
//! codecs (spec §4.4, §4.6, §4.7).
//!
//! Mirrors the shape of `itm::Decoder`/`itm::Buffer`: a struct wrapping a
//! `Read` source plus whatever small amount of lookahead state decoding
//! needs. `itm::Buffer` needs bit-level lookahead because ITM packets are
//! not byte-aligned; ChainPack is byte-aligned throughout; its only
//! lookahead need is a single byte, to peek at whether the next tag is
//! `MetaIMap` or `Termination` before committing to consume it.

use std::io::Read;

use tracing::trace;

use crate::datetime;
use crate::error::{Error, Result};
use crate::ioutil::read_byte;
use crate::tag;
use crate::value::{Array, Decimal, IMap, Map, MetaValue, Metadata, Type, Value};
use crate::varint;

/// Configuration for [`Reader`] (mirrors `itm::DecoderOptions`).
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// Maximum nesting depth before [`Error::DepthExceeded`] replaces
    /// further recursion (§5).
    pub max_depth: usize,

    /// Upper bound on how many elements/bytes a single length-prefixed
    /// `Array`, `Blob` or `String` will preallocate before reading confirms
    /// the stream actually contains that much data. Guards against a
    /// malicious or corrupt length prefix causing an outsized allocation.
    pub max_prealloc: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            max_depth: 64,
            max_prealloc: 4096,
        }
    }
}

/// Reads ChainPack-encoded [`MetaValue`]s from any [`Read`] source.
pub struct Reader<R: Read> {
    inner: R,
    peeked: Option<u8>,
    options: ReaderOptions,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R) -> Self {
        Reader::with_options(inner, ReaderOptions::default())
    }

    pub fn with_options(inner: R, options: ReaderOptions) -> Self {
        Reader {
            inner,
            peeked: None,
            options,
        }
    }

    /// Reads one top-level value, including any metadata block preceding
    /// it (§4.4, §4.7).
    pub fn read(&mut self) -> Result<MetaValue> {
        self.read_tagged(0)
    }

    fn peek_tag(&mut self) -> Result<u8> {
        match self.peeked {
            Some(b) => Ok(b),
            None => {
                let b = read_byte(&mut self.inner)?;
                self.peeked = Some(b);
                Ok(b)
            }
        }
    }

    fn next_tag(&mut self) -> Result<u8> {
        match self.peeked.take() {
            Some(b) => Ok(b),
            None => read_byte(&mut self.inner),
        }
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.options.max_depth {
            return Err(Error::DepthExceeded(self.options.max_depth));
        }
        Ok(())
    }

    fn prealloc(&self, requested: usize) -> usize {
        requested.min(self.options.max_prealloc)
    }

    fn read_tagged(&mut self, depth: usize) -> Result<MetaValue> {
        self.check_depth(depth)?;
        let meta = self.read_metadata(depth + 1)?;
        let value = self.read_value(depth + 1)?;
        Ok(MetaValue::with_meta(meta, value))
    }

    fn read_metadata(&mut self, depth: usize) -> Result<Metadata> {
        let mut meta = Metadata::new();
        while self.peek_tag()? == tag::META_IMAP {
            self.next_tag()?;
            trace!("reading metadata block");
            let entries = self.read_plain_imap_body(depth)?;
            meta.extend(entries);
        }
        Ok(meta)
    }

    /// Reads an IMap body whose values carry no metadata of their own —
    /// used only for the metadata block itself (§3.3, §4.7).
    fn read_plain_imap_body(&mut self, depth: usize) -> Result<Metadata> {
        self.check_depth(depth)?;
        let mut out = Metadata::new();
        loop {
            if self.peek_tag()? == tag::TERMINATION {
                self.next_tag()?;
                break;
            }
            let key = varint::read_uint(self)?;
            let value = self.read_value(depth + 1)?;
            out.insert(key, value);
        }
        Ok(out)
    }

    fn read_value(&mut self, depth: usize) -> Result<Value> {
        self.check_depth(depth)?;
        let t = self.next_tag()?;
        if t < tag::TINY_FORM_LIMIT {
            return Ok(if t & tag::TINY_INT_FLAG != 0 {
                Value::Int((t & tag::TINY_VALUE_MASK) as i64)
            } else {
                Value::UInt((t & tag::TINY_VALUE_MASK) as u64)
            });
        }
        if t == tag::TRUE {
            return Ok(Value::Bool(true));
        }
        if t == tag::FALSE {
            return Ok(Value::Bool(false));
        }

        let is_array = t & tag::ARRAY_FLAG != 0;
        let core_tag = t & !tag::ARRAY_FLAG;
        if is_array {
            self.read_array(core_tag, depth)
        } else {
            self.read_payload(core_tag, depth)
        }
    }

    fn read_array(&mut self, core_tag: u8, depth: usize) -> Result<Value> {
        self.check_depth(depth)?;
        let element_type = core_tag_to_type(core_tag)?;
        let len = varint::read_uint(self)? as usize;
        let mut elements = Vec::with_capacity(self.prealloc(len));
        for _ in 0..len {
            elements.push(self.read_payload(core_tag, depth + 1)?);
        }
        Ok(Value::Array(Array {
            element_type,
            elements,
        }))
    }

    fn read_payload(&mut self, core_tag: u8, depth: usize) -> Result<Value> {
        match core_tag {
            tag::NULL => Ok(Value::Null),
            tag::BOOL => {
                let b = read_byte(self)?;
                Ok(Value::Bool(b != 0))
            }
            tag::UINT => Ok(Value::UInt(varint::read_uint(self)?)),
            tag::INT => Ok(Value::Int(varint::read_int(self)?)),
            tag::DOUBLE => {
                let mut buf = [0u8; 8];
                crate::ioutil::read_exact(self, &mut buf)?;
                Ok(Value::Double(f64::from_be_bytes(buf)))
            }
            tag::DECIMAL => {
                let mantissa = varint::read_int(self)?;
                let exponent = varint::read_int(self)?;
                Ok(Value::Decimal(Decimal::new(mantissa, exponent)))
            }
            tag::BLOB => Ok(Value::Blob(self.read_blob()?)),
            tag::STRING => Ok(Value::String(self.read_string()?)),
            tag::DATETIME => Ok(Value::DateTime(datetime::unpack(varint::read_int(self)?))),
            tag::DATETIME_EPOCH => {
                // No concrete reference implementation decodes this
                // deprecated tag (rpcvalue.py's own readData dispatch has
                // no branch for it); read it as whole seconds since the
                // Unix epoch with no timezone, the plain meaning implied by
                // its name, so peers that still emit it don't fail to
                // decode (spec.md §1/§9).
                let seconds = varint::read_int(self)?;
                Ok(Value::DateTime(crate::value::DateTime::from_epoch_msec(
                    seconds.saturating_mul(1000),
                )))
            }
            tag::LIST => Ok(Value::List(self.read_list_body(depth)?)),
            tag::MAP => Ok(Value::Map(self.read_map_body(depth)?)),
            tag::IMAP => Ok(Value::IMap(self.read_imap_body(depth)?)),
            other => Err(Error::InvalidTag(other)),
        }
    }

    fn read_list_body(&mut self, depth: usize) -> Result<Vec<MetaValue>> {
        self.check_depth(depth)?;
        let mut items = Vec::new();
        loop {
            if self.peek_tag()? == tag::TERMINATION {
                self.next_tag()?;
                break;
            }
            items.push(self.read_tagged(depth + 1)?);
        }
        Ok(items)
    }

    fn read_map_body(&mut self, depth: usize) -> Result<Map> {
        self.check_depth(depth)?;
        let mut map = Map::new();
        loop {
            if self.peek_tag()? == tag::TERMINATION {
                self.next_tag()?;
                break;
            }
            let key = self.read_string()?;
            let value = self.read_tagged(depth + 1)?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn read_imap_body(&mut self, depth: usize) -> Result<IMap> {
        self.check_depth(depth)?;
        let mut map = IMap::new();
        loop {
            if self.peek_tag()? == tag::TERMINATION {
                self.next_tag()?;
                break;
            }
            let key = varint::read_uint(self)?;
            let value = self.read_tagged(depth + 1)?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn read_blob(&mut self) -> Result<Vec<u8>> {
        let len = varint::read_uint(self)? as usize;
        let mut buf = Vec::with_capacity(self.prealloc(len));
        let mut remaining = len;
        let mut chunk = [0u8; 4096];
        while remaining > 0 {
            let want = remaining.min(chunk.len());
            crate::ioutil::read_exact(self, &mut chunk[..want])?;
            buf.extend_from_slice(&chunk[..want]);
            remaining -= want;
        }
        Ok(buf)
    }

    fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_blob()?;
        String::from_utf8(bytes).map_err(|e| Error::InvalidUtf8(e.utf8_error()))
    }
}

fn core_tag_to_type(core_tag: u8) -> Result<Type> {
    match core_tag {
        tag::NULL => Ok(Type::Null),
        tag::BOOL => Ok(Type::Bool),
        tag::UINT => Ok(Type::UInt),
        tag::INT => Ok(Type::Int),
        tag::DOUBLE => Ok(Type::Double),
        tag::DECIMAL => Ok(Type::Decimal),
        tag::BLOB => Ok(Type::Blob),
        tag::STRING => Ok(Type::String),
        tag::DATETIME | tag::DATETIME_EPOCH => Ok(Type::DateTime),
        tag::LIST => Ok(Type::List),
        tag::MAP => Ok(Type::Map),
        tag::IMAP => Ok(Type::IMap),
        other => Err(Error::InvalidTag(other | tag::ARRAY_FLAG)),
    }
}

impl<R: Read> Read for Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(b) = self.peeked.take() {
            buf[0] = b;
            return Ok(1);
        }
        self.inner.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;

    fn read_one(bytes: &[u8]) -> MetaValue {
        let mut r = Reader::new(bytes);
        r.read().unwrap()
    }

    #[test]
    fn tiny_uint_decodes_from_a_single_byte() {
        assert_eq!(read_one(&[0x05]).value, Value::UInt(5));
    }

    #[test]
    fn tiny_int_decodes_distinctly_from_uint() {
        assert_eq!(read_one(&[0x45]).value, Value::Int(5));
    }

    #[test]
    fn bool_singletons_decode() {
        assert_eq!(read_one(&[tag::TRUE]).value, Value::Bool(true));
        assert_eq!(read_one(&[tag::FALSE]).value, Value::Bool(false));
    }

    #[test]
    fn bool_payload_form_treats_any_nonzero_byte_as_true() {
        assert_eq!(read_one(&[tag::BOOL, 0x2a]).value, Value::Bool(true));
        assert_eq!(read_one(&[tag::BOOL, 0x00]).value, Value::Bool(false));
    }

    #[test]
    fn termination_outside_a_container_is_an_invalid_tag() {
        let mut r = Reader::new(&[tag::TERMINATION][..]);
        assert!(matches!(r.read(), Err(Error::InvalidTag(_))));
    }

    #[test]
    fn depth_exceeded_reports_instead_of_overflowing_the_stack() {
        let mut bytes = Vec::new();
        {
            let mut w = Writer::new(&mut bytes);
            let mut v = Value::List(vec![MetaValue::new(Value::UInt(0))]);
            for _ in 0..200 {
                v = Value::List(vec![MetaValue::new(v)]);
            }
            w.write(&MetaValue::new(v)).unwrap();
        }
        let mut r = Reader::with_options(
            &bytes[..],
            ReaderOptions {
                max_depth: 64,
                ..ReaderOptions::default()
            },
        );
        assert!(matches!(r.read(), Err(Error::DepthExceeded(64))));
    }

    #[test]
    fn blob_and_string_round_trip_through_the_writer() {
        let mut bytes = Vec::new();
        Writer::new(&mut bytes)
            .write(&MetaValue::new(Value::String("hello".into())))
            .unwrap();
        assert_eq!(
            read_one(&bytes).value,
            Value::String("hello".to_string())
        );
    }
}
