//! # `chainpack`
//!
//! A binary serialization codec for ChainPack, the dynamically typed value
//! model used by the SHV RPC protocol. The wire format is a self-describing
//! tagged byte stream: every value is preceded by an optional metadata block
//! and a tag byte that either carries its payload inline (tiny integers,
//! `Null`, `Bool`) or introduces a length-prefixed/terminated body.
//!
//! This crate covers the core codec only: the [`Value`] tree, its binary
//! [`Reader`]/[`Writer`], and the primitive codecs (variable-length integers,
//! the packed `DateTime` representation) they build on. Transport framing,
//! the RPC method-call envelope, and the meta-tag namespace registry are
//! left to callers — this crate treats meta tags as opaque `u64` keys.
//!
//! Usage is symmetric in both directions:
//!
//! ```
//! use chainpack::{MetaValue, Reader, Value, Writer};
//!
//! let mut bytes = Vec::new();
//! Writer::new(&mut bytes)
//!     .write(&MetaValue::new(Value::List(vec![
//!         Value::UInt(1).into_meta_value(),
//!         Value::UInt(2).into_meta_value(),
//!     ])))
//!     .unwrap();
//!
//! let decoded = Reader::new(&bytes[..]).read().unwrap();
//! assert_eq!(decoded.value, Value::List(vec![
//!     Value::UInt(1).into_meta_value(),
//!     Value::UInt(2).into_meta_value(),
//! ]));
//! ```
#[deny(rustdoc::broken_intra_doc_links)]
mod datetime;
mod error;
mod ioutil;
mod reader;
mod tag;
mod value;
mod varint;
mod writer;

pub use datetime::SHV_EPOCH_MSEC;
pub use error::{Error, Result};
pub use reader::{Reader, ReaderOptions};
pub use value::{Array, Decimal, DateTime, IMap, Map, Metadata, MetaValue, Type, Value};
pub use writer::{Writer, WriterOptions};
