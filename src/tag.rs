//! Wire-level constants for the ChainPack tag byte.
//!
//! These are kept separate from [`crate::value::Value`] because the tag byte
//! space is denser than the logical [`Type`](crate::value::Type) discriminator:
//! besides the payload-bearing tags it also encodes the tiny-int fast paths
//! and the array-flagged form of (almost) every payload tag.

/// Bit 6 of a tag byte: when set, the payload is a length-prefixed
/// homogeneous sequence of the type named by the remaining bits.
pub const ARRAY_FLAG: u8 = 0x40;

/// Tag bytes below this value are tiny UInt/Int fast paths, not a type tag.
pub const TINY_FORM_LIMIT: u8 = 0x80;

/// Within the tiny-form range, bit 6 distinguishes tiny Int from tiny UInt.
pub const TINY_INT_FLAG: u8 = 0x40;

/// Mask of the payload bits in a tiny-form byte.
pub const TINY_VALUE_MASK: u8 = 0x3F;

pub const NULL: u8 = 128;
pub const UINT: u8 = 129;
pub const INT: u8 = 130;
pub const DOUBLE: u8 = 131;
pub const BOOL: u8 = 132;
pub const BLOB: u8 = 133;
pub const STRING: u8 = 134;
/// Deprecated epoch-based DateTime tag. Recognized on read only (§9).
pub const DATETIME_EPOCH: u8 = 135;
pub const LIST: u8 = 136;
pub const MAP: u8 = 137;
pub const IMAP: u8 = 138;
pub const META_IMAP: u8 = 139;
pub const DECIMAL: u8 = 140;
pub const DATETIME: u8 = 141;

pub const FALSE: u8 = 253;
pub const TRUE: u8 = 254;
pub const TERMINATION: u8 = 255;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_outside_the_type_info_range() {
        assert!(FALSE > DATETIME);
        assert!(TRUE > FALSE);
        assert!(TERMINATION > TRUE);
    }

    #[test]
    fn tiny_form_limit_matches_null_tag_floor() {
        assert_eq!(TINY_FORM_LIMIT, NULL - NULL % 0x80);
    }
}
