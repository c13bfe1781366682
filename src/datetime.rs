//! DateTime packing into a single signed integer (spec §4.3).
//!
//! ChainPack's `DateTime` is not its own wire form: it is a plain `Int`
//! carrying the instant, an optional millisecond flag, and an optional
//! 7-bit timezone field, all folded into one value by [`pack`]. This mirrors
//! `rpcvalue.py`'s `write_DateTime`/`read_DateTime`, which never touch a
//! calendar library internally — only integer arithmetic.

use crate::value::DateTime;

/// 2018-02-01T00:00:00Z, the codec's date-time origin (§4.3, GLOSSARY).
pub const SHV_EPOCH_MSEC: i64 = 1_517_529_600_000;

/// Folds a [`DateTime`] into the signed integer the Int codec writes (§4.3).
pub fn pack(dt: &DateTime) -> i64 {
    let mut out = dt.epoch_msec - SHV_EPOCH_MSEC;
    let has_ms = out % 1000 != 0;
    if !has_ms {
        out /= 1000;
    }

    let tz = dt.tz_offset_quarter_hours;
    if tz != 0 {
        out <<= 7;
        let tz_field: i64 = if tz < 0 {
            (1 << 6) | (!(-1 - tz as i64) & 0x3F)
        } else {
            tz as i64
        };
        out |= tz_field;
    }

    out <<= 2;
    if tz != 0 {
        out |= 1;
    }
    if !has_ms {
        out |= 2;
    }
    out
}

/// Reverses [`pack`], reconstructing the original instant and tz offset.
pub fn unpack(packed: i64) -> DateTime {
    let has_tz = packed & 1 != 0;
    let no_ms = packed & 2 != 0;
    let mut out = packed >> 2;

    let tz_offset_quarter_hours = if has_tz {
        let field = out & 0x7F;
        out >>= 7;
        let tz = if field & 0x40 != 0 {
            field - 128
        } else {
            field
        };
        tz as i8
    } else {
        0
    };

    if no_ms {
        out *= 1000;
    }

    DateTime {
        epoch_msec: out + SHV_EPOCH_MSEC,
        tz_offset_quarter_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(dt: DateTime) -> DateTime {
        unpack(pack(&dt))
    }

    #[test]
    fn epoch_instant_with_no_tz_round_trips() {
        let dt = DateTime::new(SHV_EPOCH_MSEC, 0);
        assert_eq!(roundtrip(dt), dt);
    }

    #[test]
    fn tz_offsets_across_the_full_range_round_trip() {
        for tz in [-64, -1, 0, 1, 63] {
            let dt = DateTime::new(SHV_EPOCH_MSEC + 86_400_000, tz);
            assert_eq!(roundtrip(dt), dt);
        }
    }

    #[test]
    fn sub_second_instant_round_trips() {
        let dt = DateTime::new(SHV_EPOCH_MSEC + 1_234, 0);
        assert_eq!(roundtrip(dt), dt);
    }

    #[test]
    fn tz_flag_is_omitted_when_offset_is_zero() {
        let dt = DateTime::new(SHV_EPOCH_MSEC, 0);
        assert_eq!(pack(&dt) & 1, 0);
    }

    // Spec §8.3 scenario 5: 2018-02-02T00:00:00Z, tz = -4, expects the packed
    // tz field to equal (1<<6) | ((~3) & 0x3F) == 0x7C.
    #[test]
    fn negative_tz_field_matches_spec_worked_example() {
        let dt = DateTime::new(SHV_EPOCH_MSEC + 86_400_000, -4);
        let packed = pack(&dt);
        let has_tz = packed & 1 != 0;
        assert!(has_tz);
        let no_ms = packed & 2 != 0;
        assert!(no_ms);
        let tz_field = (packed >> 2) & 0x7F;
        assert_eq!(tz_field, 0x7C);
        assert_eq!(roundtrip(dt), dt);
    }
}
