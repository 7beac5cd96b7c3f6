//! Numeric conversion of lexed payloads.
//!
//! The lexer has already validated the shape of every number token, so these
//! routines only have to convert and watch for overflow.

/// Converts a JSON integer literal to `i64`, or `None` on overflow.
///
/// The accumulator works in the negative domain: `-i64::MIN` is not
/// representable, so digits are folded as `ret = 10 * ret - digit` and the
/// sign is applied at the end. This accepts the full `i64` range including
/// `i64::MIN` without intermediate overflow.
pub(crate) fn parse_integer(buf: &[u8]) -> Option<i64> {
    debug_assert!(!buf.is_empty());
    let neg = buf[0] == b'-';
    let mut cut_lim = i64::MAX % 10;
    if neg {
        cut_lim += 1;
    }
    const CUTOFF: i64 = -(i64::MAX / 10);

    let mut off = usize::from(neg);
    let mut ret = 0i64;
    while off < buf.len() {
        let c = i64::from(buf[off] - b'0');
        debug_assert!((0..=9).contains(&c));
        if ret < CUTOFF || (ret == CUTOFF && c > cut_lim) {
            return None;
        }
        ret = 10 * ret - c;
        off += 1;
    }
    Some(if neg { ret } else { -ret })
}

/// Converts a JSON number literal to a finite `f64`, or `None` when the
/// magnitude overflows binary64. (Underflow to zero is not an error.)
pub(crate) fn parse_floating(buf: &[u8]) -> Option<f64> {
    // Number payloads are ASCII by construction.
    let text = std::str::from_utf8(buf).ok()?;
    let value: f64 = text.parse().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::{parse_floating, parse_integer};

    #[test]
    fn integers_across_the_range() {
        assert_eq!(parse_integer(b"0"), Some(0));
        assert_eq!(parse_integer(b"-0"), Some(0));
        assert_eq!(parse_integer(b"42"), Some(42));
        assert_eq!(parse_integer(b"-42"), Some(-42));
        assert_eq!(parse_integer(b"9223372036854775807"), Some(i64::MAX));
        assert_eq!(parse_integer(b"-9223372036854775808"), Some(i64::MIN));
    }

    #[test]
    fn integer_overflow_is_detected_not_wrapped() {
        assert_eq!(parse_integer(b"9223372036854775808"), None);
        assert_eq!(parse_integer(b"-9223372036854775809"), None);
        assert_eq!(parse_integer(b"99999999999999999999"), None);
    }

    #[test]
    fn floating_values() {
        assert_eq!(parse_floating(b"3.14"), Some(3.14));
        assert_eq!(parse_floating(b"-1e3"), Some(-1000.0));
        assert_eq!(parse_floating(b"9.223372e+18"), Some(9.223372e18));
        assert_eq!(parse_floating(b"1e-999"), Some(0.0));
    }

    #[test]
    fn floating_overflow_is_detected() {
        assert_eq!(parse_floating(b"1e999"), None);
        assert_eq!(parse_floating(b"-1e999"), None);
    }
}
