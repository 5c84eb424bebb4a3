//! Typed projections of raw configuration strings.

/// Parse a leading decimal integer the way C's `atoi` does.
///
/// Leading whitespace and one sign are accepted, digits are consumed up to
/// the first non-digit. Input without leading digits yields `0`. Overflow
/// saturates.
pub fn parse_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let d = i64::from(b - b'0');
        value = value.saturating_mul(10).saturating_add(d);
    }

    if negative {
        -value
    } else {
        value
    }
}

/// Parse a boolean flag.
///
/// A leading `Y`, `T` or `1` (any case) is true. Otherwise the value is read
/// as an integer and anything non-zero is true.
pub fn parse_bool(s: &str) -> bool {
    match s.bytes().next().map(|b| b.to_ascii_uppercase()) {
        Some(b'Y' | b'T' | b'1') => true,
        _ => parse_int(s) != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42"), 42);
        assert_eq!(parse_int("  -17"), -17);
        assert_eq!(parse_int("+8"), 8);
        assert_eq!(parse_int("12abc"), 12);
        assert_eq!(parse_int("abc"), 0);
        assert_eq!(parse_int(""), 0);
        assert_eq!(parse_int("-"), 0);
        assert_eq!(parse_int("99999999999999999999999"), i64::MAX);
    }

    #[test]
    fn test_parse_bool_truthy() {
        assert!(parse_bool("Y"));
        assert!(parse_bool("yes"));
        assert!(parse_bool("1"));
        assert!(parse_bool("True"));
        assert!(parse_bool("t"));
        assert!(parse_bool("-1"));
        assert!(parse_bool("2"));
    }

    #[test]
    fn test_parse_bool_falsy() {
        assert!(!parse_bool("0"));
        assert!(!parse_bool("no"));
        assert!(!parse_bool(""));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("off"));
    }
}
