//! Textual scalar decoding: turning a YAML scalar's source text into the
//! typed value a schema node expects, with the same base-autodetect and
//! range-checking behavior as the original `strtoll`-based decoder.

use crate::error::LoadError;

fn split_sign(text: &str) -> (bool, &str) {
    match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    }
}

fn split_radix(text: &str) -> (u32, &str) {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (16, hex)
    } else if text.len() > 1 && text.starts_with('0') {
        (8, &text[1..])
    } else {
        (10, text)
    }
}

fn parse_magnitude(text: &str) -> Result<i128, LoadError> {
    let (radix, digits) = split_radix(text);
    if digits.is_empty() {
        return Err(LoadError::InvalidValue(format!("{text:?} is not an integer")));
    }
    i128::from_str_radix(digits, radix)
        .map_err(|_| LoadError::InvalidValue(format!("{text:?} is not an integer")))
}

/// Parses a signed integer scalar, rejecting values outside the two's
/// complement range representable in `width` bytes.
pub(crate) fn parse_int(text: &str, width: usize) -> Result<i64, LoadError> {
    let (negative, rest) = split_sign(text.trim());
    let magnitude = parse_magnitude(rest)?;
    let value = if negative { -magnitude } else { magnitude };
    let min = -(1i128 << (8 * width - 1));
    let max = (1i128 << (8 * width - 1)) - 1;
    if value < min || value > max {
        return Err(LoadError::InvalidValue(format!(
            "{text:?} is out of range for a {width}-byte signed integer"
        )));
    }
    Ok(value as i64)
}

/// Parses an unsigned integer scalar. A leading `-` is always out of range.
pub(crate) fn parse_uint(text: &str, width: usize) -> Result<u64, LoadError> {
    let (negative, rest) = split_sign(text.trim());
    let magnitude = parse_magnitude(rest)?;
    if negative && magnitude != 0 {
        return Err(LoadError::InvalidValue(format!(
            "{text:?} is out of range for a {width}-byte unsigned integer"
        )));
    }
    let max = if width >= 16 {
        i128::MAX
    } else {
        (1i128 << (8 * width)) - 1
    };
    if magnitude > max {
        return Err(LoadError::InvalidValue(format!(
            "{text:?} is out of range for a {width}-byte unsigned integer"
        )));
    }
    Ok(magnitude as u64)
}

/// Parses a YAML-conventional boolean scalar: `true`/`false`, `yes`/`no`,
/// `on`/`off`, case-insensitively.
pub(crate) fn parse_bool(text: &str) -> Result<bool, LoadError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        _ => Err(LoadError::InvalidValue(format!("{text:?} is not a boolean"))),
    }
}

/// Resolves scalar text against a schema-supplied enum value list.
pub(crate) fn parse_enum(text: &str, values: &[(&str, i64)]) -> Result<i64, LoadError> {
    let text = text.trim();
    values
        .iter()
        .find(|(name, _)| *name == text)
        .map(|(_, value)| *value)
        .ok_or_else(|| LoadError::InvalidValue(format!("{text:?} is not a recognized enum value")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decimal_and_hex_and_octal() {
        assert_eq!(parse_int("7", 4).unwrap(), 7);
        assert_eq!(parse_int("0x1F", 4).unwrap(), 0x1F);
        assert_eq!(parse_int("010", 4).unwrap(), 8);
        assert_eq!(parse_int("-5", 4).unwrap(), -5);
    }

    #[test]
    fn int_width_overflow() {
        assert!(parse_int("40000", 2).is_err());
        assert!(parse_int("32767", 2).is_ok());
        assert!(parse_int("-32768", 2).is_ok());
        assert!(parse_int("-32769", 2).is_err());
    }

    #[test]
    fn uint_rejects_negative() {
        assert!(parse_uint("-1", 4).is_err());
        assert!(parse_uint("255", 1).is_ok());
        assert!(parse_uint("256", 1).is_err());
    }

    #[test]
    fn bool_variants() {
        assert_eq!(parse_bool("yes").unwrap(), true);
        assert_eq!(parse_bool("NO").unwrap(), false);
        assert_eq!(parse_bool("On").unwrap(), true);
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn enum_lookup() {
        let values = [("RED", 1i64), ("GREEN", 2)];
        assert_eq!(parse_enum("RED", &values).unwrap(), 1);
        assert!(parse_enum("BLUE", &values).is_err());
    }
}
