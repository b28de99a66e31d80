//! Validation of duration-valued provisioner attributes.
//!
//! Durations are stored in the authority configuration as strings using the same syntax the CA
//! server parses, i.e., a possibly signed sequence of decimal numbers, each with optional fraction
//! and a unit suffix, such as "300ms", "-1.5h" or "2h45m". Valid time units are "ns", "us" (or "µs"),
//! "ms", "s", "m", "h".

use crate::util::error::*;

const NANOSECOND: u128 = 1;
const MICROSECOND: u128 = 1_000 * NANOSECOND;
const MILLISECOND: u128 = 1_000 * MICROSECOND;
const SECOND: u128 = 1_000 * MILLISECOND;
const MINUTE: u128 = 60 * SECOND;
const HOUR: u128 = 60 * MINUTE;

// fractional digits beyond this precision do not contribute to a nanosecond result
const MAX_FRACTION_DIGITS: usize = 18;

fn unit_multiplier(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(NANOSECOND),
        "us" | "\u{00b5}s" | "\u{03bc}s" => Some(MICROSECOND),
        "ms" => Some(MILLISECOND),
        "s" => Some(SECOND),
        "m" => Some(MINUTE),
        "h" => Some(HOUR),
        _ => None,
    }
}

fn invalid(s: &str) -> Error {
    Error::InvalidArgument(format!("time: invalid duration \"{}\"", s))
}

/// `parse_duration` parses a duration string and returns the number of nanoseconds it represents.
///
/// ```
/// use provstore::parse_duration;
/// assert_eq!(parse_duration("1m30s").unwrap(), 90_000_000_000);
/// assert_eq!(parse_duration("-1.5h").unwrap(), -5_400_000_000_000);
/// assert!(parse_duration("10").is_err());
/// ```
pub fn parse_duration(s: &str) -> Result<i128> {
    let (negative, mut rest) = if let Some(r) = s.strip_prefix('-') {
        (true, r)
    } else if let Some(r) = s.strip_prefix('+') {
        (false, r)
    } else {
        (false, s)
    };

    if rest == "0" {
        return Ok(0);
    }
    if rest.is_empty() {
        return Err(invalid(s));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        // integer part
        let int_len = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
        let int_part = &rest[..int_len];
        rest = &rest[int_len..];

        // optional fraction
        let mut frac_part = "";
        if let Some(r) = rest.strip_prefix('.') {
            let frac_len = r.bytes().take_while(|b| b.is_ascii_digit()).count();
            frac_part = &r[..frac_len];
            rest = &r[frac_len..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid(s));
        }

        // unit runs until the next number
        let unit_len = rest
            .char_indices()
            .find(|(_, c)| *c == '.' || c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];
        let multiplier = match unit_multiplier(unit) {
            Some(m) => m,
            None => return Err(invalid(s)),
        };

        let mut value: u128 = 0;
        for b in int_part.bytes() {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u128::from(b - b'0')))
                .ok_or_else(|| invalid(s))?;
        }
        value = value.checked_mul(multiplier).ok_or_else(|| invalid(s))?;

        let mut frac: u128 = 0;
        let mut scale: u128 = 1;
        for b in frac_part.bytes().take(MAX_FRACTION_DIGITS) {
            frac = frac * 10 + u128::from(b - b'0');
            scale *= 10;
        }
        if frac > 0 {
            value = value
                .checked_add(frac * multiplier / scale)
                .ok_or_else(|| invalid(s))?;
        }

        total = total.checked_add(value).ok_or_else(|| invalid(s))?;
        if total > i64::MAX as u128 {
            return Err(invalid(s));
        }
    }

    let total = total as i128;
    Ok(if negative { -total } else { total })
}

/// `validate_duration` returns `value` unchanged if it parses as a duration, else an
/// [Error::InvalidDuration] naming the flag.
pub fn validate_duration(flag: &str, value: &str) -> Result<String> {
    match parse_duration(value) {
        Ok(_) => Ok(value.to_string()),
        Err(_) => Err(Error::InvalidDuration {
            flag: flag.to_string(),
            value: value.to_string(),
        }),
    }
}

/// `parse_instance_age` validates the maximum instance age used by cloud provisioners. The value
/// must be a duration that is not negative.
pub fn parse_instance_age(value: &str) -> Result<String> {
    let age = validate_duration("instance-age", value)?;
    if parse_duration(&age)? < 0 {
        return Err(Error::InvalidArgument(format!(
            "value '{}' of 'instance-age' must be greater than or equal to 0s",
            value
        )));
    }
    Ok(age)
}

#[test]
fn parse_duration_units() {
    assert_eq!(Ok(0), parse_duration("0"));
    assert_eq!(Ok(0), parse_duration("-0"));
    assert_eq!(Ok(300_000_000), parse_duration("300ms"));
    assert_eq!(Ok(1_000), parse_duration("1us"));
    assert_eq!(Ok(1_000), parse_duration("1µs"));
    assert_eq!(Ok(1_000), parse_duration("1μs"));
    assert_eq!(Ok(5), parse_duration("5ns"));
    assert_eq!(Ok(2 * 3_600_000_000_000 + 45 * 60_000_000_000), parse_duration("2h45m"));
    assert_eq!(Ok(500_000_000), parse_duration(".5s"));
    assert_eq!(Ok(1_000_000_000), parse_duration("1.s"));
    assert_eq!(Ok(24 * 3_600_000_000_000), parse_duration("+24h"));
}

#[test]
fn parse_duration_rejects() {
    assert!(parse_duration("").is_err());
    assert!(parse_duration("-").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("1d").is_err());
    assert!(parse_duration(".s").is_err());
    assert!(parse_duration("h").is_err());
    assert!(parse_duration("3000000h").is_err());
}

#[test]
fn instance_age() {
    assert_eq!(Ok("1h".to_string()), parse_instance_age("1h"));
    assert_eq!(Ok("0s".to_string()), parse_instance_age("0s"));
    assert!(matches!(
        parse_instance_age("-1m"),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(
        Err(Error::InvalidDuration {
            flag: "instance-age".to_string(),
            value: "forever".to_string()
        }),
        parse_instance_age("forever")
    );
}
