//! Prices are kept as integer cents and exchanged as decimal strings.

/// Parse a non-negative decimal amount with at most two fraction digits into cents.
pub fn parse_cents(input: &str) -> Result<i64, String> {
    let input = input.trim();
    let (whole, fraction) = match input.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (input, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err("Invalid price format".to_string());
    }
    if !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err("Invalid price format".to_string());
    }
    if fraction.len() > 2 {
        return Err("Prices have at most two decimal places".to_string());
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| "Price is too large".to_string())?
    };
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().unwrap_or(0) * 10,
        _ => fraction.parse().unwrap_or(0),
    };

    whole
        .checked_mul(100)
        .and_then(|cents| cents.checked_add(fraction))
        .ok_or_else(|| "Price is too large".to_string())
}

pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(parse_cents("12"), Ok(1200));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents("12.05"), Ok(1205));
        assert_eq!(parse_cents(".99"), Ok(99));
        assert_eq!(parse_cents(" 0.00 "), Ok(0));
    }

    #[test]
    fn rejects_malformed_amounts() {
        assert!(parse_cents("").is_err());
        assert!(parse_cents(".").is_err());
        assert!(parse_cents("-1").is_err());
        assert!(parse_cents("1.234").is_err());
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("1e3").is_err());
        assert!(parse_cents("99999999999999999999").is_err());
    }

    #[test]
    fn formats_with_two_decimals() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(123456), "1234.56");
        assert_eq!(format_cents(-250), "-2.50");
    }
}
