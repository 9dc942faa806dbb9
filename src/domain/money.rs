use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// An expense of 4.50 is stored as 450.
pub type Cents = i64;

/// Largest amount a single expense may carry: 10 billion in major units.
/// Keeps sums over any realistic ledger far from `Cents::MAX`.
pub const MAX_AMOUNT_CENTS: Cents = 1_000_000_000_000;

/// Format cents as a plain decimal string.
/// Example: 450 -> "4.50", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a user-entered amount into cents.
///
/// Accepts "4.5", "4.50", "4", ".99". Extra decimal places are truncated.
/// The result must be strictly positive and at most [`MAX_AMOUNT_CENTS`].
pub fn parse_amount(input: &str) -> Result<Cents, ParseAmountError> {
    let input = input.trim();
    if input.starts_with('-') {
        return Err(ParseAmountError::NotPositive);
    }

    let (units_str, decimals_str) = match input.split_once('.') {
        Some((units, decimals)) => (units, decimals),
        None => (input, ""),
    };

    if units_str.is_empty() && decimals_str.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !decimals_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseAmountError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        // Only digits remain, so a parse failure means the value overflowed
        units_str.parse().map_err(|_| ParseAmountError::TooLarge)?
    };

    // "5" means 50 cents, "567" truncates to 56
    let mut digits = decimals_str.chars().chain(std::iter::repeat('0')).take(2);
    let tens = digits.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;
    let ones = digits.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(tens * 10 + ones))
        .ok_or(ParseAmountError::TooLarge)?;

    if cents == 0 {
        return Err(ParseAmountError::NotPositive);
    }
    if cents > MAX_AMOUNT_CENTS {
        return Err(ParseAmountError::TooLarge);
    }
    Ok(cents)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    InvalidFormat,
    NotPositive,
    TooLarge,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::InvalidFormat => write!(f, "invalid amount format"),
            ParseAmountError::NotPositive => write!(f, "amount must be greater than zero"),
            ParseAmountError::TooLarge => {
                write!(f, "amount must not exceed {}", format_cents(MAX_AMOUNT_CENTS))
            }
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(450), "4.50");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-1234), "-12.34");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("4.5"), Ok(450));
        assert_eq!(parse_amount("4.50"), Ok(450));
        assert_eq!(parse_amount("20"), Ok(2000));
        assert_eq!(parse_amount(".99"), Ok(99));
        assert_eq!(parse_amount(" 10.00 "), Ok(1000));
        assert_eq!(parse_amount("3.999"), Ok(399)); // Truncates
    }

    #[test]
    fn test_parse_amount_rejects_non_positive() {
        assert_eq!(parse_amount("0"), Err(ParseAmountError::NotPositive));
        assert_eq!(parse_amount("0.00"), Err(ParseAmountError::NotPositive));
        assert_eq!(parse_amount("-5"), Err(ParseAmountError::NotPositive));
    }

    #[test]
    fn test_parse_amount_invalid() {
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("1.2.3").is_err());
        assert!(parse_amount("").is_err());
        assert!(parse_amount(".").is_err());
        assert!(parse_amount("1e3").is_err());
    }

    #[test]
    fn test_parse_amount_rejects_oversized() {
        assert_eq!(parse_amount("10000000000"), Ok(MAX_AMOUNT_CENTS));
        assert_eq!(parse_amount("10000000000.01"), Err(ParseAmountError::TooLarge));
        assert_eq!(parse_amount("90000000000000000"), Err(ParseAmountError::TooLarge));
        assert_eq!(
            parse_amount("99999999999999999999999"),
            Err(ParseAmountError::TooLarge)
        );
    }
}
