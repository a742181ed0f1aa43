use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};

/// Fractional digits the ledger stores for any amount.
pub const MAX_SCALE: u32 = 6;
pub const MAX_AMOUNT: i64 = 1_000_000_000;
pub const MAX_REFERENCE_LEN: usize = 128;

pub fn validate_amount(amount: Decimal) -> LedgerResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation("amount must be positive"));
    }
    if amount > Decimal::from(MAX_AMOUNT) {
        return Err(LedgerError::validation(format!(
            "amount exceeds maximum of {MAX_AMOUNT}"
        )));
    }
    let normalized = amount.normalize();
    if normalized.scale() > MAX_SCALE {
        return Err(LedgerError::validation(format!(
            "amount supports at most {MAX_SCALE} decimal places"
        )));
    }
    Ok(normalized)
}

pub fn parse_amount(value: &str) -> LedgerResult<Decimal> {
    let parsed = Decimal::from_str(value.trim())
        .map_err(|_| LedgerError::validation(format!("invalid amount: {value}")))?;
    validate_amount(parsed)
}

/// Uppercases an ISO-4217 style code (`usd` -> `USD`). Crypto tickers up to
/// five letters are accepted as well.
pub fn normalize_currency(value: &str) -> LedgerResult<String> {
    let trimmed = value.trim();
    if !(3..=5).contains(&trimmed.len()) || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(LedgerError::validation(format!("invalid currency code: {value}")));
    }
    Ok(trimmed.to_ascii_uppercase())
}

pub fn sanitize_reference(value: &str) -> LedgerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation("transaction reference cannot be empty"));
    }
    if trimmed.len() > MAX_REFERENCE_LEN {
        return Err(LedgerError::validation(format!(
            "transaction reference exceeds {MAX_REFERENCE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_must_be_positive_and_bounded() {
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(Decimal::from(-5)).is_err());
        assert!(validate_amount(Decimal::from(MAX_AMOUNT + 1)).is_err());
        assert_eq!(validate_amount(Decimal::new(2500, 2)).unwrap(), Decimal::from(25));
    }

    #[test]
    fn excess_precision_is_rejected() {
        assert!(parse_amount("0.0000001").is_err());
        assert_eq!(parse_amount("0.000001").unwrap(), Decimal::new(1, 6));
    }

    #[test]
    fn amount_strings_parse() {
        assert_eq!(parse_amount(" 25.00 ").unwrap(), Decimal::from(25));
        assert!(parse_amount("twenty").is_err());
        assert!(parse_amount("").is_err());
    }

    #[test]
    fn currency_codes_normalize() {
        assert_eq!(normalize_currency("usd").unwrap(), "USD");
        assert_eq!(normalize_currency("USDC").unwrap(), "USDC");
        assert!(normalize_currency("US").is_err());
        assert!(normalize_currency("U$D").is_err());
    }

    #[test]
    fn references_are_trimmed_and_bounded() {
        assert_eq!(sanitize_reference(" 0xabc ").unwrap(), "0xabc");
        assert!(sanitize_reference("   ").is_err());
        assert!(sanitize_reference(&"a".repeat(MAX_REFERENCE_LEN + 1)).is_err());
    }
}
