//! Currency codes and price formatting.
//!
//! Amounts are always [`Decimal`]; floats never touch money.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Error returned when parsing an unsupported currency code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported currency code: {0}")]
pub struct CurrencyCodeError(pub String);

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(CurrencyCodeError(s.to_string())),
        }
    }
}

/// Format an amount for display (e.g., "$19.99", "-$5.00").
#[must_use]
pub fn format_amount(amount: Decimal, currency: CurrencyCode) -> String {
    let rounded = amount.round_dp(2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{}{:.2}", currency.symbol(), rounded.abs())
    } else {
        format!("{}{:.2}", currency.symbol(), rounded.abs())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::new(1999, 2), CurrencyCode::USD), "$19.99");
        assert_eq!(format_amount(Decimal::from(200), CurrencyCode::USD), "$200.00");
        assert_eq!(format_amount(Decimal::new(5, 1), CurrencyCode::GBP), "£0.50");
    }

    #[test]
    fn test_format_negative_amount() {
        assert_eq!(format_amount(Decimal::from(-5), CurrencyCode::EUR), "-€5.00");
    }

    #[test]
    fn test_format_zero_has_no_sign() {
        assert_eq!(format_amount(Decimal::ZERO, CurrencyCode::USD), "$0.00");
    }

    #[test]
    fn test_parse_currency_code() {
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!(" GBP ".parse::<CurrencyCode>().unwrap(), CurrencyCode::GBP);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
