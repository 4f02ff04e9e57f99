//! Monetary amounts in minor units.
//!
//! All monetary arithmetic in this core is integer arithmetic over the
//! smallest currency denomination (cents for EUR). Floating point never
//! touches an amount.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// A monetary amount in minor units (e.g. cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(i64);

impl MinorUnits {
    /// Zero amount.
    pub const ZERO: MinorUnits = MinorUnits(0);

    /// Wraps a raw minor-unit amount.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Saturating addition; amounts never wrap.
    pub fn plus(&self, other: MinorUnits) -> MinorUnits {
        MinorUnits(self.0.saturating_add(other.0))
    }

    /// Multiplies by an integer factor (e.g. day count, quantity).
    pub fn times(&self, factor: i64) -> MinorUnits {
        MinorUnits(self.0.saturating_mul(factor))
    }

    /// Absolute difference between two amounts.
    pub fn abs_diff(&self, other: MinorUnits) -> i64 {
        (self.0 - other.0).abs()
    }

    /// Renders as a decimal string in major units ("50000" -> "500.00"),
    /// the format the hosted-fields gateway expects for `importo`.
    pub fn as_decimal_string(&self) -> String {
        format!("{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }

    /// Parses a gateway decimal string ("500.00") back into minor units.
    pub fn parse_decimal(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::invalid_format("amount", format!("'{}'", s));

        let (major, minor) = match s.split_once('.') {
            Some((major, minor)) if minor.len() == 2 => (major, minor),
            Some(_) => return Err(invalid()),
            None => (s, "00"),
        };
        // Digits only; `i64::parse` alone would admit "-7" as a minor part.
        if major.is_empty()
            || !major.bytes().all(|b| b.is_ascii_digit())
            || !minor.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let major: i64 = major.parse().map_err(|_| invalid())?;
        let minor: i64 = minor.parse().map_err(|_| invalid())?;
        major
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(minor))
            .map(MinorUnits)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Creates a currency from a three-letter ISO 4217 code.
    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into().to_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                "expected a three-letter ISO 4217 code",
            ));
        }
        Ok(Self(code))
    }

    /// Euro, the default settlement currency.
    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric ISO code the legacy gateway generation expects for `divisa`.
    pub fn numeric_code(&self) -> &str {
        match self.0.as_str() {
            "EUR" => "978",
            "USD" => "840",
            "GBP" => "826",
            _ => "978",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
