//! Price type
//!
//! Domain primitive for menu item prices with business rule validation.
//! All prices are validated at construction time, ensuring invalid values
//! cannot exist in the system.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum allowed price for a single menu item
const MAX_PRICE: &str = "100000";

/// Maximum decimal places (2, currency cents)
const MAX_SCALE: u32 = 2;

/// Price represents a validated menu item price.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Maximum 2 decimal places
/// - Maximum value is 100000
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use tavola::domain::Price;
///
/// let price = Price::new(Decimal::new(1250, 2)).unwrap();
/// assert_eq!(price.value(), Decimal::new(1250, 2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Price(Decimal);

/// Errors that can occur when creating a Price
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("Price must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Price has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Price exceeds maximum allowed value ({MAX_PRICE})")]
    Overflow,

    #[error("Invalid price format: {0}")]
    ParseError(String),
}

impl Price {
    /// Create a new Price with validation.
    ///
    /// # Errors
    /// - `PriceError::NotPositive` if value <= 0
    /// - `PriceError::TooManyDecimals` if more than 2 decimal places
    /// - `PriceError::Overflow` if value > 100000
    pub fn new(value: Decimal) -> Result<Self, PriceError> {
        // Rule 1: Must be positive
        if value <= Decimal::ZERO {
            return Err(PriceError::NotPositive(value));
        }

        // Rule 2: Maximum 2 decimal places
        if value.scale() > MAX_SCALE {
            return Err(PriceError::TooManyDecimals(value.scale()));
        }

        // Rule 3: Maximum single item price
        let max = Decimal::from_str(MAX_PRICE).expect("Invalid MAX_PRICE constant");
        if value > max {
            return Err(PriceError::Overflow);
        }

        Ok(Self(value))
    }

    /// Create a Price from an integer (no decimal places).
    pub fn from_integer(value: i64) -> Result<Self, PriceError> {
        Self::new(Decimal::from(value))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

/// Total for `quantity` units at `unit_price`.
///
/// Cart pricing and order snapshots both go through here, so the line
/// arithmetic has a single definition.
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s)
            .map_err(|e| PriceError::ParseError(e.to_string()))?;
        Price::new(decimal)
    }
}

impl TryFrom<String> for Price {
    type Error = PriceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Price::from_str(&value)
    }
}

impl From<Price> for String {
    fn from(price: Price) -> Self {
        format!("{:.2}", price.0)
    }
}
