//! Menu categories and order lifecycle states
//!
//! String-backed enums stored as text columns. Parsing is strict so that
//! unknown values coming from clients are rejected at the boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::DomainError;

/// Section of the menu an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuItemCategory {
    Starter,
    Soup,
    MainCourse,
    Dessert,
    Drink,
}

impl MenuItemCategory {
    /// Stable string form used in the database and API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Soup => "soup",
            Self::MainCourse => "main_course",
            Self::Dessert => "dessert",
            Self::Drink => "drink",
        }
    }

    /// All known categories, in menu display order.
    pub fn all() -> &'static [MenuItemCategory] {
        &[
            Self::Starter,
            Self::Soup,
            Self::MainCourse,
            Self::Dessert,
            Self::Drink,
        ]
    }
}

impl fmt::Display for MenuItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MenuItemCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starter" => Ok(Self::Starter),
            "soup" => Ok(Self::Soup),
            "main_course" => Ok(Self::MainCourse),
            "dessert" => Ok(Self::Dessert),
            "drink" => Ok(Self::Drink),
            other => Err(DomainError::UnknownCategory(other.to_string())),
        }
    }
}

/// Lifecycle state of a placed order.
///
/// Orders start in `Received`. Staff move them through the remaining
/// states; any known state may be set directly so mistakes can be
/// corrected without a forced path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Received,
    Preparing,
    Delivering,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Stable string form used in the database and API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Preparing => "preparing",
            Self::Delivering => "delivering",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(Self::Received),
            "preparing" => Ok(Self::Preparing),
            "delivering" => Ok(Self::Delivering),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::UnknownOrderStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for category in MenuItemCategory::all() {
            let parsed: MenuItemCategory = category.as_str().parse().unwrap();
            assert_eq!(parsed, *category);
        }
    }

    #[test]
    fn test_category_unknown_rejected() {
        let result: Result<MenuItemCategory, _> = "sushi".parse();
        assert!(matches!(result, Err(DomainError::UnknownCategory(_))));
    }

    #[test]
    fn test_category_serde_snake_case() {
        let json = serde_json::to_string(&MenuItemCategory::MainCourse).unwrap();
        assert_eq!(json, "\"main_course\"");
    }

    #[test]
    fn test_order_status_round_trip() {
        for s in ["received", "preparing", "delivering", "completed", "cancelled"] {
            let status: OrderStatus = s.parse().unwrap();
            assert_eq!(status.as_str(), s);
        }
    }

    #[test]
    fn test_order_status_unknown_rejected() {
        let result: Result<OrderStatus, _> = "shipped".parse();
        assert!(matches!(result, Err(DomainError::UnknownOrderStatus(_))));
    }
}
