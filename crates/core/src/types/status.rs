//! Status enums for orders and payments.
//!
//! Both enums map to Postgres enum types (`order_status`,
//! `payment_status`) created by the server's migrations. Checkout
//! fulfillment only ever creates records in the `completed` state; the
//! failure states are applied afterwards by webhook events.

use serde::{Deserialize, Serialize};

/// Website order status.
///
/// Orders are created `completed` by checkout fulfillment and move to
/// `cancelled` when the provider reports the underlying payment failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Fulfillment committed; the website order is live.
    Completed,
    /// The linked payment failed after fulfillment; order withdrawn.
    Cancelled,
}

impl OrderStatus {
    /// Stable lowercase name, matching the Postgres enum label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// The charge was captured.
    Completed,
    /// The provider reported the charge failed.
    Failed,
}

impl PaymentStatus {
    /// Stable lowercase name, matching the Postgres enum label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names_match_postgres_labels() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(OrderStatus::Completed.to_string(), "completed");
        assert_eq!(PaymentStatus::Completed.to_string(), "completed");
    }
}
