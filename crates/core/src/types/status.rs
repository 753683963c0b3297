//! Status enums for marketplace entities.
//!
//! These mirror the enum domains of the database schema. Order and ride
//! statuses additionally carry their transition rules so that every code path
//! that moves an entity along its lifecycle checks the same table.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Implements `as_str`, `Display` and `FromStr` for a unit-only enum using the
/// given wire names.
macro_rules! wire_names {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The snake_case name used on the wire and in the database.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", stringify!($ty), ": {}"), s)),
                }
            }
        }
    };
}

/// Role tag on a user account selecting which dashboard applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    Seller,
    Driver,
    /// Restaurant operator.
    Restaurant,
    /// Lists rental or sale properties.
    PropertySeller,
    Admin,
}

wire_names!(UserRole {
    Customer => "customer",
    Seller => "seller",
    Driver => "driver",
    Restaurant => "restaurant",
    PropertySeller => "property_seller",
    Admin => "admin",
});

/// Error returned when a status change is not allowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move {entity} from {from} to {to}")]
pub struct StatusTransitionError {
    /// Entity kind ("order", "ride").
    pub entity: &'static str,
    /// Current status.
    pub from: &'static str,
    /// Requested status.
    pub to: &'static str,
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Shipped,
    Delivered,
    Cancelled,
}

wire_names!(OrderStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Preparing => "preparing",
    Ready => "ready",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Position along the fulfilment path. `Cancelled` has none.
    const fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Preparing => Some(2),
            Self::Ready => Some(3),
            Self::Shipped => Some(4),
            Self::Delivered => Some(5),
            Self::Cancelled => None,
        }
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether an order may move from `self` to `next`.
    ///
    /// Orders only move forward. Steps may be skipped (a product order goes
    /// from `confirmed` straight to `shipped`), and any non-terminal order can
    /// be cancelled.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }

    /// Validate a transition, returning a descriptive error when it is illegal.
    ///
    /// # Errors
    ///
    /// Returns `StatusTransitionError` if `next` is not reachable from `self`.
    pub const fn transition(self, next: Self) -> Result<Self, StatusTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                entity: "order",
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

/// Payment state recorded on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

wire_names!(PaymentStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

/// Ride lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "ride_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    #[default]
    Requested,
    Accepted,
    Arrived,
    InProgress,
    Completed,
    Cancelled,
}

wire_names!(RideStatus {
    Requested => "requested",
    Accepted => "accepted",
    Arrived => "arrived",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl RideStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a ride may move from `self` to `next`.
    ///
    /// Rides advance one step at a time; a trip cannot be completed before it
    /// has started. Any non-terminal ride can be cancelled.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Accepted)
                | (Self::Accepted, Self::Arrived)
                | (Self::Arrived, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (
                    Self::Requested | Self::Accepted | Self::Arrived | Self::InProgress,
                    Self::Cancelled
                )
        )
    }

    /// Validate a transition, returning a descriptive error when it is illegal.
    ///
    /// # Errors
    ///
    /// Returns `StatusTransitionError` if `next` is not reachable from `self`.
    pub const fn transition(self, next: Self) -> Result<Self, StatusTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                entity: "ride",
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

/// Ledger transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "transaction_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

wire_names!(TransactionStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Refunded => "refunded",
});

/// Payment rail a transaction went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "transaction_provider", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionProvider {
    Mpesa,
    Card,
    Wallet,
    Cash,
}

wire_names!(TransactionProvider {
    Mpesa => "mpesa",
    Card => "card",
    Wallet => "wallet",
    Cash => "cash",
});

/// Know-your-customer verification state for drivers and sellers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "kyc_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

wire_names!(KycStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// How fast an errand must be run. Drives the errand price multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
    Express,
}

wire_names!(Urgency {
    Normal => "normal",
    Urgent => "urgent",
    Express => "express",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_forward_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_order_cannot_go_backwards() {
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Confirmed));
    }

    #[test]
    fn test_order_terminal_states_are_final() {
        for next in OrderStatus::ALL {
            assert!(!OrderStatus::Delivered.can_transition_to(*next));
            assert!(!OrderStatus::Cancelled.can_transition_to(*next));
        }
    }

    #[test]
    fn test_order_cancel_from_any_open_state() {
        for from in OrderStatus::ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(from.can_transition_to(OrderStatus::Cancelled), "{from}");
        }
    }

    #[test]
    fn test_order_transition_error_message() {
        let err = OrderStatus::Delivered
            .transition(OrderStatus::Pending)
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot move order from delivered to pending");
    }

    #[test]
    fn test_ride_steps_one_at_a_time() {
        assert!(RideStatus::Requested.can_transition_to(RideStatus::Accepted));
        assert!(!RideStatus::Requested.can_transition_to(RideStatus::InProgress));
        assert!(!RideStatus::Accepted.can_transition_to(RideStatus::Completed));
        assert!(RideStatus::InProgress.can_transition_to(RideStatus::Completed));
        assert!(RideStatus::Arrived.can_transition_to(RideStatus::Cancelled));
        assert!(!RideStatus::Completed.can_transition_to(RideStatus::Cancelled));
    }

    #[test]
    fn test_wire_names_round_trip() {
        assert_eq!(RideStatus::InProgress.to_string(), "in_progress");
        assert_eq!(
            "property_seller".parse::<UserRole>(),
            Ok(UserRole::PropertySeller)
        );
        assert!("shipped".parse::<RideStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&RideStatus::InProgress).expect("serialize");
        assert_eq!(json, "\"in_progress\"");
        let provider: TransactionProvider = serde_json::from_str("\"mpesa\"").expect("parse");
        assert_eq!(provider, TransactionProvider::Mpesa);
    }
}
