//! Change notifications and the toasts they raise.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use soko_core::{OrderStatus, RideStatus};

/// A watched table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feed {
    Orders,
    Chats,
    Drivers,
    Rides,
}

impl Feed {
    /// Every feed the bridge listens on.
    pub const ALL: [Self; 4] = [Self::Orders, Self::Chats, Self::Drivers, Self::Rides];

    /// Feed name as used in `?feeds=` and as the SSE event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Chats => "chats",
            Self::Drivers => "drivers",
            Self::Rides => "rides",
        }
    }

    /// `LISTEN` channel the trigger notifies on.
    #[must_use]
    pub const fn channel(self) -> &'static str {
        match self {
            Self::Orders => "orders_changes",
            Self::Chats => "chats_changes",
            Self::Drivers => "drivers_changes",
            Self::Rides => "rides_changes",
        }
    }

    /// Parse a comma-separated feed list. Empty input selects every feed.
    ///
    /// # Errors
    ///
    /// Returns the first unknown feed name.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, String> {
        let feeds = input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        if feeds.is_empty() {
            Ok(Self::ALL.to_vec())
        } else {
            Ok(feeds)
        }
    }
}

impl FromStr for Feed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|feed| feed.as_str() == s)
            .ok_or_else(|| format!("unknown feed: {s}"))
    }
}

impl std::fmt::Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row operation that fired the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

/// Payload published by the `notify_change()` trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    #[serde(rename = "type")]
    pub change: ChangeType,
    /// New row; absent on delete.
    #[serde(default)]
    pub record: Option<serde_json::Value>,
    /// Previous row; absent on insert.
    #[serde(default)]
    pub old_record: Option<serde_json::Value>,
    /// Rows too large for a notification carry only their key columns.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl ChangeEvent {
    /// The new row's `status` column, if it has one.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.record.as_ref()?.get("status")?.as_str()
    }
}

/// Order statuses worth interrupting the user for.
const ORDER_TOAST_STATUSES: &[OrderStatus] = &[
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
];

/// Ride statuses worth interrupting the user for.
const RIDE_TOAST_STATUSES: &[RideStatus] = &[
    RideStatus::Accepted,
    RideStatus::Arrived,
    RideStatus::InProgress,
    RideStatus::Completed,
    RideStatus::Cancelled,
];

/// Toast text for a change, if it deserves one.
///
/// Order and ride toasts fire on updates into a user-visible status; every
/// new chat message toasts; driver movements never do.
#[must_use]
pub fn toast_for(feed: Feed, event: &ChangeEvent) -> Option<String> {
    match (feed, event.change) {
        (Feed::Orders, ChangeType::Update) => {
            let status: OrderStatus = event.status()?.parse().ok()?;
            ORDER_TOAST_STATUSES
                .contains(&status)
                .then(|| format!("Order {}", humanize(status.as_str())))
        }
        (Feed::Rides, ChangeType::Update) => {
            let status: RideStatus = event.status()?.parse().ok()?;
            RIDE_TOAST_STATUSES
                .contains(&status)
                .then(|| format!("Ride {}", humanize(status.as_str())))
        }
        (Feed::Chats, ChangeType::Insert) => Some("New message".to_string()),
        _ => None,
    }
}

fn humanize(status: &str) -> String {
    status.replace('_', " ")
}

/// A change republished to subscribers, with the toast already decided.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeEvent {
    pub feed: Feed,
    pub event: ChangeEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toast: Option<String>,
}

impl BridgeEvent {
    /// Build from a raw `NOTIFY` payload received on `feed`'s channel.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the payload is not a change event.
    pub fn from_notification(feed: Feed, payload: &str) -> Result<Self, serde_json::Error> {
        let event: ChangeEvent = serde_json::from_str(payload)?;
        let toast = toast_for(feed, &event);
        Ok(Self { feed, event, toast })
    }
}
