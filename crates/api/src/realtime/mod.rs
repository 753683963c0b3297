//! Real-time change feed.
//!
//! # Architecture
//!
//! ```text
//! PostgreSQL trigger           RealtimeBridge             EventHub            SSE clients
//!        │                           │                        │                    │
//!        ├─ pg_notify(orders_changes)►                        │                    │
//!        │                           ├─ parse + toast rules   │                    │
//!        │                           ├─ publish(BridgeEvent) ─►                    │
//!        │                           │                        ├─ fan out ─────────►│
//! ```
//!
//! One `LISTEN` connection is held per feed. [`RealtimeBridge::start`] returns
//! a [`BridgeHandle`]; dropping it or calling
//! [`BridgeHandle::unsubscribe`] closes every listener.

pub mod bridge;
pub mod event;
pub mod hub;

pub use bridge::{BridgeHandle, RealtimeBridge};
pub use event::{BridgeEvent, ChangeEvent, ChangeType, Feed};
pub use hub::EventHub;
