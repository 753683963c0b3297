//! Soko Core - Shared domain types.
//!
//! This crate provides the types shared by every Soko component:
//! - `api` - Marketplace backend (payments, assistant relay, change feed)
//! - `cli` - Command-line tools for migrations and quick price checks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Phone normalization and price calculations live
//! here so the server and the CLI agree on them.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, status enums, phone numbers, money and pricing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
