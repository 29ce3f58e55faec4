//! Atelier Core Library
//!
//! Models, booking rules, order fulfillment, permissions, and storage for the
//! Atelier craft-studio platform.

pub mod accounts;
pub mod catalog;
pub mod checkin;
pub mod directory;
pub mod error;
pub mod fulfillment;
pub mod invariants;
pub mod ledger;
pub mod models;
pub mod permissions;
pub mod policy;
pub mod shop;
pub mod storage;

#[cfg(test)]
mod fixtures;

pub use accounts::{Accounts, DEFAULT_TOKEN_TTL_HOURS};
pub use catalog::{days_until, EventCatalog, SessionCatalog};
pub use checkin::CheckInVerifier;
pub use directory::BranchDirectory;
pub use error::{Error, Result};
pub use fulfillment::{generate_tracking_number, FulfillmentTracker};
pub use ledger::{generate_qr_code, BookingLedger};
pub use models::*;
pub use permissions::*;
pub use policy::{CatalogPolicy, FulfillmentPolicy};
pub use shop::ProductCatalog;
pub use storage::Database;
