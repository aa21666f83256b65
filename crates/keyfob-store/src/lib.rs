//! `keyfob-store` — Encrypted client record store for keyfob.
//!
//! Owns the `ClientRecord` collection, serializes it to deterministic
//! JSON, and persists it through the passphrase-keyed AES-256-CBC file
//! format implemented in `keyfob-crypto-core`.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;

pub mod record;

pub mod store;

pub use error::StoreError;
pub use record::{min_update_time, ClientRecord, ClientRecordParams, OtpMode};
pub use store::{GeneratedCode, RecordStore};
