//! Sharded, append-mostly store for signed, proof-of-work-backed entries.
//!
//! An entry is a small, immutable, content-addressed record: a 32-byte id,
//! a 32-byte parent reference, a 64-byte Ed25519ph signature, and a
//! variable-length content blob ending in a proof-of-work trailer. The
//! store itself never parses application content — just the fixed header
//! and the proof — and never does networking, so wiring this into an
//! actual peer-to-peer node is left to the caller (see `SPEC_FULL.md`).
//!
//! Module map:
//! - [`consensus`] — wire-compatible constants, the injectable clock.
//! - [`id`] — `Identity`/`Id`, the 32-byte sortable entry identifier.
//! - [`entry`] — the entry record view/builder and announcement classification.
//! - [`proof`] — the proof-of-work trailer: locate, verify, generate.
//! - [`sign`] — Ed25519ph prehash signing/verification over an entry.
//! - [`validator`] — consensus-level acceptance checks (spec.md §4.C).
//! - [`file`] — positional file I/O (component D).
//! - [`key`] — the fixed-size index row stored per entry.
//! - [`shard`] — one time-bounded slice of the store (component E).
//! - [`table`] — the directory of shards (component F).
//! - [`threadpool`] — the worker pool and join barrier (component G).
//! - [`config`] — caller-supplied tunables.
//! - [`error`] — the crate's error types.

pub mod config;
pub mod consensus;
pub mod entry;
pub mod error;
pub mod file;
pub mod id;
pub mod key;
pub mod proof;
pub mod shard;
pub mod sign;
pub mod table;
pub mod threadpool;
pub mod validator;

pub use config::Config;
pub use consensus::{Clock, FixedClock, SystemClock, Timestamp};
pub use entry::{AnnouncementType, EntryBuilder, EntryView};
pub use error::{Result, StoreError};
pub use id::{Id, Identity};
pub use key::Key;
pub use shard::{Shard, What};
pub use table::Table;
