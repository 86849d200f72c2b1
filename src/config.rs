//! Configuration recognized by the core (spec.md §6), passed in by the
//! Table/orchestrator. Mirrors the teacher's `DatabaseConfig`/`Config`
//! shape: a plain struct with an `impl Default`, constructed by the
//! caller — no env or file parsing happens inside this crate (that is
//! explicitly the CLI/orchestrator's job, per spec.md §1's non-goals).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::proof::RequirementsPolicy;

/// Read-only or read-write access to the store. Enforced by
/// `shard::Shard::ensure_open_locked`: any attempt to open a shard for
/// write (`insert`/`erase`/`split`/`advance(Write, ..)`) while `mode` is
/// `ReadOnly` fails with `ShardError::ReadOnly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    ReadOnly,
    ReadWrite,
}

/// Tunables shared by every shard under one table. Deserializable on its
/// own (the orchestrator is expected to load this from whatever config
/// file format it uses and hand it in); the policy field isn't, since a
/// trait object can't round-trip through serde — it defaults to
/// `FlatPolicy` and callers that want `TieredPolicy` set it after
/// deserializing.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub mode: Mode,

    /// Divisor used to guard the 32-bit cache-budget memory estimate; see
    /// `shard::reserve_capacity`.
    pub maximum_active_shards: u32,
    pub minimum_active_shards: u32,

    /// Used by the write-open reserve heuristic (spec.md §4.E).
    pub maximum_shard_size: u64,

    /// Seconds per age step in the reserve-halving heuristic.
    pub forward_granularity: u32,

    /// Whether `insert` must fetch-and-compare an existing id before
    /// overwriting it (spec.md §4.E, "Reinsertion validation").
    pub reinsertion_validation: bool,

    /// Proof-of-work requirements policy (spec.md §9, Open Question 2).
    #[serde(skip, default = "default_requirements_policy")]
    pub requirements_policy: Arc<dyn RequirementsPolicy>,
}

fn default_requirements_policy() -> Arc<dyn RequirementsPolicy> {
    Arc::new(crate::proof::FlatPolicy)
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("mode", &self.mode)
            .field("maximum_active_shards", &self.maximum_active_shards)
            .field("minimum_active_shards", &self.minimum_active_shards)
            .field("maximum_shard_size", &self.maximum_shard_size)
            .field("forward_granularity", &self.forward_granularity)
            .field("reinsertion_validation", &self.reinsertion_validation)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mode: Mode::ReadWrite,
            maximum_active_shards: 64,
            minimum_active_shards: 4,
            maximum_shard_size: 64 * 1024 * 1024,
            forward_granularity: 3600,
            reinsertion_validation: true,
            requirements_policy: Arc::new(crate::proof::FlatPolicy),
        }
    }
}
