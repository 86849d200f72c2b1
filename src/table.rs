//! Table (component F): the directory of shards. Owns shard naming
//! (`%08x`/`%08xd` hex basenames), routes an id to the shard whose time
//! range contains it, reconciles the on-disk shard set at startup, and
//! enforces the open-shard budget / size-triggered split policy described
//! in spec.md §4.F and §6.
//!
//! Shards are held behind `Arc` so a reference handed to a caller survives
//! independent of the table's own lock — mirrors the teacher's
//! `connection_pool`'s pattern of handing out pooled connections behind a
//! shared handle rather than transferring ownership across a lock.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::consensus::{Clock, Timestamp};
use crate::error::ShardError;
use crate::file::Access as FileAccess;
use crate::id::Id;
use crate::key::Key;
use crate::shard::{Shard, What};

/// Floor `ts` to the start of its `granularity`-second bucket. Shard bases
/// always land on one of these boundaries so a given timestamp maps to
/// exactly one shard.
fn floor_base(ts: Timestamp, granularity: u32) -> Timestamp {
    if granularity == 0 {
        ts
    } else {
        ts - (ts % granularity)
    }
}

/// Parse a shard index filename (`%08x`, no trailing `d`) into its base.
fn parse_index_name(name: &str) -> Option<Timestamp> {
    if name.len() != 8 || !name.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Timestamp::from_str_radix(name, 16).ok()
}

pub struct Table {
    dir: PathBuf,
    config: Config,
    shards: RwLock<BTreeMap<Timestamp, Arc<Shard>>>,
}

impl Table {
    /// Open (or create) a table rooted at `dir`, reconciling the shard set
    /// against whatever index files are already there.
    pub fn open(dir: impl AsRef<Path>, config: Config) -> Result<Table, ShardError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| ShardError::File(crate::error::FileError::Open(e)))?;

        let mut shards = BTreeMap::new();
        for entry in fs::read_dir(&dir).map_err(|e| ShardError::File(crate::error::FileError::Open(e)))? {
            let entry = entry.map_err(|e| ShardError::File(crate::error::FileError::Open(e)))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(base) = parse_index_name(name) {
                shards.entry(base).or_insert_with(|| Arc::new(Shard::new(base, dir.clone())));
            }
        }

        Ok(Table { dir, config, shards: RwLock::new(shards) })
    }

    pub fn shard_count(&self) -> usize {
        self.shards.read().len()
    }

    /// Return the shard whose bucket contains `ts`, creating one if the
    /// table has never seen that bucket before.
    pub fn shard_for(&self, ts: Timestamp) -> Arc<Shard> {
        let base = floor_base(ts, self.config.forward_granularity);
        if let Some(shard) = self.shards.read().get(&base) {
            return shard.clone();
        }
        let mut shards = self.shards.write();
        shards.entry(base).or_insert_with(|| Arc::new(Shard::new(base, self.dir.clone()))).clone()
    }

    /// Insert an already-validated, already-signed entry. Routes to the
    /// shard covering `key.id.timestamp`, opening/creating it as needed,
    /// then enforces the size-triggered split policy.
    pub fn insert(&self, entry_bytes: &[u8], key: Key, clock: &dyn Clock) -> Result<bool, ShardError> {
        let shard = self.shard_for(key.id.timestamp);
        let inserted = shard.insert(entry_bytes, key, &self.config, clock)?;
        if inserted {
            self.maybe_split(&shard, clock)?;
            self.enforce_active_shard_budget(clock);
        }
        Ok(inserted)
    }

    pub fn get(&self, id: Id, what: What, demand: u32, clock: &dyn Clock) -> Result<Option<Vec<u8>>, ShardError> {
        let shard = self.shard_for(id.timestamp);
        shard.get(id, what, demand, &self.config, clock)
    }

    /// Erase `id`. When `thorough` is set, the entry's payload bytes in the
    /// content file are zeroed in addition to the index row (spec.md §4.E,
    /// "Thorough erase").
    pub fn erase(&self, id: Id, thorough: bool, clock: &dyn Clock) -> Result<bool, ShardError> {
        let shard = self.shard_for(id.timestamp);
        shard.erase(id, thorough, &self.config, clock)
    }

    /// Walk every known shard's cache in base order, oldest first.
    pub fn enumerate_all(
        &self,
        mut callback: impl FnMut(&Key, Option<&[u8]>) -> bool,
        clock: &dyn Clock,
    ) -> Result<(), ShardError> {
        let bases: Vec<Timestamp> = self.shards.read().keys().copied().collect();
        for base in bases {
            let shard = self.shard_for(base);
            let mut keep_going = true;
            shard.enumerate(
                |key, data| {
                    keep_going = callback(key, data);
                    keep_going
                },
                &self.config,
                clock,
            )?;
            if !keep_going {
                break;
            }
        }
        Ok(())
    }

    /// If `shard` has grown past `maximum_shard_size`, split it at its
    /// midpoint in time and register the newly separated shard.
    fn maybe_split(&self, shard: &Arc<Shard>, clock: &dyn Clock) -> Result<(), ShardError> {
        let size = shard.size(&self.config, clock)?;
        let estimated_bytes = size as u64 * std::mem::size_of::<Key>() as u64;
        if estimated_bytes <= self.config.maximum_shard_size {
            return Ok(());
        }

        let now = clock.now();
        let midpoint = shard.base() + (now.saturating_sub(shard.base())) / 2;
        if midpoint <= shard.base() || midpoint >= now {
            return Ok(());
        }

        let separated = shard.split(midpoint, &self.config, clock)?;
        self.shards.write().insert(separated.base(), Arc::new(separated));
        Ok(())
    }

    /// Close the least-recently-accessed shards once the table holds more
    /// than `maximum_active_shards` open at once, keeping at least
    /// `minimum_active_shards` open regardless of recency (spec.md §6).
    fn enforce_active_shard_budget(&self, _clock: &dyn Clock) {
        let shards = self.shards.read();
        let mut open: Vec<Arc<Shard>> = shards.values().filter(|s| s.is_open()).cloned().collect();
        drop(shards);

        if open.len() as u32 <= self.config.maximum_active_shards {
            return;
        }
        open.sort_by_key(|s| s.accessed());
        let close_count = open.len().saturating_sub(self.config.minimum_active_shards.max(self.config.maximum_active_shards) as usize);
        for shard in open.iter().take(close_count) {
            shard.close();
        }
    }

    /// Open every shard for write up front (used by tests and by callers
    /// that want deterministic open/created behavior rather than lazy
    /// open-on-first-use).
    pub fn warm(&self, clock: &dyn Clock) -> Result<(), ShardError> {
        let bases: Vec<Timestamp> = self.shards.read().keys().copied().collect();
        for base in bases {
            self.shard_for(base).advance(FileAccess::Write, &self.config, clock)?;
        }
        Ok(())
    }
}
