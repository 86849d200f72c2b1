//! Integration tests for the sharded entry store.
//!
//! Exercises the full insert → validate → sign → verify → shard/table
//! pipeline across module boundaries, rather than any single unit.

use entrystore::config::Config;
use entrystore::consensus::FixedClock;
use entrystore::entry::EntryBuilder;
use entrystore::id::{Id, Identity, IDENTITY_HASH_LEN};
use entrystore::proof::FlatPolicy;
use entrystore::shard::What;
use entrystore::sign;
use entrystore::table::Table;
use entrystore::{validator, Key};

use std::sync::atomic::AtomicBool;
use tempfile::tempdir;

fn id_at(hash: u8, identity_ts: u32, ts: u32) -> Id {
    Id {
        identity: Identity { hash: [hash; IDENTITY_HASH_LEN], timestamp: identity_ts },
        timestamp: ts,
    }
}

#[test]
fn identity_announcement_round_trips_through_signing_validation_and_storage() {
    let _ = env_logger::try_init();
    let dir = tempdir().unwrap();
    let clock = FixedClock(1_700_000_000);
    let config = Config::default();
    let table = Table::open(dir.path(), config).unwrap();

    let signing_key = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
    let id = id_at(1, clock.0, clock.0);
    let mut entry = EntryBuilder::announcement(id);
    entry.push_content(&vec![0xAAu8; 96]);

    let cancel = AtomicBool::new(false);
    sign::sign(&mut entry, &[], &signing_key, &FlatPolicy, &cancel).expect("signing should succeed");
    let bytes = entry.into_bytes();

    validator::validate(&bytes, &clock).expect("a freshly signed announcement must validate");

    let view = entrystore::entry::EntryView::new(&bytes).unwrap();
    let key = Key::classify(&view, Id::ERASED);
    assert!(table.insert(&bytes, key, &clock).unwrap());

    let stored = table.get(id, What::Everything, 0, &clock).unwrap().expect("entry should be retrievable");
    assert_eq!(&stored[0..32], &id.to_bytes());

    sign::verify(&bytes, &[], &signing_key.verifying_key(), Default::default()).expect("stored bytes must still verify");
}

#[test]
fn duplicate_id_with_identical_bytes_is_a_no_op_insert() {
    let _ = env_logger::try_init();
    let dir = tempdir().unwrap();
    let clock = FixedClock(1_700_000_000);
    let table = Table::open(dir.path(), Config::default()).unwrap();

    let id = id_at(2, clock.0, clock.0);
    let mut entry = EntryBuilder::announcement(id);
    entry.push_content(&vec![0xBBu8; 96]);
    let signing_key = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
    let cancel = AtomicBool::new(false);
    sign::sign(&mut entry, &[], &signing_key, &FlatPolicy, &cancel).unwrap();
    let bytes = entry.into_bytes();
    let view = entrystore::entry::EntryView::new(&bytes).unwrap();
    let key = Key::classify(&view, Id::ERASED);

    assert!(table.insert(&bytes, key, &clock).unwrap());
    assert!(!table.insert(&bytes, key, &clock).unwrap());
}

#[test]
fn erase_then_reopen_table_does_not_resurrect_the_entry() {
    let _ = env_logger::try_init();
    let dir = tempdir().unwrap();
    let clock = FixedClock(1_700_000_000);
    let config = Config::default();

    let id = id_at(3, clock.0, clock.0);
    {
        let table = Table::open(dir.path(), config.clone()).unwrap();
        let mut entry = EntryBuilder::announcement(id);
        entry.push_content(&vec![0xCCu8; 96]);
        let signing_key = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
        let cancel = AtomicBool::new(false);
        sign::sign(&mut entry, &[], &signing_key, &FlatPolicy, &cancel).unwrap();
        let bytes = entry.into_bytes();
        let view = entrystore::entry::EntryView::new(&bytes).unwrap();
        let key = Key::classify(&view, Id::ERASED);
        table.insert(&bytes, key, &clock).unwrap();
        assert!(table.erase(id, true, &clock).unwrap());
    }

    let reopened = Table::open(dir.path(), config).unwrap();
    assert!(reopened.get(id, What::Identification, 0, &clock).unwrap().is_none());
}

#[test]
fn validator_rejects_entries_outside_the_clock_skew_window() {
    let clock = FixedClock(1_700_000_000);
    let id = id_at(4, clock.0, clock.0 + entrystore::consensus::MAX_SKEW + 1);
    let mut entry = EntryBuilder::announcement(id);
    entry.push_content(&vec![0u8; 96]);
    entry.push_content(&[0u8; 8]); // stand-in trailer; content-shape only matters for the length check here

    assert!(validator::validate(entry.as_bytes(), &clock).is_err());
}
