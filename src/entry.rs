//! Entry record layout and announcement classification (component A).
//!
//! An entry is a variable-length byte buffer: a fixed 128-byte header
//! (`id ‖ parent ‖ signature`) followed by 0..`MAX_CONTENT_SIZE` bytes of
//! content, the last part of which is the proof-of-work trailer (see
//! `proof.rs`).

use crate::consensus::{ENTRY_HEADER_SIZE, Timestamp};
use crate::id::Id;

/// What kind of announcement an entry is, per spec.md §4.A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementType {
    /// `id == parent` and `id.timestamp == id.identity.timestamp`: this
    /// entry introduces a brand-new identity.
    NewIdentityAnnouncement,
    /// `id == parent` but the timestamps differ: this entry introduces a
    /// new channel owned by an existing identity.
    NewChannelAnnouncement,
    /// An ordinary entry referencing some other parent.
    NotAnAnnouncement,
}

/// Minimum content size of a well-formed identity record (a public key
/// plus whatever profile fields the identity schema carries). Owned by
/// the identity schema, not this crate; a conservative floor is kept here
/// so the validator has something concrete to check against.
pub const MIN_IDENTITY_RECORD_SIZE: usize = 96;

/// Minimum content size of a well-formed channel record.
pub const MIN_CHANNEL_RECORD_SIZE: usize = 64;

/// A borrowed view over an on-disk or on-wire entry buffer. Never copies;
/// every accessor reads directly out of the backing slice.
#[derive(Clone, Copy)]
pub struct EntryView<'a> {
    bytes: &'a [u8],
}

impl<'a> EntryView<'a> {
    /// Wrap `bytes` as an entry view. Fails if shorter than the fixed
    /// header; does not otherwise validate (see `validator.rs`).
    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        if bytes.len() < ENTRY_HEADER_SIZE {
            None
        } else {
            Some(EntryView { bytes })
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn id(&self) -> Id {
        Id::from_bytes(self.bytes[0..32].try_into().unwrap())
    }

    pub fn parent(&self) -> Id {
        Id::from_bytes(self.bytes[32..64].try_into().unwrap())
    }

    pub fn signature(&self) -> &'a [u8; 64] {
        self.bytes[64..128].try_into().unwrap()
    }

    /// Everything after the fixed header: signature-excluded payload bytes
    /// (proof trailer + application content).
    pub fn content(&self) -> &'a [u8] {
        &self.bytes[ENTRY_HEADER_SIZE..]
    }

    /// Classify this entry as an announcement or not, per spec.md §4.A.
    pub fn announcement_type(&self) -> AnnouncementType {
        classify_announcement(&self.id(), &self.parent())
    }
}

/// Classify an `(id, parent)` pair per spec.md §4.A, independent of any
/// particular entry buffer (used both by `EntryView::announcement_type`
/// and by the validator while only the header has been parsed).
pub fn classify_announcement(id: &Id, parent: &Id) -> AnnouncementType {
    if id == parent {
        if id.timestamp == id.identity.timestamp {
            AnnouncementType::NewIdentityAnnouncement
        } else {
            AnnouncementType::NewChannelAnnouncement
        }
    } else {
        AnnouncementType::NotAnAnnouncement
    }
}

/// An owned, growable entry buffer used while composing a new entry prior
/// to signing (see `proof::sign`).
pub struct EntryBuilder {
    bytes: Vec<u8>,
}

impl EntryBuilder {
    /// Start a new entry with the given id/parent and empty content.
    pub fn new(id: Id, parent: Id) -> Self {
        let mut bytes = Vec::with_capacity(ENTRY_HEADER_SIZE);
        bytes.extend_from_slice(&id.to_bytes());
        bytes.extend_from_slice(&parent.to_bytes());
        bytes.extend_from_slice(&[0u8; 64]); // signature placeholder
        EntryBuilder { bytes }
    }

    /// Construct an identity- or channel-announcement builder: `id ==
    /// parent` by construction.
    pub fn announcement(id: Id) -> Self {
        Self::new(id, id)
    }

    pub fn id(&self) -> Id {
        Id::from_bytes(self.bytes[0..32].try_into().unwrap())
    }

    pub fn parent(&self) -> Id {
        Id::from_bytes(self.bytes[32..64].try_into().unwrap())
    }

    /// Append application content (not including the proof, which
    /// `proof::sign` appends itself).
    pub fn push_content(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    pub fn set_signature(&mut self, signature: &[u8; 64]) {
        self.bytes[64..128].copy_from_slice(signature);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    pub fn view(&self) -> EntryView<'_> {
        EntryView::new(&self.bytes).expect("builder always carries at least a full header")
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Minimum additional content-timestamp the entry is allowed to derive
/// its own identity's creation time from (used by tests composing
/// synthetic entries). Exposed for convenience.
pub fn now_floor(now: Timestamp, age: u32) -> Timestamp {
    now.saturating_sub(age)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Identity;

    fn id_at(hash: u8, identity_ts: Timestamp, ts: Timestamp) -> Id {
        Id {
            identity: Identity { hash: [hash; crate::id::IDENTITY_HASH_LEN], timestamp: identity_ts },
            timestamp: ts,
        }
    }

    #[test]
    fn classify_identity_announcement() {
        let id = id_at(1, 100, 100);
        assert_eq!(classify_announcement(&id, &id), AnnouncementType::NewIdentityAnnouncement);
    }

    #[test]
    fn classify_channel_announcement() {
        let id = id_at(1, 100, 200);
        assert_eq!(classify_announcement(&id, &id), AnnouncementType::NewChannelAnnouncement);
    }

    #[test]
    fn classify_not_an_announcement() {
        let id = id_at(1, 100, 200);
        let parent = id_at(2, 50, 150);
        assert_eq!(classify_announcement(&id, &parent), AnnouncementType::NotAnAnnouncement);
    }

    #[test]
    fn builder_roundtrips_through_view() {
        let id = id_at(9, 10, 10);
        let mut builder = EntryBuilder::announcement(id);
        builder.push_content(b"hello");
        builder.set_signature(&[0xAB; 64]);

        let view = builder.view();
        assert_eq!(view.id(), id);
        assert_eq!(view.parent(), id);
        assert_eq!(view.signature(), &[0xAB; 64]);
        assert_eq!(view.content(), b"hello");
    }
}
