//! Key record (K): the fixed-size row a shard's index file stores per
//! entry, and the locator it carries into the content file.

use bytemuck::{Pod, Zeroable};

use crate::entry::{AnnouncementType, EntryView};
use crate::id::Id;

/// `{offset, length}` into a shard's content file. `length` is the size of
/// everything after `id`+`parent` (signature ‖ proof ‖ payload), per
/// spec.md §3.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct DataLocator {
    pub offset: u64,
    pub length: u32,
}

/// Opaque key-type tag, filled in by [`Key::classify`]. Downstream
/// key-record shapes (per Table) may attach additional fields; this
/// crate only needs enough to distinguish announcements from ordinary
/// entries when enumerating.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Ordinary = 0,
    IdentityAnnouncement = 1,
    ChannelAnnouncement = 2,
}

impl From<AnnouncementType> for Kind {
    fn from(a: AnnouncementType) -> Self {
        match a {
            AnnouncementType::NewIdentityAnnouncement => Kind::IdentityAnnouncement,
            AnnouncementType::NewChannelAnnouncement => Kind::ChannelAnnouncement,
            AnnouncementType::NotAnAnnouncement => Kind::Ordinary,
        }
    }
}

/// A fixed-size index row. `id == Id::ERASED` marks the slot as erased
/// (spec.md §3, invariant 3 and §6).
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Key {
    pub id: Id,
    pub data: DataLocator,
    pub kind: u8,
    _pad: [u8; 3],
}

const _: () = assert!(std::mem::size_of::<Key>() == 48);

impl Key {
    pub const ERASED: Key = Key {
        id: Id::ERASED,
        data: DataLocator { offset: 0, length: 0 },
        kind: 0,
        _pad: [0; 3],
    };

    pub fn is_erased(&self) -> bool {
        self.id.is_erased()
    }

    pub fn kind(&self) -> Kind {
        match self.kind {
            1 => Kind::IdentityAnnouncement,
            2 => Kind::ChannelAnnouncement,
            _ => Kind::Ordinary,
        }
    }

    /// Derive a key's id/kind metadata from an entry buffer. `_top` is the
    /// provenance root the caller routes this entry under (e.g. the
    /// channel or thread root); this crate treats it as opaque and does
    /// not store it, leaving type-specific key shapes to the orchestrator
    /// that owns a given Table (spec.md §4.F).
    pub fn classify(view: &EntryView<'_>, _top: Id) -> Key {
        Key {
            id: view.id(),
            data: DataLocator { offset: 0, length: 0 },
            kind: Kind::from(view.announcement_type()) as u8,
            _pad: [0; 3],
        }
    }

    pub fn with_locator(mut self, offset: u64, length: u32) -> Key {
        self.data = DataLocator { offset, length };
        self
    }

    pub fn to_bytes(&self) -> [u8; 48] {
        bytemuck::cast(*self)
    }

    pub fn from_bytes(bytes: [u8; 48]) -> Key {
        bytemuck::cast(bytes)
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key")
            .field("id", &self.id)
            .field("offset", &self.data.offset)
            .field("length", &self.data.length)
            .field("kind", &self.kind())
            .finish()
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}
