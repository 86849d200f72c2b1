//! Entry identity: `Identity`, `Id`, and their packed on-disk layout.
//!
//! See `SPEC_FULL.md` §"Resolved byte layout" for why the identity hash is
//! 24 bytes rather than the 28 the distilled spec's prose derivation
//! suggests: it's the only width that makes the nested `Id { Identity {
//! hash, timestamp }, timestamp }` structure land on the 32-byte wire size
//! spec.md §6 bakes in.

use bytemuck::{Pod, Zeroable};

use crate::consensus::Timestamp;

/// Width of the truncated public-key hash inside an [`Identity`].
pub const IDENTITY_HASH_LEN: usize = 24;

/// A public key's identity: a truncated hash of the key plus the timestamp
/// at which that identity was announced. Constant for every entry posted
/// by the same identity except for the timestamp, which never changes
/// once the identity-announcement entry is accepted.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
pub struct Identity {
    pub hash: [u8; IDENTITY_HASH_LEN],
    pub timestamp: Timestamp,
}

const _: () = assert!(std::mem::size_of::<Identity>() == 28);

impl Identity {
    pub const ERASED: Identity = Identity {
        hash: [0u8; IDENTITY_HASH_LEN],
        timestamp: 0,
    };

    pub fn is_erased(&self) -> bool {
        *self == Self::ERASED
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Identity({}@{})", hex::encode(self.hash), self.timestamp)
    }
}

/// A globally unique, sortable entry identifier: `(identity, timestamp)`.
/// Exactly 32 bytes on the wire (spec.md §6).
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
pub struct Id {
    pub identity: Identity,
    pub timestamp: Timestamp,
}

const _: () = assert!(std::mem::size_of::<Id>() == 32);

impl Id {
    /// The all-zero sentinel used to mark an erased slot (spec.md §3,
    /// invariant 3, and §6 "Erased index slots").
    pub const ERASED: Id = Id {
        identity: Identity::ERASED,
        timestamp: 0,
    };

    pub fn is_erased(&self) -> bool {
        *self == Self::ERASED
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        bytemuck::cast(*self)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        bytemuck::cast(bytes)
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Id({:?}, {})", self.identity, self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_wire_format() {
        assert_eq!(std::mem::size_of::<Identity>(), 28);
        assert_eq!(std::mem::size_of::<Id>(), 32);
    }

    #[test]
    fn erased_sentinel_is_all_zero() {
        assert_eq!(Id::ERASED.to_bytes(), [0u8; 32]);
        assert!(Id::ERASED.is_erased());

        let non_erased = Id {
            identity: Identity {
                hash: [1u8; IDENTITY_HASH_LEN],
                timestamp: 5,
            },
            timestamp: 10,
        };
        assert!(!non_erased.is_erased());
    }

    #[test]
    fn ordering_is_lexicographic_by_identity_then_timestamp() {
        let a = Id {
            identity: Identity { hash: [1; IDENTITY_HASH_LEN], timestamp: 1 },
            timestamp: 100,
        };
        let b = Id {
            identity: Identity { hash: [1; IDENTITY_HASH_LEN], timestamp: 1 },
            timestamp: 200,
        };
        let c = Id {
            identity: Identity { hash: [2; IDENTITY_HASH_LEN], timestamp: 1 },
            timestamp: 0,
        };
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn bytes_roundtrip() {
        let id = Id {
            identity: Identity { hash: [7; IDENTITY_HASH_LEN], timestamp: 42 },
            timestamp: 99,
        };
        assert_eq!(Id::from_bytes(id.to_bytes()), id);
    }
}
