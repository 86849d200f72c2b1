//! Crate-wide error types.
//!
//! Mirrors the teacher's `database::DatabaseError` shape: one `thiserror`
//! enum per subsystem, `#[from]` conversions where a lower layer's error
//! naturally becomes a higher layer's, and a single `Result` alias used
//! throughout.

use thiserror::Error;

/// Distinct log codes for validator failures, carried over verbatim from
/// `raddi_entry.cpp::validate` so log output stays traceable to the same
/// numbering scheme the original implementation used.
pub mod log_code {
    /// `length < sizeof(entry) + proof::min_size`
    pub const TOO_SHORT: u32 = 0x10;
    /// `id.timestamp < parent.timestamp`
    pub const ID_OLDER_THAN_PARENT: u32 = 0x11;
    /// `id.timestamp < id.identity.timestamp`
    pub const ID_OLDER_THAN_OWN_IDENTITY: u32 = 0x12;
    /// `parent.timestamp < parent.identity.timestamp`
    pub const PARENT_OLDER_THAN_ITS_IDENTITY: u32 = 0x13;
    /// `id.timestamp < now - MAX_AGE`
    pub const TOO_OLD: u32 = 0x14;
    /// `id.timestamp > now + MAX_SKEW`
    pub const TOO_FAR_IN_FUTURE: u32 = 0x15;
    /// identity announcement shorter than an identity record
    pub const IDENTITY_ANNOUNCEMENT_TOO_SHORT: u32 = 0x18;
    /// channel announcement shorter than a channel record
    pub const CHANNEL_ANNOUNCEMENT_TOO_SHORT: u32 = 0x19;
    /// non-announcement entry carries no content byte
    pub const EMPTY_CONTENT: u32 = 0x1A;
    /// reinsertion of an existing id with different bytes
    pub const REINSERTION_MISMATCH: u32 = 0x07;
    /// signature did not verify against the claimed public key
    pub const BAD_SIGNATURE: u32 = 0x1E;
    /// proof-of-work trailer missing or failed its complexity check
    pub const BAD_PROOF: u32 = 0x1F;
}

/// Errors from the file-handle layer (component D).
#[derive(Error, Debug)]
pub enum FileError {
    #[error("open failed: {0}")]
    Open(#[source] std::io::Error),

    #[error("read failed: requested {requested} bytes, got {got}")]
    ShortRead { requested: usize, got: usize },

    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("resize failed: {0}")]
    Resize(#[source] std::io::Error),

    #[error("handle is closed")]
    Closed,
}

/// Errors from proof-of-work generation/verification (component B).
#[derive(Error, Debug)]
pub enum ProofError {
    #[error("no valid proof found within size budget")]
    NotFound,

    #[error("cancelled")]
    Cancelled,

    #[error("signing failed")]
    SigningFailed,

    #[error("signature verification failed (0x{:02x})", crate::error::log_code::BAD_SIGNATURE)]
    BadSignature,

    #[error("proof-of-work verification failed (0x{:02x})", crate::error::log_code::BAD_PROOF)]
    BadProof,
}

/// Errors from entry validation (component C). Each variant already names
/// its log code; `validate()` itself just returns `bool` per spec.md §4.C,
/// but callers that want the reason use `validate_with_reason` and match
/// on this.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("entry shorter than header + minimum proof (0x{:02x})", log_code::TOO_SHORT)]
    TooShort,
    #[error("id older than parent (0x{:02x})", log_code::ID_OLDER_THAN_PARENT)]
    IdOlderThanParent,
    #[error("id older than its own identity (0x{:02x})", log_code::ID_OLDER_THAN_OWN_IDENTITY)]
    IdOlderThanOwnIdentity,
    #[error("parent older than its identity (0x{:02x})", log_code::PARENT_OLDER_THAN_ITS_IDENTITY)]
    ParentOlderThanItsIdentity,
    #[error("id too old (0x{:02x})", log_code::TOO_OLD)]
    TooOld,
    #[error("id too far in the future (0x{:02x})", log_code::TOO_FAR_IN_FUTURE)]
    TooFarInFuture,
    #[error("identity announcement shorter than an identity record (0x{:02x})", log_code::IDENTITY_ANNOUNCEMENT_TOO_SHORT)]
    IdentityAnnouncementTooShort,
    #[error("channel announcement shorter than a channel record (0x{:02x})", log_code::CHANNEL_ANNOUNCEMENT_TOO_SHORT)]
    ChannelAnnouncementTooShort,
    #[error("non-announcement entry has no content (0x{:02x})", log_code::EMPTY_CONTENT)]
    EmptyContent,
}

/// Errors from the shard layer (component E) and table layer (component F).
#[derive(Error, Debug)]
pub enum ShardError {
    #[error("file error: {0}")]
    File(#[from] FileError),

    #[error("cache allocation failed")]
    CacheOom,

    #[error("index count would exceed the 32-bit address-space budget")]
    SizeBound,

    #[error("entry not found")]
    NotFound,

    #[error("reinsertion mismatch for existing id (0x{:02x})", log_code::REINSERTION_MISMATCH)]
    ReinsertionMismatch,

    #[error("internal error: demand {demand} exceeds stored length {stored}")]
    DemandExceedsStored { demand: u32, stored: u32 },

    #[error("split failed to rename shard files: {0}")]
    SplitRename(#[source] std::io::Error),

    #[error("split timestamp {t} is not strictly inside (base {base}, now)")]
    SplitOutOfRange { t: u32, base: u32 },

    #[error("write rejected: table is open in read-only mode")]
    ReadOnly,
}

/// Top-level crate error, composing the subsystem errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Shard(#[from] ShardError),

    #[error("validation failed: {0}")]
    Validation(ValidationError),

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
