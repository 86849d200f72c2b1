//! Entry validator (component C): the consensus-level checks applied to
//! inbound bytes before a shard will even attempt to insert them. Mirrors
//! `raddi::entry::validate` check-for-check, including its log codes
//! (`error::log_code`).

use crate::consensus::{older, Clock, MAX_AGE, MAX_SKEW, MIN_VALIDATED_ENTRY_SIZE};
use crate::entry::{AnnouncementType, EntryView, MIN_CHANNEL_RECORD_SIZE, MIN_IDENTITY_RECORD_SIZE};
use crate::error::ValidationError;

/// Validate `bytes` as a candidate entry. Returns `Ok(())` iff every rule
/// in spec.md §4.C holds; otherwise the first violated rule, matching
/// `raddi::entry::validate`'s early-return order (length, then the four
/// timestamp-ordering checks, then the announcement/content-size check).
pub fn validate(bytes: &[u8], clock: &dyn Clock) -> Result<(), ValidationError> {
    if bytes.len() < MIN_VALIDATED_ENTRY_SIZE {
        log::warn!("validate: entry too short ({} bytes) (0x{:02x})", bytes.len(), crate::error::log_code::TOO_SHORT);
        return Err(ValidationError::TooShort);
    }

    let view = EntryView::new(bytes).expect("length already checked above");
    let id = view.id();
    let parent = view.parent();
    let now = clock.now();

    if older(id.timestamp, parent.timestamp) {
        log::warn!(
            "validate: id {:?} timestamp {} older than parent timestamp {} (0x{:02x})",
            id, id.timestamp, parent.timestamp, crate::error::log_code::ID_OLDER_THAN_PARENT
        );
        return Err(ValidationError::IdOlderThanParent);
    }
    if older(id.timestamp, id.identity.timestamp) {
        log::warn!(
            "validate: id {:?} timestamp {} older than its own identity timestamp {} (0x{:02x})",
            id, id.timestamp, id.identity.timestamp, crate::error::log_code::ID_OLDER_THAN_OWN_IDENTITY
        );
        return Err(ValidationError::IdOlderThanOwnIdentity);
    }
    if older(parent.timestamp, parent.identity.timestamp) {
        log::warn!(
            "validate: id {:?} parent timestamp {} older than parent's identity timestamp {} (0x{:02x})",
            id, parent.timestamp, parent.identity.timestamp, crate::error::log_code::PARENT_OLDER_THAN_ITS_IDENTITY
        );
        return Err(ValidationError::ParentOlderThanItsIdentity);
    }
    if older(id.timestamp, now.saturating_sub(MAX_AGE)) {
        log::warn!(
            "validate: id {:?} timestamp {} older than now-MAX_AGE {} (0x{:02x})",
            id, id.timestamp, now.saturating_sub(MAX_AGE), crate::error::log_code::TOO_OLD
        );
        return Err(ValidationError::TooOld);
    }
    if older(now.saturating_add(MAX_SKEW), id.timestamp) {
        log::warn!(
            "validate: id {:?} timestamp {} beyond now+MAX_SKEW {} (0x{:02x})",
            id, id.timestamp, now.saturating_add(MAX_SKEW), crate::error::log_code::TOO_FAR_IN_FUTURE
        );
        return Err(ValidationError::TooFarInFuture);
    }

    match view.announcement_type() {
        AnnouncementType::NewIdentityAnnouncement => {
            if bytes.len() < MIN_IDENTITY_RECORD_SIZE {
                log::warn!(
                    "validate: identity announcement {:?} too short ({} < {}) (0x{:02x})",
                    id, bytes.len(), MIN_IDENTITY_RECORD_SIZE, crate::error::log_code::IDENTITY_ANNOUNCEMENT_TOO_SHORT
                );
                return Err(ValidationError::IdentityAnnouncementTooShort);
            }
        }
        AnnouncementType::NewChannelAnnouncement => {
            if bytes.len() < MIN_CHANNEL_RECORD_SIZE {
                log::warn!(
                    "validate: channel announcement {:?} too short ({} < {}) (0x{:02x})",
                    id, bytes.len(), MIN_CHANNEL_RECORD_SIZE, crate::error::log_code::CHANNEL_ANNOUNCEMENT_TOO_SHORT
                );
                return Err(ValidationError::ChannelAnnouncementTooShort);
            }
        }
        AnnouncementType::NotAnAnnouncement => {
            if view.content().is_empty() {
                log::warn!("validate: id {:?} has no content (0x{:02x})", id, crate::error::log_code::EMPTY_CONTENT);
                return Err(ValidationError::EmptyContent);
            }
        }
    }

    Ok(())
}
