//! Duplicate-submission ledger.
//!
//! Remembers which members already had an image approved, keyed by the
//! image's BLAKE3 digest. Bounded in memory (LRU eviction via `moka`).


use std::collections::BTreeSet;
use std::sync::Arc;

use moka::sync::Cache;
use parking_lot::RwLock;
use tracing::debug;

use crate::constants::DEFAULT_DUPLICATE_CAPACITY;
use crate::hashing::{hash_member_id, to_hex};

/// Confidence reported when a member resubmits one of their own images.
pub const SAME_MEMBER_CONFIDENCE: f32 = 0.0;
/// Confidence reported when an image was already approved for someone else.
pub const OTHER_MEMBER_CONFIDENCE: f32 = 0.1;

/// Result of a ledger check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateStatus {
    /// Never approved before.
    Unique,
    /// Already approved for this same member.
    SameMember,
    /// Already approved for `count` other members.
    OtherMembers { count: usize },
}

impl DuplicateStatus {
    #[inline]
    pub fn is_duplicate(&self) -> bool {
        !matches!(self, DuplicateStatus::Unique)
    }

    /// Confidence attached to the rejection, if this is a duplicate.
    pub fn rejection_confidence(&self) -> Option<f32> {
        match self {
            DuplicateStatus::Unique => None,
            DuplicateStatus::SameMember => Some(SAME_MEMBER_CONFIDENCE),
            DuplicateStatus::OtherMembers { .. } => Some(OTHER_MEMBER_CONFIDENCE),
        }
    }

    /// Human-readable reason for the rejection.
    pub fn reason(&self) -> Option<String> {
        match self {
            DuplicateStatus::Unique => None,
            DuplicateStatus::SameMember => {
                Some("This image was already used for a previous submission.".to_string())
            }
            DuplicateStatus::OtherMembers { count } => Some(format!(
                "This image was already submitted by {} other member(s).",
                count
            )),
        }
    }
}

type MemberSet = Arc<RwLock<BTreeSet<u64>>>;

/// Shared, cheaply clonable ledger of approved image digests.
#[derive(Clone)]
pub struct DuplicateLedger {
    entries: Cache<[u8; 32], MemberSet>,
}

impl DuplicateLedger {
    /// Creates a ledger with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DUPLICATE_CAPACITY)
    }

    /// Creates a ledger remembering at most `capacity` distinct images.
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Classifies `image_digest` for `member`.
    pub fn check(&self, image_digest: &[u8; 32], member: &str) -> DuplicateStatus {
        let Some(members) = self.entries.get(image_digest) else {
            return DuplicateStatus::Unique;
        };

        let member_id = hash_member_id(member);
        let members = members.read();

        if members.contains(&member_id) {
            DuplicateStatus::SameMember
        } else if members.is_empty() {
            DuplicateStatus::Unique
        } else {
            DuplicateStatus::OtherMembers {
                count: members.len(),
            }
        }
    }

    /// Records that `member` had `image_digest` approved.
    pub fn record(&self, image_digest: [u8; 32], member: &str) {
        let member_id = hash_member_id(member);
        let members = self
            .entries
            .get_with(image_digest, || Arc::new(RwLock::new(BTreeSet::new())));
        members.write().insert(member_id);

        debug!(
            image = %to_hex(&image_digest),
            member_id,
            "Recorded approved image"
        );
    }

    /// Number of distinct images remembered.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DuplicateLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DuplicateLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateLedger")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}
