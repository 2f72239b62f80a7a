use nfm_schemas::{ActiveListing, ListingKey};
use serde::{Deserialize, Serialize};

/// Maximum number of active listings returned by [`crate::reconcile`].
pub const DEFAULT_MAX_ACTIVE: usize = 100;

/// Tunables for a reconcile pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    /// Surviving listings beyond this count are cut, oldest first.
    pub max_active: usize,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            max_active: DEFAULT_MAX_ACTIVE,
        }
    }
}

/// Why a listed event did not make it into the output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// `nftAddress` or `tokenId` was empty.
    MissingKey,
    /// A sale exists for the key. Checked before cancels.
    Sold,
    /// A cancel exists for the key.
    Canceled,
    /// Survived filtering but fell past `max_active`.
    OverCap,
}

/// Evidence for one dropped listed event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    /// Position of the event in the `listed` input.
    pub index: usize,
    pub key: ListingKey,
    pub reason: ExclusionReason,
}

/// Full output of a reconcile pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub listings: Vec<ActiveListing>,
    /// Ordered by input index.
    pub exclusions: Vec<Exclusion>,
}

impl ReconcileReport {
    pub fn excluded_for(&self, reason: ExclusionReason) -> usize {
        self.exclusions.iter().filter(|e| e.reason == reason).count()
    }
}
