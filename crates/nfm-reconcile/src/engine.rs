use std::collections::HashSet;

use nfm_schemas::{ActiveListing, CancelEvent, ListedEvent, ListingKey, SaleEvent};
use tracing::debug;

use crate::{Exclusion, ExclusionReason, ReconcilePolicy, ReconcileReport};

/// Terminal keys compare as the joined `"{nftAddress}-{tokenId}"` string, so
/// `("0xA-1", "2")` and `("0xA", "1-2")` name the same listing.
fn terminal_key(key: &ListingKey) -> String {
    key.to_string()
}

fn sold_keys(sold: &[SaleEvent]) -> HashSet<String> {
    sold.iter().map(|ev| terminal_key(&ev.key())).collect()
}

fn canceled_keys(canceled: &[CancelEvent]) -> HashSet<String> {
    canceled.iter().map(|ev| terminal_key(&ev.key())).collect()
}

/// Reconcile with the default policy (cap of 100).
pub fn reconcile(
    listed: &[ListedEvent],
    sold: &[SaleEvent],
    canceled: &[CancelEvent],
) -> Vec<ActiveListing> {
    reconcile_with(&ReconcilePolicy::default(), listed, sold, canceled)
}

/// Reconcile with an explicit policy, returning only the surviving listings.
pub fn reconcile_with(
    policy: &ReconcilePolicy,
    listed: &[ListedEvent],
    sold: &[SaleEvent],
    canceled: &[CancelEvent],
) -> Vec<ActiveListing> {
    reconcile_report(policy, listed, sold, canceled).listings
}

/// Reconcile and keep the evidence for every dropped event.
///
/// 1) key sets are built from `sold` and `canceled` as received (untrimmed)
/// 2) `listed` is walked in input order; incomplete, sold or canceled keys drop
/// 3) survivors past `policy.max_active` drop
/// 4) survivors become [`ActiveListing`] (addresses trimmed)
pub fn reconcile_report(
    policy: &ReconcilePolicy,
    listed: &[ListedEvent],
    sold: &[SaleEvent],
    canceled: &[CancelEvent],
) -> ReconcileReport {
    let sold = sold_keys(sold);
    let canceled = canceled_keys(canceled);

    let mut listings: Vec<ActiveListing> = Vec::new();
    let mut exclusions: Vec<Exclusion> = Vec::new();

    for (index, ev) in listed.iter().enumerate() {
        let key = ev.key();
        let joined = terminal_key(&key);

        let reason = if !key.is_complete() {
            Some(ExclusionReason::MissingKey)
        } else if sold.contains(&joined) {
            Some(ExclusionReason::Sold)
        } else if canceled.contains(&joined) {
            Some(ExclusionReason::Canceled)
        } else if listings.len() >= policy.max_active {
            Some(ExclusionReason::OverCap)
        } else {
            None
        };

        match reason {
            Some(reason) => exclusions.push(Exclusion { index, key, reason }),
            None => listings.push(ActiveListing::from_listed(ev)),
        }
    }

    let report = ReconcileReport {
        listings,
        exclusions,
    };

    debug!(
        listed = listed.len(),
        active = report.listings.len(),
        missing_key = report.excluded_for(ExclusionReason::MissingKey),
        sold = report.excluded_for(ExclusionReason::Sold),
        canceled = report.excluded_for(ExclusionReason::Canceled),
        over_cap = report.excluded_for(ExclusionReason::OverCap),
        "reconciled listings"
    );

    report
}
