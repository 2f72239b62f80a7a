use nfm_reconcile::*;
use nfm_schemas::{CancelEvent, ListedEvent, SaleEvent};
use proptest::prelude::*;

fn listed(nft: &str, token: &str, block: u64) -> ListedEvent {
    ListedEvent {
        id: format!("{block}"),
        seller: "0xSeller".to_string(),
        nft_address: nft.to_string(),
        token_id: token.to_string(),
        price: "1000".to_string(),
        contract_address: "0xMarket".to_string(),
        block_number: block,
        tx_hash: format!("0x{block:x}"),
    }
}

#[test]
fn scenario_unsold_listing_is_active() {
    let l = vec![listed("0xA", "1", 10)];

    let out = reconcile(&l, &[], &[]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].nft_address, "0xA");
    assert_eq!(out[0].token_id, "1");
    assert_eq!(out[0].block_number, 10);
}

#[test]
fn scenario_sold_listing_is_excluded() {
    let l = vec![listed("0xA", "1", 10)];
    let s = vec![SaleEvent::new("0xA", "1")];

    assert!(reconcile(&l, &s, &[]).is_empty());
}

#[test]
fn scenario_canceled_listing_is_excluded() {
    let l = vec![listed("0xA", "1", 10), listed("0xA", "2", 9)];
    let c = vec![CancelEvent::new("0xA", "2")];

    let out = reconcile(&l, &[], &c);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].token_id, "1");
}

/// A relisting of a previously sold key stays hidden: exclusion ignores the
/// relative order of the sale and the (newer) listing.
#[test]
fn scenario_relisted_after_sale_stays_hidden() {
    // Newest first: the relist at block 50 is newer than anything else.
    let l = vec![listed("0xA", "1", 50), listed("0xB", "7", 20)];
    // The sale happened for the earlier listing of the same key.
    let s = vec![SaleEvent::new("0xA", "1")];

    let out = reconcile(&l, &s, &[]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].nft_address, "0xB");
}

fn arb_key() -> impl Strategy<Value = (String, String)> {
    ("0x0[0-5]", "[0-4]")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// No surviving listing carries a sold or canceled key, whatever the
    /// order of the terminal feeds.
    #[test]
    fn scenario_exclusion_holds_for_every_terminal_key(
        keys in prop::collection::vec(arb_key(), 0..60),
        sold in prop::collection::vec(arb_key(), 0..10),
        canceled in prop::collection::vec(arb_key(), 0..10),
    ) {
        let l: Vec<ListedEvent> = keys
            .iter()
            .enumerate()
            .map(|(i, (nft, token))| listed(nft, token, 1_000 - i as u64))
            .collect();
        let s: Vec<SaleEvent> = sold.iter().map(|(nft, token)| SaleEvent::new(nft.as_str(), token.as_str())).collect();
        let c: Vec<CancelEvent> = canceled.iter().map(|(nft, token)| CancelEvent::new(nft.as_str(), token.as_str())).collect();

        let out = reconcile(&l, &s, &c);
        for a in &out {
            let k = (a.nft_address.clone(), a.token_id.clone());
            prop_assert!(!sold.contains(&k));
            prop_assert!(!canceled.contains(&k));
        }

        let mut s_rev = s.clone();
        s_rev.reverse();
        let mut c_rev = c.clone();
        c_rev.reverse();
        prop_assert_eq!(reconcile(&l, &s_rev, &c_rev), out);
    }
}
