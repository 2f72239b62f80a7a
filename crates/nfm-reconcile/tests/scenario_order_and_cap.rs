use nfm_reconcile::*;
use nfm_schemas::{CancelEvent, ListedEvent, SaleEvent};
use proptest::prelude::*;

fn listed(nft: &str, token: &str, block: u64) -> ListedEvent {
    ListedEvent {
        id: format!("{nft}:{token}"),
        seller: "0xSeller".to_string(),
        nft_address: nft.to_string(),
        token_id: token.to_string(),
        price: "1".to_string(),
        contract_address: format!("{nft} "),
        block_number: block,
        tx_hash: "0x0".to_string(),
    }
}

#[test]
fn scenario_cap_keeps_first_hundred_in_order() {
    let l: Vec<ListedEvent> = (0..150u64)
        .map(|i| listed(&format!("0x{i:04}"), "1", 1_000 - i))
        .collect();

    let out = reconcile(&l, &[], &[]);
    assert_eq!(out.len(), DEFAULT_MAX_ACTIVE);
    for (i, a) in out.iter().enumerate() {
        assert_eq!(a.nft_address, l[i].nft_address);
    }
}

#[test]
fn scenario_empty_listed_yields_empty() {
    let s = vec![SaleEvent::new("0xA", "1")];
    assert!(reconcile(&[], &s, &[]).is_empty());
}

/// `(nftAddress, tokenId)` drawn from small pools so terminal keys hit listings.
fn arb_key() -> impl Strategy<Value = (String, String)> {
    ("0x0[0-5]", "[0-9]{1,2}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn scenario_order_preserved_and_capped_under_random_feeds(
        keys in prop::collection::vec(arb_key(), 0..180),
        sold in prop::collection::vec(arb_key(), 0..20),
        canceled in prop::collection::vec(arb_key(), 0..20),
    ) {
        let n = keys.len();
        let l: Vec<ListedEvent> = keys
            .iter()
            .enumerate()
            .map(|(i, (nft, token))| {
                let mut ev = listed(nft, token, (n - i) as u64);
                ev.id = format!("{i}");
                ev
            })
            .collect();
        let s: Vec<SaleEvent> = sold.iter().map(|(nft, token)| SaleEvent::new(nft.as_str(), token.as_str())).collect();
        let c: Vec<CancelEvent> = canceled.iter().map(|(nft, token)| CancelEvent::new(nft.as_str(), token.as_str())).collect();

        let out = reconcile(&l, &s, &c);
        prop_assert!(out.len() <= DEFAULT_MAX_ACTIVE);

        // Surviving ids appear in the same relative order as in `l`.
        let positions: Vec<usize> = out.iter().filter_map(|a| a.id.parse().ok()).collect();
        prop_assert_eq!(positions.len(), out.len());
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
