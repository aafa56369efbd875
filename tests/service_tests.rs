use chrono::{DateTime, Duration, Utc};
use innovault_auction::auction::error::{
    BidError, CloseError, CreateError, DeleteError, FetchError, UpdateError,
};
use innovault_auction::auction::model::{Auction, AuctionPatch, AuctionStatus, NewAuction};
use innovault_auction::service::{AllowAll, AuctionService, ManageAuth};
use innovault_auction::store::MemoryAuctionStore;
use std::sync::Arc;
use tracing::info;

const OWNER: i64 = 1;

/// Tracing setup for the noisier tests
fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .without_time()
        .with_target(false)
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Service over the in-memory store
fn setup() -> AuctionService<MemoryAuctionStore> {
    AuctionService::new(MemoryAuctionStore::new(), Arc::new(AllowAll))
}

fn payload(starting_price: i64, deadline: DateTime<Utc>) -> NewAuction {
    NewAuction {
        title: "Portfolio site".to_string(),
        description: "Marketing site with a small CMS.".to_string(),
        category: "web".to_string(),
        features: vec!["cms".to_string()],
        technologies: vec!["rust".to_string()],
        tags: vec![],
        starting_price,
        bid_deadline: deadline,
        status: Some(AuctionStatus::Active),
    }
}

/// Create an active auction owned by OWNER
async fn create_active(
    service: &AuctionService<MemoryAuctionStore>,
    starting_price: i64,
) -> Auction {
    service
        .create_auction(
            OWNER,
            "Selybi",
            payload(starting_price, Utc::now() + Duration::hours(2)),
        )
        .await
        .unwrap()
}

/// Bid validation against live state
#[tokio::test]
async fn test_place_bid_tracks_highest_bid() {
    let service = setup();
    let auction = create_active(&service, 100).await;

    assert!(matches!(
        service.place_bid(auction.id, 2, "Ada", 50).await,
        Err(BidError::BidTooLow { current_bid: 100 })
    ));

    let updated = service.place_bid(auction.id, 2, "Ada", 150).await.unwrap();
    assert_eq!(updated.current_bid, 150);
    assert_eq!(updated.bid_count, 1);

    // A tie is rejected, not accepted first-come.
    assert!(matches!(
        service.place_bid(auction.id, 3, "Grace", 150).await,
        Err(BidError::BidTooLow { current_bid: 150 })
    ));

    // The owner never bids on their own auction.
    assert!(matches!(
        service.place_bid(auction.id, OWNER, "Selybi", 200).await,
        Err(BidError::SelfBid)
    ));

    let updated = service
        .place_bid(auction.id, 3, "Grace", 200)
        .await
        .unwrap();
    assert_eq!(updated.current_bid, 200);
    assert_eq!(updated.bid_count, 2);

    // History reads back most recent first.
    let history = service.get_bidding_history(auction.id).await.unwrap();
    let amounts: Vec<i64> = history.iter().map(|b| b.amount).collect();
    assert_eq!(amounts, vec![200, 150]);
}

#[tokio::test]
async fn test_bid_on_missing_auction() {
    let service = setup();
    assert!(matches!(
        service.place_bid(999, 2, "Ada", 100).await,
        Err(BidError::AuctionNotFound)
    ));
}

/// The deadline rejects even a winning amount
#[tokio::test]
async fn test_bid_after_deadline() {
    let service = setup();
    let auction = service
        .create_auction(
            OWNER,
            "Selybi",
            payload(100, Utc::now() + Duration::milliseconds(100)),
        )
        .await
        .unwrap();

    tokio::time::sleep(tokio::time::Duration::from_millis(250)).await;

    assert!(matches!(
        service.place_bid(auction.id, 2, "Ada", 500).await,
        Err(BidError::DeadlinePassed)
    ));
}

#[tokio::test]
async fn test_bid_requires_active_status() {
    let service = setup();
    let mut new = payload(100, Utc::now() + Duration::hours(2));
    new.status = None; // defaults to draft
    let auction = service.create_auction(OWNER, "Selybi", new).await.unwrap();

    assert!(matches!(
        service.place_bid(auction.id, 2, "Ada", 150).await,
        Err(BidError::NotActive)
    ));
}

/// Closing without bids ends unsold
#[tokio::test]
async fn test_close_without_bids() {
    let service = setup();
    let auction = create_active(&service, 100).await;

    let closed = service.close_auction(OWNER, auction.id).await.unwrap();
    assert_eq!(closed.status, AuctionStatus::Closed);
    assert_eq!(closed.final_buyer_id, None);
    assert_eq!(closed.sold_at, None);

    // Terminal, a second close is rejected.
    assert!(matches!(
        service.close_auction(OWNER, auction.id).await,
        Err(CloseError::NotActive)
    ));
}

/// Closing with bids sells to the last bidder
#[tokio::test]
async fn test_close_with_bids_sells_to_last_bidder() {
    let service = setup();
    let auction = create_active(&service, 100).await;
    service.place_bid(auction.id, 2, "Ada", 150).await.unwrap();
    service
        .place_bid(auction.id, 3, "Grace", 200)
        .await
        .unwrap();

    let sold = service.close_auction(OWNER, auction.id).await.unwrap();
    assert_eq!(sold.status, AuctionStatus::Sold);
    assert_eq!(sold.final_buyer_id, Some(3));
    assert_eq!(sold.final_buyer_name.as_deref(), Some("Grace"));
    assert!(sold.sold_at.is_some());
    assert_eq!(sold.current_bid, 200);

    // No more bids once sold.
    assert!(matches!(
        service.place_bid(auction.id, 4, "Alan", 300).await,
        Err(BidError::NotActive)
    ));
}

/// A close racing a bid never lets both win blindly: either the close sees
/// the bid and sells to that bidder, the close lands first and the bid is
/// refused, or the close loses the conditional write and surfaces a
/// conflict with the auction still active
#[tokio::test]
async fn test_close_and_bid_race_is_serialized() {
    let service = Arc::new(setup());

    for _ in 0..50 {
        let auction = create_active(&service, 100).await;

        let closer = {
            let service = Arc::clone(&service);
            let auction_id = auction.id;
            tokio::spawn(async move { service.close_auction(OWNER, auction_id).await })
        };
        let bidder = {
            let service = Arc::clone(&service);
            let auction_id = auction.id;
            tokio::spawn(async move { service.place_bid(auction_id, 2, "Ada", 150).await })
        };

        let close_res = closer.await.unwrap();
        let bid_res = bidder.await.unwrap();
        let final_state = service.get_auction(auction.id).await.unwrap();

        match (close_res, bid_res) {
            // The close loaded a snapshot that already carried the bid.
            (Ok(closed), Ok(_)) => {
                assert_eq!(closed.status, AuctionStatus::Sold);
                assert_eq!(closed.final_buyer_id, Some(2));
                assert_eq!(final_state.bid_count, 1);
            }
            // The close landed first, the bid revalidated and was refused.
            (Ok(closed), Err(BidError::NotActive)) => {
                assert_eq!(closed.status, AuctionStatus::Closed);
                assert!(final_state.bidding_history.is_empty());
            }
            // The bid won the conditional write, the close is not retried.
            (Err(CloseError::Conflict), Ok(_)) => {
                assert_eq!(final_state.status, AuctionStatus::Active);
                assert_eq!(final_state.bid_count, 1);
            }
            (close_res, bid_res) => {
                panic!("unexpected interleaving: {close_res:?} / {bid_res:?}")
            }
        }

        // Whatever happened, a terminal auction takes no further bids.
        if final_state.status != AuctionStatus::Active {
            assert!(matches!(
                service.place_bid(auction.id, 3, "Grace", 500).await,
                Err(BidError::NotActive)
            ));
        }
    }
}

/// Bid history blocks deletion in every status
#[tokio::test]
async fn test_delete_refuses_bid_history() {
    let service = setup();

    let empty = create_active(&service, 100).await;
    service.delete_auction(OWNER, empty.id).await.unwrap();
    assert!(matches!(
        service.get_auction(empty.id).await,
        Err(FetchError::AuctionNotFound)
    ));

    let with_bids = create_active(&service, 100).await;
    service
        .place_bid(with_bids.id, 2, "Ada", 150)
        .await
        .unwrap();
    assert!(matches!(
        service.delete_auction(OWNER, with_bids.id).await,
        Err(DeleteError::HasBids)
    ));

    // Still refused after the auction is sold.
    service.close_auction(OWNER, with_bids.id).await.unwrap();
    assert!(matches!(
        service.delete_auction(OWNER, with_bids.id).await,
        Err(DeleteError::HasBids)
    ));
}

/// Descriptive fields lock once bids exist
#[tokio::test]
async fn test_update_locks_descriptive_fields() {
    let service = setup();
    let auction = create_active(&service, 100).await;

    // No bids yet, descriptive edits pass.
    let patch = AuctionPatch {
        title: Some("Portfolio site v2".to_string()),
        ..Default::default()
    };
    let updated = service
        .update_auction(OWNER, auction.id, patch)
        .await
        .unwrap();
    assert_eq!(updated.title, "Portfolio site v2");

    service.place_bid(auction.id, 2, "Ada", 150).await.unwrap();

    let patch = AuctionPatch {
        title: Some("locked".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        service.update_auction(OWNER, auction.id, patch).await,
        Err(UpdateError::LockedFields)
    ));

    // Deadline adjustments stay allowed.
    let new_deadline = Utc::now() + Duration::hours(6);
    let patch = AuctionPatch {
        bid_deadline: Some(new_deadline),
        ..Default::default()
    };
    let updated = service
        .update_auction(OWNER, auction.id, patch)
        .await
        .unwrap();
    assert_eq!(updated.bid_deadline, new_deadline);
}

/// Re-pricing a bid-free auction moves the floor
#[tokio::test]
async fn test_update_starting_price_rederives_current_bid() {
    let service = setup();
    let auction = create_active(&service, 100).await;

    let patch = AuctionPatch {
        starting_price: Some(300),
        ..Default::default()
    };
    let updated = service
        .update_auction(OWNER, auction.id, patch)
        .await
        .unwrap();
    assert_eq!(updated.current_bid, 300);

    assert!(matches!(
        service.place_bid(auction.id, 2, "Ada", 250).await,
        Err(BidError::BidTooLow { current_bid: 300 })
    ));
}

/// Activating a draft opens it for bids
#[tokio::test]
async fn test_activate_draft_via_update() {
    let service = setup();
    let mut new = payload(100, Utc::now() + Duration::hours(2));
    new.status = None;
    let auction = service.create_auction(OWNER, "Selybi", new).await.unwrap();

    let patch = AuctionPatch {
        status: Some(AuctionStatus::Active),
        ..Default::default()
    };
    service
        .update_auction(OWNER, auction.id, patch)
        .await
        .unwrap();

    let updated = service.place_bid(auction.id, 2, "Ada", 150).await.unwrap();
    assert_eq!(updated.current_bid, 150);
}

/// Management operations consult the capability check
#[tokio::test]
async fn test_management_requires_permission() {
    struct DenyAll;
    impl ManageAuth for DenyAll {
        fn can_manage(&self, _caller_id: i64) -> bool {
            false
        }
    }

    let service = AuctionService::new(MemoryAuctionStore::new(), Arc::new(DenyAll));
    assert!(matches!(
        service
            .create_auction(OWNER, "Selybi", payload(100, Utc::now() + Duration::hours(2)))
            .await,
        Err(CreateError::NotPermitted)
    ));
    // The capability check comes before any lookup.
    assert!(matches!(
        service.delete_auction(OWNER, 999).await,
        Err(DeleteError::NotPermitted)
    ));
    assert!(matches!(
        service.close_auction(OWNER, 999).await,
        Err(CloseError::NotPermitted)
    ));
}

/// Reads count views
#[tokio::test]
async fn test_get_auction_counts_views() {
    let service = setup();
    let auction = create_active(&service, 100).await;

    let first = service.get_auction(auction.id).await.unwrap();
    assert_eq!(first.view_count, 1);
    let second = service.get_auction(auction.id).await.unwrap();
    assert_eq!(second.view_count, 2);
}

/// Two bids racing on the same snapshot: the conditional write serializes
/// them, the loser revalidates against the new price
#[tokio::test]
async fn test_concurrent_bid_pair() {
    let service = Arc::new(setup());
    let auction = create_active(&service, 100).await;
    service.place_bid(auction.id, 2, "Ada", 150).await.unwrap();

    let mut handles = vec![];
    for (bidder_id, amount) in [(3_i64, 160_i64), (4, 170)] {
        let service = Arc::clone(&service);
        let auction_id = auction.id;
        handles.push(tokio::spawn(async move {
            service
                .place_bid(auction_id, bidder_id, "racer", amount)
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(BidError::BidTooLow { .. }) => {}
            Err(e) => panic!("unexpected rejection: {e}"),
        }
    }

    // 170 always ends up accepted; 160 only when it got in first.
    let final_state = service.get_auction(auction.id).await.unwrap();
    assert_eq!(final_state.current_bid, 170);
    assert_eq!(final_state.bid_count, 1 + accepted as i64);
    assert!(accepted == 1 || accepted == 2);
}

/// Heavier contention: whatever interleaving happens, the aggregate
/// invariants must hold afterwards
#[tokio::test]
async fn test_concurrent_bidding_keeps_invariants() {
    init_tracing();

    let service = Arc::new(setup());
    let auction = create_active(&service, 100).await;

    let mut handles = vec![];
    for i in 0..20_i64 {
        let service = Arc::clone(&service);
        let auction_id = auction.id;
        let amount = 200 + i;
        handles.push(tokio::spawn(async move {
            service
                .place_bid(auction_id, 100 + i, "racer", amount)
                .await
                .map(|auction| auction.current_bid)
        }));
    }

    let mut accepted = 0;
    let mut rejected = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(BidError::BidTooLow { .. }) => rejected += 1,
            Err(BidError::Conflict) => conflicts += 1,
            Err(e) => panic!("unexpected rejection: {e}"),
        }
    }
    info!(
        "accepted: {}, rejected: {}, conflicts: {}",
        accepted, rejected, conflicts
    );

    let final_state = service.get_auction(auction.id).await.unwrap();
    assert!(accepted >= 1);
    assert_eq!(final_state.bid_count as usize, accepted);
    assert_eq!(
        final_state.bid_count as usize,
        final_state.bidding_history.len()
    );
    // Strictly increasing amounts, non-decreasing timestamps.
    for pair in final_state.bidding_history.windows(2) {
        assert!(pair[0].amount < pair[1].amount);
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
    assert_eq!(
        final_state.current_bid,
        final_state.bidding_history.last().unwrap().amount
    );
}
