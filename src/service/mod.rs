/// Auction operations over the persistence boundary.
/// 1. place bid (retried on version conflicts)
/// 2. close auction
/// 3. create / update / delete / read auctions
// region:    --- Imports
use crate::auction::error::{
    BidError, CloseError, CreateError, DeleteError, FetchError, UpdateError,
};
use crate::auction::model::{Auction, AuctionPatch, Bid, NewAuction};
use crate::store::{AuctionStore, CasOutcome, DeleteOutcome, Versioned};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Authorization

/// Capability check supplied by the identity collaborator. The service only
/// ever asks a yes/no question, how roles are modelled is not its concern.
pub trait ManageAuth: Send + Sync {
    fn can_manage(&self, caller_id: i64) -> bool;
}

/// Grants every caller management rights, the single-tenant default.
pub struct AllowAll;

impl ManageAuth for AllowAll {
    fn can_manage(&self, _caller_id: i64) -> bool {
        true
    }
}

// endregion: --- Authorization

// region:    --- Auction Service

/// Maximum reload-and-revalidate attempts when concurrent bids race on the
/// same auction. Bidding is expected to be contended, so conflicts on
/// `place_bid` are retried here; conflicts anywhere else are surfaced.
const MAX_BID_RETRIES: u32 = 5;

pub struct AuctionService<S> {
    store: S,
    auth: Arc<dyn ManageAuth>,
}

impl<S: AuctionStore> AuctionService<S> {
    pub fn new(store: S, auth: Arc<dyn ManageAuth>) -> Self {
        Self { store, auth }
    }

    /// Place a bid. Loads a snapshot, validates against it, then writes
    /// conditionally on the snapshot's version token. A lost race reloads
    /// and revalidates, bounded by `MAX_BID_RETRIES`.
    pub async fn place_bid(
        &self,
        auction_id: i64,
        bidder_id: i64,
        bidder_name: &str,
        amount: i64,
    ) -> Result<Auction, BidError> {
        info!(
            "{:<12} --> place bid: auction {} bidder {} amount {}",
            "Command", auction_id, bidder_id, amount
        );

        for _attempt in 0..MAX_BID_RETRIES {
            let Some(snapshot) = self.store.load(auction_id).await? else {
                return Err(BidError::AuctionNotFound);
            };
            let Versioned {
                version,
                data: mut auction,
            } = snapshot;

            let now = Utc::now();
            auction.validate_bid(bidder_id, amount, now)?;
            auction.apply_bid(bidder_id, bidder_name.to_owned(), amount, now);

            match self.store.compare_and_update(version, &auction).await? {
                CasOutcome::Applied => {
                    info!(
                        "{:<12} --> bid accepted: auction {} current bid {}",
                        "Command", auction_id, auction.current_bid
                    );
                    return Ok(auction);
                }
                CasOutcome::Conflict => {
                    warn!(
                        "{:<12} --> version conflict on auction {}, retrying",
                        "Command", auction_id
                    );
                }
            }
        }

        Err(BidError::Conflict)
    }

    /// Close an active auction. Single attempt: closing is a rare,
    /// single-actor operation, a conflict means the caller should refetch.
    pub async fn close_auction(&self, caller_id: i64, auction_id: i64) -> Result<Auction, CloseError> {
        info!(
            "{:<12} --> close auction: {} by caller {}",
            "Command", auction_id, caller_id
        );
        if !self.auth.can_manage(caller_id) {
            return Err(CloseError::NotPermitted);
        }

        let Some(snapshot) = self.store.load(auction_id).await? else {
            return Err(CloseError::AuctionNotFound);
        };
        let Versioned {
            version,
            data: mut auction,
        } = snapshot;

        let outcome = auction.close(Utc::now())?;
        match self.store.compare_and_update(version, &auction).await? {
            CasOutcome::Applied => {
                info!(
                    "{:<12} --> auction {} closed as {:?}",
                    "Command", auction_id, outcome
                );
                Ok(auction)
            }
            CasOutcome::Conflict => Err(CloseError::Conflict),
        }
    }

    /// Create an auction for the calling party.
    pub async fn create_auction(
        &self,
        caller_id: i64,
        caller_name: &str,
        new: NewAuction,
    ) -> Result<Auction, CreateError> {
        info!(
            "{:<12} --> create auction '{}' by caller {}",
            "Command", new.title, caller_id
        );
        if !self.auth.can_manage(caller_id) {
            return Err(CreateError::NotPermitted);
        }
        let auction = Auction::create(new, caller_id, caller_name, Utc::now())?;
        Ok(self.store.insert(auction).await?)
    }

    /// Patch an auction. Descriptive fields are refused once the auction
    /// carries bids, only status and deadline stay adjustable.
    pub async fn update_auction(
        &self,
        caller_id: i64,
        auction_id: i64,
        patch: AuctionPatch,
    ) -> Result<Auction, UpdateError> {
        info!(
            "{:<12} --> update auction {} by caller {}",
            "Command", auction_id, caller_id
        );
        if !self.auth.can_manage(caller_id) {
            return Err(UpdateError::NotPermitted);
        }

        let Some(snapshot) = self.store.load(auction_id).await? else {
            return Err(UpdateError::AuctionNotFound);
        };
        let Versioned {
            version,
            data: mut auction,
        } = snapshot;

        patch.apply_to(&mut auction, Utc::now())?;
        match self.store.compare_and_update(version, &auction).await? {
            CasOutcome::Applied => Ok(auction),
            CasOutcome::Conflict => Err(UpdateError::Conflict),
        }
    }

    /// Delete an auction. Refused whenever bid history exists, regardless
    /// of status; the store enforces the same guard on its side.
    pub async fn delete_auction(&self, caller_id: i64, auction_id: i64) -> Result<(), DeleteError> {
        info!(
            "{:<12} --> delete auction {} by caller {}",
            "Command", auction_id, caller_id
        );
        if !self.auth.can_manage(caller_id) {
            return Err(DeleteError::NotPermitted);
        }
        match self.store.delete(auction_id).await? {
            DeleteOutcome::Deleted => Ok(()),
            DeleteOutcome::HasBids => Err(DeleteError::HasBids),
            DeleteOutcome::NotFound => Err(DeleteError::AuctionNotFound),
        }
    }

    /// Fetch one auction, counting the view.
    pub async fn get_auction(&self, auction_id: i64) -> Result<Auction, FetchError> {
        info!("{:<12} --> get auction id: {}", "Query", auction_id);
        if self.store.increment_view_count(auction_id).await?.is_none() {
            return Err(FetchError::AuctionNotFound);
        }
        let Some(snapshot) = self.store.load(auction_id).await? else {
            return Err(FetchError::AuctionNotFound);
        };
        Ok(snapshot.data)
    }

    /// All auctions, newest first.
    pub async fn list_auctions(&self) -> Result<Vec<Auction>, FetchError> {
        info!("{:<12} --> list auctions", "Query");
        Ok(self.store.list().await?)
    }

    /// Bid history for display, most recent first. A read-only projection,
    /// a stale snapshot is acceptable here.
    pub async fn get_bidding_history(&self, auction_id: i64) -> Result<Vec<Bid>, FetchError> {
        info!("{:<12} --> bid history id: {}", "Query", auction_id);
        let Some(snapshot) = self.store.load(auction_id).await? else {
            return Err(FetchError::AuctionNotFound);
        };
        let mut bids = snapshot.data.bidding_history;
        bids.reverse();
        Ok(bids)
    }
}

// endregion: --- Auction Service
