/// Persistence boundary for the auction aggregate.
///
/// The service never locks in process. Correctness under concurrent bids
/// rides entirely on `compare_and_update`: every write is guarded by the
/// version token handed out at load time, and a stale token fails the write.
// region:    --- Imports
pub mod postgres;
pub mod queries;

use crate::auction::model::Auction;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

// endregion: --- Imports

// region:    --- Store Contract

/// Infrastructure failures from the persistence layer. These carry no
/// auction semantics and surface to the caller unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt auction row: {0}")]
    Corrupt(String),
}

/// A snapshot together with its optimistic-concurrency token.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub version: i64,
    pub data: T,
}

/// Outcome of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Applied,
    /// The record changed since the snapshot was loaded.
    Conflict,
}

/// Outcome of a delete attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The auction carries bid history and is never deleted.
    HasBids,
    NotFound,
}

/// Durable storage for auctions.
#[async_trait]
pub trait AuctionStore: Send + Sync {
    /// Persist a new auction and hand back the stored copy with its id.
    async fn insert(&self, auction: Auction) -> Result<Auction, StoreError>;

    /// Load a snapshot with its version token.
    async fn load(&self, auction_id: i64) -> Result<Option<Versioned<Auction>>, StoreError>;

    /// Write `auction` only if the stored version still matches
    /// `expected_version`. The stored `view_count` is left alone, it is
    /// bumped independently and never participates in the version guard.
    async fn compare_and_update(
        &self,
        expected_version: i64,
        auction: &Auction,
    ) -> Result<CasOutcome, StoreError>;

    /// Delete an auction, refusing when any bid history exists.
    async fn delete(&self, auction_id: i64) -> Result<DeleteOutcome, StoreError>;

    /// All auctions, newest first.
    async fn list(&self) -> Result<Vec<Auction>, StoreError>;

    /// Atomically bump the view counter, returning the new value.
    async fn increment_view_count(&self, auction_id: i64) -> Result<Option<i64>, StoreError>;
}

// endregion: --- Store Contract

// region:    --- Memory Store

/// In-memory store, useful for unit tests.
/// A single mutex serializes access, which makes the version guard exact.
#[derive(Default)]
pub struct MemoryAuctionStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    next_id: i64,
    rows: HashMap<i64, Versioned<Auction>>,
}

impl MemoryAuctionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuctionStore for MemoryAuctionStore {
    async fn insert(&self, mut auction: Auction) -> Result<Auction, StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.next_id += 1;
        auction.id = inner.next_id;
        inner.rows.insert(
            auction.id,
            Versioned {
                version: 1,
                data: auction.clone(),
            },
        );
        Ok(auction)
    }

    async fn load(&self, auction_id: i64) -> Result<Option<Versioned<Auction>>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.rows.get(&auction_id).cloned())
    }

    async fn compare_and_update(
        &self,
        expected_version: i64,
        auction: &Auction,
    ) -> Result<CasOutcome, StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let Some(row) = inner.rows.get_mut(&auction.id) else {
            // Deleted since the snapshot was taken.
            return Ok(CasOutcome::Conflict);
        };
        if row.version != expected_version {
            return Ok(CasOutcome::Conflict);
        }
        let view_count = row.data.view_count;
        row.data = auction.clone();
        row.data.view_count = view_count;
        row.version += 1;
        Ok(CasOutcome::Applied)
    }

    async fn delete(&self, auction_id: i64) -> Result<DeleteOutcome, StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        match inner.rows.get(&auction_id) {
            None => Ok(DeleteOutcome::NotFound),
            Some(row) if !row.data.bidding_history.is_empty() => Ok(DeleteOutcome::HasBids),
            Some(_) => {
                inner.rows.remove(&auction_id);
                Ok(DeleteOutcome::Deleted)
            }
        }
    }

    async fn list(&self) -> Result<Vec<Auction>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut auctions: Vec<Auction> = inner.rows.values().map(|row| row.data.clone()).collect();
        auctions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(auctions)
    }

    async fn increment_view_count(&self, auction_id: i64) -> Result<Option<i64>, StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.rows.get_mut(&auction_id).map(|row| {
            row.data.view_count += 1;
            row.data.view_count
        }))
    }
}

// endregion: --- Memory Store

// region:    --- Tests


// endregion: --- Tests
