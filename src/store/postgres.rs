/// Postgres-backed auction store.
/// The version column on `auctions` is the optimistic-concurrency token,
/// bids live in their own append-only table keyed by `(auction_id, seq)`.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus, Bid};
use crate::store::{queries, AuctionStore, CasOutcome, DeleteOutcome, StoreError, Versioned};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::sync::Arc;

// endregion: --- Imports

// region:    --- Rows

#[derive(FromRow)]
struct AuctionRow {
    id: i64,
    title: String,
    description: String,
    category: String,
    features: Vec<String>,
    technologies: Vec<String>,
    tags: Vec<String>,
    status: String,
    starting_price: i64,
    current_bid: i64,
    bid_deadline: DateTime<Utc>,
    final_buyer_id: Option<i64>,
    final_buyer_name: Option<String>,
    sold_at: Option<DateTime<Utc>>,
    view_count: i64,
    created_by_id: i64,
    created_by_name: String,
    created_at: DateTime<Utc>,
    version: i64,
}

#[derive(FromRow)]
struct BidRow {
    auction_id: i64,
    bidder_id: i64,
    bidder_name: String,
    amount: i64,
    bid_time: DateTime<Utc>,
}

impl AuctionRow {
    fn into_versioned(self, bids: Vec<BidRow>) -> Result<Versioned<Auction>, StoreError> {
        let status = AuctionStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown status '{}'", self.status)))?;
        let bidding_history: Vec<Bid> = bids
            .into_iter()
            .map(|row| Bid {
                bidder_id: row.bidder_id,
                bidder_name: row.bidder_name,
                amount: row.amount,
                timestamp: row.bid_time,
            })
            .collect();
        let bid_count = bidding_history.len() as i64;
        Ok(Versioned {
            version: self.version,
            data: Auction {
                id: self.id,
                title: self.title,
                description: self.description,
                category: self.category,
                features: self.features,
                technologies: self.technologies,
                tags: self.tags,
                status,
                starting_price: self.starting_price,
                current_bid: self.current_bid,
                bid_deadline: self.bid_deadline,
                bidding_history,
                bid_count,
                final_buyer_id: self.final_buyer_id,
                final_buyer_name: self.final_buyer_name,
                sold_at: self.sold_at,
                view_count: self.view_count,
                created_by_id: self.created_by_id,
                created_by_name: self.created_by_name,
                created_at: self.created_at,
            },
        })
    }
}

// endregion: --- Rows

// region:    --- Postgres Store

pub struct PostgresAuctionStore {
    pool: Arc<PgPool>,
}

impl PostgresAuctionStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn load_bids(&self, auction_id: i64) -> Result<Vec<BidRow>, StoreError> {
        Ok(sqlx::query_as::<_, BidRow>(queries::GET_AUCTION_BIDS)
            .bind(auction_id)
            .fetch_all(&*self.pool)
            .await?)
    }
}

#[async_trait]
impl AuctionStore for PostgresAuctionStore {
    async fn insert(&self, mut auction: Auction) -> Result<Auction, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(queries::INSERT_AUCTION)
            .bind(&auction.title)
            .bind(&auction.description)
            .bind(&auction.category)
            .bind(&auction.features)
            .bind(&auction.technologies)
            .bind(&auction.tags)
            .bind(auction.status.as_str())
            .bind(auction.starting_price)
            .bind(auction.current_bid)
            .bind(auction.bid_deadline)
            .bind(auction.created_by_id)
            .bind(&auction.created_by_name)
            .bind(auction.created_at)
            .fetch_one(&*self.pool)
            .await?;
        auction.id = id;
        Ok(auction)
    }

    async fn load(&self, auction_id: i64) -> Result<Option<Versioned<Auction>>, StoreError> {
        let row = sqlx::query_as::<_, AuctionRow>(queries::GET_AUCTION)
            .bind(auction_id)
            .fetch_optional(&*self.pool)
            .await?;
        match row {
            None => Ok(None),
            Some(row) => {
                let bids = self.load_bids(auction_id).await?;
                Ok(Some(row.into_versioned(bids)?))
            }
        }
    }

    async fn compare_and_update(
        &self,
        expected_version: i64,
        auction: &Auction,
    ) -> Result<CasOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(queries::CAS_UPDATE_AUCTION)
            .bind(auction.id)
            .bind(&auction.title)
            .bind(&auction.description)
            .bind(&auction.category)
            .bind(&auction.features)
            .bind(&auction.technologies)
            .bind(&auction.tags)
            .bind(auction.status.as_str())
            .bind(auction.starting_price)
            .bind(auction.current_bid)
            .bind(auction.bid_deadline)
            .bind(auction.final_buyer_id)
            .bind(auction.final_buyer_name.as_deref())
            .bind(auction.sold_at)
            .bind(expected_version)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CasOutcome::Conflict);
        }

        // The history is append-only, only the tail beyond the persisted
        // count needs inserting.
        let persisted = sqlx::query_scalar::<_, i64>(queries::COUNT_AUCTION_BIDS)
            .bind(auction.id)
            .fetch_one(&mut *tx)
            .await?;
        for (seq, bid) in auction
            .bidding_history
            .iter()
            .enumerate()
            .skip(persisted as usize)
        {
            sqlx::query(queries::INSERT_BID)
                .bind(auction.id)
                .bind(seq as i64)
                .bind(bid.bidder_id)
                .bind(&bid.bidder_name)
                .bind(bid.amount)
                .bind(bid.timestamp)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(CasOutcome::Applied)
    }

    async fn delete(&self, auction_id: i64) -> Result<DeleteOutcome, StoreError> {
        let deleted = sqlx::query(queries::DELETE_AUCTION)
            .bind(auction_id)
            .execute(&*self.pool)
            .await?;
        if deleted.rows_affected() > 0 {
            return Ok(DeleteOutcome::Deleted);
        }
        let exists = sqlx::query_scalar::<_, bool>(queries::AUCTION_EXISTS)
            .bind(auction_id)
            .fetch_one(&*self.pool)
            .await?;
        if exists {
            Ok(DeleteOutcome::HasBids)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }

    async fn list(&self) -> Result<Vec<Auction>, StoreError> {
        let rows = sqlx::query_as::<_, AuctionRow>(queries::LIST_AUCTIONS)
            .fetch_all(&*self.pool)
            .await?;
        // One round trip for every history, grouped per auction.
        let bid_rows = sqlx::query_as::<_, BidRow>(queries::LIST_ALL_BIDS)
            .fetch_all(&*self.pool)
            .await?;
        let mut bids_by_auction: HashMap<i64, Vec<BidRow>> = HashMap::new();
        for bid in bid_rows {
            bids_by_auction.entry(bid.auction_id).or_default().push(bid);
        }

        let mut auctions = Vec::with_capacity(rows.len());
        for row in rows {
            let bids = bids_by_auction.remove(&row.id).unwrap_or_default();
            auctions.push(row.into_versioned(bids)?.data);
        }
        Ok(auctions)
    }

    async fn increment_view_count(&self, auction_id: i64) -> Result<Option<i64>, StoreError> {
        Ok(sqlx::query_scalar::<_, i64>(queries::INCREMENT_VIEW_COUNT)
            .bind(auction_id)
            .fetch_optional(&*self.pool)
            .await?)
    }
}

// endregion: --- Postgres Store
