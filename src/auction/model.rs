/// The auction aggregate and its invariants.
/// Pure in-memory logic, no I/O. Every mutation validates before it touches
/// state, so a rejected operation leaves the aggregate unchanged.
// region:    --- Imports
use crate::auction::error::{BidError, CloseError, CreateError, UpdateError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Bid

/// One accepted bid, immutable once appended to the history.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Bid {
    pub bidder_id: i64,
    /// Display name captured at bid time, never re-synced.
    pub bidder_name: String,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
}

// endregion: --- Bid

// region:    --- Status

/// Auction lifecycle status. `Closed` and `Sold` are terminal.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Draft,
    Active,
    Closed,
    Sold,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Draft => "draft",
            AuctionStatus::Active => "active",
            AuctionStatus::Closed => "closed",
            AuctionStatus::Sold => "sold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(AuctionStatus::Draft),
            "active" => Some(AuctionStatus::Active),
            "closed" => Some(AuctionStatus::Closed),
            "sold" => Some(AuctionStatus::Sold),
            _ => None,
        }
    }
}

/// Result of closing an auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// No bids were placed, the auction ends as `closed`.
    Unsold,
    /// At least one bid was placed, the last bidder wins and the auction
    /// ends as `sold`.
    Sold,
}

// endregion: --- Status

// region:    --- Auction

/// The auction aggregate.
///
/// Invariants held after every mutation:
/// - `current_bid` equals `starting_price` while the history is empty,
///   otherwise the amount of the last accepted bid
/// - `bid_count` equals `bidding_history.len()`
/// - bid amounts strictly increase, timestamps are non-decreasing
/// - `sold` always has a final buyer and a non-empty history
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Auction {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub features: Vec<String>,
    pub technologies: Vec<String>,
    pub tags: Vec<String>,
    pub status: AuctionStatus,
    pub starting_price: i64,
    /// Highest accepted bid, cached. Only `apply_bid` moves it.
    pub current_bid: i64,
    pub bid_deadline: DateTime<Utc>,
    /// Append-only, in acceptance order.
    pub bidding_history: Vec<Bid>,
    pub bid_count: i64,
    pub final_buyer_id: Option<i64>,
    pub final_buyer_name: Option<String>,
    pub sold_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub created_by_id: i64,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
}

impl Auction {
    /// Build a new auction from the creation payload.
    /// The id stays 0 until the store assigns one.
    pub fn create(
        new: NewAuction,
        created_by_id: i64,
        created_by_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, CreateError> {
        if new.title.trim().is_empty() {
            return Err(CreateError::MissingField("title"));
        }
        if new.description.trim().is_empty() {
            return Err(CreateError::MissingField("description"));
        }
        if new.category.trim().is_empty() {
            return Err(CreateError::MissingField("category"));
        }
        if new.starting_price <= 0 {
            return Err(CreateError::InvalidPrice);
        }
        if new.bid_deadline <= now {
            return Err(CreateError::DeadlineNotFuture);
        }
        let status = new.status.unwrap_or(AuctionStatus::Draft);
        if status != AuctionStatus::Draft && status != AuctionStatus::Active {
            return Err(CreateError::InvalidStatus);
        }

        Ok(Auction {
            id: 0,
            title: new.title,
            description: new.description,
            category: new.category,
            features: new.features,
            technologies: new.technologies,
            tags: new.tags,
            status,
            starting_price: new.starting_price,
            current_bid: new.starting_price,
            bid_deadline: new.bid_deadline,
            bidding_history: Vec::new(),
            bid_count: 0,
            final_buyer_id: None,
            final_buyer_name: None,
            sold_at: None,
            view_count: 0,
            created_by_id,
            created_by_name: created_by_name.to_owned(),
            created_at: now,
        })
    }

    /// Check a bid against the current state without mutating anything.
    /// The state checks come first, then the amount, then the owner check.
    pub fn validate_bid(
        &self,
        bidder_id: i64,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<(), BidError> {
        if self.status != AuctionStatus::Active {
            return Err(BidError::NotActive);
        }
        if now >= self.bid_deadline {
            return Err(BidError::DeadlinePassed);
        }
        if amount <= self.current_bid {
            return Err(BidError::BidTooLow {
                current_bid: self.current_bid,
            });
        }
        if bidder_id == self.created_by_id {
            return Err(BidError::SelfBid);
        }
        Ok(())
    }

    /// Append an accepted bid. Callers run `validate_bid` first; this is the
    /// only place `current_bid` and `bid_count` change.
    pub fn apply_bid(
        &mut self,
        bidder_id: i64,
        bidder_name: String,
        amount: i64,
        now: DateTime<Utc>,
    ) {
        self.bidding_history.push(Bid {
            bidder_id,
            bidder_name,
            amount,
            timestamp: now,
        });
        self.current_bid = amount;
        self.bid_count += 1;
    }

    /// Close an active auction. With bids the last bidder wins and the
    /// auction becomes `sold`, without bids it becomes `closed`.
    pub fn close(&mut self, now: DateTime<Utc>) -> Result<CloseOutcome, CloseError> {
        if self.status != AuctionStatus::Active {
            return Err(CloseError::NotActive);
        }
        match self.bidding_history.last() {
            None => {
                self.status = AuctionStatus::Closed;
                Ok(CloseOutcome::Unsold)
            }
            Some(winning) => {
                self.final_buyer_id = Some(winning.bidder_id);
                self.final_buyer_name = Some(winning.bidder_name.clone());
                self.sold_at = Some(now);
                self.status = AuctionStatus::Sold;
                Ok(CloseOutcome::Sold)
            }
        }
    }

    /// Whether the descriptive fields are still editable. Once an active
    /// auction carries bids only `status` and `bid_deadline` stay patchable,
    /// and terminal auctions are fully locked.
    pub fn field_edits_locked(&self) -> bool {
        match self.status {
            AuctionStatus::Draft => false,
            AuctionStatus::Active => !self.bidding_history.is_empty(),
            AuctionStatus::Closed | AuctionStatus::Sold => true,
        }
    }

    /// Auctions with any bid history can never be deleted.
    pub fn can_delete(&self) -> bool {
        self.bidding_history.is_empty()
    }
}

// endregion: --- Auction

// region:    --- New Auction

/// Creation payload for an auction.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewAuction {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub starting_price: i64,
    pub bid_deadline: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<AuctionStatus>,
}

// endregion: --- New Auction

// region:    --- Auction Patch

/// Partial update for an auction. Absent fields are left untouched.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AuctionPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub features: Option<Vec<String>>,
    pub technologies: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<AuctionStatus>,
    pub starting_price: Option<i64>,
    pub bid_deadline: Option<DateTime<Utc>>,
}

impl AuctionPatch {
    /// Whether the patch touches anything outside the always-editable
    /// `{status, bid_deadline}` subset.
    pub fn touches_locked_fields(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.category.is_some()
            || self.features.is_some()
            || self.technologies.is_some()
            || self.tags.is_some()
            || self.starting_price.is_some()
    }

    /// Apply the patch, validating against the lock and transition rules.
    /// On error the auction is left unchanged.
    pub fn apply_to(&self, auction: &mut Auction, now: DateTime<Utc>) -> Result<(), UpdateError> {
        if auction.field_edits_locked() && self.touches_locked_fields() {
            return Err(UpdateError::LockedFields);
        }
        let status = match self.status {
            Some(requested) if requested != auction.status => {
                // Closing and selling only happen through close().
                match (auction.status, requested) {
                    (AuctionStatus::Draft, AuctionStatus::Active)
                    | (AuctionStatus::Active, AuctionStatus::Draft) => Some(requested),
                    _ => return Err(UpdateError::InvalidStatus),
                }
            }
            _ => None,
        };
        if let Some(deadline) = self.bid_deadline {
            if deadline <= now {
                return Err(UpdateError::DeadlineNotFuture);
            }
        }
        if let Some(price) = self.starting_price {
            if price <= 0 {
                return Err(UpdateError::InvalidPrice);
            }
        }

        // All checks passed, mutate.
        if let Some(status) = status {
            auction.status = status;
        }
        if let Some(deadline) = self.bid_deadline {
            auction.bid_deadline = deadline;
        }
        if let Some(price) = self.starting_price {
            auction.starting_price = price;
            if auction.bidding_history.is_empty() {
                auction.current_bid = price;
            }
        }
        if let Some(title) = &self.title {
            auction.title = title.clone();
        }
        if let Some(description) = &self.description {
            auction.description = description.clone();
        }
        if let Some(category) = &self.category {
            auction.category = category.clone();
        }
        if let Some(features) = &self.features {
            auction.features = features.clone();
        }
        if let Some(technologies) = &self.technologies {
            auction.technologies = technologies.clone();
        }
        if let Some(tags) = &self.tags {
            auction.tags = tags.clone();
        }
        Ok(())
    }
}

// endregion: --- Auction Patch

// region:    --- Tests


// endregion: --- Tests
