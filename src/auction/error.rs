/// Error taxonomy for the auction operations.
/// Everything here is scoped to a single auction; nothing is fatal to the
/// process. Each variant carries a stable machine code for the HTTP layer.
// region:    --- Imports
use crate::store::StoreError;
use thiserror::Error;

// endregion: --- Imports

// region:    --- Bid Errors

/// Rejections for `place_bid`
#[derive(Debug, Error)]
pub enum BidError {
    #[error("auction not found")]
    AuctionNotFound,
    #[error("the auction is not active")]
    NotActive,
    #[error("the bidding deadline has passed")]
    DeadlinePassed,
    #[error("bid must be strictly greater than the current bid of {current_bid}")]
    BidTooLow { current_bid: i64 },
    #[error("the auction owner cannot bid on their own auction")]
    SelfBid,
    #[error("too many concurrent bids, please retry")]
    Conflict,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BidError {
    pub fn code(&self) -> &'static str {
        match self {
            BidError::AuctionNotFound => "NOT_FOUND",
            BidError::NotActive => "NOT_ACTIVE",
            BidError::DeadlinePassed => "DEADLINE_PASSED",
            BidError::BidTooLow { .. } => "LOW_BID",
            BidError::SelfBid => "SELF_BID",
            BidError::Conflict => "CONFLICT",
            BidError::Store(_) => "STORE_ERROR",
        }
    }
}

// endregion: --- Bid Errors

// region:    --- Close Errors

/// Rejections for `close_auction`
#[derive(Debug, Error)]
pub enum CloseError {
    #[error("auction not found")]
    AuctionNotFound,
    #[error("caller is not permitted to manage auctions")]
    NotPermitted,
    #[error("the auction is not active")]
    NotActive,
    #[error("the auction changed while closing, refetch and retry")]
    Conflict,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CloseError {
    pub fn code(&self) -> &'static str {
        match self {
            CloseError::AuctionNotFound => "NOT_FOUND",
            CloseError::NotPermitted => "NOT_PERMITTED",
            CloseError::NotActive => "NOT_ACTIVE",
            CloseError::Conflict => "CONFLICT",
            CloseError::Store(_) => "STORE_ERROR",
        }
    }
}

// endregion: --- Close Errors

// region:    --- Create Errors

/// Rejections for `create_auction`
#[derive(Debug, Error)]
pub enum CreateError {
    #[error("caller is not permitted to manage auctions")]
    NotPermitted,
    #[error("missing or empty field: {0}")]
    MissingField(&'static str),
    #[error("starting price must be positive")]
    InvalidPrice,
    #[error("bid deadline must be in the future")]
    DeadlineNotFuture,
    #[error("a new auction must start as draft or active")]
    InvalidStatus,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CreateError {
    pub fn code(&self) -> &'static str {
        match self {
            CreateError::NotPermitted => "NOT_PERMITTED",
            CreateError::MissingField(_) => "MISSING_FIELD",
            CreateError::InvalidPrice => "INVALID_PRICE",
            CreateError::DeadlineNotFuture => "DEADLINE_NOT_FUTURE",
            CreateError::InvalidStatus => "INVALID_STATUS",
            CreateError::Store(_) => "STORE_ERROR",
        }
    }
}

// endregion: --- Create Errors

// region:    --- Update Errors

/// Rejections for `update_auction`
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("auction not found")]
    AuctionNotFound,
    #[error("caller is not permitted to manage auctions")]
    NotPermitted,
    #[error("descriptive fields are locked once an auction has bids")]
    LockedFields,
    #[error("status can only move between draft and active, closing goes through close")]
    InvalidStatus,
    #[error("bid deadline must be in the future")]
    DeadlineNotFuture,
    #[error("starting price must be positive")]
    InvalidPrice,
    #[error("the auction changed while updating, refetch and retry")]
    Conflict,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl UpdateError {
    pub fn code(&self) -> &'static str {
        match self {
            UpdateError::AuctionNotFound => "NOT_FOUND",
            UpdateError::NotPermitted => "NOT_PERMITTED",
            UpdateError::LockedFields => "LOCKED_FIELDS",
            UpdateError::InvalidStatus => "INVALID_STATUS",
            UpdateError::DeadlineNotFuture => "DEADLINE_NOT_FUTURE",
            UpdateError::InvalidPrice => "INVALID_PRICE",
            UpdateError::Conflict => "CONFLICT",
            UpdateError::Store(_) => "STORE_ERROR",
        }
    }
}

// endregion: --- Update Errors

// region:    --- Delete Errors

/// Rejections for `delete_auction`
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("auction not found")]
    AuctionNotFound,
    #[error("caller is not permitted to manage auctions")]
    NotPermitted,
    #[error("auctions with bid history cannot be deleted")]
    HasBids,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DeleteError {
    pub fn code(&self) -> &'static str {
        match self {
            DeleteError::AuctionNotFound => "NOT_FOUND",
            DeleteError::NotPermitted => "NOT_PERMITTED",
            DeleteError::HasBids => "HAS_BIDS",
            DeleteError::Store(_) => "STORE_ERROR",
        }
    }
}

// endregion: --- Delete Errors

// region:    --- Fetch Errors

/// Rejections for the read operations
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("auction not found")]
    AuctionNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FetchError {
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::AuctionNotFound => "NOT_FOUND",
            FetchError::Store(_) => "STORE_ERROR",
        }
    }
}

// endregion: --- Fetch Errors
