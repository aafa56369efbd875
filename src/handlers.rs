// region:    --- Imports
use crate::auction::model::{AuctionPatch, NewAuction};
use crate::service::AuctionService;
use crate::store::postgres::PostgresAuctionStore;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::fmt::Display;
use std::sync::Arc;

// endregion: --- Imports

pub type SharedService = Arc<AuctionService<PostgresAuctionStore>>;

// region:    --- Requests

#[derive(Debug, Deserialize)]
pub struct CreateAuctionRequest {
    pub caller_id: i64,
    pub caller_name: String,
    #[serde(flatten)]
    pub auction: NewAuction,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAuctionRequest {
    pub caller_id: i64,
    #[serde(flatten)]
    pub patch: AuctionPatch,
}

#[derive(Debug, Deserialize)]
pub struct PlaceBidRequest {
    pub bidder_id: i64,
    pub bidder_name: String,
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct CallerRequest {
    pub caller_id: i64,
}

// endregion: --- Requests

// region:    --- Error Mapping

/// Map a stable error code to an HTTP status.
fn error_status(code: &str) -> StatusCode {
    match code {
        "NOT_FOUND" => StatusCode::NOT_FOUND,
        "CONFLICT" => StatusCode::CONFLICT,
        "NOT_PERMITTED" => StatusCode::FORBIDDEN,
        "STORE_ERROR" => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn error_response(err: impl Display, code: &'static str) -> Response {
    (
        error_status(code),
        Json(serde_json::json!({
            "error": err.to_string(),
            "code": code,
        })),
    )
        .into_response()
}

// endregion: --- Error Mapping

// region:    --- Command Handlers

/// Place a bid on an auction
pub async fn handle_place_bid(
    State(service): State<SharedService>,
    Path(auction_id): Path<i64>,
    Json(req): Json<PlaceBidRequest>,
) -> impl IntoResponse {
    match service
        .place_bid(auction_id, req.bidder_id, &req.bidder_name, req.amount)
        .await
    {
        Ok(auction) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "bid accepted",
                "current_bid": auction.current_bid,
                "bid_count": auction.bid_count,
            })),
        )
            .into_response(),
        Err(e) => {
            let code = e.code();
            error_response(e, code)
        }
    }
}

/// Close an auction
pub async fn handle_close_auction(
    State(service): State<SharedService>,
    Path(auction_id): Path<i64>,
    Json(req): Json<CallerRequest>,
) -> impl IntoResponse {
    match service.close_auction(req.caller_id, auction_id).await {
        Ok(auction) => Json(auction).into_response(),
        Err(e) => {
            let code = e.code();
            error_response(e, code)
        }
    }
}

/// Create an auction
pub async fn handle_create_auction(
    State(service): State<SharedService>,
    Json(req): Json<CreateAuctionRequest>,
) -> impl IntoResponse {
    match service
        .create_auction(req.caller_id, &req.caller_name, req.auction)
        .await
    {
        Ok(auction) => (StatusCode::CREATED, Json(auction)).into_response(),
        Err(e) => {
            let code = e.code();
            error_response(e, code)
        }
    }
}

/// Patch an auction
pub async fn handle_update_auction(
    State(service): State<SharedService>,
    Path(auction_id): Path<i64>,
    Json(req): Json<UpdateAuctionRequest>,
) -> impl IntoResponse {
    match service
        .update_auction(req.caller_id, auction_id, req.patch)
        .await
    {
        Ok(auction) => Json(auction).into_response(),
        Err(e) => {
            let code = e.code();
            error_response(e, code)
        }
    }
}

/// Delete an auction
pub async fn handle_delete_auction(
    State(service): State<SharedService>,
    Path(auction_id): Path<i64>,
    Json(req): Json<CallerRequest>,
) -> impl IntoResponse {
    match service.delete_auction(req.caller_id, auction_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            let code = e.code();
            error_response(e, code)
        }
    }
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// List all auctions
pub async fn handle_get_auctions(State(service): State<SharedService>) -> impl IntoResponse {
    match service.list_auctions().await {
        Ok(auctions) => Json(auctions).into_response(),
        Err(e) => {
            let code = e.code();
            error_response(e, code)
        }
    }
}

/// Fetch one auction, counting the view
pub async fn handle_get_auction(
    State(service): State<SharedService>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    match service.get_auction(auction_id).await {
        Ok(auction) => Json(auction).into_response(),
        Err(e) => {
            let code = e.code();
            error_response(e, code)
        }
    }
}

/// Bid history, most recent first
pub async fn handle_get_bid_history(
    State(service): State<SharedService>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    match service.get_bidding_history(auction_id).await {
        Ok(bids) => Json(bids).into_response(),
        Err(e) => {
            let code = e.code();
            error_response(e, code)
        }
    }
}

// endregion: --- Query Handlers
