// region:    --- Imports
use crate::database::DatabaseManager;
use crate::service::{AllowAll, AuctionService};
use crate::store::postgres::PostgresAuctionStore;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Modules
mod auction;
mod database;
mod handlers;
mod service;
mod store;

// endregion: --- Modules

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let db_manager = Arc::new(DatabaseManager::new().await);

    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> database initialization failed: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> database initialized", "Main");

    let store = PostgresAuctionStore::new(db_manager.get_pool());
    let service = Arc::new(AuctionService::new(store, Arc::new(AllowAll)));

    // Cors for the marketing site and the admin dashboard
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes_all = Router::new()
        .route(
            "/auctions",
            post(handlers::handle_create_auction).get(handlers::handle_get_auctions),
        )
        .route(
            "/auctions/:id",
            get(handlers::handle_get_auction)
                .patch(handlers::handle_update_auction)
                .delete(handlers::handle_delete_auction),
        )
        .route(
            "/auctions/:id/bids",
            post(handlers::handle_place_bid).get(handlers::handle_get_bid_history),
        )
        .route("/auctions/:id/close", post(handlers::handle_close_auction))
        .layer(cors)
        .with_state(service);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
