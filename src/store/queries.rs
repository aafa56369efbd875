/// Insert a new auction, defaults cover view count and version
pub const INSERT_AUCTION: &str = r#"
    INSERT INTO auctions (title, description, category, features, technologies, tags,
                          status, starting_price, current_bid, bid_deadline,
                          created_by_id, created_by_name, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
    RETURNING id
"#;

/// Load one auction row with its version token
pub const GET_AUCTION: &str = "SELECT id, title, description, category, features, technologies, tags, status, starting_price, current_bid, bid_deadline, final_buyer_id, final_buyer_name, sold_at, view_count, created_by_id, created_by_name, created_at, version FROM auctions WHERE id = $1";

/// Load the bid history in acceptance order
pub const GET_AUCTION_BIDS: &str = r#"
    SELECT auction_id, bidder_id, bidder_name, amount, bid_time
    FROM bids
    WHERE auction_id = $1
    ORDER BY seq
"#;

/// Bid history for every auction in one round trip, grouped in memory
pub const LIST_ALL_BIDS: &str = r#"
    SELECT auction_id, bidder_id, bidder_name, amount, bid_time
    FROM bids
    ORDER BY auction_id, seq
"#;

/// How many bids are already persisted for an auction
pub const COUNT_AUCTION_BIDS: &str = "SELECT COUNT(*) FROM bids WHERE auction_id = $1";

/// Conditional write, guarded by the version token taken at load time
pub const CAS_UPDATE_AUCTION: &str = r#"
    UPDATE auctions
    SET title = $2, description = $3, category = $4, features = $5,
        technologies = $6, tags = $7, status = $8, starting_price = $9,
        current_bid = $10, bid_deadline = $11, final_buyer_id = $12,
        final_buyer_name = $13, sold_at = $14, version = version + 1
    WHERE id = $1 AND version = $15
"#;

/// Append one bid, existing rows are never rewritten
pub const INSERT_BID: &str = r#"
    INSERT INTO bids (auction_id, seq, bidder_id, bidder_name, amount, bid_time)
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT (auction_id, seq) DO NOTHING
"#;

/// Delete an auction unless any bid history exists
pub const DELETE_AUCTION: &str =
    "DELETE FROM auctions WHERE id = $1 AND NOT EXISTS (SELECT 1 FROM bids WHERE auction_id = $1)";

/// Existence probe used to tell a refused delete from a missing auction
pub const AUCTION_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM auctions WHERE id = $1)";

/// All auctions, newest first
pub const LIST_AUCTIONS: &str = "SELECT id, title, description, category, features, technologies, tags, status, starting_price, current_bid, bid_deadline, final_buyer_id, final_buyer_name, sold_at, view_count, created_by_id, created_by_name, created_at, version FROM auctions ORDER BY created_at DESC, id DESC";

/// Bump the view counter outside the version guard
pub const INCREMENT_VIEW_COUNT: &str =
    "UPDATE auctions SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count";
