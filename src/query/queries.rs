/// 상품 조회
pub const GET_ITEM: &str = "SELECT id, owner_id, title, description, starting_price, end_time, winner_notified_at, created_at, updated_at FROM items WHERE id = $1";

/// 모든 상품 조회
pub const GET_ALL_ITEMS: &str =
    "SELECT id, owner_id, title, description, starting_price, end_time, winner_notified_at, created_at, updated_at FROM items ORDER BY created_at DESC";

/// 상품 잠금 조회 (트랜잭션 종료까지 행 잠금 유지)
pub const LOCK_ITEM: &str = "SELECT id, owner_id, title, description, starting_price, end_time, winner_notified_at, created_at, updated_at FROM items WHERE id = $1 FOR UPDATE";

/// 상품 입찰 조회 (금액 내림차순, 같은 금액은 먼저 들어온 순)
pub const GET_ITEM_BIDS: &str = r#"
    SELECT b.id, b.item_id, b.bidder_id, u.email AS bidder_email, b.amount, b.created_at
    FROM bids b
    JOIN users u ON u.id = b.bidder_id
    WHERE b.item_id = $1
    ORDER BY b.amount DESC, b.created_at ASC, b.id ASC
"#;

/// 종료되었지만 낙찰 알림이 처리되지 않은 상품 조회
pub const FIND_ELIGIBLE_ITEM_IDS: &str = r#"
    SELECT id
    FROM items
    WHERE end_time <= $1 AND winner_notified_at IS NULL
    ORDER BY end_time ASC
"#;

/// 낙찰 알림 처리 시각 기록 (아직 기록되지 않은 경우에만)
pub const MARK_WINNER_NOTIFIED: &str = "UPDATE items SET winner_notified_at = $1, updated_at = $1 WHERE id = $2 AND winner_notified_at IS NULL";

/// 입찰 기록 추가
pub const INSERT_BID: &str = r#"
    WITH inserted AS (
        INSERT INTO bids (item_id, bidder_id, amount, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, item_id, bidder_id, amount, created_at
    )
    SELECT i.id, i.item_id, i.bidder_id, u.email AS bidder_email, i.amount, i.created_at
    FROM inserted i
    JOIN users u ON u.id = i.bidder_id
"#;
