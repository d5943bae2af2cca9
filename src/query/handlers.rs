// region:    --- Imports
use super::queries;
use crate::auction::model::{Bid, Item};
use crate::database::DatabaseManager;
use chrono::{DateTime, Utc};
use sqlx::Error as SqlxError;
use tracing::{debug, info};

// endregion: --- Imports

// region:    --- Query Handlers

/// 상품 조회
pub async fn get_item(
    db_manager: &DatabaseManager,
    item_id: i64,
) -> Result<Option<Item>, SqlxError> {
    info!("{:<12} --> 상품 조회 id: {}", "Query", item_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Item>(queries::GET_ITEM)
                    .bind(item_id)
                    .fetch_optional(&mut **tx)
                    .await
            })
        })
        .await
}

/// 모든 상품 조회
pub async fn get_all_items(db_manager: &DatabaseManager) -> Result<Vec<Item>, SqlxError> {
    info!("{:<12} --> 모든 상품 조회", "Query");
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Item>(queries::GET_ALL_ITEMS)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// 상품 입찰 조회
pub async fn get_item_bids(
    db_manager: &DatabaseManager,
    item_id: i64,
) -> Result<Vec<Bid>, SqlxError> {
    info!("{:<12} --> 상품 입찰 조회 id: {}", "Query", item_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Bid>(queries::GET_ITEM_BIDS)
                    .bind(item_id)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// 낙찰 알림 대상 상품 조회
pub async fn find_eligible_item_ids(
    db_manager: &DatabaseManager,
    now: DateTime<Utc>,
) -> Result<Vec<i64>, SqlxError> {
    debug!("{:<12} --> 낙찰 알림 대상 조회 기준: {}", "Query", now);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_scalar::<_, i64>(queries::FIND_ELIGIBLE_ITEM_IDS)
                    .bind(now)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

// endregion: --- Query Handlers
