// region:    --- Imports
use super::{AuctionStore, ItemClaim};
use crate::auction::{Bid, Item};
use crate::database::DatabaseManager;
use crate::error::{Error, Result};
use crate::query::{handlers, queries};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tracing::{debug, warn};

// endregion: --- Imports

// region:    --- Postgres Store
/// PostgreSQL 저장소 구현체
/// 상품 점유는 트랜잭션 안의 SELECT ... FOR UPDATE 행 잠금
pub struct PostgresStore {
    db_manager: Arc<DatabaseManager>,
}

impl PostgresStore {
    pub fn new(db_manager: Arc<DatabaseManager>) -> Self {
        Self { db_manager }
    }
}

#[async_trait]
impl AuctionStore for PostgresStore {
    async fn get_item(&self, item_id: i64) -> Result<Option<Item>> {
        Ok(handlers::get_item(&self.db_manager, item_id).await?)
    }

    async fn get_all_items(&self) -> Result<Vec<Item>> {
        Ok(handlers::get_all_items(&self.db_manager).await?)
    }

    async fn get_item_bids(&self, item_id: i64) -> Result<Vec<Bid>> {
        Ok(handlers::get_item_bids(&self.db_manager, item_id).await?)
    }

    async fn find_eligible_item_ids(&self, now: DateTime<Utc>) -> Result<Vec<i64>> {
        Ok(handlers::find_eligible_item_ids(&self.db_manager, now).await?)
    }

    async fn claim_item(&self, item_id: i64) -> Result<Box<dyn ItemClaim>> {
        let mut tx = self.db_manager.pool().begin().await?;
        let item = sqlx::query_as::<_, Item>(queries::LOCK_ITEM)
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?;
        debug!(
            "{:<12} --> 상품 잠금 획득 id: {} (존재: {})",
            "Store",
            item_id,
            item.is_some()
        );
        Ok(Box::new(PgItemClaim { item_id, tx, item }))
    }
}
// endregion: --- Postgres Store

// region:    --- Postgres Item Claim
struct PgItemClaim {
    item_id: i64,
    tx: Transaction<'static, Postgres>,
    item: Option<Item>,
}

#[async_trait]
impl ItemClaim for PgItemClaim {
    fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    async fn bids(&mut self) -> Result<Vec<Bid>> {
        if self.item.is_none() {
            return Ok(Vec::new());
        }
        let bids = sqlx::query_as::<_, Bid>(queries::GET_ITEM_BIDS)
            .bind(self.item_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(bids)
    }

    async fn mark_notified(self: Box<Self>, at: DateTime<Utc>) -> Result<bool> {
        let PgItemClaim { item_id, mut tx, item } = *self;
        if item.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        let result = sqlx::query(queries::MARK_WINNER_NOTIFIED)
            .bind(at)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let marked = result.rows_affected() == 1;
        if !marked {
            warn!(
                "{:<12} --> 이미 낙찰 알림이 기록된 상품 id: {}",
                "Store", item_id
            );
        }
        Ok(marked)
    }

    async fn insert_bid(
        self: Box<Self>,
        bidder_id: i64,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Bid> {
        let PgItemClaim { item_id, mut tx, item } = *self;
        if item.is_none() {
            tx.rollback().await?;
            return Err(Error::ItemNotFound(item_id));
        }

        let bid = sqlx::query_as::<_, Bid>(queries::INSERT_BID)
            .bind(item_id)
            .bind(bidder_id)
            .bind(amount)
            .bind(at)
            .fetch_optional(&mut *tx)
            .await;
        let bid = match bid {
            Ok(Some(bid)) => bid,
            // 없는 입찰자는 bids.bidder_id 외래 키에서 걸린다
            Ok(None) => {
                tx.rollback().await?;
                return Err(Error::UserNotFound(bidder_id));
            }
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                tx.rollback().await?;
                return Err(Error::UserNotFound(bidder_id));
            }
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;
        Ok(bid)
    }

    async fn release(self: Box<Self>) -> Result<()> {
        let PgItemClaim { tx, .. } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
// endregion: --- Postgres Item Claim
