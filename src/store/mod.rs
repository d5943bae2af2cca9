/// 영속성 협력자
/// 낙찰 알림 엔진과 입찰 커맨드가 사용하는 저장소 경계
// region:    --- Imports
use crate::auction::{Auction, Bid, Item};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

// endregion: --- Imports

// region:    --- Modules
mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
// endregion: --- Modules

// region:    --- Store Traits
/// 경매 저장소 트레이트
#[async_trait]
pub trait AuctionStore: Send + Sync {
    async fn get_item(&self, item_id: i64) -> Result<Option<Item>>;

    async fn get_all_items(&self) -> Result<Vec<Item>>;

    async fn get_item_bids(&self, item_id: i64) -> Result<Vec<Bid>>;

    /// end_time <= now 이고 winner_notified_at 이 비어 있는 상품 id
    async fn find_eligible_item_ids(&self, now: DateTime<Utc>) -> Result<Vec<i64>>;

    /// 상품에 대한 배타적 점유 획득
    /// 점유가 해제(commit/release/drop)될 때까지 같은 상품의 다른 점유 시도는 대기한다.
    async fn claim_item(&self, item_id: i64) -> Result<Box<dyn ItemClaim>>;
}

/// 상품 배타적 점유 (하나의 작업 단위)
/// mark_notified / insert_bid 는 변경을 커밋하면서 점유를 해제한다.
/// release 하지 않고 drop 해도 변경 없이 해제된다.
#[async_trait]
pub trait ItemClaim: Send {
    /// 점유 시점에 다시 읽은 상품 상태 (없으면 None)
    fn item(&self) -> Option<&Item>;

    async fn bids(&mut self) -> Result<Vec<Bid>>;

    /// 낙찰 알림 처리 시각 기록 후 커밋
    /// 이미 기록되어 있으면 아무것도 바꾸지 않고 false
    async fn mark_notified(self: Box<Self>, at: DateTime<Utc>) -> Result<bool>;

    /// 입찰 기록 추가 후 커밋
    async fn insert_bid(
        self: Box<Self>,
        bidder_id: i64,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Bid>;

    async fn release(self: Box<Self>) -> Result<()>;
}
// endregion: --- Store Traits

/// 상품과 입찰 이력을 함께 조회 (잠금 없음, 표시용)
pub async fn load_auction(store: &dyn AuctionStore, item_id: i64) -> Result<Option<Auction>> {
    let Some(item) = store.get_item(item_id).await? else {
        return Ok(None);
    };
    let bids = store.get_item_bids(item_id).await?;
    Ok(Some(Auction::new(item, bids)))
}
