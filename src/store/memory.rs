// region:    --- Imports
use super::{AuctionStore, ItemClaim};
use crate::auction::{Bid, Item};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

// endregion: --- Imports

// region:    --- Memory Store
#[derive(Default)]
struct State {
    users: HashMap<i64, String>,
    items: BTreeMap<i64, Item>,
    bids: Vec<Bid>,
    locks: HashMap<i64, Arc<AsyncMutex<()>>>,
    next_bid_id: i64,
}

impl State {
    fn item_bids(&self, item_id: i64) -> Vec<Bid> {
        let mut bids: Vec<Bid> = self
            .bids
            .iter()
            .filter(|bid| bid.item_id == item_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        bids
    }
}

/// 인메모리 저장소 구현체 (단일 프로세스 내장용 / 테스트용)
/// 상품 점유는 상품별 비동기 뮤텍스
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 사용자 등록
    pub fn add_user(&self, user_id: i64, email: impl Into<String>) {
        self.state().users.insert(user_id, email.into());
    }

    /// 상품 등록 (같은 id 가 있으면 덮어쓴다)
    pub fn add_item(&self, item: Item) {
        self.state().items.insert(item.id, item);
    }

    /// 검증 없이 입찰 기록 추가 (초기 데이터 적재용)
    pub fn add_bid(
        &self,
        item_id: i64,
        bidder_id: i64,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Bid> {
        push_bid(&mut self.state(), item_id, bidder_id, amount, at)
    }
}

fn push_bid(
    state: &mut State,
    item_id: i64,
    bidder_id: i64,
    amount: Decimal,
    at: DateTime<Utc>,
) -> Result<Bid> {
    if !state.items.contains_key(&item_id) {
        return Err(Error::ItemNotFound(item_id));
    }
    let bidder_email = state
        .users
        .get(&bidder_id)
        .cloned()
        .ok_or(Error::UserNotFound(bidder_id))?;

    state.next_bid_id += 1;
    let bid = Bid {
        id: state.next_bid_id,
        item_id,
        bidder_id,
        bidder_email,
        amount,
        created_at: at,
    };
    state.bids.push(bid.clone());
    Ok(bid)
}

#[async_trait]
impl AuctionStore for MemoryStore {
    async fn get_item(&self, item_id: i64) -> Result<Option<Item>> {
        Ok(self.state().items.get(&item_id).cloned())
    }

    async fn get_all_items(&self) -> Result<Vec<Item>> {
        let mut items: Vec<Item> = self.state().items.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn get_item_bids(&self, item_id: i64) -> Result<Vec<Bid>> {
        Ok(self.state().item_bids(item_id))
    }

    async fn find_eligible_item_ids(&self, now: DateTime<Utc>) -> Result<Vec<i64>> {
        let state = self.state();
        let mut eligible: Vec<&Item> = state
            .items
            .values()
            .filter(|item| item.end_time <= now && item.winner_notified_at.is_none())
            .collect();
        eligible.sort_by_key(|item| item.end_time);
        Ok(eligible.into_iter().map(|item| item.id).collect())
    }

    async fn claim_item(&self, item_id: i64) -> Result<Box<dyn ItemClaim>> {
        let lock = Arc::clone(self.state().locks.entry(item_id).or_default());
        let guard = lock.lock_owned().await;
        // 잠금 획득 후 다시 읽는다
        let item = self.state().items.get(&item_id).cloned();
        Ok(Box::new(MemoryItemClaim {
            item_id,
            state: Arc::clone(&self.state),
            item,
            _guard: guard,
        }))
    }
}
// endregion: --- Memory Store

// region:    --- Memory Item Claim
struct MemoryItemClaim {
    item_id: i64,
    state: Arc<Mutex<State>>,
    item: Option<Item>,
    _guard: OwnedMutexGuard<()>,
}

impl MemoryItemClaim {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ItemClaim for MemoryItemClaim {
    fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    async fn bids(&mut self) -> Result<Vec<Bid>> {
        Ok(self.state().item_bids(self.item_id))
    }

    async fn mark_notified(self: Box<Self>, at: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state();
        let Some(item) = state.items.get_mut(&self.item_id) else {
            return Ok(false);
        };
        if item.winner_notified_at.is_some() {
            return Ok(false);
        }
        item.winner_notified_at = Some(at);
        item.updated_at = at;
        Ok(true)
    }

    async fn insert_bid(
        self: Box<Self>,
        bidder_id: i64,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Bid> {
        let mut state = self.state();
        push_bid(&mut state, self.item_id, bidder_id, amount, at)
    }

    async fn release(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
// endregion: --- Memory Item Claim
