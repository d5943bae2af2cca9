/// 입찰 관련 커맨드 처리
/// 1. 입찰
/// 상품 점유(행 잠금) 안에서 검증과 기록을 함께 수행하므로 동시 입찰끼리 최고가를 덮어쓰지 않는다.
// region:    --- Imports
use crate::auction::{Auction, Bid, BidValidation};
use crate::clock::Clock;
use crate::error::Error;
use crate::store::AuctionStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Commands
/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub item_id: i64,
    pub bidder_id: i64,
    pub bid_amount: Decimal,
}

/// 입찰 실패
#[derive(Debug, thiserror::Error)]
pub enum BidError {
    #[error("입찰이 거절되었습니다: {}", .0.reason.message())]
    Rejected(BidValidation),
    #[error(transparent)]
    Store(#[from] Error),
}

/// 1. 입찰
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    store: &dyn AuctionStore,
    clock: &dyn Clock,
) -> Result<Bid, BidError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);

    let mut claim = store.claim_item(cmd.item_id).await?;
    let Some(item) = claim.item().cloned() else {
        claim.release().await?;
        return Err(Error::ItemNotFound(cmd.item_id).into());
    };
    let bids = claim.bids().await?;

    let now = clock.now();
    let validation = Auction::new(item, bids).validate_bid(cmd.bid_amount, now);
    if !validation.accepted {
        claim.release().await?;
        warn!(
            "{:<12} --> 입찰 거절: {:?} (최소 금액 {})",
            "Command", validation.reason, validation.minimum_required
        );
        return Err(BidError::Rejected(validation));
    }

    let bid = claim
        .insert_bid(cmd.bidder_id, cmd.bid_amount, now)
        .await?;
    info!(
        "{:<12} --> 입찰 성공: item {} 현재 가격 {}",
        "Command", bid.item_id, bid.amount
    );
    Ok(bid)
}
// endregion: --- Commands
