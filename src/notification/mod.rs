/// 낙찰 알림 엔진
/// 상품 단위로 "점유 -> 대상 여부 확인 -> 낙찰자 결정 -> 메일 발송 -> 알림 기록" 을 하나의 작업 단위로 처리한다.
/// 1. 단일 상품 처리 (notify_winner_for_item)
/// 2. 종료된 경매 일괄 처리 (notify_winners_for_ended_auctions)
///
/// 같은 상품에 대해 메일 발송이 성공하는 것은 최대 한 번이다.
/// 점유(행 잠금)를 잡은 상태에서 다시 읽고, 메일 발송이 확인된 뒤에만 알림 시각을 기록한다.
/// 발송 후 기록 전에 프로세스가 죽으면 다음 스캔에서 다시 발송될 수 있다.
// region:    --- Imports
use crate::auction::{Auction, Bid, Item};
use crate::clock::Clock;
use crate::error::Result;
use crate::mailer::Mailer;
use crate::store::AuctionStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// endregion: --- Imports

// region:    --- Outcome
/// 상품 단위 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 낙찰자에게 메일을 보내고 기록함
    Notified,
    /// 입찰 없이 종료되어 메일 없이 기록만 함
    ClosedWithoutBids,
    /// 메일 발송 실패, 기록하지 않음 (다음 스캔에서 재시도)
    DeliveryFailed,
    /// 상품 없음 / 이미 처리됨 / 아직 진행 중
    Skipped,
}
// endregion: --- Outcome

// region:    --- Winner Notifier
pub struct WinnerNotifier {
    store: Arc<dyn AuctionStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
}

impl WinnerNotifier {
    pub fn new(
        store: Arc<dyn AuctionStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            mailer,
            clock,
        }
    }

    /// 1. 단일 상품 처리
    /// 실제로 메일이 발송된 경우에만 true
    pub async fn notify_winner_for_item(&self, item_id: i64) -> Result<bool> {
        let outcome = self.process_item(item_id).await?;
        Ok(outcome == Outcome::Notified)
    }

    /// 2. 종료된 경매 일괄 처리
    /// 상품별 실패는 로그만 남기고 나머지 상품을 계속 처리한다.
    /// 대상 조회 자체가 실패한 경우에만 에러를 반환한다.
    pub async fn notify_winners_for_ended_auctions(&self) -> Result<Vec<i64>> {
        let now = self.clock.now();
        let item_ids = self.store.find_eligible_item_ids(now).await?;
        debug!(
            "{:<12} --> 낙찰 알림 대상 {}건",
            "Notifier",
            item_ids.len()
        );

        let mut notified = Vec::new();
        for item_id in item_ids {
            match self.process_item(item_id).await {
                Ok(Outcome::Notified) => notified.push(item_id),
                Ok(outcome) => debug!(
                    "{:<12} --> 상품 {} 처리 결과: {:?}",
                    "Notifier", item_id, outcome
                ),
                Err(e) => error!(
                    "{:<12} --> 상품 {} 낙찰 알림 처리 중 오류: {:?}",
                    "Notifier", item_id, e
                ),
            }
        }

        if !notified.is_empty() {
            info!(
                "{:<12} --> 낙찰 알림 발송 완료: {:?}",
                "Notifier", notified
            );
        }
        Ok(notified)
    }

    /// 상품 단위 처리 (점유 안에서 수행)
    async fn process_item(&self, item_id: i64) -> Result<Outcome> {
        let mut claim = self.store.claim_item(item_id).await?;
        let now = self.clock.now();

        // 점유 후 다시 읽은 상태로 판단
        let eligible = claim
            .item()
            .filter(|item| item.winner_notified_at.is_none() && now >= item.end_time)
            .cloned();
        let Some(item) = eligible else {
            claim.release().await?;
            return Ok(Outcome::Skipped);
        };

        let bids = claim.bids().await?;
        let auction = Auction::new(item, bids);

        let Some(winning_bid) = auction.select_winning_bid(now).cloned() else {
            claim.mark_notified(now).await?;
            info!(
                "{:<12} --> 입찰 없이 종료된 경매 id: {}",
                "Notifier", item_id
            );
            return Ok(Outcome::ClosedWithoutBids);
        };

        if !self.send_winner_email(&auction.item, &winning_bid).await {
            claim.release().await?;
            return Ok(Outcome::DeliveryFailed);
        }

        if !claim.mark_notified(now).await? {
            // 점유 중에는 일어나지 않아야 한다
            error!(
                "{:<12} --> 메일 발송 후 알림 기록 실패 (이미 기록됨) id: {}",
                "Notifier", item_id
            );
        }
        info!(
            "{:<12} --> 낙찰 알림 발송 id: {}, bidder: {}, amount: {}",
            "Notifier", item_id, winning_bid.bidder_id, winning_bid.amount
        );
        Ok(Outcome::Notified)
    }

    /// 낙찰자에게 메일 발송
    /// 설정 없음 / 전송 실패 / 수신자 0명은 모두 실패로 본다.
    async fn send_winner_email(&self, item: &Item, winning_bid: &Bid) -> bool {
        let (subject, body) = winner_email(item, winning_bid);
        match self
            .mailer
            .send(&winning_bid.bidder_email, &subject, &body)
            .await
        {
            Ok(delivered) if delivered > 0 => true,
            Ok(_) => {
                warn!(
                    "{:<12} --> 낙찰 메일이 전달되지 않음 item: {}, recipient: {}",
                    "Notifier", item.id, winning_bid.bidder_email
                );
                false
            }
            Err(e) => {
                warn!(
                    "{:<12} --> 낙찰 메일 발송 실패 item: {}, recipient: {}, error: {}",
                    "Notifier", item.id, winning_bid.bidder_email, e
                );
                false
            }
        }
    }
}

/// 낙찰 메일 제목 / 본문
pub fn winner_email(item: &Item, winning_bid: &Bid) -> (String, String) {
    let subject = format!("'{}' 경매에 낙찰되었습니다", item.title);
    let body = format!(
        "축하합니다! '{}' 경매에 {} 금액으로 낙찰되었습니다.",
        item.title, winning_bid.amount
    );
    (subject, body)
}
// endregion: --- Winner Notifier

// endregion: --- Tests
