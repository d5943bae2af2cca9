/// 입찰 평가
/// 상품과 입찰 이력만으로 계산되는 순수 함수 모음 (부수 효과 없음)
/// 1. 경매 종료 여부
/// 2. 현재 최고가 / 최고 입찰
/// 3. 낙찰 입찰 선정
/// 4. 신규 입찰 검증
// region:    --- Imports
use super::model::{Bid, Item};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;

// endregion: --- Imports

// region:    --- Bid Validation
/// 입찰 검증 사유 (클라이언트에 응답 코드로 전달)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BidReason {
    #[serde(rename = "ACCEPTED")]
    Accepted,
    #[serde(rename = "ALREADY_ENDED")]
    Ended,
    #[serde(rename = "LOW_BID")]
    TooLow,
    #[serde(rename = "INVALID_AMOUNT")]
    NotPositive,
    #[serde(rename = "UNSUPPORTED_AMOUNT")]
    Unrepresentable,
}

impl BidReason {
    pub fn message(&self) -> &'static str {
        match self {
            BidReason::Accepted => "입찰이 접수되었습니다.",
            BidReason::Ended => "경매가 이미 종료되었습니다.",
            BidReason::TooLow => "입찰 금액은 현재 최고가보다 높아야 합니다.",
            BidReason::NotPositive => "입찰 금액은 0보다 커야 합니다.",
            BidReason::Unrepresentable => {
                "입찰 금액은 소수점 둘째 자리까지, 99999999.99 이하만 가능합니다."
            }
        }
    }
}

/// 금액 컬럼(NUMERIC(10,2))이 그대로 담을 수 있는 소수 자릿수
pub const BID_AMOUNT_SCALE: u32 = 2;

/// 금액 컬럼이 담을 수 있는 최대 입찰 금액 (99999999.99)
pub fn max_bid_amount() -> Decimal {
    Decimal::new(9_999_999_999, BID_AMOUNT_SCALE)
}

/// 입찰 검증 결과
/// 거절된 경우에도 minimum_required 를 항상 채워 클라이언트가 금액을 고쳐 재시도할 수 있게 한다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BidValidation {
    pub accepted: bool,
    pub reason: BidReason,
    pub minimum_required: Decimal,
}
// endregion: --- Bid Validation

// region:    --- Auction
/// 경매: 상품과 해당 상품의 입찰 이력
#[derive(Debug, Clone)]
pub struct Auction {
    pub item: Item,
    pub bids: Vec<Bid>,
}

impl Auction {
    pub fn new(item: Item, bids: Vec<Bid>) -> Self {
        Self { item, bids }
    }

    /// 1. 경매 종료 여부 (now >= end_time)
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.item.end_time
    }

    /// 2-1. 현재 최고가 (입찰이 없으면 시작가)
    pub fn current_highest_amount(&self) -> Decimal {
        self.bids
            .iter()
            .map(|bid| bid.amount)
            .max()
            .unwrap_or(self.item.starting_price)
    }

    /// 2-2. 현재 최고 입찰
    /// 금액 내림차순, 같은 금액이면 먼저 들어온 입찰(created_at, id 오름차순)이 우선
    pub fn current_highest_bid(&self) -> Option<&Bid> {
        self.bids.iter().max_by(|a, b| rank(a, b))
    }

    /// 3. 낙찰 입찰 선정 (진행 중인 경매는 입찰이 있어도 낙찰자가 없다)
    pub fn select_winning_bid(&self, now: DateTime<Utc>) -> Option<&Bid> {
        if !self.has_ended(now) {
            return None;
        }
        self.current_highest_bid()
    }

    /// 4. 신규 입찰 검증
    pub fn validate_bid(&self, amount: Decimal, now: DateTime<Utc>) -> BidValidation {
        let minimum_required = self.current_highest_amount();
        let reason = if self.has_ended(now) {
            BidReason::Ended
        } else if amount <= Decimal::ZERO {
            BidReason::NotPositive
        } else if amount.normalize().scale() > BID_AMOUNT_SCALE || amount > max_bid_amount() {
            // 저장 시 반올림되거나 넘치는 금액은 받지 않는다
            BidReason::Unrepresentable
        } else if amount <= minimum_required {
            BidReason::TooLow
        } else {
            BidReason::Accepted
        };

        BidValidation {
            accepted: reason == BidReason::Accepted,
            reason,
            minimum_required,
        }
    }
}

/// 입찰 우선순위 비교 (Greater 가 더 우선)
fn rank(a: &Bid, b: &Bid) -> Ordering {
    a.amount
        .cmp(&b.amount)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}
// endregion: --- Auction

// endregion: --- Tests
