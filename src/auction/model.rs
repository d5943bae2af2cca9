use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// 상품 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    pub starting_price: Decimal,
    pub end_time: DateTime<Utc>,
    /// 낙찰 알림 처리 시각. 한 번 설정되면 변경되지 않는다.
    pub winner_notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// 입찰 모델 (입찰자 이메일은 users 테이블에서 조인)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub item_id: i64,
    pub bidder_id: i64,
    #[serde(skip_serializing, default)]
    pub bidder_email: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}
