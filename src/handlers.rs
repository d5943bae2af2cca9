// region:    --- Imports
use crate::bidding::{handle_place_bid, BidError, PlaceBidCommand};
use crate::clock::Clock;
use crate::error::Error;
use crate::notification::WinnerNotifier;
use crate::scheduler::{notify_on_request, RequestTrigger};
use crate::store::{self, AuctionStore};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{error, info};

// endregion: --- Imports

// region:    --- App State
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuctionStore>,
    pub notifier: Arc<WinnerNotifier>,
    pub clock: Arc<dyn Clock>,
}

/// 라우터 설정
/// trigger 가 있으면 모든 요청에 요청 경로 낙찰 알림 확인을 붙인다.
pub fn routes(state: AppState, trigger: Option<Arc<RequestTrigger>>) -> Router {
    let router = Router::new()
        .route("/bid", post(handle_bid))
        .route("/items", get(handle_get_items))
        .route("/items/:id", get(handle_get_item))
        .route("/items/:id/bids", get(handle_get_item_bids))
        .route("/admin/notify-winners", post(handle_notify_winners))
        .with_state(state);

    match trigger {
        Some(trigger) => router.layer(axum::middleware::from_fn_with_state(
            trigger,
            notify_on_request,
        )),
        None => router,
    }
}

fn internal_error(e: Error) -> Response {
    error!("{:<12} --> 요청 처리 실패: {:?}", "Handler", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": e.to_string() })),
    )
        .into_response()
}

/// 상품 또는 입찰자 없음
fn not_found(e: Error) -> Response {
    let code = match e {
        Error::UserNotFound(_) => "USER_NOT_FOUND",
        _ => "NOT_FOUND",
    };
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": e.to_string(),
            "code": code
        })),
    )
        .into_response()
}
// endregion: --- App State

// region:    --- Command Handlers

/// 입찰 요청 처리
pub async fn handle_bid(
    State(state): State<AppState>,
    Json(cmd): Json<PlaceBidCommand>,
) -> Response {
    match handle_place_bid(cmd, state.store.as_ref(), state.clock.as_ref()).await {
        Ok(bid) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "입찰이 성공적으로 처리되었습니다.",
                "current_price": bid.amount,
                "bid": bid
            })),
        )
            .into_response(),
        Err(BidError::Rejected(validation)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": validation.reason.message(),
                "code": validation.reason,
                "reason": validation.reason,
                "minimum_required": validation.minimum_required
            })),
        )
            .into_response(),
        Err(BidError::Store(e @ (Error::ItemNotFound(_) | Error::UserNotFound(_)))) => {
            not_found(e)
        }
        Err(BidError::Store(e)) => internal_error(e),
    }
}

/// 종료된 경매 낙찰 알림 즉시 실행
pub async fn handle_notify_winners(State(state): State<AppState>) -> Response {
    info!("{:<12} --> 낙찰 알림 즉시 실행 요청", "Command");
    match state.notifier.notify_winners_for_ended_auctions().await {
        Ok(notified) => Json(serde_json::json!({ "notified": notified })).into_response(),
        Err(e) => internal_error(e),
    }
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// 모든 상품 조회
pub async fn handle_get_items(State(state): State<AppState>) -> Response {
    info!("{:<12} --> 모든 상품 조회", "HandlerQuery");
    match state.store.get_all_items().await {
        Ok(items) => Json(items).into_response(),
        Err(e) => internal_error(e),
    }
}

/// 상품 조회 (현재 최고가, 종료 여부, 종료된 경우 낙찰 입찰 포함)
pub async fn handle_get_item(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Response {
    info!("{:<12} --> 상품 조회 id: {}", "HandlerQuery", item_id);
    let auction = match store::load_auction(state.store.as_ref(), item_id).await {
        Ok(Some(auction)) => auction,
        Ok(None) => return not_found(Error::ItemNotFound(item_id)),
        Err(e) => return internal_error(e),
    };

    let now = state.clock.now();
    Json(serde_json::json!({
        "item": auction.item,
        "current_highest_amount": auction.current_highest_amount(),
        "has_ended": auction.has_ended(now),
        "winning_bid": auction.select_winning_bid(now),
        "bid_count": auction.bids.len()
    }))
    .into_response()
}

/// 상품 입찰 이력 조회
pub async fn handle_get_item_bids(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Response {
    info!(
        "{:<12} --> 상품 입찰 이력 조회 id: {}",
        "HandlerQuery", item_id
    );
    match state.store.get_item_bids(item_id).await {
        Ok(bids) => Json(bids).into_response(),
        Err(e) => internal_error(e),
    }
}

// endregion: --- Query Handlers

// endregion: --- Tests
