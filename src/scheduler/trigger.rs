// region:    --- Imports
use crate::clock::Clock;
use crate::error::Result;
use crate::notification::WinnerNotifier;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error};

// endregion: --- Imports

// region:    --- Request Trigger
/// 요청 경로 낙찰 알림 트리거
/// 마지막 실행 후 쿨다운이 지났을 때만 일괄 처리를 실행한다.
/// 마지막 실행 시각은 인스턴스가 소유하므로 엔진 인스턴스끼리 간섭하지 않는다.
pub struct RequestTrigger {
    notifier: Arc<WinnerNotifier>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    last_run: Mutex<Option<DateTime<Utc>>>,
}

impl RequestTrigger {
    pub fn new(notifier: Arc<WinnerNotifier>, clock: Arc<dyn Clock>, cooldown: Duration) -> Self {
        Self {
            notifier,
            clock,
            cooldown,
            last_run: Mutex::new(None),
        }
    }

    /// 실행 권한 획득
    /// 동시에 여러 요청이 들어와도 쿨다운 구간마다 하나만 true 를 받는다.
    pub fn try_begin(&self) -> bool {
        let now = self.clock.now();
        let mut last_run = self.last_run.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(last) = *last_run {
            // 시계가 뒤로 간 경우도 쿨다운 중으로 본다
            let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
            if elapsed < self.cooldown {
                return false;
            }
        }
        *last_run = Some(now);
        true
    }

    /// 쿨다운이 지났으면 일괄 처리 실행
    /// 실행하지 않은 경우 None
    pub async fn maybe_run(&self) -> Option<Result<Vec<i64>>> {
        if !self.try_begin() {
            return None;
        }
        Some(self.notifier.notify_winners_for_ended_auctions().await)
    }
}
// endregion: --- Request Trigger

// region:    --- Middleware
/// 요청마다 쿨다운을 확인하고, 실행 권한을 얻으면 일괄 처리를 백그라운드로 돌린다.
/// 요청 처리 자체는 기다리지 않는다.
pub async fn notify_on_request(
    State(trigger): State<Arc<RequestTrigger>>,
    request: Request,
    next: Next,
) -> Response {
    if trigger.try_begin() {
        debug!("{:<12} --> 요청 경로 낙찰 알림 실행", "Trigger");
        let notifier = Arc::clone(&trigger.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify_winners_for_ended_auctions().await {
                error!(
                    "{:<12} --> 요청 경로 낙찰 알림 처리 실패: {:?}",
                    "Trigger", e
                );
            }
        });
    }
    next.run(request).await
}
// endregion: --- Middleware

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::mailer::MockMailer;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use chrono::TimeZone;
    use tower::ServiceExt;

    fn trigger(clock: Arc<ManualClock>) -> Arc<RequestTrigger> {
        let mut mailer = MockMailer::new();
        mailer.expect_send().returning(|_, _, _| Ok(1));
        let notifier = Arc::new(WinnerNotifier::new(
            Arc::new(MemoryStore::new()),
            Arc::new(mailer),
            clock.clone(),
        ));
        Arc::new(RequestTrigger::new(notifier, clock, Duration::from_secs(60)))
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 2, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn runs_again_only_after_cooldown() {
        let clock = Arc::new(ManualClock::new(start()));
        let trigger = trigger(clock.clone());

        assert!(trigger.maybe_run().await.is_some());
        assert!(trigger.maybe_run().await.is_none());

        clock.advance(chrono::Duration::seconds(59));
        assert!(trigger.maybe_run().await.is_none());

        clock.advance(chrono::Duration::seconds(1));
        assert!(trigger.maybe_run().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn clock_going_backwards_counts_as_cooldown() {
        let clock = Arc::new(ManualClock::new(start()));
        let trigger = trigger(clock.clone());

        assert!(trigger.try_begin());
        clock.set(start() - chrono::Duration::minutes(10));
        assert!(!trigger.try_begin());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_agree_on_one_run() {
        let clock = Arc::new(ManualClock::new(start()));
        let trigger = trigger(clock);

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let trigger = Arc::clone(&trigger);
                tokio::spawn(async move { trigger.try_begin() })
            })
            .collect();
        let started = futures::future::join_all(handles)
            .await
            .into_iter()
            .filter(|started| *started.as_ref().unwrap())
            .count();
        assert_eq!(started, 1);
    }

    #[tokio::test]
    async fn middleware_claims_the_cooldown_window() {
        let clock = Arc::new(ManualClock::new(start()));
        let trigger = trigger(clock);
        let app = Router::new().route("/ping", get(|| async { "pong" })).layer(
            axum::middleware::from_fn_with_state(Arc::clone(&trigger), notify_on_request),
        );

        let response = app
            .oneshot(axum::http::Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert!(!trigger.try_begin());
    }
}
