/// 낙찰 알림 스케줄러
/// 낙찰 알림 엔진의 일괄 처리를 호출하는 트리거 모음
/// 1. 주기 실행 (NotificationScheduler)
/// 2. 요청 경로 실행 (RequestTrigger, 쿨다운 적용)
/// 3. 즉시 실행 (CLI / 관리자 API 에서 엔진을 직접 호출)
/// 정합성은 모두 엔진의 상품 단위 점유가 보장하므로 트리거끼리 겹쳐 실행되어도 된다.
// region:    --- Imports
use crate::notification::WinnerNotifier;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// endregion: --- Imports

// region:    --- Modules
mod trigger;

pub use trigger::{notify_on_request, RequestTrigger};
// endregion: --- Modules

// region:    --- Notification Scheduler
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// 낙찰 알림 주기 실행 스케줄러
/// 호스트 프로세스가 start 로 시작하고 취소 토큰으로 종료한다.
pub struct NotificationScheduler {
    notifier: Arc<WinnerNotifier>,
    period: Duration,
}

impl NotificationScheduler {
    /// period 가 0 이면 최소 주기(1ms)로 올린다
    pub fn new(notifier: Arc<WinnerNotifier>, period: Duration) -> Self {
        let period = if period.is_zero() {
            warn!(
                "{:<12} --> 스케줄러 주기가 0 이어서 {:?} 로 조정합니다",
                "Scheduler", MIN_PERIOD
            );
            MIN_PERIOD
        } else {
            period
        };
        Self { notifier, period }
    }

    /// 낙찰 알림 스케줄러 시작
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "{:<12} --> 낙찰 알림 스케줄러 시작 (주기: {:?})",
                "Scheduler", self.period
            );
            let mut interval = interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => self.run_once().await,
                }
            }
            info!("{:<12} --> 낙찰 알림 스케줄러 종료", "Scheduler");
        })
    }

    /// 한 주기 실행: 에러나 패닉이 나도 루프는 계속된다
    async fn run_once(&self) {
        let result = AssertUnwindSafe(self.notifier.notify_winners_for_ended_auctions())
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(notified)) => debug!(
                "{:<12} --> 낙찰 알림 주기 실행 완료: {:?}",
                "Scheduler", notified
            ),
            Ok(Err(e)) => error!(
                "{:<12} --> 낙찰 알림 처리 중 오류 발생: {:?}",
                "Scheduler", e
            ),
            Err(_) => error!("{:<12} --> 낙찰 알림 처리 중 패닉 발생", "Scheduler"),
        }
    }
}
// endregion: --- Notification Scheduler

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::Item;
    use crate::clock::ManualClock;
    use crate::mailer::MockMailer;
    use crate::store::{AuctionStore, MemoryStore};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn scheduler_notifies_and_stops_on_cancel() {
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let store = MemoryStore::new();
        store.add_user(5, "five@example.com");
        store.add_item(Item {
            id: 1,
            owner_id: 9,
            title: "스케줄러 테스트".to_string(),
            description: String::new(),
            starting_price: dec!(1),
            end_time: now,
            winner_notified_at: None,
            created_at: now,
            updated_at: now,
        });
        store.add_bid(1, 5, dec!(2), now).unwrap();

        let mut mailer = MockMailer::new();
        mailer.expect_send().times(1).returning(|_, _, _| Ok(1));
        let notifier = Arc::new(WinnerNotifier::new(
            Arc::new(store.clone()),
            Arc::new(mailer),
            Arc::new(ManualClock::new(now)),
        ));

        let shutdown = CancellationToken::new();
        let handle =
            NotificationScheduler::new(notifier, Duration::from_millis(10)).start(shutdown.clone());

        // 여러 주기가 돌아도 메일은 한 번만 발송된다
        tokio::time::sleep(Duration::from_millis(80)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let stored = store.get_item(1).await.unwrap().unwrap();
        assert_eq!(stored.winner_notified_at, Some(now));
    }

    #[tokio::test]
    async fn zero_period_keeps_the_loop_alive() {
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(0);
        let notifier = Arc::new(WinnerNotifier::new(
            Arc::new(MemoryStore::new()),
            Arc::new(mailer),
            Arc::new(ManualClock::new(Utc::now())),
        ));

        let shutdown = CancellationToken::new();
        let handle = NotificationScheduler::new(notifier, Duration::ZERO).start(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        shutdown.cancel();
        handle.await.unwrap();
    }
}
