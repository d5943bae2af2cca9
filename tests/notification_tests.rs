use async_trait::async_trait;
use auction_notifier::auction::Item;
use auction_notifier::clock::ManualClock;
use auction_notifier::mailer::{MailError, Mailer};
use auction_notifier::notification::WinnerNotifier;
use auction_notifier::scheduler::{NotificationScheduler, RequestTrigger};
use auction_notifier::store::{AuctionStore, MemoryStore};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// 수신자별 발송 기록을 남기는 메일러
/// failing 에 있는 수신자에게는 전달 수 0 을 돌려준다.
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingMailer {
    fn fail_for(&self, recipient: &str) {
        self.failing.lock().unwrap().push(recipient.to_string());
    }

    fn recover(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn sent_per_recipient(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for (recipient, _) in self.sent.lock().unwrap().iter() {
            *counts.entry(recipient.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, recipient: &str, subject: &str, _body: &str) -> Result<usize, MailError> {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        if self.failing.lock().unwrap().iter().any(|r| r == recipient) {
            return Ok(0);
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), subject.to_string()));
        Ok(1)
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 20, 20, 0, 0).unwrap()
}

fn item(id: i64, end_time: DateTime<Utc>) -> Item {
    Item {
        id,
        owner_id: 100,
        title: format!("상품 {}", id),
        description: String::new(),
        starting_price: dec!(1),
        end_time,
        winner_notified_at: None,
        created_at: end_time - Duration::days(2),
        updated_at: end_time - Duration::days(2),
    }
}

/// 상품 1..=count, 상품 i 의 낙찰자는 사용자 i (user{i}@example.com)
fn marketplace(count: i64) -> MemoryStore {
    let store = MemoryStore::new();
    for id in 1..=count {
        store.add_user(id, format!("user{}@example.com", id));
        store.add_item(item(id, t0() - Duration::minutes(id)));
        store
            .add_bid(id, id, dec!(5) + rust_decimal::Decimal::from(id), t0() - Duration::hours(1))
            .unwrap();
    }
    store
}

#[tokio::test]
async fn tie_goes_to_the_earlier_bid() {
    let store = MemoryStore::new();
    for (id, email) in [(1, "a@example.com"), (2, "b@example.com"), (3, "c@example.com")] {
        store.add_user(id, email);
    }
    store.add_item(item(1, t0()));
    store.add_bid(1, 1, dec!(50), t0() - Duration::seconds(10)).unwrap();
    store.add_bid(1, 2, dec!(80), t0() - Duration::seconds(5)).unwrap();
    store.add_bid(1, 3, dec!(80), t0() - Duration::seconds(5)).unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    let notifier = WinnerNotifier::new(
        Arc::new(store),
        mailer.clone(),
        Arc::new(ManualClock::new(t0())),
    );

    assert!(notifier.notify_winner_for_item(1).await.unwrap());
    let sent = mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "b@example.com");
}

#[tokio::test]
async fn failed_delivery_is_retried_on_next_scan() {
    let store = marketplace(3);
    let mailer = Arc::new(RecordingMailer::default());
    mailer.fail_for("user2@example.com");
    let notifier = WinnerNotifier::new(
        Arc::new(store.clone()),
        mailer.clone(),
        Arc::new(ManualClock::new(t0())),
    );

    let mut first = notifier.notify_winners_for_ended_auctions().await.unwrap();
    first.sort();
    assert_eq!(first, vec![1, 3]);
    assert_eq!(store.find_eligible_item_ids(t0()).await.unwrap(), vec![2]);

    mailer.recover();
    assert_eq!(notifier.notify_winners_for_ended_auctions().await.unwrap(), vec![2]);
    assert!(notifier.notify_winners_for_ended_auctions().await.unwrap().is_empty());

    let counts = mailer.sent_per_recipient();
    assert_eq!(counts.len(), 3);
    assert!(counts.values().all(|count| *count == 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_triggers_send_each_email_once() {
    let store = marketplace(6);
    let mailer = Arc::new(RecordingMailer::default());
    let clock = Arc::new(ManualClock::new(t0()));
    let notifier = Arc::new(WinnerNotifier::new(
        Arc::new(store.clone()),
        mailer.clone(),
        clock.clone(),
    ));

    // 주기 실행
    let shutdown = CancellationToken::new();
    let scheduler = NotificationScheduler::new(
        Arc::clone(&notifier),
        std::time::Duration::from_millis(5),
    )
    .start(shutdown.clone());

    // 요청 경로 실행
    let trigger = Arc::new(RequestTrigger::new(
        Arc::clone(&notifier),
        clock,
        std::time::Duration::from_secs(60),
    ));

    // 즉시 실행 (여러 작업자)
    let mut handles = Vec::new();
    for _ in 0..4 {
        let notifier = Arc::clone(&notifier);
        handles.push(tokio::spawn(async move {
            notifier.notify_winners_for_ended_auctions().await.unwrap()
        }));
    }
    for _ in 0..4 {
        let trigger = Arc::clone(&trigger);
        handles.push(tokio::spawn(async move {
            trigger
                .maybe_run()
                .await
                .map(|result| result.unwrap())
                .unwrap_or_default()
        }));
    }

    let mut reported = Vec::new();
    for handle in futures::future::join_all(handles).await {
        reported.extend(handle.unwrap());
    }

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    shutdown.cancel();
    scheduler.await.unwrap();

    let counts = mailer.sent_per_recipient();
    assert_eq!(counts.len(), 6);
    assert!(counts.values().all(|count| *count == 1));

    // 즉시 실행이 보고한 id 는 중복되지 않는다 (나머지는 스케줄러가 처리했을 수 있다)
    let mut deduped = reported.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), reported.len());

    for id in 1..=6 {
        let stored = store.get_item(id).await.unwrap().unwrap();
        assert_eq!(stored.winner_notified_at, Some(t0()));
    }
}
