// region:    --- Imports
use auction_notifier::clock::{Clock, SystemClock};
use auction_notifier::config::{Arguments, Command, ServeArguments};
use auction_notifier::database::DatabaseManager;
use auction_notifier::handlers::{self, AppState};
use auction_notifier::mailer;
use auction_notifier::notification::WinnerNotifier;
use auction_notifier::scheduler::{NotificationScheduler, RequestTrigger};
use auction_notifier::store::{AuctionStore, PostgresStore};
use axum::extract::DefaultBodyLimit;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let args = Arguments::parse();

    // DatabaseManager 생성
    let db_manager = match DatabaseManager::new(&args.database_url, args.db_max_connections).await
    {
        Ok(db_manager) => Arc::new(db_manager),
        Err(e) => {
            error!("{:<12} --> 데이터베이스 연결 실패: {:?}", "Main", e);
            return Err(e.into());
        }
    };

    // 데이터베이스 초기화
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // 낙찰 알림 엔진 구성
    let store: Arc<dyn AuctionStore> = Arc::new(PostgresStore::new(Arc::clone(&db_manager)));
    let mailer = mailer::from_config(args.mail.config()?)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifier = Arc::new(WinnerNotifier::new(
        Arc::clone(&store),
        mailer,
        Arc::clone(&clock),
    ));

    match args.command {
        Command::ProcessEndedAuctions => {
            let notified = notifier.notify_winners_for_ended_auctions().await?;
            println!("Notified winners for items: {:?}", notified);
            Ok(())
        }
        Command::Serve(serve_args) => {
            let state = AppState {
                store,
                notifier,
                clock,
            };
            serve(serve_args, state).await
        }
    }
}

/// HTTP 서버 및 낙찰 알림 스케줄러 실행
async fn serve(args: ServeArguments, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = CancellationToken::new();

    // 낙찰 알림 스케줄러 시작
    let scheduler = NotificationScheduler::new(Arc::clone(&state.notifier), args.notify_interval)
        .start(shutdown.clone());

    // 요청 경로 낙찰 알림 확인 (선택)
    let trigger = args.request_trigger.then(|| {
        info!(
            "{:<12} --> 요청 경로 낙찰 알림 확인 사용 (쿨다운: {:?})",
            "Main", args.request_trigger_cooldown
        );
        Arc::new(RequestTrigger::new(
            Arc::clone(&state.notifier),
            Arc::clone(&state.clock),
            args.request_trigger_cooldown,
        ))
    });

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = handlers::routes(state, trigger)
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024));

    // 리스너 생성
    let listener = TcpListener::bind(args.bind_address).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행 (Ctrl+C 수신 시 스케줄러와 함께 종료)
    let server_shutdown = shutdown.clone();
    let result = axum::serve(listener, routes_all.into_make_service())
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("{:<12} --> 종료 시그널 수신 실패: {}", "Main", e);
            }
            server_shutdown.cancel();
        })
        .await;
    if let Err(err) = &result {
        error!("{:<12} --> Server error: {}", "Main", err);
    }

    shutdown.cancel();
    if let Err(e) = scheduler.await {
        error!("{:<12} --> 스케줄러 종료 오류: {:?}", "Main", e);
    }
    info!("{:<12} --> 서버 종료", "Main");
    result.map_err(Into::into)
}
// endregion: --- Main
