/// 실행 설정
/// 모든 옵션은 명령행 인자 또는 환경 변수로 지정할 수 있다.
// region:    --- Imports
use crate::error::Error;
use crate::mailer::MailConfig;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;

// endregion: --- Imports

// region:    --- Arguments
#[derive(Debug, Parser)]
#[clap(name = "auction-notifier", about = "경매 종료 및 낙찰 알림 서비스")]
pub struct Arguments {
    /// PostgreSQL 접속 URL
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// 커넥션 풀 최대 크기
    #[clap(long, env = "DB_MAX_CONNECTIONS", default_value = "5")]
    pub db_max_connections: u32,

    #[clap(flatten)]
    pub mail: MailArguments,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// HTTP 서버와 낙찰 알림 스케줄러 실행
    Serve(ServeArguments),
    /// 종료된 경매의 낙찰 알림을 한 번 처리하고 종료
    ProcessEndedAuctions,
}

#[derive(Debug, Args)]
pub struct ServeArguments {
    #[clap(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:3000")]
    pub bind_address: SocketAddr,

    /// 낙찰 알림 스케줄러 실행 주기
    #[clap(
        long,
        env = "NOTIFY_INTERVAL",
        default_value = "60s",
        value_parser = parse_non_zero_duration,
    )]
    pub notify_interval: Duration,

    /// 요청 경로 낙찰 알림 확인 사용 여부 (스케줄러가 있으므로 기본은 끔)
    #[clap(long, env = "REQUEST_TRIGGER")]
    pub request_trigger: bool,

    /// 요청 경로 낙찰 알림 확인 쿨다운
    #[clap(
        long,
        env = "REQUEST_TRIGGER_COOLDOWN",
        default_value = "60s",
        value_parser = parse_non_zero_duration,
    )]
    pub request_trigger_cooldown: Duration,
}

/// 메일 릴레이 설정 (세 값이 모두 있어야 메일이 발송된다)
#[derive(Debug, Default, Args)]
pub struct MailArguments {
    #[clap(long, env = "MAIL_API_URL")]
    pub mail_api_url: Option<String>,

    #[clap(long, env = "MAIL_API_KEY", hide_env_values = true)]
    pub mail_api_key: Option<String>,

    #[clap(long, env = "MAIL_FROM")]
    pub mail_from: Option<String>,
}

impl MailArguments {
    /// 메일 설정 변환
    /// 전부 없으면 None, 일부만 있으면 설정 오류
    pub fn config(&self) -> Result<Option<MailConfig>, Error> {
        match (&self.mail_api_url, &self.mail_api_key, &self.mail_from) {
            (Some(api_url), Some(api_key), Some(from)) => Ok(Some(MailConfig {
                api_url: api_url.clone(),
                api_key: api_key.clone(),
                from: from.clone(),
            })),
            (None, None, None) => Ok(None),
            _ => Err(Error::Config(
                "MAIL_API_URL, MAIL_API_KEY, MAIL_FROM 는 함께 설정해야 합니다.".to_string(),
            )),
        }
    }
}

/// 0 이 아닌 기간만 허용
fn parse_non_zero_duration(s: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(s).map_err(|e| e.to_string())?;
    if duration.is_zero() {
        return Err("0 보다 긴 기간이어야 합니다.".to_string());
    }
    Ok(duration)
}
// endregion: --- Arguments
