/// 메일 발송 협력자
/// 낙찰 알림 메일은 외부 메일 릴레이 API 로 전송한다고 가정
/// 릴레이는 {"delivered": n} 형태로 실제 전달된 수신자 수를 응답한다.
// region:    --- Imports
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Mail Error
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("메일 설정이 없습니다.")]
    NotConfigured,
    #[error("메일 릴레이 통신 실패: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("메일 릴레이가 요청을 거부했습니다: status={status}, body={body}")]
    Rejected { status: u16, body: String },
}
// endregion: --- Mail Error

// region:    --- Mailer Trait
/// 메일 발송 트레이트
/// 반환값은 실제로 전달된 수신자 수 (0 이면 호출자가 실패로 간주)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<usize, MailError>;
}

/// 메일 설정
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

/// 설정 유무에 따라 메일 발송 구현체 선택
pub fn from_config(config: Option<MailConfig>) -> Result<Arc<dyn Mailer>, MailError> {
    match config {
        Some(config) => Ok(Arc::new(HttpMailer::new(config)?)),
        None => {
            warn!(
                "{:<12} --> 메일 설정이 없어 낙찰 알림이 발송되지 않습니다.",
                "Mailer"
            );
            Ok(Arc::new(DisabledMailer))
        }
    }
}
// endregion: --- Mailer Trait

// region:    --- Http Mailer
#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    delivered: usize,
}

/// 메일 릴레이 API 구현체
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<usize, MailError> {
        info!("{:<12} --> 메일 전송: to={}", "Mailer", recipient);
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&SendRequest {
                from: &self.config.from,
                to: [recipient],
                subject,
                text: body,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let result: SendResponse = response.json().await?;
        Ok(result.delivered)
    }
}
// endregion: --- Http Mailer

// region:    --- Disabled Mailer
/// 메일 설정이 없는 환경용 구현체: 항상 NotConfigured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(
        &self,
        _recipient: &str,
        _subject: &str,
        _body: &str,
    ) -> Result<usize, MailError> {
        Err(MailError::NotConfigured)
    }
}
// endregion: --- Disabled Mailer

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_mailer_never_delivers() {
        let mailer = from_config(None).unwrap();
        let result = mailer.send("winner@example.com", "subject", "body").await;
        assert!(matches!(result, Err(MailError::NotConfigured)));
    }

    #[test]
    fn send_request_shape() {
        let request = SendRequest {
            from: "auction@example.com",
            to: ["winner@example.com"],
            subject: "s",
            text: "t",
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "from": "auction@example.com",
                "to": ["winner@example.com"],
                "subject": "s",
                "text": "t",
            })
        );
    }
}
