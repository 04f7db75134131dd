use reqwest::blocking;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::fmt::{Display, Formatter};

/// 텔레그램 봇 API 엔드포인트 URL
const TELEGRAM_API_ENDPOINT: &'static str = "https://api.telegram.org";
/// 메시지 전송 시 기본 타임아웃 시간(초)
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// 메시지 전송 실패 열거
///
/// [`NotifyError::RateLimited`]는 채널이 알려준 대기 시간 만큼 기다린 뒤
/// 한번만 다시 보낼 수 있다는 신호로, 다른 실패는 재시도 대상이 아니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// 수신자가 봇을 차단 함
    Forbidden(i64),

    /// 전송 한도 초과. 전달 받은 시간(초) 후에 한번만 다시 보낼 수 있다.
    RateLimited { chat_id: i64, retry_after: u64 },

    RequestFailed(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Forbidden(chat_id) => write!(f, "Target [ID:{}]: forbidden", chat_id),
            NotifyError::RateLimited { chat_id, retry_after } => {
                write!(f, "Target [ID:{}]: flood limit, retry after {}s", chat_id, retry_after)
            }
            NotifyError::RequestFailed(s) => write!(f, "Request failed: {}", s),
        }
    }
}

impl std::error::Error for NotifyError {}

/// 회원에게 메시지를 전송하는 클라이언트
pub trait NotifyClient {
    fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError>;
}

/// 전송 한도 초과 응답에 담겨 오는 재시도 정보
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    parameters: Option<RetryParameters>,
}

#[derive(Debug, Deserialize)]
struct RetryParameters {
    retry_after: u64,
}

/// 텔레그램 봇 API 클라이언트
pub struct TelegramClient {
    endpoint: String,
    bot_token: String,
}

impl TelegramClient {
    pub fn new(endpoint: &str, bot_token: &str) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
            bot_token: bot_token.to_owned(),
        }
    }

    pub fn with_default_endpoint(bot_token: &str) -> Self {
        Self::new(TELEGRAM_API_ENDPOINT, bot_token)
    }
}

impl NotifyClient for TelegramClient {
    fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let client = blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;
        let url = format!("{}/bot{}/sendMessage", self.endpoint, self.bot_token);

        let response = client.post(url)
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::FORBIDDEN => Err(NotifyError::Forbidden(chat_id)),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response.json::<ApiErrorResponse>()
                    .ok()
                    .and_then(|body| body.parameters)
                    .map(|parameters| parameters.retry_after)
                    .unwrap_or(0);

                Err(NotifyError::RateLimited { chat_id, retry_after })
            }
            status => Err(NotifyError::RequestFailed(format!("HTTP 오류: {}", status))),
        }
    }
}
