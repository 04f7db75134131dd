use serde::Deserialize;

/// 외부 도서 검색 API 설정
#[derive(Debug, Deserialize)]
pub struct Lookup {
    endpoint: String,
    key: Option<String>,

    /// 표지 이미지를 저장할 디렉토리
    image_dir: String,
}

impl Lookup {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn key(&self) -> Option<&str> {
        match &self.key {
            None => None,
            Some(k) => Some(k.as_str()),
        }
    }

    pub fn image_dir(&self) -> &str {
        &self.image_dir
    }
}

/// 알림 전송 채널 설정
#[derive(Debug, Deserialize)]
pub struct Notify {
    endpoint: String,
    bot_token: String,

    /// 수신자 사이의 전송 간격(밀리초)
    pause_millis: u64,
}

impl Notify {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn bot_token(&self) -> &str {
        &self.bot_token
    }

    pub fn pause_millis(&self) -> u64 {
        self.pause_millis
    }
}
