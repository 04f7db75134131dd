use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Token {
    /// 토큰 서명에 사용할 비밀 키
    secret_key: String,

    /// 발급 시각부터 토큰이 유효한 시간(분)
    expire_minutes: i64,
}

impl Token {
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn expire_minutes(&self) -> i64 {
        self.expire_minutes
    }
}
