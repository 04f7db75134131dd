use crate::member::{Member, MemberRepository};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fmt::{Display, Formatter};
use tracing::error;

/// 일반 회원에게 부여 되는 스코프
pub const SCOPE_USER: &'static str = "user";
/// 관리자에게 부여 되는 스코프
pub const SCOPE_ADMIN: &'static str = "admin";

type HmacSha256 = Hmac<Sha256>;

/// Auth 모듈에서 사용할 에러 열거
///
/// 서명 불일치, 만료, 모르는 회원 등 인증 실패의 원인은 호출자에게 노출 하지 않고
/// 모두 [`AuthError::Unauthenticated`] 하나로 합쳐 반환한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// 인증 실패
    Unauthenticated,

    /// 인증은 되었으나 필요한 스코프가 없음
    Forbidden,

    /// 토큰 서명 생성 실패
    SignFailed(String),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Unauthenticated => write!(f, "Could not authenticate"),
            AuthError::Forbidden => write!(f, "Not enough permissions"),
            AuthError::SignFailed(s) => write!(f, "Failed to sign token: {}", s),
        }
    }
}

impl std::error::Error for AuthError {}

/// 토큰에 담기는 클레임
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// 회원 아이디
    pub sub: i64,
    /// 부여된 스코프 리스트
    pub scopes: Vec<String>,
    /// 만료 시각(UNIX 초)
    pub exp: i64,
}

impl Claims {
    pub fn covers(&self, required: &[&str]) -> bool {
        required.iter().all(|r| self.scopes.iter().any(|s| s == r))
    }
}

/// 토큰 발급/검증 서비스
///
/// 토큰은 `base64url(클레임 JSON) "." base64url(HMAC-SHA256 서명)` 형태이며
/// 발급은 (회원, 스코프, 현재 시각)만으로 결정 되는 순수 함수로 서버에 세션 상태를 두지 않는다.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: chrono::Duration,
}

impl TokenService {
    pub fn new(secret_key: &str, expire_minutes: i64) -> Self {
        Self {
            secret: secret_key.as_bytes().to_vec(),
            ttl: chrono::Duration::minutes(expire_minutes),
        }
    }

    /// 전달 받은 회원의 역할에 맞는 스코프로 토큰을 발급한다.
    pub fn issue_for(
        &self,
        member: &Member,
        now: chrono::NaiveDateTime,
    ) -> Result<String, AuthError> {
        self.issue(member.id(), &member.role().granted_scopes(), now)
    }

    pub fn issue(
        &self,
        subject: i64,
        scopes: &[String],
        now: chrono::NaiveDateTime,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject,
            scopes: scopes.to_vec(),
            exp: (now + self.ttl).and_utc().timestamp(),
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| AuthError::SignFailed(e.to_string()))?;
        let signature = self.sign(&payload)?;

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// 토큰의 서명과 만료를 검증 하고 클레임을 돌려준다.
    /// 어느 단계에서 실패 했는지는 에러로 구분 하지 않는다.
    pub fn verify(
        &self,
        token: &str,
        now: chrono::NaiveDateTime,
    ) -> Result<Claims, AuthError> {
        self.try_verify(token, now).ok_or(AuthError::Unauthenticated)
    }

    fn try_verify(&self, token: &str, now: chrono::NaiveDateTime) -> Option<Claims> {
        let (payload_raw, signature_raw) = token.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload_raw).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(signature_raw).ok()?;

        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(&payload);
        mac.verify_slice(&signature).ok()?;

        let claims: Claims = serde_json::from_slice(&payload).ok()?;
        if claims.exp <= now.and_utc().timestamp() {
            return None;
        }

        Some(claims)
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError::SignFailed(e.to_string()))?;
        mac.update(payload);

        Ok(mac.finalize().into_bytes().as_slice().to_vec())
    }
}

/// 요청 단계의 접근 제어
///
/// 토큰을 회원으로 환원한 뒤 작업별로 선언된 필요 스코프를 검사한다.
/// 스코프 부족은 인증 실패와 구분 되는 [`AuthError::Forbidden`]으로 거절 된다.
pub struct AccessGuard<M>
where
    M: MemberRepository,
{
    tokens: TokenService,
    members: M,
}

impl<M> AccessGuard<M>
where
    M: MemberRepository,
{
    pub fn new(tokens: TokenService, members: M) -> Self {
        Self { tokens, members }
    }

    pub fn authorize(
        &self,
        bearer: Option<&str>,
        required_scopes: &[&str],
        now: chrono::NaiveDateTime,
    ) -> Result<Member, AuthError> {
        let token = bearer.ok_or(AuthError::Unauthenticated)?;
        let claims = self.tokens.verify(token, now)?;

        let member = self.members.find_by_id(claims.sub)
            .map_err(|e| {
                error!("토큰 검증 중 회원 조회에 실패 했습니다. {:?}", e);
                AuthError::Unauthenticated
            })?
            .ok_or(AuthError::Unauthenticated)?;

        if !claims.covers(required_scopes) {
            return Err(AuthError::Forbidden);
        }

        Ok(member)
    }
}

/// 로그인 위젯이 전달한 데이터의 해시 검증
///
/// 위젯 데이터는 `hash` 필드를 제외한 키들을 정렬해 `key=value`를 줄바꿈으로 이어 붙인 문자열에
/// 봇 토큰의 SHA-256 다이제스트를 키로 한 HMAC-SHA256을 걸어 서명 된다.
pub struct LoginPayload {
    fields: BTreeMap<String, String>,
    hash: Option<String>,
}

impl LoginPayload {
    pub fn new(mut data: HashMap<String, String>) -> Self {
        let hash = data.remove("hash");
        Self {
            fields: data.into_iter().collect(),
            hash,
        }
    }

    pub fn subject(&self) -> Option<i64> {
        self.fields.get("id").and_then(|v| v.parse().ok())
    }

    /// 해시가 봇 토큰으로 서명한 값과 일치 하는지 검증한다.
    pub fn check(&self, api_token: &str) -> bool {
        let Some(hash) = self.hash.as_deref().and_then(from_hex) else {
            return false;
        };
        let secret = Sha256::digest(api_token.as_bytes());

        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_slice()) else {
            return false;
        };
        mac.update(self.data_check_string().as_bytes());
        mac.verify_slice(&hash).is_ok()
    }

    fn data_check_string(&self) -> String {
        self.fields
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}
