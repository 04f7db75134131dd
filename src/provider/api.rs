pub mod google;

use std::fmt;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use tracing::warn;

/// 표지 이미지 다운로드 시 기본 타임아웃 시간(초)
const COVER_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    InvalidBaseUrl,
    RequestFailed(String),
    ResponseTextExtractionFailed(String),
    ResponseParseFailed(String),

    /// 재시도 횟수를 모두 소진함
    Unavailable(String),
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::InvalidBaseUrl => write!(f, "Invalid base url"),
            ClientError::RequestFailed(s) => write!(f, "Request failed: {}", s),
            ClientError::ResponseTextExtractionFailed(s) => {
                write!(f, "Failed to extract response text: {}", s)
            }
            ClientError::ResponseParseFailed(s) => write!(f, "Failed to parse response: {}", s),
            ClientError::Unavailable(s) => write!(f, "Upstream unavailable: {}", s),
        }
    }
}

impl std::error::Error for ClientError {}

/// 외부 검색 API가 돌려주는 도서 메타데이터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub authors: Vec<String>,
    pub published: Option<String>,
}

/// 도서 메타데이터 검색 클라이언트
pub trait LookupClient {
    /// ISBN으로 도서 메타데이터를 검색한다.
    ///
    /// 연결류의 일시적인 실패는 정해진 횟수 안에서 재시도 하지만,
    /// 검색 결과가 없다는 응답은 재시도 하지 않고 [`None`]으로 반환 되어야 한다.
    fn find_by_isbn(&self, isbn: i64) -> Result<Option<BookMetadata>, ClientError>;
}

/// 표지 이미지 저장소
///
/// 메타데이터의 표지 URL을 내려 받아 설정된 디렉토리에 `{ISBN}.jpeg`로 저장한다.
/// 표지가 없거나 다운로드에 실패할 경우 기본 이미지 이름으로 대신 하며 도서 등록은 막지 않는다.
pub struct CoverStore {
    dir: Option<PathBuf>,
}

impl CoverStore {
    /// 표지를 찾지 못한 도서에 사용할 기본 이미지 이름
    pub const PLACEHOLDER: &'static str = "not_found.jpeg";

    pub fn new(dir: &str) -> Self {
        Self { dir: Some(PathBuf::from(dir)) }
    }

    /// 표지 저장을 하지 않는 저장소를 만든다.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn store(&self, isbn: i64, cover_url: Option<&str>) -> String {
        let (Some(dir), Some(url)) = (&self.dir, cover_url) else {
            return Self::PLACEHOLDER.to_owned();
        };

        match download(url) {
            Ok(bytes) => {
                let file_name = format!("{}.jpeg", isbn);
                match std::fs::write(dir.join(&file_name), bytes) {
                    Ok(_) => file_name,
                    Err(e) => {
                        warn!("표지 이미지 저장에 실패 했습니다. (ISBN: {}, ERROR: {})", isbn, e);
                        Self::PLACEHOLDER.to_owned()
                    }
                }
            }
            Err(e) => {
                warn!("표지 이미지 다운로드에 실패 했습니다. (ISBN: {}, ERROR: {})", isbn, e);
                Self::PLACEHOLDER.to_owned()
            }
        }
    }
}

fn download(url: &str) -> Result<Vec<u8>, ClientError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(COVER_TIMEOUT_SECONDS))
        .build()
        .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

    let response = client.get(url)
        .send()
        .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
    if !response.status().is_success() {
        return Err(ClientError::RequestFailed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes()
        .map_err(|e| ClientError::ResponseTextExtractionFailed(e.to_string()))?;

    Ok(bytes.to_vec())
}
