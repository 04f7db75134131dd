use crate::provider::api::{BookMetadata, ClientError, LookupClient};
use reqwest::{blocking, Url};
use serde::Deserialize;
use tracing::warn;

/// Google Books 도서 검색 API 엔드포인트 URL
const VOLUMES_ENDPOINT: &'static str = "https://www.googleapis.com/books/v1/volumes";
/// API 요청 시 기본 타임아웃 시간(초)
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
/// 연결 실패 시 최대 시도 횟수
const MAX_ATTEMPTS: usize = 3;

/// Google Books API 응답 구조체
#[derive(Debug, Deserialize)]
pub struct VolumesResponse {
    /// 검색된 총 도서 수
    #[serde(rename = "totalItems")]
    pub total_items: i32,

    /// 검색된 도서 목록
    #[serde(default)]
    pub items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
pub struct Volume {
    #[serde(rename = "volumeInfo")]
    pub volume_info: VolumeInfo,
}

/// 개별 도서 정보를 표현하는 구조체
#[derive(Debug, Deserialize)]
pub struct VolumeInfo {
    /// 도서 제목
    pub title: String,
    /// 도서 설명
    #[serde(default)]
    pub description: Option<String>,
    /// 저자 목록
    #[serde(default)]
    pub authors: Vec<String>,
    /// 출판일
    #[serde(rename = "publishedDate", default)]
    pub published_date: Option<String>,
    /// 표지 이미지 링크
    #[serde(rename = "imageLinks", default)]
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
pub struct ImageLinks {
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl VolumeInfo {
    fn to_metadata(&self) -> BookMetadata {
        BookMetadata {
            title: self.title.clone(),
            description: self.description.clone(),
            // 섬네일 URL의 줌 레벨을 올려 더 큰 표지를 받는다.
            cover_url: self.image_links.as_ref()
                .and_then(|links| links.thumbnail.as_ref())
                .map(|url| url.replace("zoom=1", "zoom=3")),
            authors: self.authors.clone(),
            published: self.published_date.clone(),
        }
    }
}

/// Google Books API 클라이언트
pub struct Client {
    endpoint: String,
    /// API 키 (선택사항)
    key: Option<String>,
}

impl Client {
    pub fn new(endpoint: &str, key: Option<&str>) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
            key: key.map(|k| k.to_owned()),
        }
    }

    pub fn with_default_endpoint(key: Option<&str>) -> Self {
        Self::new(VOLUMES_ENDPOINT, key)
    }
}

impl LookupClient for Client {
    fn find_by_isbn(&self, isbn: i64) -> Result<Option<BookMetadata>, ClientError> {
        let client = blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
        let url = build_volumes_url(&self.endpoint, self.key.as_deref(), isbn)?;

        // 연결 자체가 실패한 경우에만 정해진 횟수까지 다시 시도한다.
        // 검색 결과가 없다는 정상 응답은 그대로 반환 되어 재시도 되지 않는다.
        let mut attempts = 0;
        let response = loop {
            attempts += 1;
            match client.get(url.clone()).send() {
                Ok(response) => break response,
                Err(e) if (e.is_connect() || e.is_timeout()) && attempts < MAX_ATTEMPTS => {
                    warn!("도서 검색 요청을 다시 시도 합니다. (ISBN: {}, 시도: {})", isbn, attempts);
                }
                Err(e) => return Err(ClientError::Unavailable(format!("ISBN: {}, ERROR: {}", isbn, e))),
            }
        };

        if !response.status().is_success() {
            return Err(ClientError::RequestFailed(format!("HTTP 오류: {}", response.status())));
        }

        let text = response.text()
            .map_err(|e| ClientError::ResponseTextExtractionFailed(e.to_string()))?;
        let parsed = serde_json::from_str::<VolumesResponse>(&text)
            .map_err(|e| ClientError::ResponseParseFailed(e.to_string()))?;

        if parsed.total_items == 0 {
            return Ok(None);
        }

        Ok(parsed.items.first().map(|volume| volume.volume_info.to_metadata()))
    }
}

fn build_volumes_url(endpoint: &str, key: Option<&str>, isbn: i64) -> Result<Url, ClientError> {
    Url::parse(endpoint)
        .map_err(|_| ClientError::InvalidBaseUrl)
        .map(|mut url| {
            url.query_pairs_mut()
                .append_pair("q", &format!("isbn:{}", isbn));
            if let Some(key) = key {
                url.query_pairs_mut().append_pair("key", key);
            }
            url
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOUND: &'static str = r#"{
        "totalItems": 1,
        "items": [
            {
                "volumeInfo": {
                    "title": "Clean Code",
                    "description": "A handbook of agile software craftsmanship",
                    "authors": ["Robert C. Martin"],
                    "publishedDate": "2008-08-01",
                    "imageLinks": {
                        "thumbnail": "http://books.google.com/books/content?id=_i6bDeoCQzsC&zoom=1"
                    }
                }
            }
        ]
    }"#;

    #[test]
    fn parse_found_response() {
        let parsed = serde_json::from_str::<VolumesResponse>(FOUND).unwrap();
        let metadata = parsed.items[0].volume_info.to_metadata();

        assert_eq!(metadata.title, "Clean Code");
        assert_eq!(metadata.authors, vec!["Robert C. Martin".to_owned()]);
        assert_eq!(metadata.published.as_deref(), Some("2008-08-01"));
        assert!(metadata.cover_url.unwrap().contains("zoom=3"));
    }

    #[test]
    fn parse_empty_response() {
        let parsed = serde_json::from_str::<VolumesResponse>(r#"{"totalItems": 0}"#).unwrap();
        assert_eq!(parsed.total_items, 0);
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn parse_response_without_optional_fields() {
        let raw = r#"{"totalItems": 1, "items": [{"volumeInfo": {"title": "이름 없는 책"}}]}"#;
        let parsed = serde_json::from_str::<VolumesResponse>(raw).unwrap();
        let metadata = parsed.items[0].volume_info.to_metadata();

        assert_eq!(metadata.title, "이름 없는 책");
        assert_eq!(metadata.description, None);
        assert_eq!(metadata.cover_url, None);
        assert!(metadata.authors.is_empty());
    }
}
