use crate::auth::{AccessGuard, TokenService};
use crate::batch::{Reader, Writer};
use crate::broadcast::{NewBookReader, NotifyWriter, Outbound};
use crate::catalog::repo::BookPgStore;
use crate::catalog::CatalogService;
use crate::ledger::repo::LoanPgStore;
use crate::ledger::LendingService;
use crate::member::repo::MemberPgStore;
use crate::provider::api::CoverStore;
use crate::provider::{api, notify};
use diesel::r2d2::ConnectionManager;
use diesel::PgConnection;
use r2d2::Pool;
use std::time::Duration;

pub mod auth;
pub mod batch;
pub mod broadcast;
pub mod catalog;
pub mod config;
pub mod ledger;
pub mod member;
pub mod provider;
pub mod schema;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// 페이지당 기본 조회 개수
const DEF_PAGE_SIZE: i64 = 10;

/// 목록 조회의 페이징 조건
/// 조건이 생략 되면 기본 개수와 0번째 위치로 조회 된다.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Scroll {
    limit: i64,
    offset: i64,
}

impl Scroll {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEF_PAGE_SIZE),
            offset: offset.unwrap_or(0),
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

impl Default for Scroll {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// 대출 서비스를 생성한다.
pub fn create_lending_service(pool: DbPool) -> LendingService<LoanPgStore, BookPgStore> {
    LendingService::new(LoanPgStore::new(pool.clone()), BookPgStore::new(pool))
}

/// 외부 검색 API와 표지 저장소가 연결된 카탈로그 서비스를 생성한다.
pub fn create_catalog_service(
    pool: DbPool,
    lookup: &config::api::Lookup,
) -> CatalogService<BookPgStore, api::google::Client> {
    let client = api::google::Client::new(lookup.endpoint(), lookup.key());
    let covers = CoverStore::new(lookup.image_dir());

    CatalogService::new(BookPgStore::new(pool), client, covers)
}

/// 토큰 발급/검증 서비스를 생성한다.
pub fn create_token_service(token: &config::token::Token) -> TokenService {
    TokenService::new(token.secret_key(), token.expire_minutes())
}

/// 회원 디렉토리가 연결된 접근 제어 가드를 생성한다.
pub fn create_access_guard(
    pool: DbPool,
    token: &config::token::Token,
) -> AccessGuard<MemberPgStore> {
    AccessGuard::new(create_token_service(token), MemberPgStore::new(pool))
}

/// 신규 도서 알림 잡에 사용할 리더와 라이터를 생성한다.
pub fn create_broadcast_job_attr(
    pool: DbPool,
    notify: &config::api::Notify,
) -> (impl Reader<Item = Outbound> + use<>, impl Writer<Item = Outbound> + use<>) {
    let reader = NewBookReader::new(
        BookPgStore::new(pool.clone()),
        MemberPgStore::new(pool),
    );
    let client = notify::TelegramClient::new(notify.endpoint(), notify.bot_token());
    let writer = NotifyWriter::new(client, Duration::from_millis(notify.pause_millis()));

    (reader, writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_defaults() {
        let scroll = Scroll::default();
        assert_eq!(scroll.limit(), 10);
        assert_eq!(scroll.offset(), 0);

        let scroll = Scroll::new(Some(3), None);
        assert_eq!(scroll.limit(), 3);
        assert_eq!(scroll.offset(), 0);
    }
}
