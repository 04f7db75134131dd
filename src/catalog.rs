pub mod repo;

use crate::provider::api::{BookMetadata, CoverStore, LookupClient};
use crate::Scroll;
use std::fmt;
use std::fmt::{Display, Formatter};
use tracing::info;

/// 한 권으로 인정하는 ISBN 자릿수
const ISBN_DIGITS: [usize; 2] = [10, 13];

/// Catalog 모듈에서 사용할 에러 열거
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// 필수 데이터가 입력 되지 않음
    RequireArgumentMissing(String),

    /// 알 수 없는 열거형 코드
    UnknownCode(String),

    /// 형식에 맞지 않는 ISBN
    InvalidIsbn(i64),

    /// 도서를 찾을 수 없음
    NotFound(i64),

    /// 외부 검색 API에서 도서를 찾지 못함
    LookupNotFound(i64),

    /// 외부 검색 API 호출 실패
    LookupUnavailable(String),

    ConnectError(String),

    SqlExecuteError(String),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::RequireArgumentMissing(s) => write!(f, "Missing required argument: {}", s),
            CatalogError::UnknownCode(s) => write!(f, "Unknown code: {}", s),
            CatalogError::InvalidIsbn(isbn) => write!(f, "Invalid isbn: {}", isbn),
            CatalogError::NotFound(isbn) => write!(f, "Book not found: {}", isbn),
            CatalogError::LookupNotFound(isbn) => write!(f, "Book not found in lookup: {}", isbn),
            CatalogError::LookupUnavailable(s) => write!(f, "Lookup unavailable: {}", s),
            CatalogError::ConnectError(s) => write!(f, "Connect error: {}", s),
            CatalogError::SqlExecuteError(s) => write!(f, "Sql execute error: {}", s),
        }
    }
}

impl std::error::Error for CatalogError {}

/// 도서 목록 조회 시 사용할 대출 상태 필터
/// 대출 가능 여부는 항상 "열린 대출이 없는 도서"로 계산 하며 따로 저장하지 않는다.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum LendingFilter {
    All,
    OnLoan,
    Available,
}

impl TryFrom<&str> for LendingFilter {
    type Error = CatalogError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "all" => Ok(LendingFilter::All),
            "on-loan" | "taken" => Ok(LendingFilter::OnLoan),
            "available" | "not-taken" => Ok(LendingFilter::Available),
            _ => Err(CatalogError::UnknownCode(format!("Unknown lending filter: {}", value))),
        }
    }
}

impl Display for LendingFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LendingFilter::All => write!(f, "ALL"),
            LendingFilter::OnLoan => write!(f, "ON_LOAN"),
            LendingFilter::Available => write!(f, "AVAILABLE"),
        }
    }
}

/// 도서
/// 아이디는 ISBN 코드를 그대로 사용하며 서버에서 생성하지 않는다.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Book {
    id: i64,
    title: String,
    description: String,
    image: String,
    author: String,
    publish: String,
    added_at: Option<chrono::NaiveDateTime>,
}

impl Book {
    pub fn builder() -> BookBuilder {
        BookBuilder::new()
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn publish(&self) -> &str {
        &self.publish
    }

    pub fn added_at(&self) -> Option<chrono::NaiveDateTime> {
        self.added_at
    }
}

impl AsRef<Book> for Book {
    fn as_ref(&self) -> &Book {
        self
    }
}

/// Book 빌더
#[derive(Debug, Clone, Default)]
pub struct BookBuilder {
    id: Option<i64>,
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
    author: Option<String>,
    publish: Option<String>,
    added_at: Option<chrono::NaiveDateTime>,
}

impl BookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn image(mut self, image: String) -> Self {
        self.image = Some(image);
        self
    }

    pub fn author(mut self, author: String) -> Self {
        self.author = Some(author);
        self
    }

    pub fn publish(mut self, publish: String) -> Self {
        self.publish = Some(publish);
        self
    }

    pub fn added_at(mut self, added_at: chrono::NaiveDateTime) -> Self {
        self.added_at = Some(added_at);
        self
    }

    pub fn build(self) -> Result<Book, CatalogError> {
        let id = self.id.ok_or(CatalogError::RequireArgumentMissing("id".to_owned()))?;
        let title = self.title.ok_or(CatalogError::RequireArgumentMissing("title".to_owned()))?;

        Ok(Book {
            id,
            title,
            description: self.description.unwrap_or_default(),
            image: self.image.unwrap_or_default(),
            author: self.author.unwrap_or_default(),
            publish: self.publish.unwrap_or_default(),
            added_at: self.added_at,
        })
    }
}

/// 도서 저장소
pub trait BookRepository {
    /// 전달 받은 ISBN으로 도서를 찾는다.
    fn find_by_id(&self, id: i64) -> Result<Option<Book>, CatalogError>;

    /// 전달 받은 도서를 저장소에 저장한다.
    /// 같은 ISBN의 도서가 이미 저장 되어 있을 경우 저장 되어 있던 도서를 반환한다.
    fn get_or_create(&self, book: &Book) -> Result<Book, CatalogError>;

    /// 전달 받은 ISBN의 도서를 삭제 하고 삭제된 행 수를 반환한다.
    /// 대출 기록은 저장소의 참조 무결성 설정에 따라 함께 삭제 된다.
    fn delete(&self, id: i64) -> Result<usize, CatalogError>;

    /// 대출 상태 필터와 페이징 조건으로 도서 목록을 가져온다.
    fn find_all(&self, filter: LendingFilter, scroll: &Scroll) -> Result<Vec<Book>, CatalogError>;

    /// 전달 받은 시각 이후에 추가된 도서를 모두 가져온다.
    fn find_added_after(&self, since: chrono::NaiveDateTime) -> Result<Vec<Book>, CatalogError>;
}

/// 신규 도서로 취급하는 기간(일)
pub const NEW_BOOK_WINDOW_DAYS: i64 = 7;

/// 카탈로그 서비스
/// 도서 저장소와 외부 검색 API를 묶어 도서 등록/조회/삭제를 담당한다.
pub struct CatalogService<B, L>
where
    B: BookRepository,
    L: LookupClient,
{
    books: B,
    lookup: L,
    covers: CoverStore,
}

impl<B, L> CatalogService<B, L>
where
    B: BookRepository,
    L: LookupClient,
{
    pub fn new(books: B, lookup: L, covers: CoverStore) -> Self {
        Self { books, lookup, covers }
    }

    /// ISBN만 전달 받아 외부 검색 API의 메타데이터로 도서를 등록한다.
    ///
    /// 이미 등록된 ISBN일 경우 외부 API를 호출 하지 않고 저장 되어 있던 도서를 반환 하며,
    /// 외부 API가 도서를 찾지 못할 경우 [`CatalogError::LookupNotFound`]로 거절한다.
    pub fn add_book_by_isbn(&self, isbn: i64) -> Result<Book, CatalogError> {
        if !is_valid_isbn(isbn) {
            return Err(CatalogError::InvalidIsbn(isbn));
        }

        if let Some(exists) = self.books.find_by_id(isbn)? {
            return Ok(exists);
        }

        let metadata = self.lookup.find_by_isbn(isbn)
            .map_err(|e| CatalogError::LookupUnavailable(e.to_string()))?
            .ok_or(CatalogError::LookupNotFound(isbn))?;
        let image = self.covers.store(isbn, metadata.cover_url.as_deref());

        let book = to_book(isbn, metadata, image)?;
        let saved = self.books.get_or_create(&book)?;
        info!("신규 도서가 등록 되었습니다. (ISBN: {})", saved.id());

        Ok(saved)
    }

    /// 직접 입력한 메타데이터로 도서를 등록한다.
    pub fn add_book(&self, book: &Book) -> Result<Book, CatalogError> {
        if !is_valid_isbn(book.id()) {
            return Err(CatalogError::InvalidIsbn(book.id()));
        }
        self.books.get_or_create(book)
    }

    pub fn get_book(&self, isbn: i64) -> Result<Option<Book>, CatalogError> {
        self.books.find_by_id(isbn)
    }

    pub fn delete_book(&self, isbn: i64) -> Result<(), CatalogError> {
        let deleted = self.books.delete(isbn)?;
        if deleted == 0 {
            return Err(CatalogError::NotFound(isbn));
        }
        Ok(())
    }

    pub fn list_books(
        &self,
        filter: LendingFilter,
        scroll: &Scroll,
    ) -> Result<Vec<Book>, CatalogError> {
        self.books.find_all(filter, scroll)
    }

    /// 최근 일주일 안에 추가된 도서 목록을 가져온다.
    pub fn new_books(&self, now: chrono::NaiveDateTime) -> Result<Vec<Book>, CatalogError> {
        let since = now - chrono::Duration::days(NEW_BOOK_WINDOW_DAYS);
        self.books.find_added_after(since)
    }
}

fn to_book(isbn: i64, metadata: BookMetadata, image: String) -> Result<Book, CatalogError> {
    Book::builder()
        .id(isbn)
        .title(metadata.title)
        .description(metadata.description.unwrap_or_default())
        .image(image)
        .author(metadata.authors.join(", "))
        .publish(metadata.published.unwrap_or_default())
        .build()
}

fn is_valid_isbn(isbn: i64) -> bool {
    isbn > 0 && ISBN_DIGITS.contains(&isbn.to_string().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::api::ClientError;
    use std::cell::RefCell;

    struct FakeBooks {
        saved: RefCell<Vec<Book>>,
    }

    impl FakeBooks {
        fn new() -> Self {
            Self { saved: RefCell::new(Vec::new()) }
        }
    }

    impl BookRepository for FakeBooks {
        fn find_by_id(&self, id: i64) -> Result<Option<Book>, CatalogError> {
            Ok(self.saved.borrow().iter().find(|b| b.id() == id).cloned())
        }

        fn get_or_create(&self, book: &Book) -> Result<Book, CatalogError> {
            if let Some(exists) = self.find_by_id(book.id())? {
                return Ok(exists);
            }
            self.saved.borrow_mut().push(book.clone());
            Ok(book.clone())
        }

        fn delete(&self, id: i64) -> Result<usize, CatalogError> {
            let before = self.saved.borrow().len();
            self.saved.borrow_mut().retain(|b| b.id() != id);
            Ok(before - self.saved.borrow().len())
        }

        fn find_all(&self, _: LendingFilter, _: &Scroll) -> Result<Vec<Book>, CatalogError> {
            Ok(self.saved.borrow().clone())
        }

        fn find_added_after(&self, _: chrono::NaiveDateTime) -> Result<Vec<Book>, CatalogError> {
            Ok(self.saved.borrow().clone())
        }
    }

    enum FakeLookup {
        Found(BookMetadata),
        Missing,
        Broken,
    }

    impl LookupClient for FakeLookup {
        fn find_by_isbn(&self, _: i64) -> Result<Option<BookMetadata>, ClientError> {
            match self {
                FakeLookup::Found(metadata) => Ok(Some(BookMetadata {
                    title: metadata.title.clone(),
                    description: metadata.description.clone(),
                    cover_url: metadata.cover_url.clone(),
                    authors: metadata.authors.clone(),
                    published: metadata.published.clone(),
                })),
                FakeLookup::Missing => Ok(None),
                FakeLookup::Broken => Err(ClientError::Unavailable("connect timeout".to_owned())),
            }
        }
    }

    fn service(lookup: FakeLookup) -> CatalogService<FakeBooks, FakeLookup> {
        CatalogService::new(FakeBooks::new(), lookup, CoverStore::disabled())
    }

    fn metadata() -> BookMetadata {
        BookMetadata {
            title: "클린 코드".to_owned(),
            description: Some("설명".to_owned()),
            cover_url: None,
            authors: vec!["Robert C. Martin".to_owned()],
            published: Some("2008".to_owned()),
        }
    }

    #[test]
    fn lending_filter_from_str() {
        assert_eq!(LendingFilter::try_from("ALL").unwrap(), LendingFilter::All);
        assert_eq!(LendingFilter::try_from("taken").unwrap(), LendingFilter::OnLoan);
        assert_eq!(
            LendingFilter::try_from("not-taken").unwrap(),
            LendingFilter::Available
        );
        assert!(LendingFilter::try_from("??").is_err());
    }

    #[test]
    fn add_book_by_isbn_rejects_malformed_isbn() {
        let service = service(FakeLookup::Missing);

        assert_eq!(
            service.add_book_by_isbn(-1),
            Err(CatalogError::InvalidIsbn(-1))
        );
        assert_eq!(
            service.add_book_by_isbn(12345),
            Err(CatalogError::InvalidIsbn(12345))
        );
    }

    #[test]
    fn add_book_by_isbn_rejects_lookup_miss() {
        let service = service(FakeLookup::Missing);

        assert_eq!(
            service.add_book_by_isbn(9780132350884),
            Err(CatalogError::LookupNotFound(9780132350884))
        );
    }

    #[test]
    fn add_book_by_isbn_propagates_lookup_failure() {
        let service = service(FakeLookup::Broken);

        assert!(matches!(
            service.add_book_by_isbn(9780132350884),
            Err(CatalogError::LookupUnavailable(_))
        ));
    }

    #[test]
    fn add_book_by_isbn_is_idempotent() {
        let service = service(FakeLookup::Found(metadata()));

        let first = service.add_book_by_isbn(9780132350884).unwrap();
        let second = service.add_book_by_isbn(9780132350884).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.title(), "클린 코드");
        assert_eq!(first.image(), CoverStore::PLACEHOLDER);
    }
}
