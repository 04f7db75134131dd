pub mod repo;

use crate::catalog::{Book, BookRepository};
use crate::Scroll;
use std::fmt;
use std::fmt::{Display, Formatter};
use tracing::info;

/// 평점의 최소값
pub const MIN_RATING: i16 = 1;
/// 평점의 최대값
pub const MAX_RATING: i16 = 5;

/// Ledger 모듈에서 사용할 에러 열거
///
/// 대출 충돌은 요청한 회원이 원인인 경우([`LedgerError::MemberAlreadyHolding`])와
/// 다른 회원이 원인인 경우([`LedgerError::BookAlreadyTaken`])를 구분해 반환한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// 필수 데이터가 입력 되지 않음
    RequireArgumentMissing(String),

    /// 카탈로그에 등록 되지 않은 도서
    BookUnknown(i64),

    /// 회원이 이미 다른 도서를 대출 중
    MemberAlreadyHolding(i64),

    /// 도서가 이미 다른 회원에게 대출 됨
    BookAlreadyTaken(i64),

    /// 반납할 열린 대출이 없음
    NoOpenLoan(i64),

    /// 열린 대출의 도서가 요청한 도서와 다름
    LoanMismatch { requested: i64, holding: i64 },

    /// 평점이 허용 범위를 벗어남
    InvalidRating(i16),

    ConnectError(String),

    SqlExecuteError(String),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::RequireArgumentMissing(s) => write!(f, "Missing required argument: {}", s),
            LedgerError::BookUnknown(isbn) => write!(f, "Unknown book: {}", isbn),
            LedgerError::MemberAlreadyHolding(id) => {
                write!(f, "Member {} already holds a book", id)
            }
            LedgerError::BookAlreadyTaken(isbn) => {
                write!(f, "Book {} is already taken by someone", isbn)
            }
            LedgerError::NoOpenLoan(id) => write!(f, "No open loan to return for member {}", id),
            LedgerError::LoanMismatch { requested, holding } => {
                write!(f, "Open loan is for book {}, not {}", holding, requested)
            }
            LedgerError::InvalidRating(rating) => write!(f, "Invalid rating: {}", rating),
            LedgerError::ConnectError(s) => write!(f, "Connect error: {}", s),
            LedgerError::SqlExecuteError(s) => write!(f, "Sql execute error: {}", s),
        }
    }
}

impl std::error::Error for LedgerError {}

/// 대출 기록
///
/// 반납 시각이 비어 있으면 열린(대출 중) 상태이며, 반납 시각과 평점은 반납 시점에 한번만 기록 된다.
/// 닫힌 기록은 다시 열리지 않고 재대출 시 새로운 행이 추가 된다.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Loan {
    id: i64,
    member_id: i64,
    book_id: i64,
    acquired_at: Option<chrono::NaiveDateTime>,
    returned_at: Option<chrono::NaiveDateTime>,
    rating: Option<i16>,
}

impl Loan {
    pub fn builder() -> LoanBuilder {
        LoanBuilder::new()
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn member_id(&self) -> i64 {
        self.member_id
    }

    pub fn book_id(&self) -> i64 {
        self.book_id
    }

    pub fn acquired_at(&self) -> Option<chrono::NaiveDateTime> {
        self.acquired_at
    }

    pub fn returned_at(&self) -> Option<chrono::NaiveDateTime> {
        self.returned_at
    }

    pub fn rating(&self) -> Option<i16> {
        self.rating
    }

    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }
}

impl AsRef<Loan> for Loan {
    fn as_ref(&self) -> &Loan {
        self
    }
}

/// Loan 빌더
#[derive(Debug, Clone, Default)]
pub struct LoanBuilder {
    id: Option<i64>,
    member_id: Option<i64>,
    book_id: Option<i64>,
    acquired_at: Option<chrono::NaiveDateTime>,
    returned_at: Option<chrono::NaiveDateTime>,
    rating: Option<i16>,
}

impl LoanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn member_id(mut self, member_id: i64) -> Self {
        self.member_id = Some(member_id);
        self
    }

    pub fn book_id(mut self, book_id: i64) -> Self {
        self.book_id = Some(book_id);
        self
    }

    pub fn acquired_at(mut self, acquired_at: chrono::NaiveDateTime) -> Self {
        self.acquired_at = Some(acquired_at);
        self
    }

    pub fn returned_at(mut self, returned_at: chrono::NaiveDateTime) -> Self {
        self.returned_at = Some(returned_at);
        self
    }

    pub fn rating(mut self, rating: i16) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn build(self) -> Result<Loan, LedgerError> {
        let member_id = self.member_id
            .ok_or(LedgerError::RequireArgumentMissing("member_id".to_owned()))?;
        let book_id = self.book_id
            .ok_or(LedgerError::RequireArgumentMissing("book_id".to_owned()))?;

        Ok(Loan {
            id: self.id.unwrap_or(0),
            member_id,
            book_id,
            acquired_at: self.acquired_at,
            returned_at: self.returned_at,
            rating: self.rating,
        })
    }
}

/// 대출 기록과 대출된 도서 정보
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LoanDetail {
    loan: Loan,
    book: Book,
}

impl LoanDetail {
    pub fn new(loan: Loan, book: Book) -> Self {
        Self { loan, book }
    }

    pub fn loan(&self) -> &Loan {
        &self.loan
    }

    pub fn book(&self) -> &Book {
        &self.book
    }
}

/// 대출 장부 저장소
///
/// `take`와 `close`는 동시에 호출 되어도 열린 대출의 유일성(회원당 1건, 도서당 1건)이
/// 깨지지 않도록 구현 되어야 한다.
pub trait LoanRepository {
    /// 대출 기록을 추가한다.
    ///
    /// 존재 확인과 INSERT는 다른 `take` 호출에 대해 원자적으로 실행 되어야 하며,
    /// 경쟁에서 진 호출은 충돌 에러를 받아야 한다.
    fn take(&self, member_id: i64, book_id: i64) -> Result<Loan, LedgerError>;

    /// 전달 받은 대출 기록이 아직 열려 있을 경우에만 반납 시각과 평점을 기록한다.
    /// 조건에 맞는 행이 없을 경우(이미 반납 됨) 0을 반환한다.
    fn close(&self, loan_id: i64, rating: i16) -> Result<usize, LedgerError>;

    /// 회원의 열린 대출을 찾는다.
    fn find_open_by_member(&self, member_id: i64) -> Result<Option<Loan>, LedgerError>;

    /// 도서의 열린 대출을 찾는다.
    fn find_open_by_book(&self, book_id: i64) -> Result<Option<Loan>, LedgerError>;

    /// 회원의 열린 대출을 도서 정보와 함께 찾는다.
    fn find_open_detail_by_member(&self, member_id: i64) -> Result<Option<LoanDetail>, LedgerError>;

    /// 회원의 닫힌 대출 기록을 도서 정보와 함께 추가된 순서로 가져온다.
    fn find_history_by_member(
        &self,
        member_id: i64,
        scroll: &Scroll,
    ) -> Result<Vec<LoanDetail>, LedgerError>;
}

/// 대출 서비스
///
/// 대출/반납의 사전 조건 검사와 에러 구분을 담당 하며, 남은 경쟁 조건은
/// 저장소 계층의 트랜잭션과 유니크 제약으로 닫는다.
pub struct LendingService<L, B>
where
    L: LoanRepository,
    B: BookRepository,
{
    loans: L,
    books: B,
}

impl<L, B> LendingService<L, B>
where
    L: LoanRepository,
    B: BookRepository,
{
    pub fn new(loans: L, books: B) -> Self {
        Self { loans, books }
    }

    /// 회원이 도서를 대출한다.
    ///
    /// 사전 조건은 아래 순서로 검사 되며 각각 다른 에러로 거절 된다.
    /// 1. 카탈로그에 등록된 도서인가 => [`LedgerError::BookUnknown`]
    /// 2. 회원이 대출 중인 도서가 없는가 => [`LedgerError::MemberAlreadyHolding`]
    /// 3. 도서가 다른 회원에게 대출 되어 있지 않은가 => [`LedgerError::BookAlreadyTaken`]
    pub fn take(&self, member_id: i64, book_id: i64) -> Result<Loan, LedgerError> {
        self.books.find_by_id(book_id)
            .map_err(|e| LedgerError::SqlExecuteError(e.to_string()))?
            .ok_or(LedgerError::BookUnknown(book_id))?;

        if self.loans.find_open_by_member(member_id)?.is_some() {
            return Err(LedgerError::MemberAlreadyHolding(member_id));
        }
        if self.loans.find_open_by_book(book_id)?.is_some() {
            return Err(LedgerError::BookAlreadyTaken(book_id));
        }

        let loan = self.loans.take(member_id, book_id)?;
        info!("대출이 기록 되었습니다. (회원: {}, ISBN: {})", member_id, book_id);

        Ok(loan)
    }

    /// 회원이 대출 중인 도서를 반납 하고 평점을 기록한다.
    pub fn return_current(&self, member_id: i64, rating: i16) -> Result<(), LedgerError> {
        validate_rating(rating)?;

        let open = self.loans.find_open_by_member(member_id)?
            .ok_or(LedgerError::NoOpenLoan(member_id))?;

        self.close_open_loan(member_id, &open, rating)
    }

    /// 도서를 지정해 반납한다. 회원이 대출 중인 도서가 지정한 도서와 다를 경우
    /// [`LedgerError::LoanMismatch`]로 거절 된다.
    pub fn return_book(&self, member_id: i64, book_id: i64, rating: i16) -> Result<(), LedgerError> {
        validate_rating(rating)?;

        let open = self.loans.find_open_by_member(member_id)?
            .ok_or(LedgerError::NoOpenLoan(member_id))?;
        if open.book_id() != book_id {
            return Err(LedgerError::LoanMismatch {
                requested: book_id,
                holding: open.book_id(),
            });
        }

        self.close_open_loan(member_id, &open, rating)
    }

    fn close_open_loan(&self, member_id: i64, open: &Loan, rating: i16) -> Result<(), LedgerError> {
        let closed = self.loans.close(open.id(), rating)?;
        // 조회와 반납 사이에 다른 호출이 먼저 반납 했을 경우 0건이 수정 된다.
        if closed == 0 {
            return Err(LedgerError::NoOpenLoan(member_id));
        }
        info!("반납이 기록 되었습니다. (회원: {}, ISBN: {})", member_id, open.book_id());

        Ok(())
    }

    /// 회원이 대출 중인 도서를 도서 정보와 함께 가져온다.
    pub fn current_loan(&self, member_id: i64) -> Result<Option<LoanDetail>, LedgerError> {
        self.loans.find_open_detail_by_member(member_id)
    }

    /// 회원의 반납 완료된 대출 기록을 가져온다.
    pub fn history(&self, member_id: i64, scroll: &Scroll) -> Result<Vec<LoanDetail>, LedgerError> {
        self.loans.find_history_by_member(member_id, scroll)
    }
}

fn validate_rating(rating: i16) -> Result<(), LedgerError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(LedgerError::InvalidRating(rating));
    }
    Ok(())
}
