use crate::catalog::repo::BookEntity;
use crate::ledger::{LedgerError, Loan, LoanDetail, LoanRepository};
use crate::schema::{book, loan};
use crate::{DbPool, Scroll};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;

/// 회원당 열린 대출 1건을 보장하는 부분 유니크 인덱스 이름
const OPEN_MEMBER_CONSTRAINT: &'static str = "loan_open_member_key";
/// 도서당 열린 대출 1건을 보장하는 부분 유니크 인덱스 이름
const OPEN_BOOK_CONSTRAINT: &'static str = "loan_open_book_key";
/// 대출 도서의 FK 제약 이름
const BOOK_FK_CONSTRAINT: &'static str = "loan_book_id_fkey";

#[derive(Queryable, Selectable)]
#[diesel(table_name = loan)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LoanEntity {
    pub id: i64,
    pub member_id: i64,
    pub book_id: i64,
    pub acquired_at: chrono::NaiveDateTime,
    pub returned_at: Option<chrono::NaiveDateTime>,
    pub rating: Option<i16>,
}

impl LoanEntity {
    fn to_domain(&self) -> Result<Loan, LedgerError> {
        let mut builder = Loan::builder()
            .id(self.id)
            .member_id(self.member_id)
            .book_id(self.book_id)
            .acquired_at(self.acquired_at);

        if let Some(returned_at) = self.returned_at {
            builder = builder.returned_at(returned_at);
        }
        if let Some(rating) = self.rating {
            builder = builder.rating(rating);
        }

        builder.build()
    }
}

#[derive(Insertable)]
#[diesel(table_name = loan)]
pub struct NewLoan {
    pub member_id: i64,
    pub book_id: i64,
    pub acquired_at: chrono::NaiveDateTime,
}

/// 트랜잭션 안에서 발생한 실패 구분
/// 사전 조건 검사에서 걸린 도메인 에러와 diesel 에러를 나누어 전달한다.
enum TakeFailure {
    Conflict(LedgerError),
    Db(diesel::result::Error),
}

impl From<diesel::result::Error> for TakeFailure {
    fn from(e: diesel::result::Error) -> Self {
        TakeFailure::Db(e)
    }
}

pub struct LoanPgStore {
    pool: DbPool,
}

impl LoanPgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl LoanRepository for LoanPgStore {
    fn take(&self, target_member_id: i64, target_book_id: i64) -> Result<Loan, LedgerError> {
        let mut connection = self.pool.get()
            .map_err(|e| LedgerError::ConnectError(e.to_string()))?;

        // 존재 확인과 INSERT를 한 트랜잭션으로 묶는다. 같은 회원이나 같은 도서를 노리는
        // 동시 호출이 확인을 같이 통과 하더라도 부분 유니크 인덱스에 걸려 한 쪽만 커밋 된다.
        let result = connection.transaction::<LoanEntity, TakeFailure, _>(|conn| {
            let member_open: i64 = loan::table
                .filter(loan::member_id.eq(target_member_id).and(loan::returned_at.is_null()))
                .count()
                .get_result(conn)?;
            if member_open > 0 {
                return Err(TakeFailure::Conflict(LedgerError::MemberAlreadyHolding(
                    target_member_id,
                )));
            }

            let book_open: i64 = loan::table
                .filter(loan::book_id.eq(target_book_id).and(loan::returned_at.is_null()))
                .count()
                .get_result(conn)?;
            if book_open > 0 {
                return Err(TakeFailure::Conflict(LedgerError::BookAlreadyTaken(
                    target_book_id,
                )));
            }

            let entity = diesel::insert_into(loan::table)
                .values(NewLoan {
                    member_id: target_member_id,
                    book_id: target_book_id,
                    acquired_at: chrono::Utc::now().naive_utc(),
                })
                .returning(LoanEntity::as_select())
                .get_result::<LoanEntity>(conn)?;

            Ok(entity)
        });

        match result {
            Ok(entity) => entity.to_domain(),
            Err(TakeFailure::Conflict(e)) => Err(e),
            Err(TakeFailure::Db(e)) => Err(map_take_error(target_member_id, target_book_id, e)),
        }
    }

    fn close(&self, target_loan_id: i64, target_rating: i16) -> Result<usize, LedgerError> {
        use crate::schema::loan::dsl::*;

        let mut connection = self.pool.get()
            .map_err(|e| LedgerError::ConnectError(e.to_string()))?;

        // 반납 시각이 비어 있는 행만 조건으로 걸어 한 문장으로 반납을 기록한다.
        // 먼저 반납된 경우 0건이 수정 되며 호출자가 실패로 처리한다.
        let closed = diesel::update(loan.filter(id.eq(target_loan_id).and(returned_at.is_null())))
            .set((
                returned_at.eq(chrono::Utc::now().naive_utc()),
                rating.eq(target_rating),
            ))
            .execute(&mut connection)
            .map_err(|e| LedgerError::SqlExecuteError(e.to_string()))?;

        Ok(closed)
    }

    fn find_open_by_member(&self, target_member_id: i64) -> Result<Option<Loan>, LedgerError> {
        use crate::schema::loan::dsl::*;

        let mut connection = self.pool.get()
            .map_err(|e| LedgerError::ConnectError(e.to_string()))?;
        let entity = loan
            .filter(member_id.eq(target_member_id).and(returned_at.is_null()))
            .select(LoanEntity::as_select())
            .first::<LoanEntity>(&mut connection)
            .optional()
            .map_err(|e| LedgerError::SqlExecuteError(e.to_string()))?;

        entity.map(|e| e.to_domain()).transpose()
    }

    fn find_open_by_book(&self, target_book_id: i64) -> Result<Option<Loan>, LedgerError> {
        use crate::schema::loan::dsl::*;

        let mut connection = self.pool.get()
            .map_err(|e| LedgerError::ConnectError(e.to_string()))?;
        let entity = loan
            .filter(book_id.eq(target_book_id).and(returned_at.is_null()))
            .select(LoanEntity::as_select())
            .first::<LoanEntity>(&mut connection)
            .optional()
            .map_err(|e| LedgerError::SqlExecuteError(e.to_string()))?;

        entity.map(|e| e.to_domain()).transpose()
    }

    fn find_open_detail_by_member(
        &self,
        target_member_id: i64,
    ) -> Result<Option<LoanDetail>, LedgerError> {
        let mut connection = self.pool.get()
            .map_err(|e| LedgerError::ConnectError(e.to_string()))?;
        let row = loan::table
            .inner_join(book::table)
            .filter(loan::member_id.eq(target_member_id).and(loan::returned_at.is_null()))
            .select((LoanEntity::as_select(), BookEntity::as_select()))
            .first::<(LoanEntity, BookEntity)>(&mut connection)
            .optional()
            .map_err(|e| LedgerError::SqlExecuteError(e.to_string()))?;

        row.map(|(loan_entity, book_entity)| to_detail(&loan_entity, &book_entity))
            .transpose()
    }

    fn find_history_by_member(
        &self,
        target_member_id: i64,
        scroll: &Scroll,
    ) -> Result<Vec<LoanDetail>, LedgerError> {
        let mut connection = self.pool.get()
            .map_err(|e| LedgerError::ConnectError(e.to_string()))?;
        let rows = loan::table
            .inner_join(book::table)
            .filter(loan::member_id.eq(target_member_id).and(loan::returned_at.is_not_null()))
            .order_by(loan::id.asc())
            .limit(scroll.limit())
            .offset(scroll.offset())
            .select((LoanEntity::as_select(), BookEntity::as_select()))
            .load::<(LoanEntity, BookEntity)>(&mut connection)
            .map_err(|e| LedgerError::SqlExecuteError(e.to_string()))?;

        rows.iter()
            .map(|(loan_entity, book_entity)| to_detail(loan_entity, book_entity))
            .collect()
    }
}

fn to_detail(loan_entity: &LoanEntity, book_entity: &BookEntity) -> Result<LoanDetail, LedgerError> {
    let book = book_entity.to_domain()
        .map_err(|e| LedgerError::SqlExecuteError(e.to_string()))?;

    Ok(LoanDetail::new(loan_entity.to_domain()?, book))
}

/// 트랜잭션 커밋 과정에서 발생한 diesel 에러를 도메인 에러로 변환한다.
///
/// 부분 유니크 인덱스 위반은 어느 인덱스에 걸렸는지에 따라 회원 충돌과 도서 충돌을
/// 구분 하고, 도서 FK 위반은 카탈로그에 없는 도서로 취급한다.
fn map_take_error(member_id: i64, book_id: i64, e: diesel::result::Error) -> LedgerError {
    match e {
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            match info.constraint_name() {
                Some(OPEN_MEMBER_CONSTRAINT) => LedgerError::MemberAlreadyHolding(member_id),
                Some(OPEN_BOOK_CONSTRAINT) => LedgerError::BookAlreadyTaken(book_id),
                _ => LedgerError::SqlExecuteError(info.message().to_owned()),
            }
        }
        diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            match info.constraint_name() {
                Some(BOOK_FK_CONSTRAINT) => LedgerError::BookUnknown(book_id),
                _ => LedgerError::SqlExecuteError(info.message().to_owned()),
            }
        }
        e => LedgerError::SqlExecuteError(e.to_string()),
    }
}
