use crate::catalog::{Book, BookRepository, CatalogError, LendingFilter};
use crate::schema::{book, loan};
use crate::{DbPool, Scroll};
use diesel::dsl::{exists, not};
use diesel::prelude::*;

#[derive(Queryable, Selectable)]
#[diesel(table_name = book)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookEntity {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image: String,
    pub author: String,
    pub publish: String,
    pub added_at: chrono::NaiveDateTime,
}

impl BookEntity {
    pub fn to_domain(&self) -> Result<Book, CatalogError> {
        Book::builder()
            .id(self.id)
            .title(self.title.clone())
            .description(self.description.clone())
            .image(self.image.clone())
            .author(self.author.clone())
            .publish(self.publish.clone())
            .added_at(self.added_at)
            .build()
    }
}

#[derive(Insertable)]
#[diesel(table_name = book)]
pub struct NewBook<'a> {
    pub id: i64,
    pub title: &'a str,
    pub description: &'a str,
    pub image: &'a str,
    pub author: &'a str,
    pub publish: &'a str,
    pub added_at: chrono::NaiveDateTime,
}

impl<'a, 'b> NewBook<'a>
where
    'b: 'a,
{
    pub fn from(book: &'b Book) -> Self {
        Self {
            id: book.id(),
            title: book.title(),
            description: book.description(),
            image: book.image(),
            author: book.author(),
            publish: book.publish(),
            added_at: chrono::Utc::now().naive_utc(),
        }
    }
}

pub struct BookPgStore {
    pool: DbPool,
}

impl BookPgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl BookRepository for BookPgStore {
    fn find_by_id(&self, target_id: i64) -> Result<Option<Book>, CatalogError> {
        use crate::schema::book::dsl::*;

        let mut connection = self.pool.get()
            .map_err(|e| CatalogError::ConnectError(e.to_string()))?;
        let entity = book
            .find(target_id)
            .select(BookEntity::as_select())
            .first::<BookEntity>(&mut connection)
            .optional()
            .map_err(|e| CatalogError::SqlExecuteError(e.to_string()))?;

        entity.map(|e| e.to_domain()).transpose()
    }

    fn get_or_create(&self, target: &Book) -> Result<Book, CatalogError> {
        let mut connection = self.pool.get()
            .map_err(|e| CatalogError::ConnectError(e.to_string()))?;

        // 같은 ISBN이 이미 저장 되어 있을 경우 아무것도 하지 않는다.
        diesel::insert_into(book::table)
            .values(NewBook::from(target))
            .on_conflict_do_nothing()
            .execute(&mut connection)
            .map_err(|e| CatalogError::SqlExecuteError(e.to_string()))?;

        self.find_by_id(target.id())?
            .ok_or(CatalogError::NotFound(target.id()))
    }

    fn delete(&self, target_id: i64) -> Result<usize, CatalogError> {
        use crate::schema::book::dsl::*;

        let mut connection = self.pool.get()
            .map_err(|e| CatalogError::ConnectError(e.to_string()))?;
        let deleted = diesel::delete(book.find(target_id))
            .execute(&mut connection)
            .map_err(|e| CatalogError::SqlExecuteError(e.to_string()))?;

        Ok(deleted)
    }

    fn find_all(&self, filter: LendingFilter, scroll: &Scroll) -> Result<Vec<Book>, CatalogError> {
        let mut connection = self.pool.get()
            .map_err(|e| CatalogError::ConnectError(e.to_string()))?;

        // 대출 여부는 저장된 플래그가 아니라 열린 대출의 존재 여부로 계산한다.
        let on_loan = exists(
            loan::table.filter(
                loan::book_id.eq(book::id).and(loan::returned_at.is_null()),
            ),
        );

        let result_set = match filter {
            LendingFilter::All => book::table
                .order_by(book::id.asc())
                .limit(scroll.limit())
                .offset(scroll.offset())
                .select(BookEntity::as_select())
                .load::<BookEntity>(&mut connection),
            LendingFilter::OnLoan => book::table
                .filter(on_loan)
                .order_by(book::id.asc())
                .limit(scroll.limit())
                .offset(scroll.offset())
                .select(BookEntity::as_select())
                .load::<BookEntity>(&mut connection),
            LendingFilter::Available => book::table
                .filter(not(on_loan))
                .order_by(book::id.asc())
                .limit(scroll.limit())
                .offset(scroll.offset())
                .select(BookEntity::as_select())
                .load::<BookEntity>(&mut connection),
        }
        .map_err(|e| CatalogError::SqlExecuteError(e.to_string()))?;

        result_set.iter().map(|e| e.to_domain()).collect()
    }

    fn find_added_after(&self, since: chrono::NaiveDateTime) -> Result<Vec<Book>, CatalogError> {
        use crate::schema::book::dsl::*;

        let mut connection = self.pool.get()
            .map_err(|e| CatalogError::ConnectError(e.to_string()))?;
        let result_set = book
            .filter(added_at.gt(since))
            .order_by(id.asc())
            .select(BookEntity::as_select())
            .load::<BookEntity>(&mut connection)
            .map_err(|e| CatalogError::SqlExecuteError(e.to_string()))?;

        result_set.iter().map(|e| e.to_domain()).collect()
    }
}
