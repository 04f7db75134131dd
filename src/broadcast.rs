use crate::batch::error::{JobReadFailed, JobWriteFailed};
use crate::batch::{JobParameter, Reader, Writer};
use crate::catalog::{Book, BookRepository, NEW_BOOK_WINDOW_DAYS};
use crate::member::MemberRepository;
use crate::provider::notify::{NotifyClient, NotifyError};
use std::time::Duration;
use tracing::{error, info};

/// 회원 한 명에게 전달할 메시지
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Outbound {
    chat_id: i64,
    text: String,
}

impl Outbound {
    pub fn new(chat_id: i64, text: String) -> Self {
        Self { chat_id, text }
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// 최근 일주일 안에 추가된 도서 목록으로 회원별 발송 메시지를 만드는 리더
///
/// 추가된 도서가 한 권도 없을 경우 [`JobReadFailed::EmptyData`]로 잡을 중단 시켜
/// 빈 알림이 발송 되지 않도록 한다.
pub struct NewBookReader<B, M>
where
    B: BookRepository,
    M: MemberRepository,
{
    books: B,
    members: M,
}

impl<B, M> NewBookReader<B, M>
where
    B: BookRepository,
    M: MemberRepository,
{
    pub fn new(books: B, members: M) -> Self {
        Self { books, members }
    }
}

impl<B, M> Reader for NewBookReader<B, M>
where
    B: BookRepository,
    M: MemberRepository,
{
    type Item = Outbound;

    fn do_read(&self, _: &JobParameter) -> Result<Vec<Outbound>, JobReadFailed> {
        let since = chrono::Utc::now().naive_utc() - chrono::Duration::days(NEW_BOOK_WINDOW_DAYS);
        let books = self.books.find_added_after(since)
            .map_err(|e| JobReadFailed::UnknownError(e.to_string()))?;
        if books.is_empty() {
            return Err(JobReadFailed::EmptyData("최근 일주일 안에 추가된 도서가 없습니다.".to_owned()));
        }

        let digest = compose_digest(&books);
        let members = self.members.find_all()
            .map_err(|e| JobReadFailed::UnknownError(e.to_string()))?;

        Ok(members.into_iter()
            .map(|member| Outbound::new(member.id(), digest.clone()))
            .collect())
    }
}

/// 새로 추가된 도서 목록을 한 개의 메시지 본문으로 만든다.
pub fn compose_digest(books: &[Book]) -> String {
    let mut digest = String::from("📚 새로 추가된 도서 목록입니다.");
    for book in books {
        digest.push_str(&format!("\n- {} (ISBN: {})", book.title(), book.id()));
    }
    digest
}

/// 만들어진 메시지를 회원들에게 전송하는 라이터
///
/// 전송은 최선 노력으로 처리 되어 실패한 수신자는 로그만 남기고 건너뛴다.
/// 전송 한도 초과 신호를 받으면 채널이 알려준 시간 만큼 기다렸다가 딱 한번만 다시 보낸다.
pub struct NotifyWriter<C>
where
    C: NotifyClient,
{
    client: C,
    /// 수신자 사이의 전송 간격
    pause: Duration,
}

impl<C> NotifyWriter<C>
where
    C: NotifyClient,
{
    pub fn new(client: C, pause: Duration) -> Self {
        Self { client, pause }
    }

    fn deliver(&self, outbound: &Outbound) -> bool {
        match self.client.send_message(outbound.chat_id(), outbound.text()) {
            Ok(_) => true,
            Err(NotifyError::RateLimited { chat_id, retry_after }) => {
                error!("Target [ID:{}]: 전송 한도 초과. {}초 대기 후 재시도 합니다.", chat_id, retry_after);
                std::thread::sleep(Duration::from_secs(retry_after));
                self.client.send_message(outbound.chat_id(), outbound.text())
                    .map_err(|e| error!("{}", e))
                    .is_ok()
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }
}

impl<C> Writer for NotifyWriter<C>
where
    C: NotifyClient,
{
    type Item = Outbound;

    fn do_write(&self, items: Vec<Outbound>) -> Result<(), JobWriteFailed<Outbound>> {
        let mut sent = 0;
        let total = items.len();

        for outbound in &items {
            if self.deliver(outbound) {
                sent += 1;
            }
            std::thread::sleep(self.pause);
        }
        info!("알림 전송을 마쳤습니다. (성공: {} / {})", sent, total);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogError, LendingFilter};
    use crate::member::{Member, MemberError, MemberUpdate, Role};
    use crate::Scroll;
    use std::cell::RefCell;

    fn book(id: i64, title: &str) -> Book {
        Book::builder().id(id).title(title.to_owned()).build().unwrap()
    }

    struct FakeBooks {
        books: Vec<Book>,
    }

    impl BookRepository for FakeBooks {
        fn find_by_id(&self, id: i64) -> Result<Option<Book>, CatalogError> {
            Ok(self.books.iter().find(|b| b.id() == id).cloned())
        }

        fn get_or_create(&self, book: &Book) -> Result<Book, CatalogError> {
            Ok(book.clone())
        }

        fn delete(&self, _: i64) -> Result<usize, CatalogError> {
            Ok(0)
        }

        fn find_all(&self, _: LendingFilter, _: &Scroll) -> Result<Vec<Book>, CatalogError> {
            Ok(self.books.clone())
        }

        fn find_added_after(&self, _: chrono::NaiveDateTime) -> Result<Vec<Book>, CatalogError> {
            Ok(self.books.clone())
        }
    }

    struct FakeMembers {
        members: Vec<Member>,
    }

    impl MemberRepository for FakeMembers {
        fn create(&self, member: &Member) -> Result<Member, MemberError> {
            Ok(member.clone())
        }

        fn find_by_id(&self, id: i64) -> Result<Option<Member>, MemberError> {
            Ok(self.members.iter().find(|m| m.id() == id).cloned())
        }

        fn update(&self, id: i64, _: &MemberUpdate) -> Result<Member, MemberError> {
            self.find_by_id(id)?.ok_or(MemberError::NotFound(id))
        }

        fn find_all(&self) -> Result<Vec<Member>, MemberError> {
            Ok(self.members.clone())
        }
    }

    /// 매 호출마다 정해진 결과를 순서대로 돌려주는 클라이언트
    struct ScriptedClient {
        script: RefCell<Vec<Result<(), NotifyError>>>,
        calls: RefCell<usize>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<(), NotifyError>>) -> Self {
            Self {
                script: RefCell::new(script),
                calls: RefCell::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl NotifyClient for &ScriptedClient {
        fn send_message(&self, _: i64, _: &str) -> Result<(), NotifyError> {
            *self.calls.borrow_mut() += 1;
            self.script.borrow_mut().remove(0)
        }
    }

    fn member(id: i64) -> Member {
        Member::builder()
            .id(id)
            .name(format!("회원{}", id))
            .role(Role::User)
            .build()
            .unwrap()
    }

    #[test]
    fn compose_digest_lists_all_books() {
        let digest = compose_digest(&[book(9780132350884, "Clean Code"), book(9780134757599, "Refactoring")]);

        assert!(digest.starts_with("📚"));
        assert!(digest.contains("- Clean Code (ISBN: 9780132350884)"));
        assert!(digest.contains("- Refactoring (ISBN: 9780134757599)"));
    }

    #[test]
    fn reader_rejects_empty_week() {
        let reader = NewBookReader::new(
            FakeBooks { books: vec![] },
            FakeMembers { members: vec![member(1)] },
        );

        assert!(matches!(
            reader.do_read(&JobParameter::new()),
            Err(JobReadFailed::EmptyData(_))
        ));
    }

    #[test]
    fn reader_builds_one_message_per_member() {
        let reader = NewBookReader::new(
            FakeBooks { books: vec![book(9780132350884, "Clean Code")] },
            FakeMembers { members: vec![member(1), member(2)] },
        );

        let outbound = reader.do_read(&JobParameter::new()).unwrap();
        assert_eq!(outbound.len(), 2);
        assert_eq!(outbound[0].chat_id(), 1);
        assert_eq!(outbound[0].text(), outbound[1].text());
    }

    #[test]
    fn writer_retries_rate_limited_delivery_once() {
        let client = ScriptedClient::new(vec![
            Err(NotifyError::RateLimited { chat_id: 1, retry_after: 0 }),
            Ok(()),
        ]);
        let writer = NotifyWriter::new(&client, Duration::from_millis(0));

        writer.do_write(vec![Outbound::new(1, "안내".to_owned())]).unwrap();
        assert_eq!(client.calls(), 2);
    }

    #[test]
    fn writer_gives_up_after_single_retry() {
        let client = ScriptedClient::new(vec![
            Err(NotifyError::RateLimited { chat_id: 1, retry_after: 0 }),
            Err(NotifyError::RateLimited { chat_id: 1, retry_after: 0 }),
        ]);
        let writer = NotifyWriter::new(&client, Duration::from_millis(0));

        writer.do_write(vec![Outbound::new(1, "안내".to_owned())]).unwrap();
        // 두번째 실패는 더 이상 재시도 하지 않는다.
        assert_eq!(client.calls(), 2);
    }

    #[test]
    fn writer_skips_forbidden_target() {
        let client = ScriptedClient::new(vec![
            Err(NotifyError::Forbidden(1)),
            Ok(()),
        ]);
        let writer = NotifyWriter::new(&client, Duration::from_millis(0));

        writer.do_write(vec![
            Outbound::new(1, "안내".to_owned()),
            Outbound::new(2, "안내".to_owned()),
        ]).unwrap();
        assert_eq!(client.calls(), 2);
    }
}
