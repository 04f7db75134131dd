use book_lending_rust::auth::{SCOPE_ADMIN, SCOPE_USER};
use book_lending_rust::batch::error::{JobReadFailed, JobRuntimeError};
use book_lending_rust::batch::{job_builder, JobParameter};
use book_lending_rust::catalog::LendingFilter;
use book_lending_rust::config;
use book_lending_rust::member::{Member, MemberError, MemberRepository, MemberUpdate};
use book_lending_rust::member::repo::MemberPgStore;
use book_lending_rust::{
    create_access_guard, create_broadcast_job_attr, create_catalog_service,
    create_lending_service, create_token_service, DbPool, Scroll,
};
use clap::{Parser, Subcommand};
use tracing::{error, info};

#[derive(Parser)]
#[command(about = "사내 도서 대출 관리 도구")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 최근 일주일 안에 추가된 도서를 전체 회원에게 알린다.
    Broadcast,

    /// 외부 검색 API의 메타데이터로 도서를 등록한다.
    AddBook {
        isbn: i64,
    },

    /// 대출 상태 필터로 도서 목록을 조회한다.
    ListBooks {
        #[arg(long, default_value = "all")]
        filter: String,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },

    /// 새 회원을 등록한다.
    RegisterMember {
        id: i64,
        name: String,
        #[arg(long, default_value = "")]
        position: String,
        #[arg(long, default_value = "")]
        about: String,
    },

    /// 회원의 역할 외 정보를 수정한다. 관리자 토큰이 필요하다.
    UpdateMember {
        token: String,
        member_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        about: Option<String>,
    },

    /// 토큰의 회원이 도서를 대출한다.
    TakeBook {
        token: String,
        isbn: i64,
    },

    /// 토큰의 회원이 대출 중인 도서를 반납 하고 평점을 남긴다.
    ReturnBook {
        token: String,
        rating: i16,
        /// 지정할 경우 대출 중인 도서와 일치 해야 한다.
        #[arg(long)]
        isbn: Option<i64>,
    },

    /// 도서를 삭제한다. 관리자 토큰이 필요하다.
    DeleteBook {
        token: String,
        isbn: i64,
    },

    /// 회원의 역할에 맞는 접근 토큰을 발급한다.
    IssueToken {
        member_id: i64,
    },

    /// 토큰을 검증 하고 요구한 스코프를 만족 하는지 확인한다.
    CheckToken {
        token: String,
        #[arg(long)]
        scope: Vec<String>,
    },
}

fn main() {
    config::load_dotenv();
    let config = config::load_config()
        .unwrap_or_else(|_| panic!("Cannot loading config"));
    config::log::set_global_logging_config(config.logger());

    let pool = config::connect_to_database(config.db());
    let cli = Cli::parse();

    if let Err(e) = run(&cli.command, pool, &config) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(
    command: &Commands,
    pool: DbPool,
    config: &config::AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Broadcast => {
            let (reader, writer) = create_broadcast_job_attr(pool, config.notify());
            let job = job_builder()
                .reader(Box::new(reader))
                .writer(Box::new(writer))
                .build();

            match job.run(&JobParameter::new()) {
                Ok(_) => {}
                // 알릴 도서가 없는 주는 실패가 아니다.
                Err(JobRuntimeError::ReadFailed(JobReadFailed::EmptyData(message))) => {
                    info!("{}", message);
                }
                Err(e) => return Err(format!("{:?}", e).into()),
            }
        }
        Commands::AddBook { isbn } => {
            let service = create_catalog_service(pool, config.lookup());
            let book = service.add_book_by_isbn(*isbn)?;
            println!("{:?}", book);
        }
        Commands::ListBooks { filter, limit, offset } => {
            let service = create_catalog_service(pool, config.lookup());
            let filter = LendingFilter::try_from(filter.as_str())?;
            let books = service.list_books(filter, &Scroll::new(*limit, *offset))?;
            for book in books {
                println!("{:?}", book);
            }
        }
        Commands::RegisterMember { id, name, position, about } => {
            let member = Member::builder()
                .id(*id)
                .name(name.clone())
                .position(position.clone())
                .about(about.clone())
                .build()?;
            let saved = MemberPgStore::new(pool).create(&member)?;
            println!("{:?}", saved);
        }
        Commands::UpdateMember { token, member_id, name, position, about } => {
            let guard = create_access_guard(pool.clone(), config.token());
            guard.authorize(
                Some(token.as_str()),
                &[SCOPE_ADMIN],
                chrono::Utc::now().naive_utc(),
            )?;

            let form = MemberUpdate {
                name: name.clone(),
                position: position.clone(),
                about: about.clone(),
            };
            let updated = MemberPgStore::new(pool).update(*member_id, &form)?;
            println!("{:?}", updated);
        }
        Commands::TakeBook { token, isbn } => {
            let guard = create_access_guard(pool.clone(), config.token());
            let member = guard.authorize(
                Some(token.as_str()),
                &[SCOPE_USER],
                chrono::Utc::now().naive_utc(),
            )?;

            let loan = create_lending_service(pool).take(member.id(), *isbn)?;
            println!("{:?}", loan);
        }
        Commands::ReturnBook { token, rating, isbn } => {
            let guard = create_access_guard(pool.clone(), config.token());
            let member = guard.authorize(
                Some(token.as_str()),
                &[SCOPE_USER],
                chrono::Utc::now().naive_utc(),
            )?;

            let service = create_lending_service(pool);
            match isbn {
                Some(isbn) => service.return_book(member.id(), *isbn, *rating)?,
                None => service.return_current(member.id(), *rating)?,
            }
        }
        Commands::DeleteBook { token, isbn } => {
            let guard = create_access_guard(pool.clone(), config.token());
            guard.authorize(
                Some(token.as_str()),
                &[SCOPE_ADMIN],
                chrono::Utc::now().naive_utc(),
            )?;

            create_catalog_service(pool, config.lookup()).delete_book(*isbn)?;
        }
        Commands::IssueToken { member_id } => {
            let store = MemberPgStore::new(pool);
            let member = store.find_by_id(*member_id)?
                .ok_or(MemberError::NotFound(*member_id))?;
            let token = create_token_service(config.token())
                .issue_for(&member, chrono::Utc::now().naive_utc())?;
            println!("{}", token);
        }
        Commands::CheckToken { token, scope } => {
            let guard = create_access_guard(pool, config.token());
            let scopes = scope.iter().map(String::as_str).collect::<Vec<_>>();
            let member = guard.authorize(
                Some(token.as_str()),
                &scopes,
                chrono::Utc::now().naive_utc(),
            )?;
            println!("{:?}", member);
        }
    }

    Ok(())
}
