pub mod api;
pub mod database;
pub mod log;
pub mod token;

use crate::config::api::{Lookup, Notify};
use crate::config::database::Database;
use crate::config::token::Token;
use crate::DbPool;
use diesel::r2d2::ConnectionManager;
use diesel::PgConnection;
use r2d2::Pool;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    db: Database,
    token: Token,
    lookup: Lookup,
    notify: Notify,
    logger: log::Config,
}

impl AppConfig {
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    pub fn notify(&self) -> &Notify {
        &self.notify
    }

    pub fn logger(&self) -> &log::Config {
        &self.logger
    }
}

/// 실행 환경에 따라 .env 파일을 로드한다.
pub fn load_dotenv() {
    let env_filename = env::var("RUN_MODE")
        .map(|env| format!(".env.{}", env))
        .unwrap_or_else(|_| ".env".into());

    dotenvy::from_filename(env_filename).ok();
}

/// 실행 환경에 맞는 설정 파일을 읽어 프로세스 시작 시 한번만 만들어지는 설정 값을 돌려준다.
pub fn load_config() -> Result<AppConfig, config::ConfigError> {
    let env = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
    let config = config::Config::builder()
        .add_source(config::File::with_name(&format!("config/{}.json", env)))
        .build()?;

    config.try_deserialize()
}

/// 데이터베이스 연결 풀을 생성한다.
pub fn connect_to_database(db: &Database) -> DbPool {
    let database_url = format!(
        "postgres://{}:{}@{}:{}/{}",
        db.username(),
        db.password(),
        db.host(),
        db.port(),
        db.dbname()
    );
    let manager = ConnectionManager::<PgConnection>::new(database_url);

    Pool::builder()
        .test_on_check_out(true)
        .build(manager)
        .expect("Could not build connection pool")
}
