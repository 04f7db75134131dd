pub mod repo;

use std::fmt;
use std::fmt::{Display, Formatter};

/// Member 모듈에서 사용할 에러 열거
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberError {
    /// 필수 데이터가 입력 되지 않음
    RequireArgumentMissing(String),

    /// 알 수 없는 역할 코드
    UnknownRole(String),

    /// 이미 등록된 회원
    AlreadyRegistered(i64),

    /// 회원을 찾을 수 없음
    NotFound(i64),

    ConnectError(String),

    SqlExecuteError(String),
}

impl Display for MemberError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MemberError::RequireArgumentMissing(s) => write!(f, "Missing required argument: {}", s),
            MemberError::UnknownRole(s) => write!(f, "Unknown role: {}", s),
            MemberError::AlreadyRegistered(id) => write!(f, "Member already registered: {}", id),
            MemberError::NotFound(id) => write!(f, "Member not found: {}", id),
            MemberError::ConnectError(s) => write!(f, "Connect error: {}", s),
            MemberError::SqlExecuteError(s) => write!(f, "Sql execute error: {}", s),
        }
    }
}

impl std::error::Error for MemberError {}

/// 회원의 역할로 토큰 발급 시 부여되는 스코프가 결정 된다.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// 역할에 따라 부여할 스코프 리스트를 반환한다.
    /// 관리자는 일반 회원의 스코프를 포함한다.
    pub fn granted_scopes(&self) -> Vec<String> {
        match self {
            Role::User => vec![crate::auth::SCOPE_USER.to_owned()],
            Role::Admin => vec![
                crate::auth::SCOPE_ADMIN.to_owned(),
                crate::auth::SCOPE_USER.to_owned(),
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = MemberError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(MemberError::UnknownRole(value.to_owned())),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 회원
/// 아이디는 외부 계정 시스템의 식별자를 그대로 사용하며 서버에서 생성하지 않는다.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Member {
    id: i64,
    name: String,
    position: String,
    about: String,
    role: Role,
    registered_at: Option<chrono::NaiveDateTime>,
}

impl Member {
    pub fn builder() -> MemberBuilder {
        MemberBuilder::new()
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> &str {
        &self.position
    }

    pub fn about(&self) -> &str {
        &self.about
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn registered_at(&self) -> Option<chrono::NaiveDateTime> {
        self.registered_at
    }
}

impl AsRef<Member> for Member {
    fn as_ref(&self) -> &Member {
        self
    }
}

/// Member 빌더
#[derive(Debug, Clone)]
pub struct MemberBuilder {
    id: Option<i64>,
    name: Option<String>,
    position: Option<String>,
    about: Option<String>,
    role: Role,
    registered_at: Option<chrono::NaiveDateTime>,
}

impl MemberBuilder {
    pub fn new() -> Self {
        Self {
            id: None,
            name: None,
            position: None,
            about: None,
            role: Role::User,
            registered_at: None,
        }
    }

    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn position(mut self, position: String) -> Self {
        self.position = Some(position);
        self
    }

    pub fn about(mut self, about: String) -> Self {
        self.about = Some(about);
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn registered_at(mut self, registered_at: chrono::NaiveDateTime) -> Self {
        self.registered_at = Some(registered_at);
        self
    }

    pub fn build(self) -> Result<Member, MemberError> {
        let id = self.id.ok_or(MemberError::RequireArgumentMissing("id".to_owned()))?;
        let name = self.name.ok_or(MemberError::RequireArgumentMissing("name".to_owned()))?;

        Ok(Member {
            id,
            name,
            position: self.position.unwrap_or_default(),
            about: self.about.unwrap_or_default(),
            role: self.role,
            registered_at: self.registered_at,
        })
    }
}

/// 회원 정보 수정 폼
/// 일반 수정 경로에서는 역할을 바꿀 수 없도록 역할 필드를 가지고 있지 않다.
#[derive(Debug, Clone, Default)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub position: Option<String>,
    pub about: Option<String>,
}

impl MemberUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.position.is_none() && self.about.is_none()
    }
}

/// 회원 저장소
pub trait MemberRepository {
    /// 전달 받은 회원을 저장소에 등록한다. 이미 등록된 아이디일 경우 에러를 반환한다.
    fn create(&self, member: &Member) -> Result<Member, MemberError>;

    /// 전달 받은 아이디로 회원을 찾는다. 없을 경우 [`None`]을 반환하며 에러로 취급하지 않는다.
    fn find_by_id(&self, id: i64) -> Result<Option<Member>, MemberError>;

    /// 역할을 제외한 회원 정보를 수정한다.
    fn update(&self, id: i64, form: &MemberUpdate) -> Result<Member, MemberError>;

    /// 모든 회원을 가져온다.
    fn find_all(&self) -> Result<Vec<Member>, MemberError>;
}
