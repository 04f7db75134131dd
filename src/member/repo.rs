use crate::member::{Member, MemberError, MemberRepository, MemberUpdate, Role};
use crate::schema::member;
use crate::DbPool;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;

#[derive(Queryable, Selectable)]
#[diesel(table_name = member)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MemberEntity {
    pub id: i64,
    pub name: String,
    pub position: String,
    pub about: String,
    pub role: String,
    pub registered_at: chrono::NaiveDateTime,
}

impl MemberEntity {
    fn to_domain(&self) -> Result<Member, MemberError> {
        Member::builder()
            .id(self.id)
            .name(self.name.clone())
            .position(self.position.clone())
            .about(self.about.clone())
            .role(Role::try_from(self.role.as_str())?)
            .registered_at(self.registered_at)
            .build()
    }
}

#[derive(Insertable)]
#[diesel(table_name = member)]
pub struct NewMember<'a> {
    pub id: i64,
    pub name: &'a str,
    pub position: &'a str,
    pub about: &'a str,
    pub role: &'a str,
    pub registered_at: chrono::NaiveDateTime,
}

impl<'a, 'b> NewMember<'a>
where
    'b: 'a,
{
    pub fn from(member: &'b Member) -> Self {
        Self {
            id: member.id(),
            name: member.name(),
            position: member.position(),
            about: member.about(),
            role: member.role().as_str(),
            registered_at: chrono::Utc::now().naive_utc(),
        }
    }
}

#[derive(AsChangeset)]
#[diesel(table_name = member)]
pub struct MemberForm<'a> {
    pub name: Option<&'a str>,
    pub position: Option<&'a str>,
    pub about: Option<&'a str>,
}

impl<'a, 'b> MemberForm<'a>
where
    'b: 'a,
{
    pub fn from(form: &'b MemberUpdate) -> Self {
        Self {
            name: form.name.as_deref(),
            position: form.position.as_deref(),
            about: form.about.as_deref(),
        }
    }
}

pub struct MemberPgStore {
    pool: DbPool,
}

impl MemberPgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl MemberRepository for MemberPgStore {
    fn create(&self, target: &Member) -> Result<Member, MemberError> {
        let mut connection = self.pool.get()
            .map_err(|e| MemberError::ConnectError(e.to_string()))?;

        let saved = diesel::insert_into(member::table)
            .values(NewMember::from(target))
            .returning(MemberEntity::as_select())
            .get_result::<MemberEntity>(&mut connection)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    MemberError::AlreadyRegistered(target.id())
                }
                e => MemberError::SqlExecuteError(e.to_string()),
            })?;

        saved.to_domain()
    }

    fn find_by_id(&self, target_id: i64) -> Result<Option<Member>, MemberError> {
        use crate::schema::member::dsl::*;

        let mut connection = self.pool.get()
            .map_err(|e| MemberError::ConnectError(e.to_string()))?;
        let entity = member
            .find(target_id)
            .select(MemberEntity::as_select())
            .first::<MemberEntity>(&mut connection)
            .optional()
            .map_err(|e| MemberError::SqlExecuteError(e.to_string()))?;

        entity.map(|e| e.to_domain()).transpose()
    }

    fn update(&self, target_id: i64, form: &MemberUpdate) -> Result<Member, MemberError> {
        // 변경할 필드가 하나도 없을 경우 UPDATE 문을 만들 수 없어 조회로 대신한다.
        if form.is_empty() {
            return self.find_by_id(target_id)?
                .ok_or(MemberError::NotFound(target_id));
        }

        let mut connection = self.pool.get()
            .map_err(|e| MemberError::ConnectError(e.to_string()))?;
        let updated = diesel::update(member::table.find(target_id))
            .set(MemberForm::from(form))
            .returning(MemberEntity::as_select())
            .get_result::<MemberEntity>(&mut connection)
            .optional()
            .map_err(|e| MemberError::SqlExecuteError(e.to_string()))?;

        updated
            .ok_or(MemberError::NotFound(target_id))?
            .to_domain()
    }

    fn find_all(&self) -> Result<Vec<Member>, MemberError> {
        use crate::schema::member::dsl::*;

        let mut connection = self.pool.get()
            .map_err(|e| MemberError::ConnectError(e.to_string()))?;
        let result_set = member
            .order_by(id.asc())
            .select(MemberEntity::as_select())
            .load::<MemberEntity>(&mut connection)
            .map_err(|e| MemberError::SqlExecuteError(e.to_string()))?;

        result_set.iter().map(|e| e.to_domain()).collect()
    }
}
