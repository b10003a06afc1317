//! Database primitives and the teacher roster provider.

use std::fmt;

use chrono::Utc;
use entity::teacher_assignments;
use platform_authz::{ActorId, AssignmentRecord, PermissionContext};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection,
    DatabaseTransaction, DbBackend, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, Statement,
    TransactionTrait,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing (env {0})")]
    MissingUrl(String),
    #[error("database error: {0}")]
    Query(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

/// Environment-driven connection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_url_key")]
    env_key: String,
}

fn default_url_key() -> String {
    "DATABASE_URL".to_string()
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            env_key: default_url_key(),
        }
    }
}

impl DatabaseSettings {
    pub fn new(env_key: impl Into<String>) -> Self {
        Self {
            env_key: env_key.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn database_url(&self) -> DbResult<String> {
        std::env::var(&self.env_key).map_err(|_| DbError::MissingUrl(self.env_key.clone()))
    }

    pub fn is_configured(&self) -> bool {
        self.database_url().is_ok()
    }
}

pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let url = settings.database_url()?;
    Ok(Database::connect(&url).await?)
}

/// Opens a transaction scoped to one school for row level security.
pub async fn with_tenant(pool: &DbPool, school_id: Uuid) -> DbResult<DatabaseTransaction> {
    let txn = pool.begin().await?;
    if txn.get_database_backend() == DbBackend::Postgres {
        txn.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT set_config('app.current_school', $1, true)",
            [school_id.to_string().into()],
        ))
        .await?;
    }
    Ok(txn)
}

/// Roster provider backed by `teacher_assignments`, scoped to one school.
#[derive(Clone, Debug)]
pub struct RosterStore {
    pool: DbPool,
    school_id: Uuid,
}

impl RosterStore {
    pub fn new(pool: DbPool, school_id: Uuid) -> Self {
        Self { pool, school_id }
    }

    pub fn school_id(&self) -> Uuid {
        self.school_id
    }

    #[instrument(name = "roster.load", skip(self), fields(school = %self.school_id))]
    pub async fn roster_for(&self, actor: &ActorId) -> DbResult<Vec<AssignmentRecord>> {
        let Ok(teacher_id) = Uuid::parse_str(actor.as_str()) else {
            debug!(%actor, "actor id is not a uuid; empty roster");
            return Ok(Vec::new());
        };
        let txn = with_tenant(&self.pool, self.school_id).await?;
        let rows = teacher_assignments::Entity::find()
            .filter(teacher_assignments::Column::SchoolId.eq(self.school_id))
            .filter(teacher_assignments::Column::TeacherId.eq(teacher_id))
            .order_by_asc(teacher_assignments::Column::CreatedAt)
            .all(&txn)
            .await?;
        txn.commit().await?;
        debug!(%actor, rows = rows.len(), "roster loaded");
        Ok(rows.into_iter().map(to_record).collect())
    }

    pub async fn assign(
        &self,
        teacher_id: Uuid,
        class_id: Uuid,
        subject_id: Option<Uuid>,
    ) -> DbResult<AssignmentRecord> {
        let txn = with_tenant(&self.pool, self.school_id).await?;
        let model = teacher_assignments::ActiveModel {
            id: Set(Uuid::new_v4()),
            school_id: Set(self.school_id),
            teacher_id: Set(teacher_id),
            class_id: Set(class_id),
            subject_id: Set(subject_id),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(to_record(model))
    }
}

/// Rewrites UUID-shaped actor, class and subject ids to the lowercase
/// hyphenated form roster records carry. Other ids are left untouched.
pub fn canonical_ids(mut context: PermissionContext) -> PermissionContext {
    context.actor_id = context.actor_id.map(canonical);
    context.class_id = context.class_id.map(canonical);
    context.subject_id = context.subject_id.map(canonical);
    context
}

fn canonical<T>(id: T) -> T
where
    T: fmt::Display + From<String>,
{
    match Uuid::parse_str(&id.to_string()) {
        Ok(uuid) => T::from(uuid.to_string()),
        Err(_) => id,
    }
}

fn to_record(model: teacher_assignments::Model) -> AssignmentRecord {
    AssignmentRecord::new(
        model.teacher_id.to_string(),
        model.class_id.to_string(),
        model.subject_id.map(|id| id.to_string().into()),
    )
}
