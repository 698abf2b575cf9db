use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{NewUser, Session, SessionStore, User, UserStore};
use crate::error::AppError;

const SESSION_COLUMNS: &str = "id, user_id, revoked, created_at, updated_at";
const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, created_at";

/// PostgreSQL implementation of both stores over a shared pool.
///
/// Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl SessionStore for PgStore {
    async fn save(&self, session: Session) -> Result<Session, AppError> {
        let sql = format!(
            "INSERT INTO sessions ({cols}) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET revoked = sessions.revoked OR EXCLUDED.revoked, updated_at = EXCLUDED.updated_at \
             RETURNING {cols}",
            cols = SESSION_COLUMNS
        );
        let saved = sqlx::query_as::<_, Session>(&sql)
            .bind(session.id)
            .bind(session.user_id)
            .bind(session.revoked)
            .bind(session.created_at)
            .bind(session.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(saved)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Session>, AppError> {
        let sql = format!("SELECT {} FROM sessions WHERE id = $1", SESSION_COLUMNS);
        let session = sqlx::query_as::<_, Session>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn find_active_by_owner(&self, owner_id: i32) -> Result<Vec<Session>, AppError> {
        let sql = format!(
            "SELECT {} FROM sessions WHERE user_id = $1 AND revoked = FALSE ORDER BY created_at",
            SESSION_COLUMNS
        );
        let sessions = sqlx::query_as::<_, Session>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(sessions)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (first_name, last_name, email, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::BadRequest("User already exists".into())
                } else {
                    e.into()
                }
            })
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_session(&self, session_id: Uuid) -> Result<Option<User>, AppError> {
        let sql = "SELECT u.id, u.first_name, u.last_name, u.email, u.password_hash, u.created_at \
                   FROM users u JOIN sessions s ON s.user_id = u.id WHERE s.id = $1";
        let user = sqlx::query_as::<_, User>(sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}
