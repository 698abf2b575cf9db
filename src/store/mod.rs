//! Persistence seams for the session authority.
//!
//! The authority depends only on the two traits below. `postgres` backs them with
//! sqlx; `memory` keeps everything in-process for tests and local runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// One logical login. Revocation is terminal.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i32,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A fresh, active session for `user_id`.
    pub fn new(user_id: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            revoked: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the session revoked. Returns `false` if it already was, in which
    /// case nothing changed and the record need not be saved again.
    pub fn revoke(&mut self) -> bool {
        if self.revoked {
            return false;
        }
        self.revoked = true;
        self.updated_at = Utc::now();
        true
    }
}

/// A stored account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts the session, or updates `revoked`/`updated_at` if its id exists.
    async fn save(&self, session: Session) -> Result<Session, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Session>, AppError>;

    /// Every session of `owner_id` whose `revoked` flag is still false.
    async fn find_active_by_owner(&self, owner_id: i32) -> Result<Vec<Session>, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AppError>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// The user owning session `session_id`, if both still exist.
    async fn find_by_session(&self, session_id: Uuid) -> Result<Option<User>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revoke_is_one_way() {
        let mut session = Session::new(7);
        assert!(!session.revoked);

        assert!(session.revoke());
        assert!(session.revoked);
        let revoked_at = session.updated_at;

        assert!(!session.revoke());
        assert!(session.revoked);
        assert_eq!(session.updated_at, revoked_at);
    }
}
