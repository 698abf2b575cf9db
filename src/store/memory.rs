use async_trait::async_trait;
use chrono::Utc;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewUser, Session, SessionStore, User, UserStore};
use crate::error::AppError;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sessions: HashMap<Uuid, Session>,
    next_user_id: i32,
}

/// In-process implementation of both stores.
///
/// Enforces the same constraints as the SQL schema: unique email ignoring case,
/// and at most one non-revoked session per user.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All sessions of `owner_id`, revoked or not. Test and diagnostics helper.
    pub async fn sessions_of(&self, owner_id: i32) -> Vec<Session> {
        let tables = self.tables.read().await;
        tables
            .sessions
            .values()
            .filter(|s| s.user_id == owner_id)
            .cloned()
            .collect()
    }

    /// Drops a user and, like `ON DELETE CASCADE`, their sessions.
    pub async fn delete_user(&self, user_id: i32) {
        let mut tables = self.tables.write().await;
        tables.users.retain(|u| u.id != user_id);
        tables.sessions.retain(|_, s| s.user_id != user_id);
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save(&self, session: Session) -> Result<Session, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == session.user_id) {
            return Err(AppError::DatabaseError(format!(
                "session {} references missing user {}",
                session.id, session.user_id
            )));
        }
        let reactivates = tables
            .sessions
            .get(&session.id)
            .is_some_and(|existing| existing.revoked);
        if !session.revoked
            && !reactivates
            && tables
                .sessions
                .values()
                .any(|s| s.user_id == session.user_id && !s.revoked && s.id != session.id)
        {
            return Err(AppError::DatabaseError(format!(
                "user {} already has an active session",
                session.user_id
            )));
        }

        let stored = match tables.sessions.entry(session.id) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                // Revocation is terminal.
                existing.revoked |= session.revoked;
                existing.updated_at = session.updated_at;
                existing.clone()
            }
            Entry::Vacant(entry) => entry.insert(session).clone(),
        };
        Ok(stored)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Session>, AppError> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn find_active_by_owner(&self, owner_id: i32) -> Result<Vec<Session>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .filter(|s| s.user_id == owner_id && !s.revoked)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        let lowered = user.email.to_lowercase();
        if tables.users.iter().any(|u| u.email.to_lowercase() == lowered) {
            return Err(AppError::BadRequest("User already exists".into()));
        }

        tables.next_user_id += 1;
        let created = User {
            id: tables.next_user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let lowered = email.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.to_lowercase() == lowered)
            .cloned())
    }

    async fn find_by_session(&self, session_id: Uuid) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        let owner = match tables.sessions.get(&session_id) {
            Some(session) => session.user_id,
            None => return Ok(None),
        };
        Ok(tables.users.iter().find(|u| u.id == owner).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            email: email.into(),
            password_hash: "hash".into(),
        }
    }

    #[actix_rt::test]
    async fn test_email_is_unique_ignoring_case() {
        let store = MemoryStore::new();
        store.create(new_user("grace@example.com")).await.unwrap();

        let duplicate = store.create(new_user("GRACE@example.com")).await;
        assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

        let found = store.find_by_email("Grace@Example.com").await.unwrap();
        assert_eq!(found.map(|u| u.email), Some("grace@example.com".to_string()));
    }

    #[actix_rt::test]
    async fn test_second_active_session_is_refused() {
        let store = MemoryStore::new();
        let user = store.create(new_user("grace@example.com")).await.unwrap();

        let first = SessionStore::save(&store, Session::new(user.id)).await.unwrap();
        let second = SessionStore::save(&store, Session::new(user.id)).await;
        assert!(matches!(second, Err(AppError::DatabaseError(_))));

        let mut revoked = first.clone();
        revoked.revoke();
        SessionStore::save(&store, revoked).await.unwrap();
        SessionStore::save(&store, Session::new(user.id)).await.unwrap();

        let active = store.find_active_by_owner(user.id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_ne!(active[0].id, first.id);
    }

    #[actix_rt::test]
    async fn test_revoked_session_stays_revoked() {
        let store = MemoryStore::new();
        let user = store.create(new_user("grace@example.com")).await.unwrap();

        let mut session = SessionStore::save(&store, Session::new(user.id)).await.unwrap();
        session.revoke();
        SessionStore::save(&store, session.clone()).await.unwrap();

        session.revoked = false;
        let stored = SessionStore::save(&store, session.clone()).await.unwrap();
        assert!(stored.revoked);
        assert!(store.find_active_by_owner(user.id).await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_find_by_session_resolves_owner() {
        let store = MemoryStore::new();
        let user = store.create(new_user("grace@example.com")).await.unwrap();
        let session = SessionStore::save(&store, Session::new(user.id)).await.unwrap();

        let owner = store.find_by_session(session.id).await.unwrap();
        assert_eq!(owner.map(|u| u.id), Some(user.id));
        assert!(store.find_by_session(Uuid::new_v4()).await.unwrap().is_none());

        store.delete_user(user.id).await;
        assert!(SessionStore::find_by_id(&store, session.id).await.unwrap().is_none());
    }
}
