use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::auth::outcome::{AuthFailure, Identity, UNVERIFIABLE_TOKEN_MESSAGE};
use crate::auth::token::{DisplayName, TokenCodec, TokenError};
use crate::error::AppError;
use crate::store::{Session, SessionStore, User, UserStore};

/// Per-owner async locks so that revoke-all and create for one user never
/// interleave with another issue or sign-out for the same user on this process.
#[derive(Default)]
struct OwnerLocks {
    locks: StdMutex<HashMap<i32, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    fn table(&self) -> MutexGuard<'_, HashMap<i32, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn acquire(&self, owner_id: i32) -> OwnerGuard<'_> {
        let mut held = OwnerGuard {
            owner_id,
            owner_locks: self,
            guard: None,
        };
        let lock = Arc::clone(self.table().entry(owner_id).or_default());
        held.guard = Some(lock.lock_owned().await);
        held
    }
}

/// Holds an owner's lock; dropping it, including when the surrounding future is
/// cancelled, forgets the lock once nobody else holds or waits on it.
struct OwnerGuard<'a> {
    owner_id: i32,
    owner_locks: &'a OwnerLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.owner_locks.table();
        if locks
            .get(&self.owner_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.owner_id);
        }
    }
}

/// Issues sessions, validates tokens against them, and revokes them.
///
/// A token is only ever as good as the session it names: the codec proves who
/// minted it, the session store proves it has not been revoked since.
pub struct SessionAuthority {
    codec: TokenCodec,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    owner_locks: OwnerLocks,
}

impl SessionAuthority {
    pub fn new(codec: TokenCodec, sessions: Arc<dyn SessionStore>, users: Arc<dyn UserStore>) -> Self {
        Self {
            codec,
            sessions,
            users,
            owner_locks: OwnerLocks::default(),
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// The credential store, for login and signup handlers.
    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    /// Revokes every active session of `user`, opens a new one and returns a
    /// token bound to it.
    pub async fn issue_session(&self, user: &User) -> Result<String, AppError> {
        let _owner = self.owner_locks.acquire(user.id).await;
        self.issue_session_locked(user).await
    }

    async fn issue_session_locked(&self, user: &User) -> Result<String, AppError> {
        let revoked = self.revoke_all(user.id).await?;
        let session = self.sessions.save(Session::new(user.id)).await?;

        let name = DisplayName {
            first_name: &user.first_name,
            last_name: &user.last_name,
        };
        match self.codec.encode(&user.email, session.id, name) {
            Ok(token) => {
                info!(
                    "Issued session {} for user {} (revoked {} earlier)",
                    session.id, user.id, revoked
                );
                Ok(token)
            }
            Err(e) => {
                // Never leave a live session behind that no token refers to.
                let mut orphan = session;
                orphan.revoke();
                if let Err(revoke_err) = self.sessions.save(orphan).await {
                    error!("Failed to revoke orphaned session: {}", revoke_err);
                }
                Err(e.into())
            }
        }
    }

    /// Validates `token` against the codec and the session store.
    ///
    /// Never fails with anything but an `AuthFailure`; store and codec errors are
    /// logged here and folded into the fixed outcome set.
    pub async fn validate_token(&self, token: &str) -> Result<Identity, AuthFailure> {
        self.validate_token_at(token, Utc::now()).await
    }

    pub async fn validate_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Identity, AuthFailure> {
        let claims = self.codec.decode_at(token, now).map_err(|e| match e {
            TokenError::Expired => AuthFailure::Expired,
            TokenError::Malformed(detail) => {
                debug!("Rejected malformed token: {}", detail);
                AuthFailure::invalid()
            }
            other => {
                debug!("Rejected token: {}", other);
                AuthFailure::Invalid(UNVERIFIABLE_TOKEN_MESSAGE)
            }
        })?;

        let session_id =
            Uuid::parse_str(&claims.session).map_err(|_| AuthFailure::InvalidSession)?;

        let session = self
            .sessions
            .find_by_id(session_id)
            .await
            .map_err(store_failure)?
            .ok_or(AuthFailure::InvalidSession)?;

        let user = self
            .users
            .find_by_session(session_id)
            .await
            .map_err(store_failure)?
            .ok_or_else(|| {
                warn!("Session {} has no owning user", session_id);
                AuthFailure::UserNotFound
            })?;

        let owner_matches = user.email.to_lowercase() == claims.sub.to_lowercase();
        let issuer_matches = claims.iss == self.codec.issuer();
        if owner_matches && issuer_matches && !session.revoked {
            Ok(Identity {
                user_id: user.id,
                email: claims.sub,
                session_id,
            })
        } else {
            debug!(
                "Token for session {} rejected (owner_matches={}, issuer_matches={}, revoked={})",
                session_id, owner_matches, issuer_matches, session.revoked
            );
            Err(AuthFailure::invalid())
        }
    }

    /// Revokes every active session of the caller.
    pub async fn sign_out(&self, identity: &Identity) -> Result<(), AppError> {
        if identity.email.trim().is_empty() {
            return Err(AuthFailure::InvalidSession.into());
        }
        let user = self
            .users
            .find_by_email(&identity.email)
            .await?
            .ok_or(AuthFailure::UserNotFound)?;

        let revoked = {
            let _owner = self.owner_locks.acquire(user.id).await;
            self.revoke_all(user.id).await?
        };
        info!("Signed out user {} ({} session(s) revoked)", user.id, revoked);
        Ok(())
    }

    /// Revokes all active sessions of `owner_id`, saving only those whose flag
    /// actually flips. Returns how many were revoked.
    async fn revoke_all(&self, owner_id: i32) -> Result<usize, AppError> {
        let active = self.sessions.find_active_by_owner(owner_id).await?;
        let mut revoked = 0;
        for mut session in active {
            if session.revoke() {
                self.sessions.save(session).await?;
                revoked += 1;
            }
        }
        if revoked > 1 {
            warn!("User {} had {} active sessions", owner_id, revoked);
        }
        Ok(revoked)
    }
}

fn store_failure(error: AppError) -> AuthFailure {
    error!("Session lookup failed during token validation: {}", error);
    AuthFailure::Invalid(UNVERIFIABLE_TOKEN_MESSAGE)
}
