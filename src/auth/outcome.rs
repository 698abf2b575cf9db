use serde::Serialize;
use uuid::Uuid;

/// Message for a token whose `exp` has passed.
pub const EXPIRED_TOKEN_MESSAGE: &str = "Token is expired. Try login or request for another";
/// Message for a token that fails the signature, issuer, owner or revocation checks.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token. Please login to continue";
/// Message for codec or store failures that are not otherwise enumerated.
pub const UNVERIFIABLE_TOKEN_MESSAGE: &str =
    "Invalid token. Please verify your token or login again";
/// Message for an `Authorization` header the gate cannot even read.
pub const INCORRECT_TOKEN_MESSAGE: &str = "Incorrect token";
pub const INVALID_SESSION_MESSAGE: &str = "Invalid session. Please login";
pub const USER_NOT_FOUND_MESSAGE: &str = "User not found";

/// The principal resolved from a valid token.
///
/// Built per request by `SessionAuthority::validate_token` and carried in the
/// request extensions; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: i32,
    /// Subject email exactly as it appears in the token.
    pub email: String,
    pub session_id: Uuid,
}

/// Every way token validation or sign-out can fail.
///
/// `Ok(Identity)` from `validate_token` is the `Valid` outcome; this enum is the
/// rest of the closed set. Each variant maps once to a fixed client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    Expired,
    /// Carries which fixed message applies.
    Invalid(&'static str),
    InvalidSession,
    UserNotFound,
}

impl AuthFailure {
    /// Stable machine-readable kind, used as the `error` field of the response.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthFailure::Expired => "expired",
            AuthFailure::Invalid(_) => "invalid",
            AuthFailure::InvalidSession => "invalid_session",
            AuthFailure::UserNotFound => "user_not_found",
        }
    }

    pub fn message(&self) -> &'static str {
        match *self {
            AuthFailure::Expired => EXPIRED_TOKEN_MESSAGE,
            AuthFailure::Invalid(message) => message,
            AuthFailure::InvalidSession => INVALID_SESSION_MESSAGE,
            AuthFailure::UserNotFound => USER_NOT_FOUND_MESSAGE,
        }
    }

    pub fn invalid() -> Self {
        AuthFailure::Invalid(INVALID_TOKEN_MESSAGE)
    }
}
