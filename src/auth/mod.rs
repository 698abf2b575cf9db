pub mod authority;
pub mod extractors;
pub mod middleware;
pub mod outcome;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::store::User;

// Re-export necessary items
pub use authority::SessionAuthority;
pub use extractors::AuthenticatedUser;
pub use middleware::RequestGate;
pub use outcome::{AuthFailure, Identity};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenCodec, TokenError};

lazy_static! {
    // Names: letters (any script), spaces, apostrophes, hyphens and periods
    static ref NAME_REGEX: regex::Regex = regex::Regex::new(r"^[\p{L}][\p{L} '.-]*$").unwrap();
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// User's email address.
    #[validate(email)]
    pub email: String,
    /// User's password.
    /// Must be at least 6 characters long.
    #[validate(length(min = 6))]
    pub password: String,
}

/// Represents the payload for a new account.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(
        length(min = 1, max = 64),
        regex(path = "NAME_REGEX", message = "First name must contain only letters")
    )]
    pub first_name: String,
    #[validate(
        length(min = 1, max = 64),
        regex(path = "NAME_REGEX", message = "Last name must contain only letters")
    )]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    /// Must be at least 6 characters long.
    #[validate(length(min = 6))]
    pub password: String,
}

/// Response after successful authentication (login or signup).
/// Contains the access token and the profile it was issued for.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Signed access token bound to the new session.
    pub token: String,
    pub user_id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl AuthResponse {
    pub fn new(token: String, user: &User) -> Self {
        Self {
            token,
            user_id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}
