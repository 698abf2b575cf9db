use crate::{
    auth::{
        hash_password, verify_password, AuthResponse, AuthenticatedUser, LoginRequest,
        SessionAuthority, SignupRequest,
    },
    error::AppError,
    store::{NewUser, UserStore},
};
use actix_web::{post, web, HttpResponse, Responder};
use log::info;
use serde_json::json;
use validator::Validate;

/// Register a new user
///
/// Creates the account and opens its first session.
///
/// ## Responses:
/// - `201 Created`: `AuthResponse` with a fresh token.
/// - `400 Bad Request`: Email already registered, or a required field is missing.
/// - `422 Unprocessable Entity`: Field validation failed.
#[post("/signup")]
pub async fn signup(
    authority: web::Data<SessionAuthority>,
    signup_data: web::Json<SignupRequest>,
) -> Result<impl Responder, AppError> {
    signup_data.validate()?;
    let signup_data = signup_data.into_inner();

    if authority
        .users()
        .find_by_email(&signup_data.email)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest("User already exists".into()));
    }

    let password_hash = hash_password(&signup_data.password)?;
    let user = authority
        .users()
        .create(NewUser {
            first_name: signup_data.first_name,
            last_name: signup_data.last_name,
            email: signup_data.email,
            password_hash,
        })
        .await?;
    info!("Registered user {}", user.id);

    let token = authority.issue_session(&user).await?;
    Ok(HttpResponse::Created().json(AuthResponse::new(token, &user)))
}

/// Login user
///
/// Verifies the credentials and opens a new session. Every earlier session of
/// the user is revoked, so previously issued tokens stop working.
#[post("/login")]
pub async fn login(
    authority: web::Data<SessionAuthority>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let user = authority
        .users()
        .find_by_email(&login_data.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    if !verify_password(&login_data.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = authority.issue_session(&user).await?;
    Ok(HttpResponse::Ok().json(AuthResponse::new(token, &user)))
}

/// Logout user
///
/// Revokes every active session of the caller.
#[post("/logout")]
pub async fn logout(
    authority: web::Data<SessionAuthority>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    authority.sign_out(&user.0).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Sign out successful."
    })))
}
