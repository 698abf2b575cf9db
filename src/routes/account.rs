use crate::{
    auth::{AuthenticatedUser, SessionAuthority},
    error::AppError,
    store::UserStore,
};
use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

/// Profile of the authenticated caller.
///
/// ## Responses:
/// - `200 OK`: `{user_id, email, first_name, last_name, created_at, session_id}`.
/// - `401 Unauthorized`: No valid bearer token.
/// - `404 Not Found`: The account was deleted after the token was validated.
#[get("")]
pub async fn get_account(
    authority: web::Data<SessionAuthority>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let identity = user.0;
    let account = authority
        .users()
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".into()))?;

    Ok(HttpResponse::Ok().json(json!({
        "user_id": account.id,
        "email": account.email,
        "first_name": account.first_name,
        "last_name": account.last_name,
        "created_at": account.created_at,
        "session_id": identity.session_id,
    })))
}
