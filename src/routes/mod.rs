pub mod account;
pub mod auth;
pub mod health;

use actix_web::web;

/// Routes mounted under `/api`, behind `RequestGate`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::signup)
            .service(auth::login)
            .service(auth::logout),
    )
    .service(web::scope("/account").service(account::get_account));
}
