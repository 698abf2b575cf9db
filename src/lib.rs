#![doc = "The `authforge` library crate."]
#![doc = ""]
#![doc = "Session and token authority: issues signed access tokens bound to server-side"]
#![doc = "session records, validates them on every request through `auth::RequestGate`,"]
#![doc = "and revokes sessions on logout or re-login. The binary (`main.rs`) wires these"]
#![doc = "pieces into an actix-web server backed by PostgreSQL."]

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod store;

pub use crate::auth::{AuthFailure, Identity, RequestGate, SessionAuthority, TokenCodec};
pub use crate::error::AppError;
