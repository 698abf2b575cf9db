use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderValue},
    web, Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::{debug, error, warn};
use std::rc::Rc;

use crate::auth::authority::SessionAuthority;
use crate::auth::outcome::{AuthFailure, Identity, INCORRECT_TOKEN_MESSAGE};
use crate::error::AppError;

/// `"Bearer"` plus the separator; anything shorter is treated as no credential.
const BEARER_PREFIX_LEN: usize = 7;

/// Paths the gate never inspects, so a stale token cannot block logging in again.
///
/// Requests to these paths never carry an `Identity`, so no handler mounted on
/// them may take an `AuthenticatedUser`.
const PUBLIC_PATHS: [&str; 3] = ["/health", "/api/auth/login", "/api/auth/signup"];

#[derive(Debug, PartialEq, Eq)]
enum Credential {
    /// No usable `Authorization: Bearer` header; the request continues anonymously.
    Absent,
    Bearer(String),
    /// A header is present but cannot be read as text.
    Unreadable,
}

fn bearer_credential(value: Option<&HeaderValue>) -> Credential {
    let Some(value) = value else {
        return Credential::Absent;
    };
    let Ok(value) = value.to_str() else {
        return Credential::Unreadable;
    };
    if !value.starts_with("Bearer") || value.len() < BEARER_PREFIX_LEN {
        return Credential::Absent;
    }
    match value.get(BEARER_PREFIX_LEN..) {
        Some(token) => Credential::Bearer(token.to_string()),
        None => Credential::Unreadable,
    }
}

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| path == *public)
}

/// Per-request authentication hook.
///
/// Validates the bearer token through the `SessionAuthority` registered as app
/// data and attaches the resulting `Identity` to the request. Requests without
/// a bearer credential pass through; any failed validation is answered here with
/// a 401 and never reaches a handler.
pub struct RequestGate;

impl<S, B> Transform<S, ServiceRequest> for RequestGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RequestGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestGateService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestGateService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public(req.path()) {
            return self.pass(req);
        }

        let credential = bearer_credential(req.headers().get(header::AUTHORIZATION));
        let token = match credential {
            Credential::Absent => return self.pass(req),
            Credential::Unreadable => {
                warn!("Unreadable Authorization header on {}", req.path());
                let failure = AuthFailure::Invalid(INCORRECT_TOKEN_MESSAGE);
                return Box::pin(ready(Ok(reject(req, failure.into()))));
            }
            Credential::Bearer(token) => token,
        };

        let Some(authority) = req.app_data::<web::Data<SessionAuthority>>().cloned() else {
            error!("SessionAuthority is not registered as app data");
            let err = AppError::InternalServerError("Authentication is not configured".into());
            return Box::pin(ready(Ok(reject(req, err))));
        };

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            match authority.validate_token(&token).await {
                Ok(identity) => {
                    debug!("Authenticated user {} on {}", identity.user_id, req.path());
                    req.extensions_mut().insert(identity);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(failure) => {
                    warn!("Rejected token on {}: {}", req.path(), failure.kind());
                    Ok(reject(req, failure.into()))
                }
            }
        })
    }
}

impl<S, B> RequestGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    fn pass(&self, req: ServiceRequest) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, Error>> {
        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}

/// Ends the request with `err`'s response, dropping any identity set so far.
fn reject<B>(req: ServiceRequest, err: AppError) -> ServiceResponse<EitherBody<B>> {
    req.extensions_mut().remove::<Identity>();
    let (http_req, _payload) = req.into_parts();
    ServiceResponse::new(http_req, err.error_response().map_into_right_body())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(value: &str) -> HeaderValue {
        HeaderValue::from_str(value).unwrap()
    }

    #[test]
    fn test_bearer_credential_parsing() {
        assert_eq!(bearer_credential(None), Credential::Absent);
        assert_eq!(bearer_credential(Some(&header("Basic abc"))), Credential::Absent);
        assert_eq!(bearer_credential(Some(&header("Bearer"))), Credential::Absent);
        assert_eq!(
            bearer_credential(Some(&header("Bearer abc.def.ghi"))),
            Credential::Bearer("abc.def.ghi".into())
        );
        // Exactly the prefix: a credential is present but empty, and will fail validation.
        assert_eq!(
            bearer_credential(Some(&header("Bearer "))),
            Credential::Bearer(String::new())
        );
    }

    #[test]
    fn test_non_ascii_header_is_unreadable() {
        let value = HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap();
        assert_eq!(bearer_credential(Some(&value)), Credential::Unreadable);
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public("/health"));
        assert!(is_public("/api/auth/login"));
        assert!(is_public("/api/auth/signup"));
        assert!(!is_public("/api/auth/logout"));
        assert!(!is_public("/api/account"));
    }
}
