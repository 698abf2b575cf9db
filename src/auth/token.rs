use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD},
    Engine as _,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Issuer stamped into every token unless `JWT_ISSUER` overrides it.
pub const DEFAULT_ISSUER: &str = "authforge";

/// HMAC-SHA256 wants at least as many key bytes as its output.
const MIN_SECRET_BYTES: usize = 32;

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject of the token: the owner's email address.
    pub sub: String,
    /// Identifier of the server-side session this token is bound to.
    /// Kept as a string so a garbled value still decodes and can be
    /// rejected as an invalid session rather than a malformed token.
    pub session: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub iss: String,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiration, seconds since epoch.
    pub exp: i64,
}

/// The `alg` named in the token header, if the header can be read at all.
///
/// jsonwebtoken refuses to parse a header whose algorithm it does not know
/// (`none`, for one), which would otherwise surface as a JSON error.
fn header_algorithm(token: &str) -> Option<String> {
    let segment = token.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    let header: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    header.get("alg")?.as_str().map(str::to_owned)
}

/// Display-only fields carried in the token.
#[derive(Debug, Clone, Copy)]
pub struct DisplayName<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The configured key material cannot be used for signing.
    #[error("invalid signing key: {0}")]
    Signing(String),
    #[error("token has expired")]
    Expired,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("unsupported token: {0}")]
    Unsupported(String),
}

/// Signs and verifies access tokens.
///
/// Holds the process-wide key pair derived once from the configured secret; it
/// knows nothing about sessions or persistence.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    issuer: String,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Builds a codec from a base64-encoded secret.
    ///
    /// Returns `TokenError::Signing` if the secret is not valid base64 or decodes
    /// to fewer than 32 bytes.
    pub fn new(secret_base64: &str, ttl: Duration, issuer: impl Into<String>) -> Result<Self, TokenError> {
        let secret = BASE64
            .decode(secret_base64.trim())
            .map_err(|e| TokenError::Signing(format!("secret is not valid base64: {}", e)))?;
        if secret.len() < MIN_SECRET_BYTES {
            return Err(TokenError::Signing(format!(
                "secret must decode to at least {} bytes, got {}",
                MIN_SECRET_BYTES,
                secret.len()
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            ttl,
            issuer: issuer.into(),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Encodes a token for `subject_email` bound to `session_id`, valid from now
    /// for the configured TTL.
    pub fn encode(
        &self,
        subject_email: &str,
        session_id: Uuid,
        name: DisplayName<'_>,
    ) -> Result<String, TokenError> {
        self.encode_at(subject_email, session_id, name, Utc::now())
    }

    pub fn encode_at(
        &self,
        subject_email: &str,
        session_id: Uuid,
        name: DisplayName<'_>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let issued_at = now.timestamp();
        let claims = Claims {
            sub: subject_email.to_string(),
            session: session_id.to_string(),
            first_name: name.first_name.to_string(),
            last_name: name.last_name.to_string(),
            iss: self.issuer.clone(),
            iat: issued_at,
            exp: issued_at + self.ttl.num_seconds(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies the signature and structure of `token` and returns its claims.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Like `decode`, with expiry judged against `now`.
    ///
    /// The issuer is deliberately not checked here; that comparison belongs to
    /// the session authority.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        if let Some(alg) = header_algorithm(token) {
            if alg != "HS256" {
                return Err(TokenError::Unsupported(format!("algorithm {} is not accepted", alg)));
            }
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::MissingAlgorithm => TokenError::Unsupported(e.to_string()),
                _ => TokenError::Malformed(e.to_string()),
            })?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
