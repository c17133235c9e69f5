use actix_web::{dev::Payload, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::{ready, Ready};
use tracing::{debug, error};

use crate::error::ApiError;
use crate::models::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// username of the caller
    pub sub: String,
    pub exp: usize,
    pub roles: Vec<Role>,
}

#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    #[error("JWT_SECRET not set")] MissingSecret,
    #[error(transparent)] Jwt(#[from] jsonwebtoken::errors::Error),
}

fn secret() -> Result<String, TokenError> {
    env::var("JWT_SECRET").map_err(|_| TokenError::MissingSecret)
}

/// Validate a JWT and return its claims.
fn decode_jwt(token: &str) -> Result<Claims, TokenError> {
    let secret = secret()?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}

/// Extractor yielding validated `Claims`. Tokens are issued elsewhere with the shared secret.
pub struct Auth(pub Claims);

impl Auth {
    pub fn is_admin(&self) -> bool {
        self.0.roles.contains(&Role::Admin)
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() { Ok(()) } else { Err(ApiError::Forbidden) }
    }

    /// Admins may act on any account, everyone else only on their own.
    pub fn require_self_or_admin(&self, username: &str) -> Result<(), ApiError> {
        if self.is_admin() || self.0.sub == username { Ok(()) } else { Err(ApiError::Forbidden) }
    }
}

impl FromRequest for Auth {
    type Error = ApiError;
    type Future = Ready<Result<Self, ApiError>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let Ok(bearer) = BearerAuth::from_request(req, pl).into_inner() else {
            return ready(Err(ApiError::Unauthorized));
        };
        ready(match decode_jwt(bearer.token()) {
            Ok(claims) => Ok(Auth(claims)),
            Err(TokenError::MissingSecret) => {
                error!("JWT_SECRET missing at request time");
                Err(ApiError::Internal)
            }
            Err(e) => {
                debug!(error = %e, "rejected bearer token");
                Err(ApiError::Unauthorized)
            }
        })
    }
}

/// Create a 24h token for `username`. Used by tooling and tests; the API itself only verifies.
pub fn create_jwt(username: &str, roles: Vec<Role>) -> Result<String, TokenError> {
    let secret = secret()?;
    let expiration = (chrono::Utc::now() + chrono::Duration::hours(24)).timestamp() as usize;
    let claims = Claims { sub: username.to_string(), exp: expiration, roles };
    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))?)
}

/// Salted argon2 hash in PHC string form. CPU bound: call it through `web::block`.
pub fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "password hashing failed");
            ApiError::Internal
        })
}
