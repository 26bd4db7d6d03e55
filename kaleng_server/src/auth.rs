//! Session-token validation.
//!
//! The storefront does not issue sessions itself; the external auth service does, as HS256 JWTs signed with a
//! secret shared through configuration. This module validates those tokens and exposes the claims as an actix
//! extractor, so any handler can simply take a [`JwtClaims`] argument. The [`crate::middleware::AclMiddlewareFactory`]
//! middleware builds on the same verifier for role-gated routes.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpMessage, HttpRequest};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use kaleng_engine::db_types::Role;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, errors::{AuthError, ServerError}};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id, as assigned by the auth service.
    pub sub: String,
    pub email: String,
    pub roles: Vec<Role>,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl JwtClaims {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        let validation = Validation::default();
        Self { key, validation }
    }

    pub fn decode(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;
        Ok(data.claims)
    }
}

/// Issues session tokens. In production only the auth service signs tokens; the server carries an issuer for the
/// endpoint tests and local development.
pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes()) }
    }

    pub fn issue_token(&self, claims: &JwtClaims) -> Result<String, ServerError> {
        encode(&Header::default(), claims, &self.key)
            .map_err(|e| ServerError::Unspecified(format!("Could not sign token: {e}")))
    }
}

/// Pulls the bearer token out of the Authorization header.
pub fn bearer_token(req: &HttpRequest) -> Result<String, AuthError> {
    let header = req.headers().get("Authorization").ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a Bearer token".to_string()))
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // The ACL middleware may already have validated the token and stashed the claims.
        if let Some(claims) = req.extensions().get::<JwtClaims>() {
            return ready(Ok(claims.clone()));
        }
        let result: Result<JwtClaims, ServerError> = (|| {
            let verifier = req
                .app_data::<web::Data<JwtVerifier>>()
                .ok_or_else(|| ServerError::Unspecified("No JWT verifier configured".to_string()))?;
            let token = bearer_token(req)?;
            let claims = verifier.decode(&token).map_err(|e| {
                debug!("💻️ Rejected session token. {e}");
                ServerError::from(e)
            })?;
            Ok(claims)
        })();
        ready(result)
    }
}
