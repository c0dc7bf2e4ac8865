//! Bearer-token authentication and scope-based authorization (§6,
//! §9 "Authentication / rate limiting"), grounded on
//! `domains/auth/jwt.rs::JwtService`, generalized from a single
//! `is_admin` boolean to an open scope set.

mod scope;

pub use scope::Scope;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OrdinautError;

/// Claims embedded in an agent's bearer token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub agent_id: Uuid,
    pub scopes: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    pub fn has_scope(&self, scope: Scope) -> bool {
        let needle = scope.as_str();
        self.scopes.iter().any(|s| s == Scope::Admin.as_str() || s == needle)
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Issues a token for `agent_id` carrying `scopes`, valid for 24 hours.
    pub fn issue(&self, agent_id: Uuid, scopes: Vec<String>) -> Result<String, OrdinautError> {
        let now = Utc::now();
        let exp = now + Duration::hours(24);

        let claims = Claims {
            sub: agent_id.to_string(),
            agent_id,
            scopes,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| OrdinautError::Forbidden(format!("failed to issue token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, OrdinautError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| OrdinautError::Forbidden("invalid or expired token".to_string()))
    }
}
