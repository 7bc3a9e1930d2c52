use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Tokens live this long; clients are expected to re-authenticate after.
const TOKEN_TTL_SECS: i64 = 360_000; // 100 hours

/// Claims layout: `{ user: { id }, exp }`, the shape clients already decode.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user: ClaimsUser,
    exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClaimsUser {
    id: String,
}

/// Stateless issue/verify pair over a shared HS256 secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: &ObjectId) -> Result<String, AppError> {
        self.issue_with_ttl(user_id, Duration::seconds(TOKEN_TTL_SECS))
    }

    fn issue_with_ttl(&self, user_id: &ObjectId, ttl: Duration) -> Result<String, AppError> {
        let claims = Claims {
            user: ClaimsUser {
                id: user_id.to_hex(),
            },
            exp: (Utc::now() + ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(e.into()))
    }

    /// Resolves a token back to the user id it was issued for. Every failure
    /// mode (bad signature, malformed token, expiry, non-ObjectId id) comes
    /// back as the same `Unauthorized`; nothing from the JWT library escapes
    /// this boundary.
    pub fn verify(&self, token: &str) -> Result<ObjectId, AppError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| AppError::Unauthorized("Token is not valid"))?;
        ObjectId::parse_str(&data.claims.user.id)
            .map_err(|_| AppError::Unauthorized("Token is not valid"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_round_trips_user_id() {
        let svc = TokenService::new("keyboard cat");
        let id = ObjectId::new();
        let token = svc.issue(&id).unwrap();
        assert_eq!(svc.verify(&token).unwrap(), id);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = TokenService::new("keyboard cat");
        let token = svc.issue(&ObjectId::new()).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert!(svc.verify(&tampered).is_err());
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let issuer = TokenService::new("secret-a");
        let verifier = TokenService::new("secret-b");
        let token = issuer.issue(&ObjectId::new()).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = TokenService::new("keyboard cat");
        let token = svc
            .issue_with_ttl(&ObjectId::new(), Duration::seconds(-3600))
            .unwrap();
        match svc.verify(&token) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Token is not valid"),
            other => panic!("expected unauthorized, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_rejected_not_panicked() {
        let svc = TokenService::new("keyboard cat");
        assert!(svc.verify("not.a.jwt").is_err());
        assert!(svc.verify("").is_err());
    }
}
