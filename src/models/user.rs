use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, FieldError};

/// Account document as stored in the `users` collection. The password field
/// holds a bcrypt hash and must never reach a response body; use
/// [`User::into_public`] before serializing to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: String,
    pub date: DateTime<Utc>,
}

/// The same record minus the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub date: DateTime<Utc>,
}

impl User {
    pub fn into_public(self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name,
            email: self.email,
            avatar: self.avatar,
            date: self.date,
        }
    }
}

/// Gravatar URL derived from the account e-mail: 200px, pg-rated, with the
/// "mystery man" fallback. Gravatar hashes the trimmed, lowercased address.
pub fn gravatar_url(email: &str) -> String {
    let digest = md5::compute(email.trim().to_lowercase().as_bytes());
    format!("https://www.gravatar.com/avatar/{digest:x}?s=200&r=pg&d=mm")
}

#[derive(Debug, Deserialize)]
pub struct RegisterUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterUser {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Name is required"));
        }
        if !looks_like_email(&self.email) {
            errors.push(FieldError::new("email", "Please include a valid email"));
        }
        if self.password.len() < 6 {
            errors.push(FieldError::new(
                "password",
                "Please enter a password with 6 or more characters",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(errors))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginUser {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if !looks_like_email(&self.email) {
            errors.push(FieldError::new("email", "Please include a valid email"));
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "Password is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(errors))
        }
    }
}

fn looks_like_email(s: &str) -> bool {
    // local@domain with a dot somewhere in the domain part
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gravatar_ignores_case_and_whitespace() {
        let a = gravatar_url("Someone@Example.COM ");
        let b = gravatar_url("someone@example.com");
        assert_eq!(a, b);
        assert!(a.starts_with("https://www.gravatar.com/avatar/"));
        assert!(a.ends_with("?s=200&r=pg&d=mm"));
    }

    #[test]
    fn public_user_never_serializes_password() {
        let user = User {
            id: Some(ObjectId::new()),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: bcrypt::hash("hunter22", 4).unwrap(),
            avatar: gravatar_url("ada@example.com"),
            date: Utc::now(),
        };
        let json = serde_json::to_value(user.into_public()).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["name"], "Ada");
    }

    #[test]
    fn password_hash_round_trips() {
        let hash = bcrypt::hash("hunter22", 4).unwrap();
        assert_ne!(hash, "hunter22");
        assert!(bcrypt::verify("hunter22", &hash).unwrap());
        assert!(!bcrypt::verify("wrong", &hash).unwrap());
    }

    #[test]
    fn register_validation_collects_all_failures() {
        let reg = RegisterUser {
            name: " ".into(),
            email: "not-an-email".into(),
            password: "short".into(),
        };
        match reg.validate() {
            Err(AppError::Validation(errors)) => {
                let params: Vec<_> = errors.iter().filter_map(|e| e.param).collect();
                assert_eq!(params, vec!["name", "email", "password"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn login_requires_email_shape_and_password() {
        let ok = LoginUser {
            email: "a@b.co".into(),
            password: "pw".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = LoginUser {
            email: "a@b".into(),
            password: String::new(),
        };
        match bad.validate() {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
