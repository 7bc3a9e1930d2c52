use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use tracing::info;

use crate::error::{AppError, FieldError};
use crate::models::user::{gravatar_url, RegisterUser, User};

fn duplicate_user() -> AppError {
    AppError::validation(vec![FieldError::msg("User already exists")])
}

/// E11000: the insert lost the unique-email race to a concurrent
/// registration.
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11000
    )
}

fn map_insert_error(err: mongodb::error::Error) -> AppError {
    if is_duplicate_key(&err) {
        duplicate_user()
    } else {
        err.into()
    }
}

#[derive(Clone)]
pub struct UsersDb {
    coll: Collection<User>,
}

impl UsersDb {
    pub fn new(db: &Database) -> Self {
        Self {
            coll: db.collection("users"),
        }
    }

    /// Unique index on email so duplicate registrations lose the race at the
    /// store, not just at the pre-insert check.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.coll.create_index(model).await?;
        Ok(())
    }

    pub async fn by_id(&self, id: &ObjectId) -> Result<Option<User>, AppError> {
        Ok(self.coll.find_one(doc! { "_id": *id }).await?)
    }

    pub async fn by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.coll.find_one(doc! { "email": email }).await?)
    }

    /// Registers an account: duplicate e-mail is a validation failure, the
    /// password is stored only as a bcrypt hash, and the avatar is derived
    /// from the e-mail.
    pub async fn register(&self, reg: RegisterUser) -> Result<User, AppError> {
        if self.by_email(&reg.email).await?.is_some() {
            return Err(duplicate_user());
        }

        let mut user = User {
            id: None,
            avatar: gravatar_url(&reg.email),
            name: reg.name,
            email: reg.email,
            password: bcrypt::hash(&reg.password, bcrypt::DEFAULT_COST)?,
            date: Utc::now(),
        };
        // the unique index decides races the pre-check above cannot see
        let inserted = self.coll.insert_one(&user).await.map_err(map_insert_error)?;
        user.id = inserted.inserted_id.as_object_id();
        info!(user = %user.email, "registered user");
        Ok(user)
    }

    /// Credential check for login; `None` covers both unknown e-mail and a
    /// wrong password so the two are indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, AppError> {
        let Some(user) = self.by_email(email).await? else {
            return Ok(None);
        };
        if bcrypt::verify(password, &user.password)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<(), AppError> {
        self.coll.delete_one(doc! { "_id": *id }).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_is_a_validation_failure() {
        // same body whether caught by the pre-check or the unique index
        match duplicate_user() {
            AppError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].msg, "User already exists");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn non_duplicate_insert_errors_stay_internal() {
        let err = map_insert_error(mongodb::error::Error::custom("connection reset"));
        assert!(matches!(err, AppError::Internal(_)));
    }
}
