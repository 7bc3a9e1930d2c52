use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, FieldError};
use crate::models::user::User;

/// Post document. Author name/avatar are denormalized at creation time and
/// intentionally not kept in sync with later account edits. Likes and
/// comments are embedded most-recent-first lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: ObjectId,
    pub text: String,
    pub name: String,
    pub avatar: String,
    #[serde(default)]
    pub like: Vec<Like>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub user: ObjectId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    pub text: String,
    pub name: String,
    pub avatar: String,
    pub date: DateTime<Utc>,
}

impl Post {
    /// New post with empty like/comment lists. The author id comes from the
    /// auth gate; `author` only contributes the denormalized name/avatar.
    pub fn new(author_id: ObjectId, author: &User, text: String) -> Self {
        Self {
            id: None,
            user: author_id,
            text,
            name: author.name.clone(),
            avatar: author.avatar.clone(),
            like: Vec::new(),
            comments: Vec::new(),
            date: Utc::now(),
        }
    }

    pub fn liked_by(&self, user: &ObjectId) -> bool {
        self.like.iter().any(|l| &l.user == user)
    }

    pub fn comment(&self, id: &ObjectId) -> Option<&Comment> {
        self.comments.iter().find(|c| &c.id == id)
    }

    pub fn authored_by(&self, user: &ObjectId) -> bool {
        &self.user == user
    }

    /// Author-only guard for post deletion.
    pub fn authorize_delete(&self, caller: &ObjectId) -> Result<(), AppError> {
        if self.authored_by(caller) {
            Ok(())
        } else {
            Err(AppError::Unauthorized("User not authorized"))
        }
    }
}

impl Comment {
    pub fn new(author_id: ObjectId, author: &User, text: String) -> Self {
        Self {
            id: ObjectId::new(),
            user: author_id,
            text,
            name: author.name.clone(),
            avatar: author.avatar.clone(),
            date: Utc::now(),
        }
    }
}

/// Body for `POST /api/posts` and `POST /api/posts/comment/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct PostInput {
    pub text: Option<String>,
}

impl PostInput {
    pub fn validate(&self) -> Result<&str, AppError> {
        match self.text.as_deref() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(AppError::validation(vec![FieldError::new(
                "text",
                "Text is required",
            )])),
        }
    }
}
