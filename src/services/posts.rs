use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, to_bson};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

use crate::error::AppError;
use crate::models::post::{Comment, Like, Post};

const POST_NOT_FOUND: &str = "Post not found";

#[derive(Clone)]
pub struct PostsDb {
    coll: Collection<Post>,
}

impl PostsDb {
    pub fn new(db: &Database) -> Self {
        Self {
            coll: db.collection("posts"),
        }
    }

    pub async fn create(&self, mut post: Post) -> Result<Post, AppError> {
        let inserted = self.coll.insert_one(&post).await?;
        post.id = inserted.inserted_id.as_object_id();
        Ok(post)
    }

    pub async fn all(&self) -> Result<Vec<Post>, AppError> {
        let cursor = self.coll.find(doc! {}).sort(doc! { "date": -1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn by_id(&self, id: &ObjectId) -> Result<Post, AppError> {
        self.coll
            .find_one(doc! { "_id": *id })
            .await?
            .ok_or(AppError::NotFound(POST_NOT_FOUND))
    }

    /// Author-only delete.
    pub async fn delete(&self, id: &ObjectId, caller: &ObjectId) -> Result<(), AppError> {
        let post = self.by_id(id).await?;
        post.authorize_delete(caller)?;
        self.coll.delete_one(doc! { "_id": *id }).await?;
        Ok(())
    }

    /// Prepends a like for `user`. The update filter excludes posts that
    /// already carry this user's like, so two racing likes cannot both land;
    /// the loser surfaces as the duplicate-like conflict.
    pub async fn like(&self, id: &ObjectId, user: &ObjectId) -> Result<Vec<Like>, AppError> {
        // distinguish a missing post from an already-liked one up front
        self.by_id(id).await?;
        let updated = self
            .coll
            .find_one_and_update(
                doc! { "_id": *id, "like.user": { "$ne": *user } },
                doc! { "$push": { "like": { "$each": [{ "user": *user }], "$position": 0 } } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        match updated {
            Some(post) => Ok(post.like),
            None => Err(AppError::BadRequest("Post already liked")),
        }
    }

    /// Removes `user`'s like by value, wherever it sits in the list.
    pub async fn unlike(&self, id: &ObjectId, user: &ObjectId) -> Result<Vec<Like>, AppError> {
        self.by_id(id).await?;
        let updated = self
            .coll
            .find_one_and_update(
                doc! { "_id": *id, "like.user": *user },
                doc! { "$pull": { "like": { "user": *user } } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        match updated {
            Some(post) => Ok(post.like),
            None => Err(AppError::BadRequest("Post has not yet been liked")),
        }
    }

    pub async fn add_comment(
        &self,
        id: &ObjectId,
        comment: Comment,
    ) -> Result<Vec<Comment>, AppError> {
        let entry = to_bson(&comment).map_err(anyhow::Error::from)?;
        let updated = self
            .coll
            .find_one_and_update(
                doc! { "_id": *id },
                doc! { "$push": { "comments": { "$each": [entry], "$position": 0 } } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        match updated {
            Some(post) => Ok(post.comments),
            None => Err(AppError::NotFound(POST_NOT_FOUND)),
        }
    }

    /// Comment-owner-only removal, matched by the comment's own id so one
    /// user's other comments on the same post are untouched.
    pub async fn remove_comment(
        &self,
        id: &ObjectId,
        comment_id: &ObjectId,
        caller: &ObjectId,
    ) -> Result<Vec<Comment>, AppError> {
        let post = self.by_id(id).await?;
        let comment = post
            .comment(comment_id)
            .ok_or(AppError::NotFound("Comment does not exist"))?;
        if &comment.user != caller {
            return Err(AppError::Unauthorized("User is not authorized"));
        }
        let updated = self
            .coll
            .find_one_and_update(
                doc! { "_id": *id },
                doc! { "$pull": { "comments": { "_id": *comment_id } } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        match updated {
            Some(post) => Ok(post.comments),
            None => Err(AppError::NotFound(POST_NOT_FOUND)),
        }
    }

    /// All posts authored by `user` go with the account.
    pub async fn delete_for_user(&self, user: &ObjectId) -> Result<(), AppError> {
        self.coll.delete_many(doc! { "user": *user }).await?;
        Ok(())
    }
}
