use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, to_bson, Document};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};

use crate::error::AppError;
use crate::models::profile::{Education, Experience, Profile, ProfileOwner};

const NO_PROFILE: &str = "There is no profile for this user";

/// Aggregation stages that swap the stored owner id for the owning account's
/// id/name/avatar, the shape profile reads hand to clients.
fn owner_pipeline(filter: Option<Document>) -> Vec<Document> {
    let mut pipeline = Vec::new();
    if let Some(filter) = filter {
        pipeline.push(doc! { "$match": filter });
    }
    pipeline.extend([
        doc! { "$lookup": {
            "from": "users",
            "localField": "user",
            "foreignField": "_id",
            "as": "owner",
        } },
        doc! { "$unwind": "$owner" },
        doc! { "$set": {
            "user": { "_id": "$user", "name": "$owner.name", "avatar": "$owner.avatar" },
        } },
        doc! { "$unset": "owner" },
    ]);
    pipeline
}

/// `$set` only what the payload provided; the creation date is written once,
/// when the upsert inserts.
fn upsert_update(set: Document) -> Result<Document, AppError> {
    let now = to_bson(&Utc::now()).map_err(anyhow::Error::from)?;
    Ok(doc! { "$set": set, "$setOnInsert": { "date": now } })
}

#[derive(Clone)]
pub struct ProfilesDb {
    coll: Collection<Profile>,
}

impl ProfilesDb {
    pub fn new(db: &Database) -> Self {
        Self {
            coll: db.collection("profiles"),
        }
    }

    /// At most one profile per user; the unique index closes the
    /// concurrent-upsert window the handler check alone would leave open.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let model = IndexModel::builder()
            .keys(doc! { "user": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.coll.create_index(model).await?;
        Ok(())
    }

    pub async fn by_user(&self, user: &ObjectId) -> Result<Option<Profile>, AppError> {
        Ok(self.coll.find_one(doc! { "user": *user }).await?)
    }

    /// Single profile with the owner's name/avatar embedded.
    pub async fn by_user_with_owner(
        &self,
        user: &ObjectId,
    ) -> Result<Option<Profile<ProfileOwner>>, AppError> {
        let mut cursor = self
            .coll
            .aggregate(owner_pipeline(Some(doc! { "user": *user })))
            .with_type::<Profile<ProfileOwner>>()
            .await?;
        Ok(cursor.try_next().await?)
    }

    /// Public listing, each profile with its owner embedded.
    pub async fn all_with_owner(&self) -> Result<Vec<Profile<ProfileOwner>>, AppError> {
        let cursor = self
            .coll
            .aggregate(owner_pipeline(None))
            .with_type::<Profile<ProfileOwner>>()
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// Create-or-update in one statement: only the provided fields are `$set`,
    /// so an existing profile keeps everything the payload left out.
    pub async fn upsert(&self, user: &ObjectId, set: Document) -> Result<Profile, AppError> {
        let updated = self
            .coll
            .find_one_and_update(doc! { "user": *user }, upsert_update(set)?)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?;
        updated.ok_or_else(|| AppError::Internal(anyhow::anyhow!("upsert returned no document")))
    }

    pub async fn delete_for_user(&self, user: &ObjectId) -> Result<(), AppError> {
        self.coll.delete_one(doc! { "user": *user }).await?;
        Ok(())
    }

    pub async fn add_experience(
        &self,
        user: &ObjectId,
        entry: Experience,
    ) -> Result<Profile, AppError> {
        self.prepend(user, "experience", to_bson(&entry).map_err(anyhow::Error::from)?)
            .await
    }

    pub async fn add_education(
        &self,
        user: &ObjectId,
        entry: Education,
    ) -> Result<Profile, AppError> {
        self.prepend(user, "education", to_bson(&entry).map_err(anyhow::Error::from)?)
            .await
    }

    async fn prepend(
        &self,
        user: &ObjectId,
        field: &str,
        entry: mongodb::bson::Bson,
    ) -> Result<Profile, AppError> {
        let mut push = Document::new();
        push.insert(field, doc! { "$each": [entry], "$position": 0 });
        let updated = self
            .coll
            .find_one_and_update(doc! { "user": *user }, doc! { "$push": push })
            .return_document(ReturnDocument::After)
            .await?;
        updated.ok_or(AppError::BadRequest(NO_PROFILE))
    }

    /// Removes the entry with the given id. A missing entry is reported as
    /// not-found and leaves the list untouched; no positional fallback.
    pub async fn remove_experience(
        &self,
        user: &ObjectId,
        entry: &ObjectId,
    ) -> Result<Profile, AppError> {
        let profile = self.by_user(user).await?.ok_or(AppError::BadRequest(NO_PROFILE))?;
        if profile.experience_entry(entry).is_none() {
            return Err(AppError::NotFound("Experience entry not found"));
        }
        self.pull(user, "experience", entry).await
    }

    pub async fn remove_education(
        &self,
        user: &ObjectId,
        entry: &ObjectId,
    ) -> Result<Profile, AppError> {
        let profile = self.by_user(user).await?.ok_or(AppError::BadRequest(NO_PROFILE))?;
        if profile.education_entry(entry).is_none() {
            return Err(AppError::NotFound("Education entry not found"));
        }
        self.pull(user, "education", entry).await
    }

    async fn pull(
        &self,
        user: &ObjectId,
        field: &str,
        entry: &ObjectId,
    ) -> Result<Profile, AppError> {
        let mut pull = Document::new();
        pull.insert(field, doc! { "_id": *entry });
        let updated = self
            .coll
            .find_one_and_update(doc! { "user": *user }, doc! { "$pull": pull })
            .return_document(ReturnDocument::After)
            .await?;
        updated.ok_or(AppError::BadRequest(NO_PROFILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_writes_date_only_on_insert() {
        let update = upsert_update(doc! { "status": "Developer" }).unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "Developer");
        assert!(!set.contains_key("date"));
        assert!(update
            .get_document("$setOnInsert")
            .unwrap()
            .contains_key("date"));
    }

    #[test]
    fn owner_pipeline_joins_users_and_reshapes_user_field() {
        let pipeline = owner_pipeline(Some(doc! { "user": ObjectId::new() }));
        assert!(pipeline[0].contains_key("$match"));
        let lookup = pipeline[1].get_document("$lookup").unwrap();
        assert_eq!(lookup.get_str("from").unwrap(), "users");
        assert_eq!(lookup.get_str("localField").unwrap(), "user");
        let reshape = pipeline[3].get_document("$set").unwrap();
        assert!(reshape.get_document("user").unwrap().contains_key("name"));

        // public listing has no match stage
        assert!(owner_pipeline(None)[0].contains_key("$lookup"));
    }
}
