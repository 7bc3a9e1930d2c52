use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, FieldError};

/// Professional profile, one document per user. Experience and education are
/// embedded most-recent-first lists; each entry carries its own id so it can
/// be removed individually.
///
/// `U` is the shape of the `user` field: the stored document holds the owning
/// user's id, while read endpoints expand it to a [`ProfileOwner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile<U = ObjectId> {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: U,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub githubusername: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub social: Social,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    /// Set once, when the upsert first creates the document.
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
}

impl<U> Profile<U> {
    pub fn experience_entry(&self, id: &ObjectId) -> Option<&Experience> {
        self.experience.iter().find(|e| &e.id == id)
    }

    pub fn education_entry(&self, id: &ObjectId) -> Option<&Education> {
        self.education.iter().find(|e| &e.id == id)
    }
}

/// The owning account as embedded in profile reads, in place of the bare
/// user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileOwner {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Social {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default)]
    pub current: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Education {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub school: String,
    pub degree: String,
    pub fieldofstudy: String,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default)]
    pub current: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Upsert payload for `POST /api/profile`. Skills arrive as one
/// comma-separated string and are split server-side.
#[derive(Debug, Default, Deserialize)]
pub struct UpsertProfile {
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub status: Option<String>,
    pub githubusername: Option<String>,
    pub skills: Option<String>,
    pub youtube: Option<String>,
    pub twitter: Option<String>,
    pub facebook: Option<String>,
    pub linkedin: Option<String>,
    pub instagram: Option<String>,
}

impl UpsertProfile {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if !provided(&self.status) {
            errors.push(FieldError::new("status", "Status is required"));
        }
        if !provided(&self.skills) {
            errors.push(FieldError::new("skills", "Skills is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(errors))
        }
    }

    /// `$set` document for the upsert. Only provided top-level fields are
    /// written, so unrelated fields of an existing profile survive; `social`
    /// is the exception and is always replaced wholesale with exactly the
    /// provided links.
    pub fn update_document(&self) -> Document {
        let mut set = Document::new();
        for (key, value) in [
            ("company", &self.company),
            ("website", &self.website),
            ("location", &self.location),
            ("bio", &self.bio),
            ("status", &self.status),
            ("githubusername", &self.githubusername),
        ] {
            if let Some(v) = value {
                if !v.trim().is_empty() {
                    set.insert(key, v.clone());
                }
            }
        }
        if let Some(skills) = &self.skills {
            set.insert("skills", split_skills(skills));
        }

        let mut social = Document::new();
        for (key, value) in [
            ("youtube", &self.youtube),
            ("twitter", &self.twitter),
            ("facebook", &self.facebook),
            ("linkedin", &self.linkedin),
            ("instagram", &self.instagram),
        ] {
            if let Some(v) = value {
                if !v.trim().is_empty() {
                    social.insert(key, v.clone());
                }
            }
        }
        set.insert("social", social);
        set
    }
}

fn provided(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// "js, rust ,,go" -> ["js", "rust", "go"]
pub fn split_skills(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Default, Deserialize)]
pub struct ExperienceInput {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default)]
    pub current: bool,
    pub description: Option<String>,
}

impl ExperienceInput {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if !provided(&self.title) {
            errors.push(FieldError::new("title", "Title is required"));
        }
        if !provided(&self.company) {
            errors.push(FieldError::new("company", "Company is required"));
        }
        if !provided(&self.from) {
            errors.push(FieldError::new("from", "From date is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(errors))
        }
    }

    /// Consumes the validated payload into an entry with a fresh id.
    pub fn into_entry(self) -> Experience {
        Experience {
            id: ObjectId::new(),
            title: self.title.unwrap_or_default(),
            company: self.company.unwrap_or_default(),
            location: self.location,
            from: self.from.unwrap_or_default(),
            to: self.to,
            current: self.current,
            description: self.description,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EducationInput {
    pub school: Option<String>,
    pub degree: Option<String>,
    pub fieldofstudy: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default)]
    pub current: bool,
    pub description: Option<String>,
}

impl EducationInput {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if !provided(&self.school) {
            errors.push(FieldError::new("school", "School is required"));
        }
        if !provided(&self.degree) {
            errors.push(FieldError::new("degree", "Degree is required"));
        }
        if !provided(&self.fieldofstudy) {
            errors.push(FieldError::new("fieldofstudy", "Field of study is required"));
        }
        if !provided(&self.from) {
            errors.push(FieldError::new("from", "From date is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(errors))
        }
    }

    pub fn into_entry(self) -> Education {
        Education {
            id: ObjectId::new(),
            school: self.school.unwrap_or_default(),
            degree: self.degree.unwrap_or_default(),
            fieldofstudy: self.fieldofstudy.unwrap_or_default(),
            from: self.from.unwrap_or_default(),
            to: self.to,
            current: self.current,
            description: self.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skills_are_split_and_trimmed() {
        assert_eq!(
            split_skills("js, rust ,,  go"),
            vec!["js".to_string(), "rust".into(), "go".into()]
        );
        assert!(split_skills(" , ").is_empty());
    }

    #[test]
    fn update_document_only_sets_provided_fields() {
        let payload = UpsertProfile {
            status: Some("Developer".into()),
            skills: Some("rust,mongodb".into()),
            ..Default::default()
        };
        let set = payload.update_document();
        assert_eq!(set.get_str("status").unwrap(), "Developer");
        // bio was not provided, so a second submission must not erase it
        assert!(!set.contains_key("bio"));
        assert!(!set.contains_key("company"));
        let skills = set.get_array("skills").unwrap();
        assert_eq!(skills.len(), 2);
    }

    #[test]
    fn update_document_always_replaces_social() {
        let payload = UpsertProfile {
            status: Some("Developer".into()),
            skills: Some("rust".into()),
            twitter: Some("https://twitter.com/ada".into()),
            ..Default::default()
        };
        let set = payload.update_document();
        let social = set.get_document("social").unwrap();
        assert_eq!(social.get_str("twitter").unwrap(), "https://twitter.com/ada");
        assert!(!social.contains_key("youtube"));

        // no links at all still writes an empty social object, wiping old ones
        let bare = UpsertProfile {
            status: Some("Developer".into()),
            skills: Some("rust".into()),
            ..Default::default()
        };
        assert!(bare.update_document().get_document("social").unwrap().is_empty());
    }

    #[test]
    fn upsert_requires_status_and_skills() {
        match UpsertProfile::default().validate() {
            Err(AppError::Validation(errors)) => {
                let params: Vec<_> = errors.iter().filter_map(|e| e.param).collect();
                assert_eq!(params, vec!["status", "skills"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn experience_input_validates_required_fields() {
        let missing = ExperienceInput {
            title: Some("Eng".into()),
            ..Default::default()
        };
        match missing.validate() {
            Err(AppError::Validation(errors)) => {
                let params: Vec<_> = errors.iter().filter_map(|e| e.param).collect();
                assert_eq!(params, vec!["company", "from"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn education_input_validates_required_fields() {
        match EducationInput::default().validate() {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn entries_get_distinct_ids() {
        let a = ExperienceInput {
            title: Some("Eng".into()),
            company: Some("Acme".into()),
            from: Some("2020-01-01".into()),
            ..Default::default()
        }
        .into_entry();
        let b = ExperienceInput {
            title: Some("Lead".into()),
            company: Some("Acme".into()),
            from: Some("2022-01-01".into()),
            ..Default::default()
        }
        .into_entry();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn entry_lookup_is_by_id() {
        let eng = ExperienceInput {
            title: Some("Eng".into()),
            company: Some("Acme".into()),
            from: Some("2020-01-01".into()),
            ..Default::default()
        }
        .into_entry();
        let lead = ExperienceInput {
            title: Some("Lead".into()),
            company: Some("Acme".into()),
            from: Some("2022-01-01".into()),
            ..Default::default()
        }
        .into_entry();
        let wanted = eng.id;
        let profile = sample_profile(vec![lead, eng]);
        assert_eq!(profile.experience_entry(&wanted).unwrap().title, "Eng");
        assert!(profile.experience_entry(&ObjectId::new()).is_none());
    }

    fn sample_profile(experience: Vec<Experience>) -> Profile {
        Profile {
            id: Some(ObjectId::new()),
            user: ObjectId::new(),
            company: None,
            website: None,
            location: None,
            bio: None,
            status: Some("Developer".into()),
            githubusername: None,
            skills: vec!["rust".into()],
            social: Social::default(),
            // most recent first
            experience,
            education: vec![],
            date: Utc::now(),
        }
    }

    #[test]
    fn profile_serializes_creation_date() {
        let json = serde_json::to_value(sample_profile(vec![])).unwrap();
        assert!(json.get("date").is_some());
    }

    #[test]
    fn profile_missing_date_still_deserializes() {
        // documents written before the date field existed
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "_id": ObjectId::new(),
            "user": ObjectId::new(),
            "status": "Developer",
        }))
        .unwrap();
        assert_eq!(profile.status.as_deref(), Some("Developer"));
    }

    #[test]
    fn owner_expanded_profile_embeds_name_and_avatar() {
        let stored = sample_profile(vec![]);
        let profile = Profile::<ProfileOwner> {
            id: stored.id,
            user: ProfileOwner {
                id: ObjectId::new(),
                name: "Ada".into(),
                avatar: "https://www.gravatar.com/avatar/abc".into(),
            },
            company: stored.company,
            website: stored.website,
            location: stored.location,
            bio: stored.bio,
            status: stored.status,
            githubusername: stored.githubusername,
            skills: stored.skills,
            social: stored.social,
            experience: stored.experience,
            education: stored.education,
            date: stored.date,
        };
        let json = serde_json::to_value(profile).unwrap();
        assert_eq!(json["user"]["name"], "Ada");
        assert!(json["user"]["avatar"].as_str().unwrap().contains("gravatar"));
        assert!(json["user"].get("_id").is_some());
    }
}
