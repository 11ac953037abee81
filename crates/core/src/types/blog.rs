//! Blog records.
//!
//! The backend and the older cached payloads disagree on a few field names
//! (`author` vs `authorName`, `rating` vs `averageRating`, `date` vs
//! `createdAt`); both spellings are accepted and the accessors pick whichever
//! is present.

use serde::{Deserialize, Serialize};

use super::EntityId;

/// A blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
}

impl Post {
    /// Author name, whichever field carries it.
    #[must_use]
    pub fn author_display(&self) -> Option<&str> {
        self.author.as_deref().or(self.author_name.as_deref())
    }

    /// Rating, whichever field carries it.
    #[must_use]
    pub fn rating_display(&self) -> Option<f64> {
        self.rating.or(self.average_rating)
    }

    /// Publication date, whichever field carries it.
    #[must_use]
    pub fn published(&self) -> Option<&str> {
        self.date.as_deref().or(self.created_at.as_deref())
    }
}

/// A blog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCategory {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
