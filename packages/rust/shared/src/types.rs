//! Core domain records for ChannelScope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ItemRecord
// ---------------------------------------------------------------------------

/// A single published item (video) of a channel with its engagement counters.
///
/// The derived ratios are computed once on construction and on
/// deserialization; they are never read back from input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ItemRecordRaw")]
pub struct ItemRecord {
    /// Platform item identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Publish timestamp as delivered by the source (RFC 3339 when well-formed).
    pub published_at: Option<String>,
    /// View count.
    pub views: u64,
    /// Like count.
    pub likes: u64,
    /// Comment count.
    pub comments: u64,
    /// Duration as delivered by the source (ISO 8601 `PT#H#M#S`).
    pub duration: Option<String>,
    /// `(likes + comments) / max(views, 1)`.
    pub engagement_rate: f64,
    /// `likes / max(views, 1)`.
    pub likes_per_view: f64,
    /// `comments / max(views, 1)`.
    pub comments_per_view: f64,
}

/// Wire form of [`ItemRecord`]: every field optional, no derived ratios.
#[derive(Debug, Default, Deserialize)]
struct ItemRecordRaw {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    views: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    comments: u64,
    #[serde(default)]
    duration: Option<String>,
}

impl From<ItemRecordRaw> for ItemRecord {
    fn from(raw: ItemRecordRaw) -> Self {
        Self::new(raw.id, raw.title, raw.views, raw.likes, raw.comments)
            .with_description(raw.description)
            .with_published_at(raw.published_at)
            .with_duration(raw.duration)
    }
}

impl ItemRecord {
    /// Create a record from its counters; the derived ratios are computed here.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        views: u64,
        likes: u64,
        comments: u64,
    ) -> Self {
        let denom = views.max(1) as f64;
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            published_at: None,
            views,
            likes,
            comments,
            duration: None,
            engagement_rate: (likes as f64 + comments as f64) / denom,
            likes_per_view: likes as f64 / denom,
            comments_per_view: comments as f64 / denom,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the raw publish timestamp.
    pub fn with_published_at(mut self, published_at: Option<String>) -> Self {
        self.published_at = published_at;
        self
    }

    /// Set the raw duration string.
    pub fn with_duration(mut self, duration: Option<String>) -> Self {
        self.duration = duration;
        self
    }

    /// Parse the publish timestamp, if present and well-formed.
    pub fn published_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.published_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

// ---------------------------------------------------------------------------
// ComparisonChannel / ChannelSummary
// ---------------------------------------------------------------------------

/// A channel discovered as comparable to the subject channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonChannel {
    /// Platform channel identifier.
    pub id: String,
    /// Channel title.
    pub title: String,
    /// Channel description from the search result.
    #[serde(default)]
    pub description: String,
    /// Items fetched for this channel (empty until fetched).
    #[serde(default)]
    pub items: Vec<ItemRecord>,
}

/// Headline statistics of a channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subscriber_count: u64,
    #[serde(default)]
    pub total_views: u64,
    #[serde(default)]
    pub total_items: u64,
}

// ---------------------------------------------------------------------------
// Recommendation / Script
// ---------------------------------------------------------------------------

/// A ranked content suggestion produced by the recommendation oracle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub recommended_topic: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub target_title: String,
    #[serde(default)]
    pub title_variations: Vec<String>,
    #[serde(default)]
    pub description_template: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub content_structure: Vec<String>,
    #[serde(default)]
    pub estimated_duration: String,
    #[serde(default)]
    pub thumbnail_ideas: Vec<String>,
    /// Free-form; models return either an object or a sentence.
    #[serde(default)]
    pub estimated_engagement: serde_json::Value,
}

/// A production script for one recommendation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub video_title: String,
    #[serde(default)]
    pub sections: Vec<ScriptSection>,
    #[serde(default)]
    pub total_duration_seconds: Option<u64>,
    #[serde(default)]
    pub call_to_action: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// One section of a [`Script`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptSection {
    #[serde(default)]
    pub section_title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub duration_seconds: Option<u64>,
    #[serde(default)]
    pub visual_prompt: Option<String>,
    #[serde(default)]
    pub speaking_style: Option<String>,
}
