use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Color scheme a user prefers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
    #[default]
    System,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            "system" => Some(Theme::System),
            _ => None,
        }
    }
}

/// Localized profile preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    pub theme: Theme,
    pub nsfw: bool,
    pub cookies: bool,
    pub language: String,
}

impl Default for Preference {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            nsfw: false,
            cookies: false,
            language: "en".to_string(),
        }
    }
}

/// A user account stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    /// Public handle. Claimed once after sign-in.
    #[serde(default)]
    pub uid: Option<String>,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub preference: Preference,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Copy of the owner's display fields kept on sounds and soundboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub uid: String,
    pub name: String,
}

/// A sound clip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundRecord {
    pub s_id: String,
    pub slug: String,
    pub title: String,
    /// Seconds, parsed from the MPEG stream at upload time.
    pub duration: f64,
    pub views: u64,
    pub downloads: u64,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub nsfw: bool,
    pub audio_key: String,
    pub user: OwnerRef,
    pub created_at: DateTime<Utc>,
}

/// Which counter of a sound to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Views,
    Downloads,
}

/// Listing filters for sounds. All present filters must match.
#[derive(Debug, Clone, Default)]
pub struct SoundFilter {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub uid: Option<String>,
    /// Case-insensitive substring of the title
    pub query: Option<String>,
    pub include_nsfw: bool,
}

impl SoundFilter {
    pub fn matches(&self, sound: &SoundRecord) -> bool {
        if !self.include_nsfw && sound.nsfw {
            return false;
        }
        if let Some(ref category) = self.category {
            if !sound.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(ref tag) = self.tag {
            let tag = tag.to_lowercase();
            if !sound.tags.iter().any(|t| *t == tag) {
                return false;
            }
        }
        if let Some(ref uid) = self.uid {
            if sound.user.uid != *uid {
                return false;
            }
        }
        if let Some(ref query) = self.query {
            if !sound.title.to_lowercase().contains(&query.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// A soundboard (category) header. Members live in the entries join table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundboardRecord {
    pub sb_id: String,
    pub name: String,
    pub user: OwnerRef,
    pub created_at: DateTime<Utc>,
}

/// Soundboard plus its member sound ids, in insertion order.
#[derive(Debug, Clone)]
pub struct Soundboard {
    pub record: SoundboardRecord,
    pub s_ids: Vec<String>,
}

/// Result of claiming a handle against the unique index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    /// The account already has a handle
    AlreadySet,
    /// Another account holds the handle
    Taken,
    UnknownUser,
}

/// Contact / moderation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(default)]
    pub s_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Hit counter for a path that resolved to nothing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotFoundRecord {
    pub path: String,
    pub hits: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Single-use email sign-in token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationToken {
    pub identifier: String,
    pub expires: DateTime<Utc>,
}
