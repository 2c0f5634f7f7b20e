//! Boundary validation for request payloads.
//!
//! Validators turn loosely-typed input into typed values or a list of
//! [`Issue`]s, one per offending field, which handlers return verbatim.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::storage::models::{Preference, Theme};

pub const UID_MIN_LEN: usize = 4;
pub const UID_MAX_LEN: usize = 20;
pub const NAME_MAX_LEN: usize = 50;
pub const TITLE_MAX_LEN: usize = 80;
pub const CATEGORY_MAX_LEN: usize = 40;
pub const MAX_TAGS: usize = 10;
pub const TAG_MAX_LEN: usize = 24;
pub const MESSAGE_MAX_LEN: usize = 2000;

/// Interface languages a profile may select
pub const LANGUAGES: &[&str] = &["en", "es", "fr", "de", "it", "pt", "ja"];

/// One problem with one field of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub path: String,
    pub code: String,
    pub message: String,
}

impl Issue {
    pub fn new(path: &str, code: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

fn uid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9._-]*[a-z0-9]$").expect("uid pattern is a valid regex")
    })
}

/// Canonical form of a candidate handle
pub fn normalize_uid(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalize and check a handle. Handles are 4-20 characters of
/// `a-z 0-9 . _ -`, start and end alphanumeric, and contain at least one
/// letter and one digit.
pub fn validate_uid(raw: &str) -> Result<String, Vec<Issue>> {
    let uid = normalize_uid(raw);
    let mut issues = Vec::new();

    let len = uid.chars().count();
    if len < UID_MIN_LEN {
        issues.push(Issue::new(
            "uid",
            "too_small",
            format!("Username must be at least {UID_MIN_LEN} characters"),
        ));
    } else if len > UID_MAX_LEN {
        issues.push(Issue::new(
            "uid",
            "too_big",
            format!("Username must be at most {UID_MAX_LEN} characters"),
        ));
    }

    if !uid.is_empty() && !uid_pattern().is_match(&uid) {
        issues.push(Issue::new(
            "uid",
            "invalid_string",
            "Username may only contain letters, digits, '.', '_' and '-', and must start and end with a letter or digit",
        ));
    }

    let has_letter = uid.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = uid.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        issues.push(Issue::new(
            "uid",
            "invalid_string",
            "Username must contain both letters and digits",
        ));
    }

    if issues.is_empty() {
        Ok(uid)
    } else {
        Err(issues)
    }
}

/// Trimmed display name of 1-50 characters
pub fn validate_name(raw: &str) -> Result<String, Vec<Issue>> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 {
        return Err(vec![Issue::new("name", "too_small", "Name must not be empty")]);
    }
    if len > NAME_MAX_LEN {
        return Err(vec![Issue::new(
            "name",
            "too_big",
            format!("Name must be at most {NAME_MAX_LEN} characters"),
        )]);
    }
    Ok(name.to_string())
}

/// Partial preference update as received on the wire
#[derive(Debug, Default, Deserialize)]
pub struct PreferenceUpdate {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub nsfw: Option<bool>,
    #[serde(default)]
    pub cookies: Option<bool>,
    #[serde(default)]
    pub language: Option<String>,
}

impl PreferenceUpdate {
    /// Apply the update on top of `current`, collecting every invalid field.
    pub fn apply(&self, current: &Preference) -> Result<Preference, Vec<Issue>> {
        if self.theme.is_none()
            && self.nsfw.is_none()
            && self.cookies.is_none()
            && self.language.is_none()
        {
            return Err(vec![Issue::new(
                "",
                "invalid_type",
                "at least one field (theme, nsfw, cookies, language) must be provided",
            )]);
        }

        let mut next = current.clone();
        let mut issues = Vec::new();

        if let Some(ref theme) = self.theme {
            match Theme::parse(theme) {
                Some(theme) => next.theme = theme,
                None => issues.push(Issue::new(
                    "theme",
                    "invalid_enum_value",
                    "Expected 'light' | 'dark' | 'system'",
                )),
            }
        }
        if let Some(nsfw) = self.nsfw {
            next.nsfw = nsfw;
        }
        if let Some(cookies) = self.cookies {
            next.cookies = cookies;
        }
        if let Some(ref language) = self.language {
            if LANGUAGES.contains(&language.as_str()) {
                next.language = language.clone();
            } else {
                issues.push(Issue::new(
                    "language",
                    "invalid_enum_value",
                    format!("Expected one of: {}", LANGUAGES.join(", ")),
                ));
            }
        }

        if issues.is_empty() {
            Ok(next)
        } else {
            Err(issues)
        }
    }
}

/// Validated metadata for a new sound
#[derive(Debug, Clone, PartialEq)]
pub struct SoundMeta {
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
}

/// `tags` is a comma-separated list; tags are lowercased and deduplicated.
pub fn validate_sound_meta(
    title: Option<&str>,
    category: Option<&str>,
    tags: Option<&str>,
) -> Result<SoundMeta, Vec<Issue>> {
    let mut issues = Vec::new();

    let title = title.map(str::trim).unwrap_or_default();
    if title.is_empty() {
        issues.push(Issue::new("title", "too_small", "Title is required"));
    } else if title.chars().count() > TITLE_MAX_LEN {
        issues.push(Issue::new(
            "title",
            "too_big",
            format!("Title must be at most {TITLE_MAX_LEN} characters"),
        ));
    }

    let category = category.map(|c| c.trim().to_lowercase()).unwrap_or_default();
    if category.is_empty() {
        issues.push(Issue::new("category", "too_small", "Category is required"));
    } else if category.chars().count() > CATEGORY_MAX_LEN {
        issues.push(Issue::new(
            "category",
            "too_big",
            format!("Category must be at most {CATEGORY_MAX_LEN} characters"),
        ));
    }

    let mut parsed: Vec<String> = Vec::new();
    for tag in tags.unwrap_or_default().split(',') {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !parsed.contains(&tag) {
            parsed.push(tag);
        }
    }
    if parsed.len() > MAX_TAGS {
        issues.push(Issue::new(
            "tags",
            "too_big",
            format!("At most {MAX_TAGS} tags are allowed"),
        ));
    }
    if parsed.iter().any(|t| t.chars().count() > TAG_MAX_LEN) {
        issues.push(Issue::new(
            "tags",
            "too_big",
            format!("Tags must be at most {TAG_MAX_LEN} characters"),
        ));
    }

    if issues.is_empty() {
        Ok(SoundMeta {
            title: title.to_string(),
            category,
            tags: parsed,
        })
    } else {
        Err(issues)
    }
}

/// Contact form submission
#[derive(Debug, Deserialize)]
pub struct MessageInput {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(default)]
    pub s_id: Option<String>,
}

impl MessageInput {
    pub fn validate(&self) -> Result<(), Vec<Issue>> {
        let mut issues = Vec::new();

        let email = self.email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            issues.push(Issue::new("email", "invalid_string", "Invalid email"));
        }

        let len = self.message.trim().chars().count();
        if len == 0 {
            issues.push(Issue::new("message", "too_small", "Message is required"));
        } else if len > MESSAGE_MAX_LEN {
            issues.push(Issue::new(
                "message",
                "too_big",
                format!("Message must be at most {MESSAGE_MAX_LEN} characters"),
            ));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

/// URL-safe slug of a title: lowercase ASCII alphanumerics joined by '-'.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
