//! The normalized shape every adapter writes into `scraped_data`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest raw-content excerpt we keep for debugging.
const RAW_EXCERPT_MAX: usize = 2000;

/// Identity fields discovered on a profile page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl ProfileInfo {
    pub fn is_empty(&self) -> bool {
        self == &ProfileInfo::default()
    }

    /// Fill missing fields from `other`; existing values win.
    fn merge_from(&mut self, other: ProfileInfo) {
        let fill = |slot: &mut Option<String>, value: Option<String>| {
            if slot.is_none() {
                *slot = value;
            }
        };
        fill(&mut self.username, other.username);
        fill(&mut self.display_name, other.display_name);
        fill(&mut self.bio, other.bio);
        fill(&mut self.avatar_url, other.avatar_url);
        fill(&mut self.location, other.location);
        fill(&mut self.website, other.website);
        if self.verified.is_none() {
            self.verified = other.verified;
        }
    }
}

/// Emails and phone numbers harvested from page content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<String>,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty()
    }

    fn merge_from(&mut self, other: ContactInfo) {
        for email in other.emails {
            if !self.emails.contains(&email) {
                self.emails.push(email);
            }
        }
        for phone in other.phones {
            if !self.phones.contains(&phone) {
                self.phones.push(phone);
            }
        }
    }
}

/// Temporal signals about the target's presence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySignals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_post_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts_sampled: Option<u32>,
}

/// Everything a scrape produced. All sections optional; an empty payload is
/// a valid result (the target had no discoverable data).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stats: BTreeMap<String, i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivitySignals>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_excerpt: Option<String>,
}

impl ScrapedPayload {
    pub fn is_empty(&self) -> bool {
        self == &ScrapedPayload::default()
    }

    /// Union two payloads. Values already present win; stats and contact
    /// lists are unioned. Used to aggregate partial successes from
    /// concurrent probes.
    pub fn merge(mut self, other: ScrapedPayload) -> ScrapedPayload {
        if let Some(theirs) = other.profile {
            match self.profile.as_mut() {
                Some(mine) => mine.merge_from(theirs),
                None => self.profile = Some(theirs),
            }
        }

        for (key, value) in other.stats {
            self.stats.entry(key).or_insert(value);
        }

        if let Some(theirs) = other.contact {
            match self.contact.as_mut() {
                Some(mine) => mine.merge_from(theirs),
                None => self.contact = Some(theirs),
            }
        }

        if self.activity.is_none() {
            self.activity = other.activity;
        }

        for (key, value) in other.metadata {
            self.metadata.entry(key).or_insert(value);
        }

        if self.raw_excerpt.is_none() {
            self.raw_excerpt = other.raw_excerpt;
        }

        self
    }

    /// Attach a bounded excerpt of raw page content.
    pub fn with_raw_excerpt(mut self, text: &str) -> ScrapedPayload {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return self;
        }

        let mut end = RAW_EXCERPT_MAX.min(trimmed.len());
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        self.raw_excerpt = Some(trimmed[..end].to_string());
        self
    }
}
