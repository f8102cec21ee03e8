use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input for the profile-scraper actors. All of them accept a list of
/// usernames and a cap on how many result items to return.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileScraperInput {
    pub usernames: Vec<String>,
    #[serde(rename = "resultsLimit")]
    pub results_limit: u32,
}

/// One profile item from an actor dataset.
///
/// The actors for different platforms disagree on field names, so everything
/// is optional and the `extra` map keeps whatever else the actor emitted.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileItem {
    pub username: Option<String>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    #[serde(alias = "biography", alias = "description")]
    pub bio: Option<String>,
    #[serde(rename = "profilePicUrl", alias = "avatar")]
    pub avatar_url: Option<String>,
    #[serde(rename = "externalUrl", alias = "website")]
    pub external_url: Option<String>,
    #[serde(rename = "followersCount", alias = "followers")]
    pub followers_count: Option<i64>,
    #[serde(rename = "followsCount", alias = "following")]
    pub follows_count: Option<i64>,
    #[serde(rename = "postsCount", alias = "statusesCount")]
    pub posts_count: Option<i64>,
    pub verified: Option<bool>,
    #[serde(rename = "isPrivate", alias = "protected")]
    pub is_private: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunData {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status.as_str(),
            "SUCCEEDED" | "FAILED" | "ABORTED" | "TIMED-OUT"
        )
    }
}
