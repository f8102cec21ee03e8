//! Job model for scrape requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "scrape_job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal rows are immutable to the worker.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// What kind of identifier the job's target is. Stored as plain text so the
/// dashboard can add values without a schema change; unrecognized values fall
/// back to a username search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Username,
    Email,
    Phone,
    Domain,
}

impl SearchType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "username" => Some(SearchType::Username),
            "email" => Some(SearchType::Email),
            "phone" => Some(SearchType::Phone),
            "domain" => Some(SearchType::Domain),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Username => "username",
            SearchType::Email => "email",
            SearchType::Phone => "phone",
            SearchType::Domain => "domain",
        }
    }
}

/// A row of `scrape_jobs`. Created by the dashboard, owned by whichever
/// worker holds its `processing` claim.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub id: Uuid,
    pub target_url: String,
    pub target_username: Option<String>,
    pub platform: Option<String>,
    pub search_type: Option<String>,
    pub status: JobStatus,
    pub scraped_data: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScrapeJob {
    /// The parsed search type hint, defaulting to a username lookup.
    pub fn search_type(&self) -> SearchType {
        self.search_type
            .as_deref()
            .and_then(SearchType::parse)
            .unwrap_or(SearchType::Username)
    }

    /// Username hint, falling back to the last path segment of the URL.
    pub fn username_hint(&self) -> Option<String> {
        if let Some(name) = &self.target_username {
            let trimmed = name.trim().trim_start_matches('@');
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }

        let url = url::Url::parse(&self.target_url).ok()?;
        url.path_segments()?
            .filter(|s| !s.is_empty())
            .next_back()
            .map(|s| s.trim_start_matches('@').to_string())
            .filter(|s| !s.is_empty())
    }

    /// Whether the next failure must be terminal.
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Producer-side input for a new job. The dashboard builds one of these per
/// investigate request.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct NewScrapeJob {
    pub target_url: String,
    #[builder(default, setter(strip_option))]
    pub target_username: Option<String>,
    #[builder(default, setter(strip_option))]
    pub platform: Option<String>,
    #[builder(default, setter(strip_option))]
    pub search_type: Option<SearchType>,
    #[builder(default = 3)]
    pub max_retries: i32,
}
