//! The static table of platforms the dispatcher knows about.

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    GitHub,
    Twitter,
    Instagram,
    Facebook,
    LinkedIn,
    TikTok,
    YouTube,
    Reddit,
    Telegram,
    Mastodon,
}

/// Known hosts, matched against the target URL when the job carries no
/// explicit platform hint. Subdomains of these hosts match too.
const DOMAIN_TABLE: &[(&str, Platform)] = &[
    ("github.com", Platform::GitHub),
    ("twitter.com", Platform::Twitter),
    ("x.com", Platform::Twitter),
    ("instagram.com", Platform::Instagram),
    ("facebook.com", Platform::Facebook),
    ("fb.com", Platform::Facebook),
    ("linkedin.com", Platform::LinkedIn),
    ("tiktok.com", Platform::TikTok),
    ("youtube.com", Platform::YouTube),
    ("reddit.com", Platform::Reddit),
    ("t.me", Platform::Telegram),
    ("telegram.me", Platform::Telegram),
    ("mastodon.social", Platform::Mastodon),
];

impl Platform {
    pub const ALL: &'static [Platform] = &[
        Platform::GitHub,
        Platform::Twitter,
        Platform::Instagram,
        Platform::Facebook,
        Platform::LinkedIn,
        Platform::TikTok,
        Platform::YouTube,
        Platform::Reddit,
        Platform::Telegram,
        Platform::Mastodon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::GitHub => "github",
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::LinkedIn => "linkedin",
            Platform::TikTok => "tiktok",
            Platform::YouTube => "youtube",
            Platform::Reddit => "reddit",
            Platform::Telegram => "telegram",
            Platform::Mastodon => "mastodon",
        }
    }

    /// Parse a dashboard-supplied platform hint. Accepts a few aliases the
    /// producer is known to send.
    pub fn parse(s: &str) -> Option<Platform> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Some(Platform::GitHub),
            "twitter" | "x" => Some(Platform::Twitter),
            "instagram" | "ig" => Some(Platform::Instagram),
            "facebook" | "fb" => Some(Platform::Facebook),
            "linkedin" => Some(Platform::LinkedIn),
            "tiktok" => Some(Platform::TikTok),
            "youtube" | "yt" => Some(Platform::YouTube),
            "reddit" => Some(Platform::Reddit),
            "telegram" => Some(Platform::Telegram),
            "mastodon" => Some(Platform::Mastodon),
            _ => None,
        }
    }

    /// Infer the platform from a target URL's host.
    pub fn from_url(url: &Url) -> Option<Platform> {
        let host = url.host_str()?.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        DOMAIN_TABLE
            .iter()
            .find(|(domain, _)| {
                host == *domain || host.ends_with(&format!(".{domain}"))
            })
            .map(|(_, platform)| *platform)
    }

    /// Canonical profile URL for a username on this platform.
    pub fn profile_url(&self, username: &str) -> String {
        match self {
            Platform::GitHub => format!("https://github.com/{username}"),
            Platform::Twitter => format!("https://x.com/{username}"),
            Platform::Instagram => format!("https://www.instagram.com/{username}/"),
            Platform::Facebook => format!("https://www.facebook.com/{username}"),
            Platform::LinkedIn => format!("https://www.linkedin.com/in/{username}/"),
            Platform::TikTok => format!("https://www.tiktok.com/@{username}"),
            Platform::YouTube => format!("https://www.youtube.com/@{username}"),
            Platform::Reddit => format!("https://www.reddit.com/user/{username}/"),
            Platform::Telegram => format!("https://t.me/{username}"),
            Platform::Mastodon => format!("https://mastodon.social/@{username}"),
        }
    }
}
