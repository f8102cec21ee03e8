//! Generic profile scraper: fetch one page, extract identity and counters.
//!
//! Fetches only the target document (no subresources) with a browser-like
//! User-Agent, then works off meta tags and visible text. Platform-specific
//! markup differences are absorbed by the og:/meta fallback chain rather
//! than per-site selectors.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::payload::{ContactInfo, ProfileInfo, ScrapedPayload};
use super::{FailureKind, ScrapeOutcome, Scraper};
use crate::jobs::ScrapeJob;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap();
    // International format only; anything looser drowns in false positives.
    static ref PHONE_RE: Regex = Regex::new(r"\+[0-9][0-9 ().-]{6,}[0-9]").unwrap();
    static ref STAT_RE: Regex = Regex::new(
        r"(?i)([0-9][0-9.,]*\s*[KMB]?)\s+(followers|following|posts|tweets|subscribers|repositories|stars|connections|karma)"
    )
    .unwrap();
}

/// Page titles that mean the profile does not exist.
const NOT_FOUND_MARKERS: &[&str] = &[
    "page not found",
    "not found",
    "isn't available",
    "doesn't exist",
    "user not found",
    "account suspended",
];

pub struct ProfileScraper {
    client: reqwest::Client,
}

impl ProfileScraper {
    pub fn new(timeout: Duration) -> Result<Self> {
        // Browser-like User-Agent to avoid the most naive bot detection
        let user_agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .parse()
                .context("invalid Accept header")?,
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            "en-US,en;q=0.5".parse().context("invalid Accept-Language header")?,
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Fetch and extract one URL, classifying failures instead of erroring.
    pub(crate) async fn probe(&self, url: &str, username_hint: Option<&str>) -> ScrapeOutcome {
        debug!(url = %url, "Probing profile page");

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() || e.is_connect() => {
                return ScrapeOutcome::failure(
                    FailureKind::Timeout,
                    format!("request to {url} timed out or could not connect: {e}"),
                );
            }
            Err(e) => {
                return ScrapeOutcome::failure(
                    FailureKind::Unexpected,
                    format!("request to {url} failed: {e}"),
                );
            }
        };

        let status = response.status();
        match status.as_u16() {
            404 | 410 => {
                return ScrapeOutcome::failure(
                    FailureKind::NotFound,
                    format!("{url} returned HTTP {status}"),
                );
            }
            401 | 403 | 429 | 503 => {
                return ScrapeOutcome::failure(
                    FailureKind::Blocked,
                    format!("{url} refused the request with HTTP {status}"),
                );
            }
            s if !status.is_success() => {
                return ScrapeOutcome::failure(
                    FailureKind::Unexpected,
                    format!("{url} returned HTTP {s}"),
                );
            }
            _ => {}
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                return ScrapeOutcome::failure(
                    FailureKind::Unexpected,
                    format!("failed to read body from {url}: {e}"),
                );
            }
        };

        extract_payload(&body, username_hint)
    }
}

#[async_trait]
impl Scraper for ProfileScraper {
    async fn scrape(&self, job: &ScrapeJob) -> Result<ScrapeOutcome> {
        // A row that reaches us with a bad URL is malformed producer input,
        // not a transient condition.
        Url::parse(&job.target_url)
            .with_context(|| format!("malformed target URL: {}", job.target_url))?;

        let hint = job.username_hint();
        Ok(self.probe(&job.target_url, hint.as_deref()).await)
    }
}

/// Pull the normalized payload out of a fetched document. Pure so the
/// extraction rules are testable without network I/O.
fn extract_payload(html: &str, username_hint: Option<&str>) -> ScrapeOutcome {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    if let Some(title) = &title {
        let lowered = title.to_lowercase();
        if NOT_FOUND_MARKERS.iter().any(|m| lowered.contains(m)) {
            return ScrapeOutcome::failure(
                FailureKind::NotFound,
                format!("target page reports: {title}"),
            );
        }
    }

    let description = meta_content(&document, "meta[property='og:description']")
        .or_else(|| meta_content(&document, "meta[name='description']"));

    let profile = ProfileInfo {
        username: username_hint.map(str::to_string),
        display_name: meta_content(&document, "meta[property='og:title']").or(title),
        bio: description.clone(),
        avatar_url: meta_content(&document, "meta[property='og:image']"),
        ..Default::default()
    };

    let text = visible_text(&document);
    let mut payload = ScrapedPayload::default();

    for capture in STAT_RE.captures_iter(&text) {
        if let Some(count) = parse_count(&capture[1]) {
            payload
                .stats
                .entry(capture[2].to_lowercase())
                .or_insert(count);
        }
    }
    // Stats hide in the description on platforms that render client-side.
    if let Some(desc) = &description {
        for capture in STAT_RE.captures_iter(desc) {
            if let Some(count) = parse_count(&capture[1]) {
                payload
                    .stats
                    .entry(capture[2].to_lowercase())
                    .or_insert(count);
            }
        }
    }

    let contact = extract_contact(&text);
    if !contact.is_empty() {
        payload.contact = Some(contact);
    }

    if !profile.is_empty() {
        payload.profile = Some(profile);
    }

    ScrapeOutcome::Success(payload.with_raw_excerpt(&page_excerpt(&document, html)))
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;
    document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Concatenated page text, used for the pattern scans.
fn visible_text(document: &Html) -> String {
    let body = Selector::parse("body").ok();
    let root = body
        .as_ref()
        .and_then(|s| document.select(s).next())
        .unwrap_or_else(|| document.root_element());

    root.text().collect::<Vec<_>>().join(" ")
}

/// Markdown rendering of the main content area, for the debug excerpt.
fn page_excerpt(document: &Html, raw_html: &str) -> String {
    let main_selectors = ["main", "article", "[role='main']", "#content", "body"];

    for selector_str in main_selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(main) = document.select(&selector).next() {
                let html = main.html();
                return htmd::convert(&html).unwrap_or_else(|_| visible_text(document));
            }
        }
    }

    htmd::convert(raw_html).unwrap_or_else(|_| visible_text(document))
}

fn extract_contact(text: &str) -> ContactInfo {
    let mut contact = ContactInfo::default();

    for m in EMAIL_RE.find_iter(text) {
        let email = m.as_str().to_lowercase();
        if !contact.emails.contains(&email) {
            contact.emails.push(email);
        }
    }

    for m in PHONE_RE.find_iter(text) {
        let phone = m.as_str().trim().to_string();
        if !contact.phones.contains(&phone) {
            contact.phones.push(phone);
        }
    }

    contact
}

/// Normalize a display count ("1,234", "1.2K", "3M") into an integer.
pub(crate) fn parse_count(raw: &str) -> Option<i64> {
    let cleaned: String = raw.trim().replace(',', "").replace(' ', "");
    if cleaned.is_empty() {
        return None;
    }

    let (digits, multiplier) = match cleaned.chars().next_back()? {
        'k' | 'K' => (&cleaned[..cleaned.len() - 1], 1_000_f64),
        'm' | 'M' => (&cleaned[..cleaned.len() - 1], 1_000_000_f64),
        'b' | 'B' => (&cleaned[..cleaned.len() - 1], 1_000_000_000_f64),
        _ => (cleaned.as_str(), 1_f64),
    };

    let value: f64 = digits.parse().ok()?;
    Some((value * multiplier).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_HTML: &str = r#"
        <html>
          <head>
            <title>Octo Cat (@octocat)</title>
            <meta property="og:title" content="Octo Cat" />
            <meta property="og:description" content="1.2K Followers, 42 Following, 128 Posts - Building things" />
            <meta property="og:image" content="https://cdn.example.com/octocat.png" />
          </head>
          <body>
            <main>
              <h1>Octo Cat</h1>
              <p>Reach me at octo@example.com or +1 (555) 010-0199</p>
            </main>
          </body>
        </html>
    "#;

    #[test]
    fn parses_plain_and_suffixed_counts() {
        assert_eq!(parse_count("1234"), Some(1234));
        assert_eq!(parse_count("1,234"), Some(1234));
        assert_eq!(parse_count("1.2K"), Some(1200));
        assert_eq!(parse_count("3.4M"), Some(3_400_000));
        assert_eq!(parse_count("2B"), Some(2_000_000_000));
        assert_eq!(parse_count("1.5 k"), Some(1500));
        assert_eq!(parse_count("followers"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn extracts_profile_from_meta_tags() {
        let outcome = extract_payload(PROFILE_HTML, Some("octocat"));
        let ScrapeOutcome::Success(payload) = outcome else {
            panic!("expected success");
        };

        let profile = payload.profile.expect("profile section");
        assert_eq!(profile.username.as_deref(), Some("octocat"));
        assert_eq!(profile.display_name.as_deref(), Some("Octo Cat"));
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://cdn.example.com/octocat.png")
        );
    }

    #[test]
    fn normalizes_stats_from_description() {
        let outcome = extract_payload(PROFILE_HTML, None);
        let ScrapeOutcome::Success(payload) = outcome else {
            panic!("expected success");
        };

        assert_eq!(payload.stats.get("followers"), Some(&1200));
        assert_eq!(payload.stats.get("following"), Some(&42));
        assert_eq!(payload.stats.get("posts"), Some(&128));
    }

    #[test]
    fn harvests_contact_details() {
        let outcome = extract_payload(PROFILE_HTML, None);
        let ScrapeOutcome::Success(payload) = outcome else {
            panic!("expected success");
        };

        let contact = payload.contact.expect("contact section");
        assert_eq!(contact.emails, vec!["octo@example.com".to_string()]);
        assert_eq!(contact.phones, vec!["+1 (555) 010-0199".to_string()]);
    }

    #[test]
    fn not_found_titles_become_soft_failures() {
        let html = "<html><head><title>Page Not Found</title></head><body></body></html>";
        let outcome = extract_payload(html, Some("ghost"));
        assert_eq!(
            outcome,
            ScrapeOutcome::failure(
                FailureKind::NotFound,
                "target page reports: Page Not Found"
            )
        );
    }

    #[test]
    fn empty_page_is_still_a_success() {
        let html = "<html><head></head><body></body></html>";
        let outcome = extract_payload(html, None);
        assert!(outcome.is_success());
    }
}
