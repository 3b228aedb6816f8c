//! Video references.
//!
//! Normalizes the many shapes of a YouTube link into one canonical watch URL,
//! which makes search-grounded analysis far more reliable.

mod youtube;

pub use youtube::YoutubeMatcher;

use crate::error::{ReplicatorError, Result};
use serde::{Deserialize, Serialize};

/// Type of video reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    YouTube,
    /// Any other URL, passed through unchanged.
    Web,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::YouTube => write!(f, "youtube"),
            SourceType::Web => write!(f, "web"),
        }
    }
}

/// A tutorial video to analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoReference {
    /// Canonical URL handed to the collaborators.
    pub url: String,
    /// YouTube video id, when known.
    pub video_id: Option<String>,
    pub source_type: SourceType,
}

impl VideoReference {
    /// Parse user input into a reference.
    ///
    /// Accepts YouTube watch / short / embed links, bare 11-character ids,
    /// http(s) URLs, and host-and-path references without a scheme
    /// (`vimeo.com/123`), which are kept as typed.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ReplicatorError::InvalidInput("No video reference provided".into()));
        }

        if let Some(video_id) = YoutubeMatcher::new().extract_video_id(input) {
            return Ok(Self {
                url: YoutubeMatcher::watch_url(&video_id),
                video_id: Some(video_id),
                source_type: SourceType::YouTube,
            });
        }

        if is_web_url(input) {
            return Ok(Self {
                url: sanitize_url(input),
                video_id: None,
                source_type: SourceType::Web,
            });
        }

        Err(ReplicatorError::InvalidInput(format!(
            "Not a video URL or YouTube id: {}",
            input
        )))
    }

    /// Stable identifier for temp files and logs.
    pub fn slug(&self) -> String {
        match &self.video_id {
            Some(id) => id.clone(),
            None => format!("video-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]),
        }
    }
}

/// An http(s) URL, or a `host.tld/...` reference that becomes one with `https://`.
fn is_web_url(input: &str) -> bool {
    if input.chars().any(char::is_whitespace) {
        return false;
    }
    let candidate = if input.contains("://") {
        url::Url::parse(input)
    } else {
        url::Url::parse(&format!("https://{}", input))
    };
    match candidate {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|host| host.contains('.'))
        }
        Err(_) => false,
    }
}

/// Convert a YouTube link to `https://www.youtube.com/watch?v=<id>`.
///
/// Short links and watch links with extra parameters are rewritten. Anything
/// else is returned trimmed.
pub fn sanitize_url(url: &str) -> String {
    let url = url.trim();

    if let Some((_, rest)) = url.split_once("youtu.be/") {
        let video_id = rest.split(['?', '&', '#']).next().unwrap_or_default();
        if !video_id.is_empty() {
            return YoutubeMatcher::watch_url(video_id);
        }
    }

    if url.contains("youtube.com/watch") {
        if let Ok(parsed) = url::Url::parse(url) {
            if let Some((_, id)) = parsed.query_pairs().find(|(k, _)| k == "v") {
                if !id.is_empty() {
                    return YoutubeMatcher::watch_url(&id);
                }
            }
        }
    }

    url.to_string()
}
