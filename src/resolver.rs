use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::error::Error;

/// Prefix every short link is built from
pub const SHORT_URL_PREFIX: &str = "https://youtu.be/";

static WATCH_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?youtube\.com/watch\?v=[A-Za-z0-9_-]+").expect("watch url pattern")
});

static SHORT_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://youtu\.be/([A-Za-z0-9_-]+)").expect("short url pattern"));

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Longest prefix of `s` made of identifier characters
fn leading_id(s: &str) -> &str {
    let end = s.find(|c: char| !is_id_char(c)).unwrap_or(s.len());
    &s[..end]
}

/// Check whether `url` starts with a recognized YouTube video link.
///
/// Two shapes are accepted, matched case-sensitively from the start of the string:
/// `http(s)://[www.]youtube.com/watch?v=ID` and `http(s)://youtu.be/ID`.
/// Anything after the identifier is ignored.
pub fn is_youtube_url(url: &str) -> bool {
    WATCH_URL.is_match(url) || SHORT_URL.is_match(url)
}

/// Extract the video identifier from a recognized YouTube link.
///
/// For `youtube.com` the first `v` query value is used; for `youtu.be` the first
/// path segment. Either way the identifier stops at the first character outside
/// `[A-Za-z0-9_-]`, so trailing path segments, queries and fragments never leak in.
pub fn get_video_id(url: &str) -> Option<String> {
    if !is_youtube_url(url) {
        return None;
    }

    if let Some(caps) = SHORT_URL.captures(url) {
        return Some(caps[1].to_string());
    }

    let parsed = Url::parse(url).ok()?;
    match parsed.host_str()? {
        "youtube.com" | "www.youtube.com" => parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| leading_id(&value).to_string())
            .filter(|id| !id.is_empty()),
        _ => None,
    }
}

/// Rewrite any recognized YouTube link as `https://youtu.be/ID`.
///
/// Unrecognized input is returned unchanged.
pub fn shorten_youtube_url(url: &str) -> String {
    if !is_youtube_url(url) {
        return url.to_string();
    }

    match get_video_id(url) {
        Some(id) if !id.is_empty() => format!("{SHORT_URL_PREFIX}{id}"),
        _ => url.to_string(),
    }
}

/// Full watch page link for an identifier
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Resolve `url` to its video identifier or fail with [`Error::InvalidUrl`].
pub fn require_video_id(url: &str) -> Result<String, Error> {
    get_video_id(url).ok_or_else(|| Error::InvalidUrl(url.to_string()))
}

/// A single video identity taken from user input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoRef {
    pub raw_url: String,
    pub video_id: Option<String>,
}

impl VideoRef {
    pub fn parse(raw_url: &str) -> Self {
        Self {
            raw_url: raw_url.to_string(),
            video_id: get_video_id(raw_url),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.video_id.is_some()
    }

    pub fn short_url(&self) -> Option<String> {
        self.video_id.as_ref().map(|id| format!("{SHORT_URL_PREFIX}{id}"))
    }

    pub fn watch_url(&self) -> Option<String> {
        self.video_id.as_deref().map(watch_url)
    }
}
