use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::ResolutionError;

pub const DEFAULT_REPO: &str = "MystenLabs/suiup";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://github.com";

/// A release tag as published by the release host. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    pub fn new(tag: impl Into<String>) -> Result<Self, ResolutionError> {
        let tag = tag.into();
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(ResolutionError::EmptyVersion);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    pub repo: String,
    pub api_base: String,
    pub download_base: String,
}

impl Default for ReleaseSource {
    fn default() -> Self {
        Self::github(DEFAULT_REPO)
    }
}

impl ReleaseSource {
    pub fn github(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            download_base: DEFAULT_DOWNLOAD_BASE.to_string(),
        }
    }

    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/releases/latest",
            self.api_base.trim_end_matches('/'),
            self.repo
        )
    }

    pub fn download_url(&self, version: &ReleaseVersion, file_name: &str) -> String {
        format!(
            "{}/{}/releases/download/{}/{}",
            self.download_base.trim_end_matches('/'),
            self.repo,
            version,
            file_name
        )
    }
}

#[derive(Debug, Deserialize)]
struct LatestReleaseDocument {
    #[serde(default)]
    tag_name: Option<String>,
}

/// Extracts the `tag_name` field from a "latest release" metadata document.
///
/// Bodies that are not valid JSON (truncated responses, HTML error pages with
/// an embedded payload) are scanned with a whitespace-tolerant pattern.
pub fn parse_latest_release(body: &str, repo: &str) -> Result<ReleaseVersion, ResolutionError> {
    let tag = match serde_json::from_str::<LatestReleaseDocument>(body) {
        Ok(document) => document.tag_name,
        Err(err) => {
            tracing::debug!(error = %err, "release metadata is not valid JSON, scanning for tag_name");
            scan_tag_name(body)
        }
    };

    match tag {
        Some(tag) if !tag.trim().is_empty() => ReleaseVersion::new(tag),
        _ => Err(ResolutionError::MissingTag {
            repo: repo.to_string(),
        }),
    }
}

fn scan_tag_name(body: &str) -> Option<String> {
    static TAG_NAME: OnceLock<Regex> = OnceLock::new();
    let pattern = TAG_NAME.get_or_init(|| {
        Regex::new(r#""tag_name"\s*:\s*"([^"]*)""#).expect("tag_name pattern is valid")
    });
    pattern
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str().to_string())
}
