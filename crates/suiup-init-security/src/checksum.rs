use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    Sha256,
    Md5,
}

impl ChecksumAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Md5 => "MD5",
        }
    }

    pub fn hex_len(self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Md5 => 32,
        }
    }

    /// Legacy `.md5` checksum files are MD5; everything else is SHA-256.
    pub fn from_checksum_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        let path = lower.split(['?', '#']).next().unwrap_or(&lower);
        if path.ends_with(".md5") {
            Self::Md5
        } else {
            Self::Sha256
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumRecord {
    pub algorithm: ChecksumAlgorithm,
    pub expected_hex: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no {algorithm} hash ({len} hex characters) found in checksum file")]
pub struct ChecksumParseError {
    pub algorithm: ChecksumAlgorithm,
    pub len: usize,
}

/// Extracts the expected hash for `target_filename` from a checksum file.
///
/// Tried in order, first hit wins:
/// 1. a hash token on a line mentioning the target basename (case-insensitive);
/// 2. the first line that starts with a hash token;
/// 3. the first standalone hash anywhere, bounded by non-alphanumerics;
/// 4. the canonical `hash  name` / `hash *name` layout, including the
///    unspaced `hash*name` form.
pub fn parse_checksum(
    contents: &str,
    target_filename: Option<&str>,
    algorithm: ChecksumAlgorithm,
) -> Result<ChecksumRecord, ChecksumParseError> {
    let len = algorithm.hex_len();
    let found = target_filename
        .and_then(|name| find_on_named_line(contents, name, algorithm))
        .or_else(|| find_leading_token(contents, len))
        .or_else(|| find_standalone(contents, algorithm))
        .or_else(|| find_canonical(contents, algorithm));

    match found {
        Some(hash) => Ok(ChecksumRecord {
            algorithm,
            expected_hex: hash.to_ascii_lowercase(),
        }),
        None => Err(ChecksumParseError { algorithm, len }),
    }
}

fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

fn is_hex_of_len(token: &str, len: usize) -> bool {
    token.len() == len && token.bytes().all(|b| b.is_ascii_hexdigit())
}

/// First hash of the algorithm's length bounded by non-alphanumeric
/// characters, so `sha256:<hex>` and `"<hex>"` match but longer hex runs
/// do not.
fn find_standalone(text: &str, algorithm: ChecksumAlgorithm) -> Option<String> {
    static SHA256_TOKEN: OnceLock<Regex> = OnceLock::new();
    static MD5_TOKEN: OnceLock<Regex> = OnceLock::new();
    let cell = match algorithm {
        ChecksumAlgorithm::Sha256 => &SHA256_TOKEN,
        ChecksumAlgorithm::Md5 => &MD5_TOKEN,
    };
    let pattern = cell.get_or_init(|| {
        Regex::new(&format!(
            r"(?:^|[^0-9A-Za-z])([0-9A-Fa-f]{{{}}})(?:$|[^0-9A-Za-z])",
            algorithm.hex_len()
        ))
        .expect("standalone hash pattern is valid")
    });
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str().to_string())
}

fn find_on_named_line(contents: &str, target: &str, algorithm: ChecksumAlgorithm) -> Option<String> {
    let needle = basename(target.trim()).to_ascii_lowercase();
    if needle.is_empty() {
        return None;
    }
    contents
        .lines()
        .filter(|line| line.to_ascii_lowercase().contains(&needle))
        .find_map(|line| find_standalone(line, algorithm))
}

fn find_leading_token(contents: &str, len: usize) -> Option<String> {
    contents
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(|token| token.trim_start_matches('\\'))
        .find(|token| is_hex_of_len(token, len))
        .map(str::to_string)
}

fn find_canonical(contents: &str, algorithm: ChecksumAlgorithm) -> Option<String> {
    static SHA256_LINE: OnceLock<Regex> = OnceLock::new();
    static MD5_LINE: OnceLock<Regex> = OnceLock::new();
    let cell = match algorithm {
        ChecksumAlgorithm::Sha256 => &SHA256_LINE,
        ChecksumAlgorithm::Md5 => &MD5_LINE,
    };
    let pattern = cell.get_or_init(|| {
        Regex::new(&format!(
            r"(?m)^\\?([0-9A-Fa-f]{{{}}})(?:[ \t]+\*?|\*)\S",
            algorithm.hex_len()
        ))
        .expect("canonical checksum pattern is valid")
    });
    pattern
        .captures(contents)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str().to_string())
}
