use std::fmt;
use std::path::Path;

use crate::checksum::{parse_checksum, ChecksumAlgorithm};
use crate::hasher::HashProvider;

pub const SKIP_ENV_VAR: &str = "SUIUP_SKIP_CHECKSUM";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ExplicitlyDisabled,
    NoChecksumPublished,
    ChecksumUnavailable { url: String },
    NoHashTool { algorithm: ChecksumAlgorithm },
    HashToolFailed { algorithm: ChecksumAlgorithm, errors: Vec<String> },
    UnparsableChecksum { url: String, content: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExplicitlyDisabled => {
                write!(f, "Explicitly skipped via {SKIP_ENV_VAR}=true")
            }
            Self::NoChecksumPublished => {
                write!(f, "no checksum file is published for this release")
            }
            Self::ChecksumUnavailable { url } => {
                write!(f, "checksum file could not be downloaded from {url}")
            }
            Self::NoHashTool { algorithm } => {
                write!(f, "no {algorithm} hashing tool is available on this system")
            }
            Self::HashToolFailed { algorithm, errors } => write!(
                f,
                "every available {algorithm} hashing tool failed: {}",
                errors.join("; ")
            ),
            Self::UnparsableChecksum { url, .. } => {
                write!(f, "checksum file from {url} did not contain a recognizable hash")
            }
        }
    }
}

/// Result of integrity verification. Only `Failed` is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified {
        algorithm: ChecksumAlgorithm,
        hash: String,
        provider: &'static str,
    },
    Skipped(SkipReason),
    Failed {
        expected: String,
        actual: String,
        checksum_content: String,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct VerificationRequest<'a> {
    pub artifact_path: &'a Path,
    pub artifact_name: &'a str,
    pub checksum_url: Option<&'a str>,
    pub skip_all: bool,
}

pub struct IntegrityVerifier<'a> {
    hashers: &'a [Box<dyn HashProvider>],
}

impl<'a> IntegrityVerifier<'a> {
    pub fn new(hashers: &'a [Box<dyn HashProvider>]) -> Self {
        Self { hashers }
    }

    /// Runs the verification state machine.
    ///
    /// `fetch_checksum` is only invoked once the skip-all flag and the
    /// checksum URL have been checked, and returns `None` when the checksum
    /// file could not be retrieved.
    pub fn verify<F>(&self, request: VerificationRequest<'_>, fetch_checksum: F) -> VerificationOutcome
    where
        F: FnOnce(&str) -> Option<String>,
    {
        if request.skip_all {
            tracing::debug!("checksum verification disabled by operator");
            return VerificationOutcome::Skipped(SkipReason::ExplicitlyDisabled);
        }

        let Some(url) = request.checksum_url else {
            return VerificationOutcome::Skipped(SkipReason::NoChecksumPublished);
        };
        let algorithm = ChecksumAlgorithm::from_checksum_url(url);

        let Some(content) = fetch_checksum(url) else {
            return VerificationOutcome::Skipped(SkipReason::ChecksumUnavailable {
                url: url.to_string(),
            });
        };

        let record = match parse_checksum(&content, Some(request.artifact_name), algorithm) {
            Ok(record) => record,
            Err(err) => {
                tracing::debug!(error = %err, url, "checksum file not parsable");
                return VerificationOutcome::Skipped(SkipReason::UnparsableChecksum {
                    url: url.to_string(),
                    content,
                });
            }
        };

        let (actual, provider) = match self.compute(request.artifact_path, algorithm) {
            Ok(computed) => computed,
            Err(reason) => return VerificationOutcome::Skipped(reason),
        };

        if actual.eq_ignore_ascii_case(&record.expected_hex) {
            VerificationOutcome::Verified {
                algorithm,
                hash: actual,
                provider,
            }
        } else {
            VerificationOutcome::Failed {
                expected: record.expected_hex,
                actual,
                checksum_content: content,
            }
        }
    }

    fn compute(
        &self,
        path: &Path,
        algorithm: ChecksumAlgorithm,
    ) -> Result<(String, &'static str), SkipReason> {
        let mut errors = Vec::new();
        for hasher in self
            .hashers
            .iter()
            .filter(|hasher| hasher.supports(algorithm) && hasher.is_available())
        {
            match hasher.hash_file(path, algorithm) {
                Ok(digest) => {
                    tracing::debug!(provider = hasher.name(), %algorithm, "computed artifact hash");
                    return Ok((digest.to_ascii_lowercase(), hasher.name()));
                }
                Err(err) => {
                    tracing::debug!(provider = hasher.name(), error = %err, "hash provider failed");
                    errors.push(format!("{err:#}"));
                }
            }
        }

        if errors.is_empty() {
            Err(SkipReason::NoHashTool { algorithm })
        } else {
            Err(SkipReason::HashToolFailed { algorithm, errors })
        }
    }
}
