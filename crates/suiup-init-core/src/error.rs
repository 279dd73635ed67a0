//! Error taxonomy for the install pipeline.
//!
//! Flows propagate `anyhow::Error`; the variants here are attached at the
//! point a failure becomes categorisable so the binary can downcast them and
//! print remediation steps.

use std::path::PathBuf;

use thiserror::Error;

use crate::platform::Platform;

#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error("release metadata did not contain a tag_name (repo={repo})")]
    MissingTag { repo: String },
    #[error("release version must not be empty")]
    EmptyVersion,
    #[error("failed to fetch release metadata from {url}: {reason}")]
    MetadataUnavailable { url: String, reason: String },
}

#[derive(Debug, Clone, Error)]
#[error("no release artifact is published for platform {platform}")]
pub struct UnsupportedPlatformError {
    pub platform: Platform,
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("no HTTP client is available (tried: {tried})")]
    NoTransport { tried: String },
    #[error("{provider} request for {url} failed: {reason}")]
    Request {
        provider: &'static str,
        url: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Error)]
#[error("checksum mismatch for {artifact}: expected {expected}, got {actual}")]
pub struct IntegrityFailure {
    pub artifact: String,
    pub expected: String,
    pub actual: String,
    pub checksum_content: String,
}

#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("no extraction tool available for {kind} archives (tried: {tried})")]
    NoCapability { kind: &'static str, tried: String },
    #[error("{provider} failed to extract {archive}: {reason}")]
    Failed {
        provider: &'static str,
        archive: PathBuf,
        reason: String,
    },
    #[error("archive did not contain the expected binary '{binary}'")]
    BinaryNotFound { binary: String },
    #[error("archive entry {path} is not a regular file; refusing to install it")]
    NotRegularFile { path: PathBuf },
}

#[derive(Debug, Clone, Error)]
#[error("failed to place binary at {target}: {reason}")]
pub struct PlacementError {
    pub target: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Error)]
pub enum InstallError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    UnsupportedPlatform(#[from] UnsupportedPlatformError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Integrity(#[from] IntegrityFailure),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error("installation interrupted")]
    Interrupted,
}

impl InstallError {
    /// Finds the first categorisable failure in an error's cause chain.
    pub fn from_chain<'a, I>(chain: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a (dyn std::error::Error + 'static)>,
    {
        chain.into_iter().find_map(|cause| {
            if let Some(err) = cause.downcast_ref::<InstallError>() {
                return Some(err.clone());
            }
            if let Some(err) = cause.downcast_ref::<ResolutionError>() {
                return Some(err.clone().into());
            }
            if let Some(err) = cause.downcast_ref::<UnsupportedPlatformError>() {
                return Some(err.clone().into());
            }
            if let Some(err) = cause.downcast_ref::<TransportError>() {
                return Some(err.clone().into());
            }
            if let Some(err) = cause.downcast_ref::<IntegrityFailure>() {
                return Some(err.clone().into());
            }
            if let Some(err) = cause.downcast_ref::<ExtractionError>() {
                return Some(err.clone().into());
            }
            cause
                .downcast_ref::<PlacementError>()
                .map(|err| err.clone().into())
        })
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Resolution(_) => "version resolution failed",
            Self::UnsupportedPlatform(_) => "unsupported platform",
            Self::Transport(_) => "download failed",
            Self::Integrity(_) => "integrity check failed",
            Self::Extraction(_) => "extraction failed",
            Self::Placement(_) => "installation failed",
            Self::Interrupted => "interrupted",
        }
    }

    /// Concrete next steps printed after the error line.
    pub fn remediation(&self) -> Vec<String> {
        match self {
            Self::Resolution(_) => vec![
                "check your network connection and that api.github.com is reachable".to_string(),
                "set GITHUB_TOKEN to raise the anonymous API rate limit".to_string(),
                "pin a release explicitly with --tag <TAG> (or SUIUP_VERSION)".to_string(),
            ],
            Self::UnsupportedPlatform(err) => vec![
                format!(
                    "no prebuilt suiup exists for {}; build from source with `cargo install --git https://github.com/MystenLabs/suiup`",
                    err.platform
                ),
                "if you believe this platform should be supported, file an issue at https://github.com/MystenLabs/suiup/issues".to_string(),
            ],
            Self::Transport(TransportError::NoTransport { .. }) => vec![
                "install curl or wget with your package manager (e.g. `apt install curl`, `brew install curl`)".to_string(),
                "or download the release archive manually from https://github.com/MystenLabs/suiup/releases".to_string(),
            ],
            Self::Transport(TransportError::Request { .. }) => vec![
                "check your network connection and retry".to_string(),
                "set GITHUB_TOKEN if you are being rate limited".to_string(),
            ],
            Self::Integrity(_) => vec![
                "the download may be corrupted or tampered with; retry the installation".to_string(),
                "if the mismatch persists, file an issue at https://github.com/MystenLabs/suiup/issues".to_string(),
                "set SUIUP_SKIP_CHECKSUM=true only if you trust the source and accept the risk".to_string(),
            ],
            Self::Extraction(ExtractionError::NoCapability { kind, .. }) => {
                let mut lines = Vec::new();
                if *kind == "zip" {
                    lines.push("install unzip (`apt install unzip`, `brew install unzip`, `choco install unzip`)".to_string());
                    lines.push("or ensure PowerShell is on PATH to use Expand-Archive".to_string());
                } else {
                    lines.push("install tar and gzip with your package manager".to_string());
                }
                lines.push("or extract the downloaded archive manually and copy the binary onto your PATH".to_string());
                lines
            }
            Self::Extraction(_) => vec![
                "the archive may be corrupt; retry the installation".to_string(),
                "or download and extract the release manually from https://github.com/MystenLabs/suiup/releases".to_string(),
            ],
            Self::Placement(_) => vec![
                "choose a writable directory with --install-dir <DIR> (or SUIUP_INSTALL_DIR)".to_string(),
            ],
            Self::Interrupted => vec!["re-run the installer to start over".to_string()],
        }
    }
}
