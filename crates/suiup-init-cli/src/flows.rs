use std::ffi::OsString;

use anyhow::{Context, Result};
use suiup_init_core::error::{IntegrityFailure, ResolutionError, TransportError, UnsupportedPlatformError};
use suiup_init_core::{
    find_substitution, parse_latest_release, resolve_artifact, ArchSubstitution, ArtifactLocation,
    Platform, ReleaseVersion, BINARY_NAME,
};
use suiup_init_installer::{
    default_transports, default_unpackers, find_shadowing, path_contains, path_remediation,
    place_binary, resolve_install_target, shadowing_remediation, ArchiveExtractor, CleanupRegistry,
    Fetcher, InstallDirPolicy, InstallTarget, ScratchDir, ShadowingBinary, Transport, Unpacker,
};
use suiup_init_security::{
    default_hash_providers, HashProvider, IntegrityVerifier, VerificationOutcome,
    VerificationRequest,
};

use crate::config::RunConfig;
use crate::render::TerminalRenderer;

/// Ranked capability providers used by one run.
pub struct Toolbox {
    pub transports: Vec<Box<dyn Transport>>,
    pub hashers: Vec<Box<dyn HashProvider>>,
    pub unpackers: Vec<Box<dyn Unpacker>>,
}

impl Toolbox {
    pub fn host() -> Self {
        Self {
            transports: default_transports(),
            hashers: default_hash_providers(),
            unpackers: default_unpackers(),
        }
    }
}

/// Facts about the machine being installed on.
#[derive(Debug, Clone)]
pub struct HostContext {
    pub platform: Platform,
    pub path_var: OsString,
    pub install_policy: InstallDirPolicy,
}

impl HostContext {
    pub fn detect(config: &RunConfig) -> Self {
        let platform = Platform::detect();
        Self {
            platform,
            path_var: std::env::var_os("PATH").unwrap_or_default(),
            install_policy: InstallDirPolicy::from_host(platform, config.install_dir.clone()),
        }
    }
}

/// PATH membership and shadowing findings for the install directory.
#[derive(Debug, Clone, Default)]
pub struct PathCheck {
    pub on_path: bool,
    pub remediation: Vec<String>,
    pub shadowing: Vec<ShadowingBinary>,
    pub shadowing_remediation: Vec<String>,
}

impl PathCheck {
    pub fn inspect(host: &HostContext, target: &InstallTarget) -> Self {
        let os = host.platform.os;
        let on_path = path_contains(&host.path_var, &target.directory, os);
        let shadowing = find_shadowing(&host.path_var, &target.directory, host.platform);
        Self {
            on_path,
            remediation: if on_path {
                Vec::new()
            } else {
                path_remediation(&target.directory, os)
            },
            shadowing_remediation: if shadowing.is_empty() {
                Vec::new()
            } else {
                shadowing_remediation(&shadowing, &target.directory, os)
            },
            shadowing,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstallReport {
    pub version: ReleaseVersion,
    pub platform: Platform,
    pub artifact_platform: Platform,
    pub substitution: Option<&'static ArchSubstitution>,
    pub artifact: ArtifactLocation,
    /// `None` for dry runs.
    pub verification: Option<VerificationOutcome>,
    pub target: InstallTarget,
    pub dry_run: bool,
    pub path: PathCheck,
}

fn resolve_version(config: &RunConfig, fetcher: &Fetcher, ui: TerminalRenderer) -> Result<ReleaseVersion> {
    if let Some(tag) = &config.pinned_tag {
        let version = ReleaseVersion::new(tag.as_str())?;
        tracing::debug!(%version, "using pinned release");
        return Ok(version);
    }

    let url = config.source.latest_release_url();
    ui.print_status("..", &format!("looking up the latest release of {}", config.source.repo));
    let body = fetcher.fetch_text(&url, false).map_err(|err| {
        let no_transport = err
            .downcast_ref::<TransportError>()
            .filter(|cause| matches!(cause, TransportError::NoTransport { .. }));
        match no_transport {
            Some(cause) => anyhow::Error::new(cause.clone()),
            None => anyhow::Error::new(ResolutionError::MetadataUnavailable {
                url: url.clone(),
                reason: format!("{err:#}"),
            }),
        }
    })?;
    Ok(parse_latest_release(&body, &config.source.repo)?)
}

/// Runs the whole install. The first unrecovered failure aborts the run;
/// the scratch directory is removed on every exit path.
pub fn run_install(
    config: &RunConfig,
    host: &HostContext,
    toolbox: Toolbox,
    registry: &CleanupRegistry,
    ui: TerminalRenderer,
) -> Result<InstallReport> {
    let Toolbox {
        transports,
        hashers,
        unpackers,
    } = toolbox;
    let platform = host.platform;
    tracing::debug!(%platform, "detected platform");

    let fetcher = Fetcher::new(transports, config.github_token.clone());
    let version = resolve_version(config, &fetcher, ui)?;

    let substitution = if config.arch_fallback {
        find_substitution(platform)
    } else {
        None
    };
    let artifact_platform = match substitution {
        Some(rule) => {
            let substitute = platform.with_arch(rule.substitute);
            ui.print_status(
                "warn",
                &format!("{platform} has no published build; using {substitute}: {}", rule.note),
            );
            substitute
        }
        None => platform,
    };

    let artifact = resolve_artifact(&config.source, artifact_platform, &version)
        .ok_or(UnsupportedPlatformError { platform })?;
    let binary_name = artifact_platform.executable_name(BINARY_NAME);
    tracing::debug!(url = %artifact.download_url, "resolved artifact");

    let steps = InstallSteps {
        config,
        host,
        fetcher: &fetcher,
        hashers: &hashers,
        unpackers: &unpackers,
        registry,
        ui,
    };
    let installed = steps.run(&artifact, &binary_name);
    let (verification, target) = match substitution {
        Some(_) => installed.with_context(|| {
            format!("while installing the experimental {artifact_platform} build on {platform}")
        })?,
        None => installed?,
    };

    Ok(InstallReport {
        version,
        platform,
        artifact_platform,
        substitution,
        artifact,
        verification,
        path: PathCheck::inspect(host, &target),
        target,
        dry_run: config.dry_run,
    })
}

/// Download, verification, extraction and placement of one resolved
/// artifact. Dry runs only resolve the target.
struct InstallSteps<'a> {
    config: &'a RunConfig,
    host: &'a HostContext,
    fetcher: &'a Fetcher,
    hashers: &'a [Box<dyn HashProvider>],
    unpackers: &'a [Box<dyn Unpacker>],
    registry: &'a CleanupRegistry,
    ui: TerminalRenderer,
}

impl InstallSteps<'_> {
    fn run(
        &self,
        artifact: &ArtifactLocation,
        binary_name: &str,
    ) -> Result<(Option<VerificationOutcome>, InstallTarget)> {
        if self.config.dry_run {
            let target = resolve_install_target(&self.host.install_policy, binary_name)?;
            return Ok((None, target));
        }

        let scratch = ScratchDir::create(self.registry)?;
        let archive_path = scratch.join(&artifact.file_name);

        let label = match self.fetcher.transport_name() {
            Some(transport) => format!("downloading {} via {transport}", artifact.file_name),
            None => format!("downloading {}", artifact.file_name),
        };
        let progress = self.ui.start_progress(&label);
        if let Err(err) = self.fetcher.fetch(&artifact.download_url, &archive_path, false) {
            progress.finish_abandon();
            return Err(err);
        }
        progress.finish_success();

        let verification = IntegrityVerifier::new(self.hashers).verify(
            VerificationRequest {
                artifact_path: &archive_path,
                artifact_name: &artifact.file_name,
                checksum_url: artifact.checksum_url.as_deref(),
                skip_all: self.config.skip_checksum,
            },
            |url| self.fetcher.fetch_text(url, true).ok(),
        );
        match &verification {
            VerificationOutcome::Failed {
                expected,
                actual,
                checksum_content,
            } => {
                return Err(IntegrityFailure {
                    artifact: artifact.file_name.clone(),
                    expected: expected.clone(),
                    actual: actual.clone(),
                    checksum_content: checksum_content.clone(),
                }
                .into());
            }
            VerificationOutcome::Skipped(reason) => {
                tracing::info!(%reason, "checksum verification skipped");
            }
            VerificationOutcome::Verified { hash, .. } => {
                tracing::debug!(%hash, "checksum verified");
            }
        }

        let extracted = ArchiveExtractor::new(self.unpackers)
            .extract(
                &archive_path,
                &scratch.join("unpacked"),
                artifact.archive_kind,
                binary_name,
            )
            .with_context(|| format!("failed to unpack {}", artifact.file_name))?;

        let target = resolve_install_target(&self.host.install_policy, binary_name)?;
        target.ensure_directory()?;
        place_binary(&extracted, &target)?;
        drop(scratch);

        Ok((Some(verification), target))
    }
}
