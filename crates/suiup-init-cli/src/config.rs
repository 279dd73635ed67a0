use std::path::PathBuf;

use clap::Parser;
use suiup_init_core::{ReleaseSource, DEFAULT_REPO};
use suiup_init_security::SKIP_ENV_VAR;

use crate::render::OutputStyle;

pub const LOG_ENV_VAR: &str = "SUIUP_INIT_LOG";

#[derive(Parser, Debug, Default)]
#[command(name = "suiup-init")]
#[command(version, about = "Install the suiup binary from GitHub Releases", long_about = None)]
pub struct Cli {
    /// Release tag to install instead of the latest release
    #[arg(long, env = "SUIUP_VERSION", value_name = "TAG")]
    pub tag: Option<String>,
    /// Directory to place the binary in
    #[arg(long, env = "SUIUP_INSTALL_DIR", value_name = "DIR")]
    pub install_dir: Option<PathBuf>,
    /// Skip checksum verification (also SUIUP_SKIP_CHECKSUM=true)
    #[arg(long)]
    pub skip_checksum: bool,
    /// Token sent as a bearer credential to GitHub
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub github_token: Option<String>,
    /// Repository to install from
    #[arg(long, env = "SUIUP_REPO", value_name = "OWNER/NAME")]
    pub repo: Option<String>,
    /// Fail instead of installing a substitute architecture build
    #[arg(long)]
    pub no_arch_fallback: bool,
    /// Resolve and print the plan without downloading anything
    #[arg(long)]
    pub dry_run: bool,
    /// Disable badges, colors and spinners
    #[arg(long)]
    pub plain: bool,
    /// Emit debug diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub source: ReleaseSource,
    pub pinned_tag: Option<String>,
    pub install_dir: Option<PathBuf>,
    pub skip_checksum: bool,
    pub github_token: Option<String>,
    pub arch_fallback: bool,
    pub dry_run: bool,
    pub output: OutputStyle,
    pub log_filter: String,
}

impl RunConfig {
    /// Folds parsed flags and the environment variables clap does not read
    /// itself into the settings of one run. `env` is consulted only for
    /// `SUIUP_SKIP_CHECKSUM`, `NO_COLOR` and `SUIUP_INIT_LOG`.
    pub fn from_cli<F>(cli: Cli, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let skip_from_env = env(SKIP_ENV_VAR).is_some_and(|value| value == "true");
        let no_color = env("NO_COLOR").is_some_and(|value| !value.is_empty());
        let log_filter = env(LOG_ENV_VAR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| {
                if cli.verbose {
                    "debug".to_string()
                } else {
                    "warn".to_string()
                }
            });

        let repo = cli
            .repo
            .map(|value| value.trim().trim_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_REPO.to_string());

        Self {
            source: ReleaseSource::github(repo),
            pinned_tag: cli.tag,
            install_dir: cli.install_dir.filter(|dir| !dir.as_os_str().is_empty()),
            skip_checksum: cli.skip_checksum || skip_from_env,
            github_token: cli.github_token.filter(|token| !token.trim().is_empty()),
            arch_fallback: !cli.no_arch_fallback,
            dry_run: cli.dry_run,
            output: if cli.plain || no_color {
                OutputStyle::Plain
            } else {
                OutputStyle::Rich
            },
            log_filter,
        }
    }
}
