use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use suiup_init_core::error::TransportError;
use suiup_init_core::escape_ps_single_quote;
use tempfile::NamedTempFile;

use crate::command::{command_exists, run_command, run_command_capture};
use crate::fs_utils::remove_file_if_exists;

const USER_AGENT: &str = concat!("suiup-init/", env!("CARGO_PKG_VERSION"));

/// One way of performing HTTP GET requests on this host.
pub trait Transport {
    fn name(&self) -> &'static str;
    fn is_available(&self) -> bool;
    fn fetch(&self, url: &str, dest: &Path, auth: Option<&str>) -> Result<()>;
    fn fetch_text(&self, url: &str, auth: Option<&str>) -> Result<String>;
}

const AUTH_ENV_VAR: &str = "SUIUP_INIT_AUTH_TOKEN";

fn bearer(token: &str) -> String {
    format!("Authorization: Bearer {token}")
}

/// A child command plus the private file holding its auth header. The file
/// must outlive the child, so both travel together.
pub(crate) struct PreparedCommand {
    pub(crate) command: Command,
    pub(crate) auth_file: Option<NamedTempFile>,
}

/// Writes `contents` to a temp file readable only by the current user, so
/// credentials stay out of the child's argv.
fn private_file(contents: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("suiup-init-auth-")
        .tempfile()
        .context("failed to create auth header file")?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.flush())
        .context("failed to write auth header file")?;
    Ok(file)
}

pub struct CurlTransport;

impl CurlTransport {
    pub(crate) fn prepare(url: &str, auth: Option<&str>) -> Result<PreparedCommand> {
        let mut command = Command::new("curl");
        command.arg("-fsSL").arg("-A").arg(USER_AGENT);
        let auth_file = match auth {
            Some(token) => {
                let file = private_file(&format!("{}\n", bearer(token)))?;
                let mut header_arg = OsString::from("@");
                header_arg.push(file.path());
                command.arg("-H").arg(header_arg);
                Some(file)
            }
            None => None,
        };
        command.arg(url);
        Ok(PreparedCommand { command, auth_file })
    }
}

impl Transport for CurlTransport {
    fn name(&self) -> &'static str {
        "curl"
    }

    fn is_available(&self) -> bool {
        command_exists("curl")
    }

    fn fetch(&self, url: &str, dest: &Path, auth: Option<&str>) -> Result<()> {
        let PreparedCommand {
            mut command,
            auth_file: _auth_file,
        } = Self::prepare(url, auth)?;
        command.arg("-o").arg(dest);
        run_command(&mut command, "curl download failed")
    }

    fn fetch_text(&self, url: &str, auth: Option<&str>) -> Result<String> {
        let PreparedCommand {
            mut command,
            auth_file: _auth_file,
        } = Self::prepare(url, auth)?;
        run_command_capture(&mut command, "curl request failed")
    }
}

pub struct WgetTransport;

impl WgetTransport {
    pub(crate) fn prepare(auth: Option<&str>) -> Result<PreparedCommand> {
        let mut command = Command::new("wget");
        command.arg("-q").arg(format!("--user-agent={USER_AGENT}"));
        let auth_file = match auth {
            Some(token) => {
                let file = private_file(&format!("header = {}\n", bearer(token)))?;
                let mut config_arg = OsString::from("--config=");
                config_arg.push(file.path());
                command.arg(config_arg);
                Some(file)
            }
            None => None,
        };
        Ok(PreparedCommand { command, auth_file })
    }
}

impl Transport for WgetTransport {
    fn name(&self) -> &'static str {
        "wget"
    }

    fn is_available(&self) -> bool {
        command_exists("wget")
    }

    fn fetch(&self, url: &str, dest: &Path, auth: Option<&str>) -> Result<()> {
        let PreparedCommand {
            mut command,
            auth_file: _auth_file,
        } = Self::prepare(auth)?;
        command.arg("-O").arg(dest).arg(url);
        run_command(&mut command, "wget download failed")
    }

    fn fetch_text(&self, url: &str, auth: Option<&str>) -> Result<String> {
        let PreparedCommand {
            mut command,
            auth_file: _auth_file,
        } = Self::prepare(auth)?;
        command.arg("-O").arg("-").arg(url);
        run_command_capture(&mut command, "wget request failed")
    }
}

pub struct PowerShellTransport;

impl PowerShellTransport {
    /// The token reaches the script through the child's environment.
    /// `template` is the script with `{request}` standing for the web request.
    pub(crate) fn prepare(url: &str, auth: Option<&str>, template: &str) -> PreparedCommand {
        let mut command = Command::new("powershell");
        let headers = match auth {
            Some(token) => {
                command.env(AUTH_ENV_VAR, token);
                format!(" -Headers @{{ Authorization = ('Bearer ' + $env:{AUTH_ENV_VAR}) }}")
            }
            None => String::new(),
        };
        let request = format!(
            "$ProgressPreference = 'SilentlyContinue'; Invoke-WebRequest -UseBasicParsing -UserAgent '{USER_AGENT}' -Uri '{}'{headers}",
            url.replace('\'', "''")
        );
        command
            .arg("-NoProfile")
            .arg("-Command")
            .arg(template.replace("{request}", &request));
        PreparedCommand {
            command,
            auth_file: None,
        }
    }
}

impl Transport for PowerShellTransport {
    fn name(&self) -> &'static str {
        "powershell"
    }

    fn is_available(&self) -> bool {
        cfg!(windows) && command_exists("powershell")
    }

    fn fetch(&self, url: &str, dest: &Path, auth: Option<&str>) -> Result<()> {
        let script = format!("{{request}} -OutFile '{}'", escape_ps_single_quote(dest));
        let mut command = Self::prepare(url, auth, &script).command;
        run_command(&mut command, "powershell download failed")
    }

    fn fetch_text(&self, url: &str, auth: Option<&str>) -> Result<String> {
        let mut command = Self::prepare(url, auth, "({request}).Content").command;
        run_command_capture(&mut command, "powershell request failed")
    }
}

/// In-process client; always available, ranked last.
pub struct BuiltinTransport;

impl BuiltinTransport {
    fn get(url: &str, auth: Option<&str>) -> Result<reqwest::blocking::Response> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(None)
            .build()
            .context("failed to build HTTP client")?;
        let mut request = client.get(url);
        if let Some(token) = auth {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("server rejected request to {url}"))
    }
}

impl Transport for BuiltinTransport {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn fetch(&self, url: &str, dest: &Path, auth: Option<&str>) -> Result<()> {
        let mut response = Self::get(url, auth)?;
        let mut file = fs::File::create(dest)
            .with_context(|| format!("failed to create {}", dest.display()))?;
        response
            .copy_to(&mut file)
            .with_context(|| format!("failed to write response body to {}", dest.display()))?;
        Ok(())
    }

    fn fetch_text(&self, url: &str, auth: Option<&str>) -> Result<String> {
        Self::get(url, auth)?
            .text()
            .with_context(|| format!("failed to read response body from {url}"))
    }
}

/// Host transports in preference order. Windows-only providers report
/// themselves unavailable elsewhere.
pub fn default_transports() -> Vec<Box<dyn Transport>> {
    vec![
        Box::new(CurlTransport),
        Box::new(WgetTransport),
        Box::new(PowerShellTransport),
        Box::new(BuiltinTransport),
    ]
}

/// Performs every HTTP request of a run through one transport chosen up
/// front.
pub struct Fetcher {
    transports: Vec<Box<dyn Transport>>,
    selected: Option<usize>,
    token: Option<String>,
}

impl Fetcher {
    pub fn new(transports: Vec<Box<dyn Transport>>, token: Option<String>) -> Self {
        let selected = transports.iter().position(|transport| transport.is_available());
        match selected {
            Some(index) => tracing::debug!(transport = transports[index].name(), "selected transport"),
            None => tracing::debug!("no transport available"),
        }
        Self {
            transports,
            selected,
            token: token.filter(|value| !value.trim().is_empty()),
        }
    }

    pub fn transport_name(&self) -> Option<&'static str> {
        self.selected.map(|index| self.transports[index].name())
    }

    fn transport(&self) -> Result<&dyn Transport, TransportError> {
        match self.selected {
            Some(index) => Ok(self.transports[index].as_ref()),
            None => Err(TransportError::NoTransport {
                tried: self
                    .transports
                    .iter()
                    .map(|transport| transport.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Downloads `url` to `dest`, replacing any existing file.
    ///
    /// The body is written to a sibling `.part` file first so a failed
    /// request never leaves a truncated file at `dest`. With `fail_silently`
    /// failures are only logged at debug level; the error is still returned.
    pub fn fetch(&self, url: &str, dest: &Path, fail_silently: bool) -> Result<()> {
        let transport = self.transport()?;
        let part = part_path(dest);
        remove_file_if_exists(&part)
            .with_context(|| format!("failed to clear {}", part.display()))?;

        if let Err(err) = transport.fetch(url, &part, self.token.as_deref()) {
            let _ = remove_file_if_exists(&part);
            report_failure(transport.name(), url, &err, fail_silently);
            return Err(TransportError::Request {
                provider: transport.name(),
                url: url.to_string(),
                reason: format!("{err:#}"),
            }
            .into());
        }

        remove_file_if_exists(dest)
            .with_context(|| format!("failed to replace {}", dest.display()))?;
        fs::rename(&part, dest).with_context(|| {
            format!("failed to move {} to {}", part.display(), dest.display())
        })?;
        tracing::debug!(transport = transport.name(), url, dest = %dest.display(), "downloaded");
        Ok(())
    }

    pub fn fetch_text(&self, url: &str, fail_silently: bool) -> Result<String> {
        let transport = self.transport()?;
        transport
            .fetch_text(url, self.token.as_deref())
            .map_err(|err| {
                report_failure(transport.name(), url, &err, fail_silently);
                anyhow!(TransportError::Request {
                    provider: transport.name(),
                    url: url.to_string(),
                    reason: format!("{err:#}"),
                })
            })
    }
}

fn report_failure(provider: &str, url: &str, err: &anyhow::Error, fail_silently: bool) {
    if fail_silently {
        tracing::debug!(provider, url, error = %format!("{err:#}"), "request failed");
    } else {
        tracing::warn!(provider, url, error = %format!("{err:#}"), "request failed");
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|value| value.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
