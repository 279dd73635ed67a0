use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};
use suiup_init_core::escape_ps_single_quote;

use crate::checksum::ChecksumAlgorithm;

/// One way of hashing a file on this host.
pub trait HashProvider {
    fn name(&self) -> &'static str;
    fn supports(&self, algorithm: ChecksumAlgorithm) -> bool;
    fn is_available(&self) -> bool;
    /// Returns the lowercase hex digest of `path`.
    fn hash_file(&self, path: &Path, algorithm: ChecksumAlgorithm) -> Result<String>;
}

type ArgsBuilder = fn(&Path, ChecksumAlgorithm) -> Vec<OsString>;
type OutputParser = fn(&str, ChecksumAlgorithm) -> Option<String>;

/// A hashing utility found on PATH, driven through its command line.
pub struct ExternalHasher {
    name: &'static str,
    program: &'static str,
    algorithms: &'static [ChecksumAlgorithm],
    windows_only: bool,
    args: ArgsBuilder,
    parse: OutputParser,
}

impl ExternalHasher {
    pub fn sha256sum() -> Self {
        Self {
            name: "sha256sum",
            program: "sha256sum",
            algorithms: &[ChecksumAlgorithm::Sha256],
            windows_only: false,
            args: path_only_args,
            parse: first_token,
        }
    }

    pub fn md5sum() -> Self {
        Self {
            name: "md5sum",
            program: "md5sum",
            algorithms: &[ChecksumAlgorithm::Md5],
            windows_only: false,
            args: path_only_args,
            parse: first_token,
        }
    }

    pub fn shasum() -> Self {
        Self {
            name: "shasum",
            program: "shasum",
            algorithms: &[ChecksumAlgorithm::Sha256],
            windows_only: false,
            args: |path, _| vec!["-a".into(), "256".into(), path.as_os_str().to_owned()],
            parse: first_token,
        }
    }

    pub fn bsd_md5() -> Self {
        Self {
            name: "md5",
            program: "md5",
            algorithms: &[ChecksumAlgorithm::Md5],
            windows_only: false,
            args: |path, _| vec!["-q".into(), path.as_os_str().to_owned()],
            parse: first_token,
        }
    }

    pub fn certutil() -> Self {
        Self {
            name: "certutil",
            program: "certutil",
            algorithms: &[ChecksumAlgorithm::Sha256, ChecksumAlgorithm::Md5],
            windows_only: true,
            args: |path, algorithm| {
                vec![
                    "-hashfile".into(),
                    path.as_os_str().to_owned(),
                    algorithm.as_str().into(),
                ]
            },
            parse: certutil_digest,
        }
    }

    pub fn powershell() -> Self {
        Self {
            name: "powershell Get-FileHash",
            program: "powershell",
            algorithms: &[ChecksumAlgorithm::Sha256, ChecksumAlgorithm::Md5],
            windows_only: true,
            args: |path, algorithm| {
                vec![
                    "-NoProfile".into(),
                    "-Command".into(),
                    format!(
                        "(Get-FileHash -Algorithm {} -LiteralPath '{}').Hash",
                        algorithm.as_str(),
                        escape_ps_single_quote(path)
                    )
                    .into(),
                ]
            },
            parse: first_token,
        }
    }
}

impl HashProvider for ExternalHasher {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports(&self, algorithm: ChecksumAlgorithm) -> bool {
        self.algorithms.contains(&algorithm)
    }

    fn is_available(&self) -> bool {
        if self.windows_only && !cfg!(windows) {
            return false;
        }
        which::which(self.program).is_ok()
    }

    fn hash_file(&self, path: &Path, algorithm: ChecksumAlgorithm) -> Result<String> {
        let output = Command::new(self.program)
            .args((self.args)(path, algorithm))
            .output()
            .with_context(|| format!("{}: command failed to start", self.name))?;
        if !output.status.success() {
            return Err(anyhow!(
                "{}: status={} stderr='{}'",
                self.name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        (self.parse)(&stdout, algorithm)
            .map(|digest| digest.to_ascii_lowercase())
            .ok_or_else(|| {
                anyhow!(
                    "{}: unexpected output '{}'",
                    self.name,
                    stdout.trim()
                )
            })
    }
}

fn path_only_args(path: &Path, _algorithm: ChecksumAlgorithm) -> Vec<OsString> {
    vec![path.as_os_str().to_owned()]
}

fn first_token(output: &str, algorithm: ChecksumAlgorithm) -> Option<String> {
    let token = output.split_whitespace().next()?.trim_start_matches('\\');
    is_digest(token, algorithm).then(|| token.to_string())
}

// certutil prints a banner line, the digest (older versions space-separated
// byte pairs), then a status line.
fn certutil_digest(output: &str, algorithm: ChecksumAlgorithm) -> Option<String> {
    output
        .lines()
        .map(|line| line.split_whitespace().collect::<String>())
        .find(|candidate| is_digest(candidate, algorithm))
}

fn is_digest(candidate: &str, algorithm: ChecksumAlgorithm) -> bool {
    candidate.len() == algorithm.hex_len() && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

/// In-process hashing with `sha2` / `md5`; always available.
pub struct BuiltinHasher;

impl HashProvider for BuiltinHasher {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn supports(&self, _algorithm: ChecksumAlgorithm) -> bool {
        true
    }

    fn is_available(&self) -> bool {
        true
    }

    fn hash_file(&self, path: &Path, algorithm: ChecksumAlgorithm) -> Result<String> {
        let file = File::open(path)
            .with_context(|| format!("failed to open file for checksum: {}", path.display()))?;
        let digest = match algorithm {
            ChecksumAlgorithm::Sha256 => sha256_reader_hex(file),
            ChecksumAlgorithm::Md5 => md5_reader_hex(file),
        };
        digest.with_context(|| format!("failed to read file for checksum: {}", path.display()))
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn sha256_reader_hex(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn md5_reader_hex(mut reader: impl Read) -> io::Result<String> {
    let mut context = md5::Context::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        context.consume(&buffer[..read]);
    }
    Ok(format!("{:x}", context.compute()))
}

/// Providers in priority order: native checksum utilities, the Windows
/// platform APIs, then the built-in implementation.
pub fn default_hash_providers() -> Vec<Box<dyn HashProvider>> {
    vec![
        Box::new(ExternalHasher::sha256sum()),
        Box::new(ExternalHasher::md5sum()),
        Box::new(ExternalHasher::shasum()),
        Box::new(ExternalHasher::bsd_md5()),
        Box::new(ExternalHasher::certutil()),
        Box::new(ExternalHasher::powershell()),
        Box::new(BuiltinHasher),
    ]
}
