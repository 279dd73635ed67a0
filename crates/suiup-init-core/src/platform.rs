use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Macos,
    Windows,
    Unknown,
}

impl Os {
    pub fn detect() -> Self {
        Self::normalize(std::env::consts::OS)
    }

    /// Maps a kernel name (`uname -s` style or Rust `consts::OS`) to an `Os`.
    pub fn normalize(input: &str) -> Self {
        let lower = input.trim().to_ascii_lowercase();
        match lower.as_str() {
            "linux" => Self::Linux,
            "darwin" | "macos" | "osx" => Self::Macos,
            "windows" | "windows_nt" => Self::Windows,
            other
                if other.starts_with("mingw")
                    || other.starts_with("msys")
                    || other.starts_with("cygwin") =>
            {
                Self::Windows
            }
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    Arm64,
    Unknown,
}

impl Arch {
    pub fn detect() -> Self {
        Self::normalize(std::env::consts::ARCH)
    }

    /// Maps a machine hardware name (`uname -m` style or Rust `consts::ARCH`).
    pub fn normalize(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Self::X86_64,
            "aarch64" | "arm64" | "armv8" | "armv8l" => Self::Arm64,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    pub fn detect() -> Self {
        Self::new(Os::detect(), Arch::detect())
    }

    pub fn with_arch(self, arch: Arch) -> Self {
        Self { arch, ..self }
    }

    pub fn executable_suffix(self) -> &'static str {
        match self.os {
            Os::Windows => ".exe",
            _ => "",
        }
    }

    pub fn executable_name(self, base: &str) -> String {
        format!("{base}{}", self.executable_suffix())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

/// Quotes `path` for use inside a PowerShell single-quoted string literal.
pub fn escape_ps_single_quote(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "''")
}
