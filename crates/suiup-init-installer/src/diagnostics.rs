//! Post-install PATH checks.
//!
//! Both checks take the PATH value as an argument instead of reading the
//! environment, so callers decide which PATH is inspected.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use suiup_init_core::{Os, Platform};

/// Binaries that, when found elsewhere on PATH, can shadow the installed one.
pub const SHADOW_WATCH_LIST: &[&str] = &["suiup"];

fn normalize(path: &Path, os: Os) -> String {
    let text = path.to_string_lossy();
    let trimmed = text.trim_end_matches(['/', '\\']);
    // keep a bare root separator
    let trimmed = if trimmed.is_empty() && !text.is_empty() {
        &text[..1]
    } else {
        trimmed
    };
    match os {
        Os::Windows => trimmed.replace('/', "\\").to_ascii_lowercase(),
        _ => trimmed.to_string(),
    }
}

fn same_dir(left: &Path, right: &Path, os: Os) -> bool {
    normalize(left, os) == normalize(right, os)
}

/// Whether `dir` is one of the entries of `path_value`. Entries are compared
/// whole, so `/opt/x` does not match `/opt/xy`; trailing separators are
/// ignored, and on Windows the comparison is case-insensitive.
pub fn path_contains(path_value: &OsStr, dir: &Path, os: Os) -> bool {
    std::env::split_paths(path_value).any(|entry| same_dir(&entry, dir, os))
}

/// Shell snippets that put `dir` on PATH.
pub fn path_remediation(dir: &Path, os: Os) -> Vec<String> {
    let dir = dir.display();
    match os {
        Os::Windows => vec![
            format!(
                "PowerShell: [Environment]::SetEnvironmentVariable(\"Path\", \"{dir};\" + [Environment]::GetEnvironmentVariable(\"Path\", \"User\"), \"User\")"
            ),
            format!("cmd: setx PATH \"{dir};%PATH%\""),
            "then open a new terminal".to_string(),
        ],
        _ => {
            let profile = if os == Os::Macos { "~/.zshrc" } else { "~/.bashrc" };
            vec![
                format!("bash/zsh: echo 'export PATH=\"{dir}:$PATH\"' >> {profile}"),
                format!("fish: fish_add_path {dir}"),
                format!("for this shell only: export PATH=\"{dir}:$PATH\""),
            ]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowingBinary {
    pub binary: String,
    pub found: PathBuf,
    /// True when the entry holding `found` comes before the install
    /// directory on PATH (or the install directory is not on PATH at all),
    /// so the shell resolves `binary` to `found`.
    pub shadows_install: bool,
}

/// Scans PATH entries other than `install_dir` for same-named binaries from
/// [`SHADOW_WATCH_LIST`].
pub fn find_shadowing(
    path_value: &OsStr,
    install_dir: &Path,
    platform: Platform,
) -> Vec<ShadowingBinary> {
    let entries = std::env::split_paths(path_value).collect::<Vec<_>>();
    let install_index = entries
        .iter()
        .position(|entry| same_dir(entry, install_dir, platform.os));

    let mut seen = Vec::new();
    let mut found = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        if entry.as_os_str().is_empty() || same_dir(entry, install_dir, platform.os) {
            continue;
        }
        let key = normalize(entry, platform.os);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);

        for name in SHADOW_WATCH_LIST {
            let binary = platform.executable_name(name);
            let candidate = entry.join(&binary);
            if candidate.is_file() {
                found.push(ShadowingBinary {
                    binary,
                    found: candidate,
                    shadows_install: install_index.map_or(true, |install| index < install),
                });
            }
        }
    }
    found
}

/// Explains each shadowing binary and how to resolve it on `os`.
pub fn shadowing_remediation(conflicts: &[ShadowingBinary], install_dir: &Path, os: Os) -> Vec<String> {
    let mut lines = Vec::new();
    for conflict in conflicts {
        if conflict.shadows_install {
            lines.push(format!(
                "'{}' at {} takes precedence over {}",
                conflict.binary,
                conflict.found.display(),
                install_dir.display()
            ));
        } else {
            lines.push(format!(
                "another '{}' exists at {} (later on PATH, currently unused)",
                conflict.binary,
                conflict.found.display()
            ));
        }
    }

    if !conflicts.iter().any(|conflict| conflict.shadows_install) {
        return lines;
    }

    match os {
        Os::Macos => {
            lines.push("if it was installed with Homebrew, run: brew uninstall suiup".to_string());
            lines.push(format!(
                "otherwise remove it, or put {} first in PATH in ~/.zshrc",
                install_dir.display()
            ));
        }
        Os::Windows => {
            lines.push(format!(
                "move {} above the other entry in the user Path (System Properties > Environment Variables)",
                install_dir.display()
            ));
            lines.push("or delete the older suiup.exe".to_string());
        }
        _ => {
            lines.push(format!(
                "remove the older binary, or put {} first in PATH in your shell profile",
                install_dir.display()
            ));
            lines.push("then run `hash -r` (bash) or `rehash` (zsh) to refresh the command cache".to_string());
        }
    }
    lines
}
