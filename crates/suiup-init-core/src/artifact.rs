use crate::archive::ArchiveKind;
use crate::platform::{Arch, Os, Platform};
use crate::release::{ReleaseSource, ReleaseVersion};

pub const BINARY_NAME: &str = "suiup";
pub const CHECKSUM_SUFFIX: &str = ".sha256";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactTemplate {
    pub os: Os,
    /// File name pattern; `{arch}` is replaced with the normalized arch.
    pub name: &'static str,
    pub published: &'static [Arch],
}

impl ArtifactTemplate {
    pub fn file_name(&self, arch: Arch) -> Option<String> {
        if !self.published.contains(&arch) {
            return None;
        }
        Some(self.name.replace("{arch}", arch.as_str()))
    }
}

/// Published release artifacts, keyed by OS.
pub const ARTIFACT_TEMPLATES: &[ArtifactTemplate] = &[
    ArtifactTemplate {
        os: Os::Macos,
        name: "suiup-macOS-{arch}.tar.gz",
        published: &[Arch::X86_64, Arch::Arm64],
    },
    ArtifactTemplate {
        os: Os::Linux,
        name: "suiup-Linux-musl-{arch}.tar.gz",
        published: &[Arch::X86_64, Arch::Arm64],
    },
    ArtifactTemplate {
        os: Os::Windows,
        name: "suiup-Windows-msvc-{arch}.zip",
        published: &[Arch::Arm64],
    },
];

pub fn template_for(os: Os) -> Option<&'static ArtifactTemplate> {
    ARTIFACT_TEMPLATES.iter().find(|template| template.os == os)
}

pub fn artifact_file_name(platform: Platform) -> Option<String> {
    template_for(platform.os)?.file_name(platform.arch)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub file_name: String,
    pub download_url: String,
    pub checksum_url: Option<String>,
    pub archive_kind: ArchiveKind,
}

pub fn build_artifact_url(
    source: &ReleaseSource,
    platform: Platform,
    version: &ReleaseVersion,
) -> Option<String> {
    let file_name = artifact_file_name(platform)?;
    Some(source.download_url(version, &file_name))
}

pub fn build_checksum_url(
    source: &ReleaseSource,
    platform: Platform,
    version: &ReleaseVersion,
) -> Option<String> {
    build_artifact_url(source, platform, version).map(|url| format!("{url}{CHECKSUM_SUFFIX}"))
}

pub fn resolve_artifact(
    source: &ReleaseSource,
    platform: Platform,
    version: &ReleaseVersion,
) -> Option<ArtifactLocation> {
    let file_name = artifact_file_name(platform)?;
    let archive_kind = ArchiveKind::for_os(platform.os)?;
    let download_url = source.download_url(version, &file_name);
    Some(ArtifactLocation {
        checksum_url: Some(format!("{download_url}{CHECKSUM_SUFFIX}")),
        download_url,
        file_name,
        archive_kind,
    })
}

/// A documented substitution of one architecture's artifact for another on a
/// single OS. Applied only when the requested arch has no published artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchSubstitution {
    pub os: Os,
    pub requested: Arch,
    pub substitute: Arch,
    pub note: &'static str,
}

pub const ARCH_SUBSTITUTIONS: &[ArchSubstitution] = &[ArchSubstitution {
    os: Os::Windows,
    requested: Arch::X86_64,
    substitute: Arch::Arm64,
    note: "experimental: no x86_64 Windows build is published; installing the arm64 build, which relies on Windows architecture emulation",
}];

pub fn find_substitution(platform: Platform) -> Option<&'static ArchSubstitution> {
    if artifact_file_name(platform).is_some() {
        return None;
    }
    ARCH_SUBSTITUTIONS
        .iter()
        .find(|rule| rule.os == platform.os && rule.requested == platform.arch)
        .filter(|rule| artifact_file_name(platform.with_arch(rule.substitute)).is_some())
}
