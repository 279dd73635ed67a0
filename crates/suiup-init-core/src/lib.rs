mod archive;
mod artifact;
pub mod error;
mod platform;
mod release;

pub use archive::ArchiveKind;
pub use artifact::{
    artifact_file_name, build_artifact_url, build_checksum_url, find_substitution,
    resolve_artifact, template_for, ArchSubstitution, ArtifactLocation, ArtifactTemplate,
    ARCH_SUBSTITUTIONS, ARTIFACT_TEMPLATES, BINARY_NAME, CHECKSUM_SUFFIX,
};
pub use error::InstallError;
pub use platform::{escape_ps_single_quote, Arch, Os, Platform};
pub use release::{
    parse_latest_release, ReleaseSource, ReleaseVersion, DEFAULT_API_BASE, DEFAULT_DOWNLOAD_BASE,
    DEFAULT_REPO,
};
