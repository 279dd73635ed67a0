use crate::platform::Os;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }

    /// Release archives are tarballs everywhere except Windows.
    pub fn for_os(os: Os) -> Option<Self> {
        match os {
            Os::Linux | Os::Macos => Some(Self::TarGz),
            Os::Windows => Some(Self::Zip),
            Os::Unknown => None,
        }
    }
}
