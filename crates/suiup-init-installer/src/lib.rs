mod command;
mod diagnostics;
mod extract;
mod fetch;
mod fs_utils;
mod layout;
mod placement;
mod scratch;

pub use diagnostics::{
    find_shadowing, path_contains, path_remediation, shadowing_remediation, ShadowingBinary,
    SHADOW_WATCH_LIST,
};
pub use extract::{
    default_unpackers, ArchiveExtractor, BuiltinTarGz, BuiltinZip, ExpandArchive, TarCommand,
    Unpacker, UnzipCommand,
};
pub use fetch::{
    default_transports, BuiltinTransport, CurlTransport, Fetcher, PowerShellTransport, Transport,
    WgetTransport,
};
pub use layout::{
    is_writable, resolve_install_target, InstallDirPolicy, InstallDirSource, InstallTarget,
    INSTALL_DIR_ENV_VAR,
};
pub use placement::place_binary;
pub use scratch::{install_interrupt_handler, CleanupRegistry, ScratchDir};
