use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use suiup_init_core::error::PlacementError;

use crate::fs_utils::{is_regular_file, remove_file_if_exists, set_executable};
use crate::layout::InstallTarget;

/// Moves the extracted binary to `target.final_path`, replacing any
/// previous file.
///
/// A plain rename is tried first. When that fails (typically because the
/// scratch directory is on another filesystem) the binary is copied to a
/// hidden sibling of the destination and renamed into place, so the
/// destination never holds a partially written file.
pub fn place_binary(extracted: &Path, target: &InstallTarget) -> Result<PathBuf> {
    let dest = &target.final_path;
    let fail = |reason: String| PlacementError {
        target: dest.clone(),
        reason,
    };

    match is_regular_file(extracted) {
        Ok(true) => {}
        Ok(false) => {
            return Err(fail(format!("{} is not a regular file", extracted.display())).into());
        }
        Err(err) => return Err(fail(format!("cannot inspect {}: {err}", extracted.display())).into()),
    }

    set_executable(extracted)
        .map_err(|err| fail(format!("cannot mark {} executable: {err}", extracted.display())))?;

    match fs::rename(extracted, dest) {
        Ok(()) => {
            tracing::debug!(dest = %dest.display(), "renamed binary into place");
            return Ok(dest.clone());
        }
        Err(err) => {
            tracing::debug!(error = %err, "rename failed, copying across filesystems");
        }
    }

    let staging = staging_path(dest);
    let staged = fs::copy(extracted, &staging)
        .and_then(|_| set_executable(&staging))
        .and_then(|_| fs::rename(&staging, dest));
    if let Err(err) = staged {
        let _ = remove_file_if_exists(&staging);
        return Err(fail(format!("copy into place failed: {err}")).into());
    }

    let _ = remove_file_if_exists(extracted);
    Ok(dest.clone())
}

fn staging_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|value| value.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.tmp-{}", std::process::id()))
}
