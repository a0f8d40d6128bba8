//! Crash-safe writes of produced images.

use anyhow::{Context, Result};
use getrandom::fill;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Reads a whole input file.
pub fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Writes `data` to `path` so that readers see either the old file or the new one.
///
/// The bytes go to a randomly named sibling, are fsynced, and the sibling is
/// renamed over `path`; the parent directory is synced afterwards. Missing
/// parent directories are created.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_path_for(path)?;

    let mut tmp_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .context("failed to create temporary file")?;

    tmp_file.write_all(data)?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    if let Err(e) = atomic_replace(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    #[cfg(not(target_os = "windows"))]
    if let Some(parent) = parent {
        File::open(parent)?.sync_all()?;
    }

    Ok(())
}

/// `<file name>.tmp.<16 hex chars>` next to `path`.
fn tmp_path_for(path: &Path) -> Result<PathBuf> {
    let mut buf = [0u8; 8];
    fill(&mut buf).map_err(|_| anyhow::anyhow!("OS random generator unavailable"))?;

    let suffix = buf.iter().map(|b| format!("{b:02x}")).collect::<String>();
    let file_name = path
        .file_name()
        .with_context(|| format!("{} has no file name", path.display()))?
        .to_string_lossy();

    Ok(path.with_file_name(format!("{file_name}.tmp.{suffix}")))
}

/// Uses `ReplaceFileW` with `REPLACEFILE_WRITE_THROUGH` when the target exists,
/// a plain rename otherwise (`ReplaceFileW` requires an existing target).
#[cfg(target_os = "windows")]
fn atomic_replace(tmp_path: &Path, target: &Path) -> Result<()> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

    if !target.exists() {
        fs::rename(tmp_path, target)?;
        return Ok(());
    }

    fn to_wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    let target_w = to_wide(target.as_os_str());
    let tmp_w = to_wide(tmp_path.as_os_str());

    // SAFETY:
    // - Strings are valid UTF-16 and null-terminated
    // - Pointers remain valid during the call
    // - Windows does not retain the pointers after return
    let result = unsafe {
        ReplaceFileW(
            target_w.as_ptr(),
            tmp_w.as_ptr(),
            std::ptr::null(),
            REPLACEFILE_WRITE_THROUGH,
            std::ptr::null(),
            std::ptr::null(),
        )
    };

    if result == 0 {
        let err = std::io::Error::last_os_error();
        return Err(err).context("atomic replace failed");
    }

    Ok(())
}

/// `rename()` is atomic when both paths are on the same filesystem.
#[cfg(not(target_os = "windows"))]
fn atomic_replace(tmp_path: &Path, target: &Path) -> Result<()> {
    fs::rename(tmp_path, target)?;
    Ok(())
}
