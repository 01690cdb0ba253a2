//! Persisting fill results to disk.

use serde::{Deserialize, Serialize};
use std::fs::Permissions;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{FillError, Result};
use crate::types::FillResult;

/// When a response body is written to the output path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Only a success status writes the file; anything else leaves the path untouched.
    #[default]
    SuccessOnly,
    /// Write whatever body came back, even an error body. A non-success status
    /// is still reported as a failure after the write.
    Always,
}

/// Write `result` to `path` according to `policy`.
///
/// Returns the number of bytes written, or `None` when the policy skipped the
/// write. A non-success status is always an error, whether or not the body was
/// written.
pub fn save_result(result: &FillResult, path: &Path, policy: WritePolicy) -> Result<Option<usize>> {
    let written = match (result.is_success(), policy) {
        (true, _) | (false, WritePolicy::Always) => {
            write_atomic(path, &result.data)?;
            Some(result.data.len())
        }
        (false, WritePolicy::SuccessOnly) => None,
    };

    if !result.is_success() {
        if written.is_some() {
            tracing::warn!(
                status = result.status,
                path = %path.display(),
                "Wrote error response body to output; the file is not a valid PDF"
            );
        }
        return Err(FillError::service(result.status, &result.data));
    }

    if !result.data.starts_with(b"%PDF-") {
        tracing::warn!(path = %path.display(), "Response body does not look like a PDF");
    }

    Ok(written)
}

/// Replace `path` with `bytes`, creating missing parent directories.
///
/// Bytes go to a temporary file next to the destination which is then renamed
/// over it, so readers never observe a half-written document and a failed
/// write leaves any previous file intact.
///
/// Permissions match a plain create-or-truncate: an existing file keeps its
/// mode, a new one gets `0o666` minus the process umask.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |source: std::io::Error| FillError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;

    let existing = std::fs::metadata(path)
        .ok()
        .filter(|meta| meta.is_file())
        .map(|meta| meta.permissions());

    let mut tmp = temp_file_in(dir, existing).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote output file");
    Ok(())
}

fn temp_file_in(dir: &Path, existing: Option<Permissions>) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".pdffill-");

    // open(2) applies the umask to this mode, the same as File::create
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(0o666));
    }

    let tmp = builder.tempfile_in(dir)?;
    if let Some(permissions) = existing {
        tmp.as_file().set_permissions(permissions)?;
    }
    Ok(tmp)
}
