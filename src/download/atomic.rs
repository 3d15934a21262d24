//! Crash- and race-safe file writes into the libraries directory.
//!
//! Bytes go to a uniquely named temp file in the destination's directory, are
//! synced, then renamed over the destination. Readers see either nothing or
//! the complete file, and two writers racing on the same name both succeed
//! with identical content.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::error::MaterializeError;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `bytes` to `destination` via temp file and rename.
///
/// Creates the parent directory when missing.
///
/// # Errors
///
/// Returns [`MaterializeError`] when the directory cannot be created or the
/// temp file cannot be written, synced, or renamed. The temp file is removed
/// on failure.
pub(crate) async fn write_atomic(destination: &Path, bytes: &[u8]) -> Result<(), MaterializeError> {
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| MaterializeError::io(parent, e))?;

    let temp = temp_path_for(destination);
    if let Err(error) = write_and_sync(&temp, bytes).await {
        discard(&temp).await;
        return Err(error);
    }

    if let Err(source) = tokio::fs::rename(&temp, destination).await {
        discard(&temp).await;
        return Err(MaterializeError::rename(temp, destination, source));
    }

    debug!(path = %destination.display(), bytes = bytes.len(), "Wrote file");
    Ok(())
}

async fn write_and_sync(temp: &Path, bytes: &[u8]) -> Result<(), MaterializeError> {
    let mut file = tokio::fs::File::create(temp)
        .await
        .map_err(|e| MaterializeError::io(temp, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| MaterializeError::io(temp, e))?;
    file.sync_all()
        .await
        .map_err(|e| MaterializeError::io(temp, e))?;
    Ok(())
}

async fn discard(temp: &Path) {
    match tokio::fs::remove_file(temp).await {
        Err(error) if error.kind() != std::io::ErrorKind::NotFound => {
            warn!(path = %temp.display(), error = %error, "Could not remove temp file");
        }
        _ => {}
    }
}

/// Hidden sibling name unique across tasks in this process and across processes.
fn temp_path_for(destination: &Path) -> PathBuf {
    let file_name = destination
        .file_name()
        .map_or_else(|| "artifact".into(), |name| name.to_string_lossy());
    let sequence = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let salt: u32 = rand::thread_rng().r#gen();
    destination.with_file_name(format!(
        ".{file_name}.{}.{sequence}.{salt:08x}.part",
        std::process::id()
    ))
}
