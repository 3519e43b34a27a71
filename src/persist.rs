//! Durable file writes shared by the file-backed stores

use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Replace `path` with `contents` so that readers see either the old or the
/// new file, never a torn one. Returns only after the data and the rename
/// are on disk.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tokio::fs::create_dir_all(parent).await?;

    let temp_path = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&temp_path).await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&temp_path, path).await?;
    sync_dir(parent).await
}

/// Flush a directory entry so a completed rename survives power loss
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

// Directory handles cannot be opened for syncing here
#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
