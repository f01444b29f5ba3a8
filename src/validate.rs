use std::path::{Path, PathBuf};

use crate::Y2mError;

const MB: f64 = 1024.0 * 1024.0;

/// Size of a file in megabytes.
pub(crate) fn size_mb(path: &Path) -> Result<f64, Y2mError> {
    Ok(std::fs::metadata(path)?.len() as f64 / MB)
}

/// Check that `path` is a readable, non-empty `.pt` checkpoint.
///
/// Checks run in order: existence, extension, size, read permission.
/// Returns the file size in bytes.
pub fn validate_model_path(path: impl AsRef<Path>) -> Result<u64, Y2mError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Y2mError::FileNotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if extension != "pt" {
        return Err(Y2mError::InvalidExtension {
            path: path.to_path_buf(),
            extension: path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default(),
        });
    }

    let size = std::fs::metadata(path)?.len();
    if size == 0 {
        return Err(Y2mError::EmptyFile(path.to_path_buf()));
    }

    if let Err(e) = std::fs::File::open(path) {
        return Err(match e.kind() {
            std::io::ErrorKind::PermissionDenied => Y2mError::PermissionDenied(path.to_path_buf()),
            _ => e.into(),
        });
    }

    tracing::info!(
        "[OK] Model validated: {} ({:.2} MB)",
        path.file_name().unwrap_or_default().to_string_lossy(),
        size as f64 / MB
    );
    Ok(size)
}

/// Create the output directory and its parents.
pub fn create_output_directory(path: impl AsRef<Path>) -> Result<PathBuf, Y2mError> {
    let path = path.as_ref();
    std::fs::create_dir_all(path)?;
    tracing::info!("[OK] Output directory ready: {}", path.display());
    Ok(path.to_path_buf())
}

/// Delete intermediate files with the given extensions (e.g. `"onnx"`) from
/// `dir`. Files that cannot be deleted are logged and skipped.
///
/// Returns the number of deleted files.
pub fn cleanup_intermediate_files(dir: impl AsRef<Path>, extensions: &[&str]) -> usize {
    let dir = dir.as_ref();
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Could not list {}: {e}", dir.display());
            return 0;
        }
    };

    let mut deleted = 0;
    for path in entries.filter_map(|entry| entry.ok().map(|entry| entry.path())) {
        let matches = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| extensions.iter().any(|wanted| ext == *wanted));
        if !matches {
            continue;
        }
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("[OK] Cleaned up: {name}");
                deleted += 1;
            }
            Err(e) => tracing::warn!("Could not delete {name}: {e}"),
        }
    }
    deleted
}
