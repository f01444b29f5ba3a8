use std::path::{Path, PathBuf};

use crate::Y2mError;

/// Scheme prefix of checkpoints hosted on the Hugging Face hub.
pub const HUB_SCHEME: &str = "hf://";

/// Split `hf://<owner>/<repo>/<file>` into `(repo_id, filename)`.
fn parse_hub_reference(reference: &str) -> Option<(String, String)> {
    let rest = reference.strip_prefix(HUB_SCHEME)?;
    let mut parts = rest.splitn(3, '/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let repo = parts.next().filter(|s| !s.is_empty())?;
    let filename = parts.next().filter(|s| !s.is_empty())?;
    Some((format!("{owner}/{repo}"), filename.to_string()))
}

/// Copy a cached checkpoint into `workdir`.
///
/// The exporter writes next to the checkpoint and cleanup deletes there, so
/// neither may touch the shared hub cache.
fn stage(cached: &Path, workdir: &Path) -> Result<PathBuf, Y2mError> {
    let name = cached
        .file_name()
        .ok_or_else(|| Y2mError::FileNotFound(cached.to_path_buf()))?;
    std::fs::create_dir_all(workdir)?;
    let staged = workdir.join(name);
    std::fs::copy(cached, &staged)?;
    tracing::debug!("staged {} as {}", cached.display(), staged.display());
    Ok(staged)
}

/// Resolve a checkpoint reference to a local path.
///
/// `hf://<owner>/<repo>/<file>` is fetched into the local hub cache (or taken
/// from it) and copied into `workdir`; anything else is returned as a local
/// path.
pub fn resolve_weights(reference: &str, workdir: &Path) -> Result<PathBuf, Y2mError> {
    if !reference.starts_with(HUB_SCHEME) {
        return Ok(PathBuf::from(reference));
    }

    let (repo_id, filename) = parse_hub_reference(reference).ok_or_else(|| {
        Y2mError::FileNotFound(PathBuf::from(reference))
    })?;

    tracing::info!("Fetching {filename} from {repo_id}");
    // check if the model is already downloaded or download it
    let cached = hf_hub::api::sync::Api::new()?
        .model(repo_id)
        .get(&filename)?;
    stage(&cached, workdir)
}
