use std::path::Path;

use tokio::fs;

use crate::error::{BuildError, ErrorStage, Result};

pub async fn write_file_ensuring_parent_dir(
    file_path: &Path,
    contents: impl AsRef<[u8]>,
    stage: ErrorStage,
) -> Result<()> {
    let parent_path = match file_path.parent() {
        Some(p) => p,
        None => {
            return Err(BuildError::document(
                stage,
                format!("Problem getting parent of '{}'", file_path.display()),
            ));
        }
    };
    if let Err(e) = fs::create_dir_all(parent_path).await {
        return Err(BuildError::document(
            stage,
            format!("Problem creating parent of '{}': {}", file_path.display(), e),
        ));
    }
    if let Err(e) = fs::write(file_path, contents).await {
        return Err(BuildError::document(
            stage,
            format!("Problem writing '{}': {}", file_path.display(), e),
        ));
    }
    Ok(())
}

/// Create `dir` and its parents, logging instead of failing.  A later write
/// into the directory will report the real problem if there is one.
pub async fn ensure_dir(dir: &Path) {
    if let Err(e) = fs::create_dir_all(dir).await {
        warn!(dir = %dir.display(), error = %e, "Could not create directory");
    }
}
