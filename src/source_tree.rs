//! Enumerates the Markdown sources of the documentation tree.  This combines
//! https://crates.io/crates/globset and https://crates.io/crates/walkdir to
//! perform filtered tree enumeration.  The walk is blocking, so async callers
//! go through `spawn_blocking_enumerate`, which works on any runtime flavor.
//!
//! Paths are matched relative to the docs root, so exclude globs are written
//! the way they appear in the documentation repository, e.g. `Plugins/ns*.md`.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tokio::task;
use walkdir::WalkDir;

use crate::classify::Bucket;
use crate::error::{BuildError, ErrorStage, Result};

/// Globs that are never documentation pages.
const ALWAYS_EXCLUDED: &[&str] = &["**/README.md"];

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceDocument {
    /// Path on disk to read the Markdown from.
    pub path: PathBuf,
    /// Directory segments relative to the docs root.
    pub rel_dir: Vec<String>,
    /// File name without the `.md` extension.
    pub base_name: String,
}

impl SourceDocument {
    /// The relative directory joined with `/`, or the empty string for
    /// documents sitting directly in the docs root.
    pub fn rel_dir_string(&self) -> String {
        self.rel_dir.join("/")
    }

    /// The bucket the document was filed under, judged by its first
    /// directory segment.
    pub fn bucket(&self) -> Option<Bucket> {
        self.rel_dir
            .first()
            .and_then(|segment| Bucket::from_segment(segment))
    }
}

fn build_exclude_set(excludes: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in ALWAYS_EXCLUDED {
        builder.add(Glob::new(pattern)?);
    }
    for pattern in excludes {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Walk `root` and return every `*.md` file that isn't excluded, sorted by
/// path so that runs over the same tree plan the same pages.
pub fn enumerate_sources(root: &Path, excludes: &[String]) -> Result<Vec<SourceDocument>> {
    if !root.is_dir() {
        return Err(BuildError::fatal(
            ErrorStage::Setup,
            format!("Docs root '{}' is not a directory", root.display()),
        ));
    }

    let markdown = Glob::new("**/*.md")?.compile_matcher();
    let exclude_set = build_exclude_set(excludes)?;

    let mut docs = vec![];
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel_path = match entry.path().strip_prefix(root) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if !markdown.is_match(rel_path) || exclude_set.is_match(rel_path) {
            trace!(path = %rel_path.display(), "skipping");
            continue;
        }

        let rel_dir = match rel_path.parent() {
            Some(parent) => parent
                .iter()
                .map(|s| s.to_string_lossy().into_owned())
                .collect(),
            None => vec![],
        };
        let base_name = match rel_path.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => continue,
        };

        docs.push(SourceDocument {
            path: entry.path().to_path_buf(),
            rel_dir,
            base_name,
        });
    }

    docs.sort();

    Ok(docs)
}

/// `enumerate_sources` on the runtime's blocking pool.
pub async fn spawn_blocking_enumerate(
    root: &Path,
    excludes: &[String],
) -> Result<Vec<SourceDocument>> {
    let root = root.to_path_buf();
    let excludes = excludes.to_vec();
    task::spawn_blocking(move || enumerate_sources(&root, &excludes))
        .await
        .map_err(|err| {
            BuildError::fatal(ErrorStage::Setup, format!("source walk failed: {}", err))
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "# title\n").unwrap();
    }

    #[test]
    fn test_enumerate_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Commands/File/WriteFile.md");
        touch(root, "Callbacks/onInit.md");
        touch(root, "Callbacks/README.md");
        touch(root, "README.md");
        touch(root, "Plugins/nsExec.md");
        touch(root, "Variables/notes.txt");

        let docs = enumerate_sources(root, &[]).unwrap();
        let names: Vec<(String, String)> = docs
            .iter()
            .map(|d| (d.rel_dir_string(), d.base_name.clone()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Callbacks".to_string(), "onInit".to_string()),
                ("Commands/File".to_string(), "WriteFile".to_string()),
                ("Plugins".to_string(), "nsExec".to_string()),
            ]
        );
        assert_eq!(docs[1].bucket(), Some(Bucket::Commands));

        let docs = enumerate_sources(root, &["Plugins/*.md".to_string()]).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_root_level_document_has_no_bucket() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Overview.md");
        let docs = enumerate_sources(dir.path(), &[]).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].rel_dir_string(), "");
        assert_eq!(docs[0].bucket(), None);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = enumerate_sources(&dir.path().join("nope"), &[]).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.stage(), ErrorStage::Setup);
    }

    // Plain `#[tokio::test]` is a current-thread runtime.
    #[tokio::test]
    async fn test_spawn_blocking_enumerate_on_current_thread() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Commands/Abort.md");
        let docs = spawn_blocking_enumerate(dir.path(), &[]).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].base_name, "Abort");

        let err = spawn_blocking_enumerate(&dir.path().join("nope"), &[])
            .await
            .unwrap_err();
        assert_eq!(err.stage(), ErrorStage::Setup);
    }

    #[test]
    fn test_bad_exclude_glob() {
        let dir = tempfile::tempdir().unwrap();
        let err = enumerate_sources(dir.path(), &["Plugins/[".to_string()]).unwrap_err();
        assert_eq!(err.stage(), ErrorStage::Config);
    }
}
