//! The on-disk layout of a docset bundle and the files in it that aren't
//! documentation pages.
//!
//! ```text
//! <output_dir>/<name>.docset/
//!     icon.png, icon@2x.png
//!     Contents/Info.plist
//!     Contents/Resources/docSet.dsidx
//!     Contents/Resources/Documents/{index.html, css/, fonts/, img/, html/}
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};
use tokio::fs;

use crate::config::BuildConfig;
use crate::error::{BuildError, ErrorStage, Result};
use crate::file_utils::{ensure_dir, write_file_ensuring_parent_dir};
use crate::output::minify_html;
use crate::templating::Templates;

static STATIC_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Fira faces referenced by `docset.css`, looked up as
/// `<assets_dir>/fonts/<extension>/<font>`.
pub const FONTS: &[&str] = &[
    "FiraMono-Regular.eot",
    "FiraMono-Regular.ttf",
    "FiraMono-Regular.woff2",
    "FiraSans-Light.eot",
    "FiraSans-Light.ttf",
    "FiraSans-Light.woff2",
    "FiraSans-Regular.eot",
    "FiraSans-Regular.ttf",
    "FiraSans-Regular.woff2",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocsetLayout {
    pub docset: PathBuf,
    pub contents: PathBuf,
    pub resources: PathBuf,
    pub documents: PathBuf,
}

impl DocsetLayout {
    pub fn new(output_dir: &Path, docset_name: &str) -> DocsetLayout {
        let docset = output_dir.join(format!("{}.docset", docset_name));
        let contents = docset.join("Contents");
        let resources = contents.join("Resources");
        let documents = resources.join("Documents");
        DocsetLayout {
            docset,
            contents,
            resources,
            documents,
        }
    }

    pub fn index_db(&self) -> PathBuf {
        self.resources.join("docSet.dsidx")
    }

    /// Absolute location of a `/`-separated path relative to `Documents/`.
    pub fn document_path(&self, rel_path: &str) -> PathBuf {
        rel_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.documents.clone(), |path, segment| path.join(segment))
    }

    /// Remove whatever a previous build left behind and recreate the
    /// directory skeleton.  Problems are logged, not returned: if the tree
    /// really is unusable, opening the index right after will fail loudly.
    pub async fn prepare(&self) {
        match fs::remove_dir_all(&self.docset).await {
            Ok(()) => debug!(docset = %self.docset.display(), "removed previous build"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(docset = %self.docset.display(), error = %e, "Could not remove previous build"),
        }
        ensure_dir(&self.documents).await;
    }
}

pub async fn write_info_plist(
    layout: &DocsetLayout,
    templates: &Templates,
    config: &BuildConfig,
) -> Result<()> {
    let globals = liquid::object!({
        "bundle_id": config.bundle_id,
        "docset_name": config.docset_name,
        "platform_family": config.platform_family,
        "feed_url": config.feed_url,
    });
    let plist = templates.info_plist.render(&globals)?;
    write_asset(&layout.contents.join("Info.plist"), plist).await
}

/// The landing page Dash opens the docset on.
pub async fn write_index_page(
    layout: &DocsetLayout,
    templates: &Templates,
    config: &BuildConfig,
) -> Result<()> {
    let globals = liquid::object!({
        "docset_name": config.docset_name,
        "version": config.version_label(),
        "feed_url": config.feed_url,
        "highlight_style": config.highlight_style,
        "page_path": "index.html",
    });
    let html = templates.index.render(&globals)?;
    let html = if config.minify { minify_html(&html)? } else { html };
    write_asset(&layout.documents.join("index.html"), html).await
}

pub async fn write_stylesheet(layout: &DocsetLayout) -> Result<()> {
    let css = STATIC_DIR
        .get_file("docset.css")
        .map(|file| file.contents())
        .ok_or_else(|| BuildError::fatal(ErrorStage::Assets, "Missing bundled docset.css"))?;
    write_asset(&layout.documents.join("css").join("docset.css"), css).await
}

async fn write_asset(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    write_file_ensuring_parent_dir(path, contents, ErrorStage::Assets)
        .await
        .map_err(|err| BuildError::fatal(ErrorStage::Assets, err.details().message.clone()))
}

/// Copy icons, logo and fonts from `assets_dir`.  None of them are required
/// for a working docset, so each missing file is a warning.  Returns how many
/// files were copied.
pub async fn copy_optional_assets(layout: &DocsetLayout, assets_dir: &Path) -> usize {
    let mut copies: Vec<(PathBuf, PathBuf)> = vec![
        (assets_dir.join("icon.png"), layout.docset.join("icon.png")),
        (assets_dir.join("icon@2x.png"), layout.docset.join("icon@2x.png")),
        (
            assets_dir.join("logo.svg"),
            layout.documents.join("img").join("logo.svg"),
        ),
    ];
    for font in FONTS {
        let ext = Path::new(font)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        copies.push((
            assets_dir.join("fonts").join(ext).join(font),
            layout.documents.join("fonts").join(font),
        ));
    }

    let mut copied = 0;
    for (from, to) in copies {
        if let Some(parent) = to.parent() {
            ensure_dir(parent).await;
        }
        match fs::copy(&from, &to).await {
            Ok(_) => copied += 1,
            Err(e) => warn!(asset = %from.display(), error = %e, "Could not copy asset"),
        }
    }
    copied
}
