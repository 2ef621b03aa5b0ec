//! Build orchestration.
//!
//! `build_docset` is the whole build: plan every page, prepare the output
//! tree, open the index, render the pages concurrently, then write the
//! landing page and static files.  `run_pages` is the part that doesn't care
//! where index entries go, so it takes the `IndexWriter` as a parameter.

use std::sync::Arc;

use serde::Serialize;
use tokio::fs;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::classify::RuleSet;
use crate::config::BuildConfig;
use crate::docset::{
    copy_optional_assets, write_index_page, write_info_plist, write_stylesheet, DocsetLayout,
};
use crate::error::{BuildError, ErrorStage, Result};
use crate::file_utils::write_file_ensuring_parent_dir;
use crate::index_store::{
    IndexEntry, IndexLog, IndexSender, IndexSummary, IndexWriter, MemoryIndex, SqliteIndex,
};
use crate::markdown::markdown_to_html;
use crate::output::{render_page, PlannedPage};
use crate::source_tree::spawn_blocking_enumerate;
use crate::templating::Templates;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Markdown files found under the docs root.
    pub documents: usize,
    pub pages_written: usize,
    /// Documents that could not be read, rendered or written.
    pub skipped: Vec<String>,
    /// Documents outside the known top-level buckets.
    pub unknown_bucket: Vec<String>,
    pub index: IndexSummary,
    pub assets_copied: usize,
}

/// Enumerate and classify every document without touching the output tree.
pub async fn plan_pages(config: &BuildConfig) -> Result<Vec<PlannedPage>> {
    let rules = RuleSet::from_config(&config.rules);
    let sources = spawn_blocking_enumerate(&config.docs_root, &config.exclude).await?;
    Ok(sources
        .into_iter()
        .map(|source| PlannedPage::plan(source, &rules))
        .collect())
}

/// The rows a build would put in `searchIndex`, sorted, without rendering
/// anything.
pub async fn list_entries(config: &BuildConfig) -> Result<Vec<IndexEntry>> {
    let pages = plan_pages(config).await?;
    let memory = MemoryIndex::new();
    let log = IndexLog::open(Box::new(memory.clone()));
    let sender = log.sender();
    for page in &pages {
        sender.insert_if_absent(page.index_entry()).await?;
    }
    drop(sender);
    log.close().await?;
    Ok(memory.entries())
}

/// Like `plan_pages` but logging each document whose first directory isn't
/// a known bucket.  Those are still built, as commands.  The returned report
/// is the starting point for `run_pages`.
pub async fn plan_build(config: &BuildConfig) -> Result<(Vec<PlannedPage>, BuildReport)> {
    let pages = plan_pages(config).await?;
    let mut report = BuildReport::default();
    for page in &pages {
        if page.source.bucket().is_none() {
            warn!(path = %page.source.path.display(), "Unknown type, indexing as {}", page.classification.category);
            report.unknown_bucket.push(page.page_path.clone());
        }
    }
    report.documents = pages.len();
    Ok((pages, report))
}

/// Run the full build described by `config`.
pub async fn build_docset(config: &BuildConfig) -> Result<BuildReport> {
    config.validate()?;
    let span = info_span!("build_docset", docset = %config.docset_name);

    async move {
        // Parse templates and walk the docs root before deleting anything, so
        // a bad invocation leaves the previous build alone.
        let templates = Arc::new(Templates::load()?);
        let (pages, report) = plan_build(config).await?;

        let layout = DocsetLayout::new(&config.output_dir, &config.docset_name);
        layout.prepare().await;

        info!(db = %layout.index_db().display(), "Initializing database");
        let index = SqliteIndex::create(&layout.index_db())?;

        let mut report = run_pages(
            config,
            &layout,
            templates.clone(),
            pages,
            report,
            Box::new(index),
        )
        .await?;

        write_index_page(&layout, &templates, config).await?;
        write_info_plist(&layout, &templates, config).await?;
        write_stylesheet(&layout).await?;
        if let Some(assets_dir) = &config.assets_dir {
            report.assets_copied = copy_optional_assets(&layout, assets_dir).await;
        }

        info!(
            pages = report.pages_written,
            indexed = report.index.inserted,
            skipped = report.skipped.len(),
            "Finished {}",
            layout.docset.display()
        );
        Ok::<BuildReport, BuildError>(report)
    }
    .instrument(span)
    .await
}

/// Render `pages` into `layout` and record them in `index`, adding the
/// outcome to `report`.  The index is opened for the duration of this call
/// and closed before it returns, even when a page fails.
pub async fn run_pages(
    config: &BuildConfig,
    layout: &DocsetLayout,
    templates: Arc<Templates>,
    pages: Vec<PlannedPage>,
    mut report: BuildReport,
    index: Box<dyn IndexWriter>,
) -> Result<BuildReport> {
    let log = IndexLog::open(index);
    let config = Arc::new(config.clone());
    let layout = Arc::new(layout.clone());

    let mut tasks = JoinSet::new();
    for page in pages {
        let span = debug_span!("page", path = %page.page_path);
        tasks.spawn(
            build_page(
                page,
                config.clone(),
                layout.clone(),
                templates.clone(),
                log.sender(),
            )
            .instrument(span),
        );
    }

    let mut fatal = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(()))) => report.pages_written += 1,
            Ok((page_path, Err(err))) if !err.is_fatal() => {
                warn!(page = %page_path, "{}", err);
                report.skipped.push(page_path);
            }
            Ok((_, Err(err))) => {
                if fatal.is_none() {
                    fatal = Some(err);
                }
            }
            Err(join_err) => {
                if fatal.is_none() {
                    fatal = Some(BuildError::fatal(
                        ErrorStage::Render,
                        format!("page task failed: {}", join_err),
                    ));
                }
            }
        }
    }

    // All senders are gone with their tasks, so this drains and closes.
    // When the writer itself failed, page tasks only saw the channel close;
    // the writer's error is the one worth reporting.
    report.index = match (log.close().await, fatal) {
        (Err(writer_err), _) => return Err(writer_err),
        (Ok(_), Some(err)) => return Err(err),
        (Ok(summary), None) => summary,
    };
    report.skipped.sort();
    Ok(report)
}

/// Read, render and write one page, then record it in the index.  Returns
/// the page path so the caller can report on it.
async fn build_page(
    page: PlannedPage,
    config: Arc<BuildConfig>,
    layout: Arc<DocsetLayout>,
    templates: Arc<Templates>,
    index: IndexSender,
) -> (String, Result<()>) {
    let result = async {
        let markdown = fs::read_to_string(&page.source.path).await.map_err(|e| {
            BuildError::document(
                ErrorStage::Render,
                format!("Problem reading '{}': {}", page.source.path.display(), e),
            )
        })?;
        let contents = markdown_to_html(&markdown, &config.highlight_language);
        let html = render_page(&templates, &config, &page, &contents)?;

        let out_path = layout.document_path(&page.page_path);
        write_file_ensuring_parent_dir(&out_path, html, ErrorStage::Render).await?;
        trace!(name = %page.classification.canonical_name, "wrote page");

        index.insert_if_absent(page.index_entry()).await
    }
    .await;

    (page.page_path, result)
}
