/*
 * Docset page output.  A `PlannedPage` is everything we know about a page
 * before touching its contents: where it comes from, what it is called in
 * the index and where it ends up.  Rendering wraps the converted Markdown in
 * the page template and minifies the result.
 */
use std::cell::Cell;
use std::rc::Rc;

use lol_html::html_content::ContentType;
use lol_html::{doc_comments, doc_text, element, rewrite_str, RewriteStrSettings};
use regex::Regex;

use crate::classify::{ClassificationResult, RuleSet};
use crate::config::BuildConfig;
use crate::error::Result;
use crate::index_store::IndexEntry;
use crate::source_tree::SourceDocument;
use crate::templating::Templates;
use crate::url_encode_path::join_url;

/// Pages live under this directory inside `Documents/`.
pub const HTML_DIR: &str = "html";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedPage {
    pub source: SourceDocument,
    pub classification: ClassificationResult,
    /// Relative to the docset's `Documents` directory, `/`-separated, e.g.
    /// `html/Commands/File/WriteFile.html`.
    pub page_path: String,
}

impl PlannedPage {
    pub fn plan(source: SourceDocument, rules: &RuleSet) -> PlannedPage {
        let classification = rules.classify(source.rel_dir.as_slice(), &source.base_name);
        let rel_dir = source.rel_dir_string();
        let page_path = if rel_dir.is_empty() {
            format!("{}/{}.html", HTML_DIR, classification.output_file_name)
        } else {
            format!("{}/{}/{}.html", HTML_DIR, rel_dir, classification.output_file_name)
        };
        PlannedPage {
            source,
            classification,
            page_path,
        }
    }

    pub fn index_entry(&self) -> IndexEntry {
        IndexEntry {
            name: self.classification.canonical_name.clone(),
            entry_type: self.classification.category,
            path: self.page_path.clone(),
        }
    }

    /// Where the Markdown source can be edited upstream.
    pub fn edit_link(&self, edit_base_url: &str) -> String {
        let rel_dir = self.source.rel_dir_string();
        let rel_source = if rel_dir.is_empty() {
            format!("{}.md", self.source.base_name)
        } else {
            format!("{}/{}.md", rel_dir, self.source.base_name)
        };
        join_url(edit_base_url, &rel_source)
    }
}

/// Render the full HTML page for `page` given its converted Markdown.
pub fn render_page(
    templates: &Templates,
    config: &BuildConfig,
    page: &PlannedPage,
    contents: &str,
) -> Result<String> {
    let globals = liquid::object!({
        "version": config.version_label(),
        "page_title": page.classification.page_title(),
        "canonical_name": page.classification.canonical_name,
        "category": page.classification.category.as_str(),
        "bundle": page.classification.bundle,
        "contents": contents,
        "gh_link": page.edit_link(&config.edit_base_url),
        "page_path": page.page_path,
        "highlight_style": config.highlight_style,
    });
    let html = templates.page.render(&globals)?;
    if config.minify {
        minify_html(&html)
    } else {
        Ok(html)
    }
}

/// Elements whose text is copied through untouched.
const VERBATIM_ELEMENTS: &str = "pre, textarea, script, style";

/// Drop comments and collapse whitespace in text outside `<pre>`,
/// `<textarea>`, `<script>` and `<style>`.  Whitespace-only text that spans a
/// line break is indentation between tags and is removed entirely.
pub fn minify_html(html: &str) -> Result<String> {
    lazy_static! {
        static ref WHITESPACE: Regex = Regex::new(r"[ \t\r\n\x0C]+").unwrap();
    }

    let verbatim_depth = Rc::new(Cell::new(0u32));
    let element_depth = verbatim_depth.clone();

    let element_content_handlers = vec![element!(VERBATIM_ELEMENTS, move |el| {
        element_depth.set(element_depth.get() + 1);
        let end_depth = element_depth.clone();
        el.on_end_tag(move |_end| {
            end_depth.set(end_depth.get().saturating_sub(1));
            Ok(())
        })?;
        Ok(())
    })];

    let document_content_handlers = vec![
        doc_comments!(|c| {
            c.remove();
            Ok(())
        }),
        doc_text!(move |t| {
            if verbatim_depth.get() > 0 {
                return Ok(());
            }
            let text = t.as_str();
            if text.bytes().all(|b| b.is_ascii_whitespace()) {
                if text.contains('\n') {
                    t.remove();
                } else if !text.is_empty() {
                    t.replace(" ", ContentType::Text);
                }
            } else if WHITESPACE.is_match(text) {
                let collapsed = WHITESPACE.replace_all(text, " ").into_owned();
                t.replace(&collapsed, ContentType::Html);
            }
            Ok(())
        }),
    ];

    let minified = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers,
            document_content_handlers,
            ..RewriteStrSettings::default()
        },
    )?;
    Ok(minified.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn doc(rel_dir: &[&str], base_name: &str) -> SourceDocument {
        SourceDocument {
            path: PathBuf::from(format!("/docs/{}/{}.md", rel_dir.join("/"), base_name)),
            rel_dir: rel_dir.iter().map(|s| s.to_string()).collect(),
            base_name: base_name.to_string(),
        }
    }

    #[test]
    fn test_plan_paths() {
        let rules = RuleSet::default();

        let page = PlannedPage::plan(doc(&["Commands", "File"], "WriteFile"), &rules);
        assert_eq!(page.page_path, "html/Commands/File/WriteFile.html");
        assert_eq!(
            page.index_entry(),
            IndexEntry {
                name: "WriteFile".to_string(),
                entry_type: crate::classify::Category::Command,
                path: "html/Commands/File/WriteFile.html".to_string(),
            }
        );
        assert_eq!(
            page.edit_link("https://example.com/edit/main/docs"),
            "https://example.com/edit/main/docs/Commands/File/WriteFile.md"
        );

        // Sigils never leak into paths.
        let page = PlannedPage::plan(doc(&["Variables"], "__FILE__"), &rules);
        assert_eq!(page.page_path, "html/Variables/__FILE__.html");
        assert_eq!(page.index_entry().name, "${__FILE__}");

        let page = PlannedPage::plan(doc(&[], "Overview"), &rules);
        assert_eq!(page.page_path, "html/Overview.html");
        assert_eq!(page.edit_link("https://example.com/"), "https://example.com/Overview.md");
    }

    #[test]
    fn test_minify_html() {
        let html = "<!DOCTYPE html>\n<html>\n  <head>\n    <title>x</title>\n  </head>\n  <!-- c -->\n  <body>\n    <p>Hello   <code>a</code> <em>b</em></p>\n<pre><code>line 1\n    line 2\n</code></pre>\n  </body>\n</html>\n";
        assert_eq!(
            minify_html(html).unwrap(),
            "<!DOCTYPE html><html><head><title>x</title></head><body><p>Hello <code>a</code> <em>b</em></p><pre><code>line 1\n    line 2\n</code></pre></body></html>"
        );
    }

    #[test]
    fn test_minify_keeps_verbatim_elements() {
        let html = "<div>\n  <textarea>a\n   b</textarea>\n  <script>var  x = 1;\n</script>\n  <pre-note>wide   gap</pre-note>\n</div>";
        assert_eq!(
            minify_html(html).unwrap(),
            "<div><textarea>a\n   b</textarea><script>var  x = 1;\n</script><pre-note>wide gap</pre-note></div>"
        );
    }

    #[test]
    fn test_render_page() {
        let templates = Templates::load().unwrap();
        let config = BuildConfig {
            version: "3.10".to_string(),
            minify: false,
            ..BuildConfig::default()
        };
        let page = PlannedPage::plan(doc(&["Callbacks"], "onInit"), &RuleSet::default());
        let html = render_page(&templates, &config, &page, "<p>Called when the installer is nearly finished initializing.</p>").unwrap();

        assert!(html.contains("<title>.onInit | Core</title>"), "{}", html);
        assert!(html.contains("href=\"../../css/docset.css\""), "{}", html);
        assert!(html.contains("v3.10"), "{}", html);
        assert!(html.contains("<p>Called when the installer"), "{}", html);
        assert!(
            html.contains("https://github.com/NSIS-Dev/Documentation/edit/main/docs/Callbacks/onInit.md"),
            "{}",
            html
        );
        assert!(html.contains("class=\"theme-dark\""), "{}", html);

        let minified = render_page(
            &templates,
            &BuildConfig::default(),
            &page,
            "<p>x</p>",
        )
        .unwrap();
        assert!(minified.len() < html.len());
        assert!(!minified.contains("<!--"), "{}", minified);
        assert!(minified.contains(">dev<"), "{}", minified);
    }
}
