use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

/// Rewrite a link to another page of the documentation (`../File/Delete.md`,
/// `WinVer.md#usage`) so it points at the rendered page instead.  Absolute
/// URLs and links to anything that isn't Markdown are returned untouched.
pub fn rewrite_md_link(dest: &str) -> Option<String> {
    lazy_static! {
        static ref MD_LINK: Regex = Regex::new(r"^(?P<path>[^:?#]+)\.md(?P<rest>[?#].*)?$").unwrap();
    }

    let caps = MD_LINK.captures(dest)?;
    Some(format!(
        "{}.html{}",
        &caps["path"],
        caps.name("rest").map_or("", |m| m.as_str())
    ))
}

/// Convert a documentation page to an HTML fragment.
///
/// Code blocks, fenced or indented, are all NSIS script in this tree so they
/// are tagged with `highlight_language` for highlight.js whatever their info
/// string says.
pub fn markdown_to_html(markdown: &str, highlight_language: &str) -> String {
    let opts = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let code_open = format!(
        "<pre><code class=\"hljs language-{}\">",
        html_escape_attr(highlight_language)
    );

    let events = Parser::new_ext(markdown, opts).map(|event| match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => {
            let dest_url = match rewrite_md_link(&dest_url) {
                Some(rewritten) => CowStr::from(rewritten),
                None => dest_url,
            };
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            })
        }
        Event::Start(Tag::CodeBlock(_)) => Event::Html(CowStr::from(code_open.clone())),
        Event::End(TagEnd::CodeBlock) => Event::Html(CowStr::Borrowed("</code></pre>\n")),
        other => other,
    });

    let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut html_output, events);
    html_output
}

fn html_escape_attr(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

#[test]
fn test_rewrite_md_link() {
    assert_eq!(rewrite_md_link("Delete.md").as_deref(), Some("Delete.html"));
    assert_eq!(
        rewrite_md_link("../File/Delete.md#remarks").as_deref(),
        Some("../File/Delete.html#remarks")
    );
    assert_eq!(rewrite_md_link("https://nsis.sourceforge.io/Foo.md"), None);
    assert_eq!(rewrite_md_link("Delete.mdx"), None);
    assert_eq!(rewrite_md_link("#usage"), None);
}

#[test]
fn test_markdown_to_html() {
    let md = "# WriteFile\n\nSee [Delete](../File/Delete.md) and [site](https://nsis.sf.net/).\n\n```nsis\nWriteFile $0 \"<hi>\"\n```\n";
    let html = markdown_to_html(md, "nsis");
    assert!(html.contains("<h1>WriteFile</h1>"), "{}", html);
    assert!(html.contains("href=\"../File/Delete.html\""), "{}", html);
    assert!(html.contains("href=\"https://nsis.sf.net/\""), "{}", html);
    assert!(
        html.contains("<pre><code class=\"hljs language-nsis\">WriteFile $0 &quot;&lt;hi&gt;&quot;\n</code></pre>")
            || html.contains("<pre><code class=\"hljs language-nsis\">WriteFile $0 \"&lt;hi&gt;\"\n</code></pre>"),
        "{}",
        html
    );
}

#[test]
fn test_markdown_tables() {
    let md = "| Flag | Meaning |\n| --- | --- |\n| /o | overwrite |\n";
    let html = markdown_to_html(md, "nsis");
    assert!(html.contains("<table>"), "{}", html);
    assert!(html.contains("<td>/o</td>"), "{}", html);
}
