use std::borrow;

use include_dir::{include_dir, Dir};
use liquid::Template;

use super::liquid_exts::AssetPrefixFilterParser;
use crate::error::{BuildError, ErrorStage, Result};

static TEMPLATE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/templates");

#[derive(Default, Debug, Clone, Copy)]
struct StaticTemplateSource;

impl liquid::partials::PartialSource for StaticTemplateSource {
    fn contains(&self, name: &str) -> bool {
        TEMPLATE_DIR.get_file(name).is_some()
    }

    fn names(&self) -> Vec<&str> {
        TEMPLATE_DIR
            .files()
            .filter_map(|file| file.path().to_str())
            .collect()
    }

    fn try_get<'a>(&'a self, name: &str) -> Option<borrow::Cow<'a, str>> {
        match TEMPLATE_DIR.get_file(name) {
            Some(file) => file.contents_utf8().map(borrow::Cow::from),
            _ => None,
        }
    }
}

pub fn build_and_parse(s: &str) -> Result<Template> {
    let template = liquid::ParserBuilder::with_stdlib()
        .filter(AssetPrefixFilterParser)
        .partials(liquid::partials::LazyCompiler::<StaticTemplateSource>::empty())
        .build()?
        .parse(s)?;
    Ok(template)
}

pub fn build_and_parse_named(name: &str) -> Result<Template> {
    let template_str = TEMPLATE_DIR
        .get_file(name)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| {
            BuildError::fatal(ErrorStage::Render, format!("Missing template '{}'", name))
        })?;
    build_and_parse(template_str)
}

/// Every template the docset build renders, parsed once up front so that a
/// broken template aborts the build before any page is written.
pub struct Templates {
    pub page: Template,
    pub index: Template,
    pub info_plist: Template,
}

impl Templates {
    pub fn load() -> Result<Templates> {
        Ok(Templates {
            page: build_and_parse_named("docset.liquid")?,
            index: build_and_parse_named("index.liquid")?,
            info_plist: build_and_parse_named("info_plist.liquid")?,
        })
    }
}

#[test]
fn test_templates_parse() {
    Templates::load().unwrap();
}

#[test]
fn test_missing_template() {
    let err = build_and_parse_named("nope.liquid").err().unwrap();
    assert!(err.is_fatal());
    assert_eq!(err.stage(), ErrorStage::Render);
}

#[test]
fn test_filters_render() {
    let template =
        build_and_parse("{{ path | asset_prefix }}css|{{ name | escape }}").unwrap();
    let globals = liquid::object!({
        "path": "html/Callbacks/onInit.html",
        "name": "A & B",
    });
    assert_eq!(template.render(&globals).unwrap(), "../../css|A &amp; B");
}
