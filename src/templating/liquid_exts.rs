use liquid_core::Result;
use liquid_core::Runtime;
use liquid_core::{Display_filter, Filter, FilterReflection, ParseFilter};
use liquid_core::{Value, ValueView};

/// Number of `../` hops from a file at `page_path` back to the directory
/// `page_path` is relative to.
pub fn asset_prefix(page_path: &str) -> String {
    let depth = page_path
        .trim_start_matches('/')
        .matches('/')
        .count();
    "../".repeat(depth)
}

#[derive(Clone, ParseFilter, FilterReflection)]
#[filter(
    name = "asset_prefix",
    description = "Given a page path relative to the Documents directory, produce the relative prefix that leads back to it.",
    parsed(AssetPrefixFilter)
)]
pub struct AssetPrefixFilterParser;

#[derive(Debug, Default, Display_filter)]
#[name = "asset_prefix"]
struct AssetPrefixFilter;

impl Filter for AssetPrefixFilter {
    fn evaluate(&self, input: &dyn ValueView, _runtime: &dyn Runtime) -> Result<Value> {
        let s = input.to_kstr();
        Ok(Value::scalar(asset_prefix(&s)))
    }
}

#[test]
fn test_asset_prefix() {
    assert_eq!(asset_prefix("index.html"), "");
    assert_eq!(asset_prefix("html/onInit.html"), "../");
    assert_eq!(asset_prefix("html/Commands/File/WriteFile.html"), "../../../");
    assert_eq!(asset_prefix("/html/Callbacks/onInit.html"), "../../");
}
