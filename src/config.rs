use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::RulesConfig;
use crate::error::{BuildError, ErrorStage, Result};

/// Schema for `docset.toml`.  Every field has a default so an empty file (or
/// no file at all) builds the NSIS docset from `./docs` into `./.build`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Root of the Markdown documentation, i.e. the directory holding
    /// `Callbacks/`, `Commands/`, `Includes/`, `Plugins/` and `Variables/`.
    pub docs_root: PathBuf,
    /// The docset bundle is created inside this directory.
    pub output_dir: PathBuf,
    /// `<docset_name>.docset` and the `CFBundleName`.
    pub docset_name: String,
    pub bundle_id: String,
    /// Used by Dash for keyword searches, e.g. `nsis:WriteFile`.
    pub platform_family: String,
    /// Version of the documentation being packaged.  Pages show `v<version>`,
    /// or `dev` when this is empty.
    pub version: String,
    /// Pages link to `<edit_base_url>/<relative dir>/<name>.md`.
    pub edit_base_url: String,
    /// Docset feed advertised on the landing page and in Info.plist.  Empty
    /// to leave it out.
    pub feed_url: String,
    /// CSS theme class for code blocks.
    pub highlight_style: String,
    /// Language class put on every code block.
    pub highlight_language: String,
    /// Directory with `icon.png`, `icon@2x.png`, `logo.svg` and
    /// `fonts/<ext>/<font>` to copy into the docset.
    pub assets_dir: Option<PathBuf>,
    /// Extra globs, relative to `docs_root`, of Markdown files to leave out.
    /// `README.md` files are always left out.
    pub exclude: Vec<String>,
    pub minify: bool,
    pub rules: RulesConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            docs_root: PathBuf::from("docs"),
            output_dir: PathBuf::from(".build"),
            docset_name: "NSIS".to_string(),
            bundle_id: "nsis".to_string(),
            platform_family: "nsis".to_string(),
            version: String::new(),
            edit_base_url: "https://github.com/NSIS-Dev/Documentation/edit/main/docs".to_string(),
            feed_url: "http://nsis-dev.github.io/Docset-Feed/NSIS.xml".to_string(),
            highlight_style: "dark".to_string(),
            highlight_language: "nsis".to_string(),
            assets_dir: None,
            exclude: vec![],
            minify: true,
            rules: RulesConfig::default(),
        }
    }
}

impl BuildConfig {
    pub fn from_toml_str(s: &str) -> Result<BuildConfig> {
        let config: BuildConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(config_path: &Path) -> Result<BuildConfig> {
        let input = fs::read_to_string(config_path).map_err(|e| {
            BuildError::fatal(
                ErrorStage::Config,
                format!("Problem reading config '{}': {}", config_path.display(), e),
            )
        })?;
        let mut config = BuildConfig::from_toml_str(&input)?;

        // Relative paths in the file are relative to the file, not to
        // wherever the tool happens to be run from.
        if let Some(base) = config_path.parent() {
            config.docs_root = base.join(&config.docs_root);
            config.output_dir = base.join(&config.output_dir);
            config.assets_dir = config.assets_dir.map(|dir| base.join(dir));
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.docset_name.is_empty() || self.docset_name.contains(['/', '\\']) {
            return Err(BuildError::fatal(
                ErrorStage::Config,
                format!("Invalid docset_name '{}'", self.docset_name),
            ));
        }
        if self.highlight_language.is_empty() {
            return Err(BuildError::fatal(ErrorStage::Config, "highlight_language must not be empty"));
        }
        Ok(())
    }

    pub fn version_label(&self) -> String {
        if self.version.is_empty() {
            "dev".to_string()
        } else {
            format!("v{}", self.version.trim_start_matches('v'))
        }
    }
}
