extern crate serde;
extern crate serde_json;

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate tracing;

pub mod classify;
pub mod config;
pub mod docset;
pub mod error;
pub mod file_utils;
pub mod index_store;
pub mod logging;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod source_tree;
pub mod templating;
pub mod url_encode_path;

pub use classify::{Category, ClassificationResult, RuleSet, RulesConfig};
pub use config::BuildConfig;
pub use error::{BuildError, ErrorStage, Result};
pub use pipeline::{build_docset, list_entries, plan_build, plan_pages, BuildReport};
