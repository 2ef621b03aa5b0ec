//! Derive the search index identity of a documentation page from where its
//! Markdown source lives.
//!
//! The NSIS documentation tree encodes everything we need in its layout:
//! `Callbacks/onInit.md` documents the `.onInit` callback function,
//! `Variables/INSTDIR.md` documents `$INSTDIR`, `Includes/WinVer/WinVer.md`
//! documents the `${WinVer}` macro from `WinVer.nsh`, and anything else is a
//! plain command.  Nothing here looks at file contents.
//!
//! The decision logic is an ordered table of [`Rule`]s evaluated
//! first-match-wins.  The table always ends with a catch-all, so
//! classification is total.

use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Label assigned to every page that isn't part of an `Includes` library.
pub const CORE_BUNDLE: &str = "Core";

/// Entry type as stored in the `type` column of `searchIndex`.  The names are
/// the Dash entry types of the same spelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Function,
    Command,
    Library,
    Constant,
    Variable,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Function => "Function",
            Category::Command => "Command",
            Category::Library => "Library",
            Category::Constant => "Constant",
            Category::Variable => "Variable",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Function" => Ok(Category::Function),
            "Command" => Ok(Category::Command),
            "Library" => Ok(Category::Library),
            "Constant" => Ok(Category::Constant),
            "Variable" => Ok(Category::Variable),
            _ => Err(format!("unknown entry type '{}'", s)),
        }
    }
}

/// The top-level directories of the documentation tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bucket {
    Callbacks,
    Commands,
    Includes,
    Plugins,
    Variables,
}

impl Bucket {
    pub const ALL: [Bucket; 5] = [
        Bucket::Callbacks,
        Bucket::Commands,
        Bucket::Includes,
        Bucket::Plugins,
        Bucket::Variables,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Bucket::Callbacks => "Callbacks",
            Bucket::Commands => "Commands",
            Bucket::Includes => "Includes",
            Bucket::Plugins => "Plugins",
            Bucket::Variables => "Variables",
        }
    }

    /// Exact, case-sensitive match against a single path segment.
    pub fn from_segment(segment: &str) -> Option<Bucket> {
        Bucket::ALL
            .iter()
            .copied()
            .find(|bucket| bucket.dir_name() == segment)
    }
}

/// How the canonical name is decorated.  Decorations are display-only; the
/// output file name is always the bare base name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sigil {
    /// `onInit` → `.onInit`
    Dot,
    /// `INSTDIR` → `$INSTDIR`
    Dollar,
    /// `WinVer` → `${WinVer}`
    Braced,
    /// Unchanged.
    Bare,
}

impl Sigil {
    pub fn decorate(&self, base_name: &str) -> String {
        match self {
            Sigil::Dot => format!(".{}", base_name),
            Sigil::Dollar => format!("${}", base_name),
            Sigil::Braced => format!("${{{}}}", base_name),
            Sigil::Bare => base_name.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// Some directory segment is the bucket and the base name has the prefix.
    InBucketWithPrefix(Bucket, String),
    /// Some directory segment is the bucket.
    InBucket(Bucket),
    /// `__NAME__`, wherever it lives.
    Dunder,
    Always,
}

impl Predicate {
    fn matches<S: AsRef<str>>(&self, dir_segments: &[S], base_name: &str) -> bool {
        match self {
            Predicate::InBucketWithPrefix(bucket, prefix) => {
                has_segment(dir_segments, *bucket) && base_name.starts_with(prefix.as_str())
            }
            Predicate::InBucket(bucket) => has_segment(dir_segments, *bucket),
            Predicate::Dunder => base_name.starts_with("__") && base_name.ends_with("__"),
            Predicate::Always => true,
        }
    }
}

fn has_segment<S: AsRef<str>>(dir_segments: &[S], bucket: Bucket) -> bool {
    dir_segments
        .iter()
        .any(|segment| segment.as_ref() == bucket.dir_name())
}

/// Where the `bundle` grouping label comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundleLabel {
    /// Always `Core`.
    Core,
    /// The enclosing directory plus `.nsh`, i.e. the header file a library
    /// macro is defined in.
    EnclosingHeader,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub predicate: Predicate,
    pub category: Category,
    pub sigil: Sigil,
    pub bundle: BundleLabel,
}

impl Rule {
    fn new(predicate: Predicate, category: Category, sigil: Sigil) -> Rule {
        Rule {
            predicate,
            category,
            sigil,
            bundle: BundleLabel::Core,
        }
    }
}

/// The two rules that historically differed between build script variants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Variables whose name starts with this prefix are compile-time
    /// constants (`${NSISDIR}`) rather than runtime variables.  `None`
    /// disables the rule so they classify as plain variables.
    pub reserved_variable_prefix: Option<String>,
    /// Classify `Callbacks/un.on*` as uninstaller callback functions.  When
    /// disabled they fall through to the default `Command` rule.
    pub uninstall_callbacks: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            reserved_variable_prefix: Some("NSIS".to_string()),
            uninstall_callbacks: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub canonical_name: String,
    pub category: Category,
    pub output_file_name: String,
    pub bundle: String,
}

impl ClassificationResult {
    /// `"{canonical_name} | {bundle}"`, used as the HTML page title.
    pub fn page_title(&self) -> String {
        format!("{} | {}", self.canonical_name, self.bundle)
    }
}

/// Ordered rule table.
#[derive(Clone, Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSet::from_config(&RulesConfig::default())
    }
}

impl RuleSet {
    pub fn from_config(config: &RulesConfig) -> RuleSet {
        let mut rules = vec![Rule::new(
            Predicate::InBucketWithPrefix(Bucket::Callbacks, "on".to_string()),
            Category::Function,
            Sigil::Dot,
        )];
        if config.uninstall_callbacks {
            rules.push(Rule::new(
                Predicate::InBucketWithPrefix(Bucket::Callbacks, "un.on".to_string()),
                Category::Function,
                Sigil::Bare,
            ));
        }
        rules.push(Rule::new(Predicate::Dunder, Category::Constant, Sigil::Braced));
        if let Some(prefix) = &config.reserved_variable_prefix {
            // An empty prefix would swallow every variable.
            if !prefix.is_empty() {
                rules.push(Rule::new(
                    Predicate::InBucketWithPrefix(Bucket::Variables, prefix.clone()),
                    Category::Constant,
                    Sigil::Braced,
                ));
            }
        }
        rules.push(Rule::new(
            Predicate::InBucket(Bucket::Variables),
            Category::Variable,
            Sigil::Dollar,
        ));
        rules.push(Rule {
            bundle: BundleLabel::EnclosingHeader,
            ..Rule::new(
                Predicate::InBucket(Bucket::Includes),
                Category::Library,
                Sigil::Braced,
            )
        });
        rules.push(Rule::new(Predicate::Always, Category::Command, Sigil::Bare));

        RuleSet { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classify a document given the directory segments it lives in (any
    /// prefix of the path may be included, only whole-segment bucket names
    /// matter) and its base name without extension.
    pub fn classify<S: AsRef<str>>(&self, dir_segments: &[S], base_name: &str) -> ClassificationResult {
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.predicate.matches(dir_segments, base_name))
            .unwrap_or(&CATCH_ALL);

        let bundle = match rule.bundle {
            BundleLabel::Core => CORE_BUNDLE.to_string(),
            BundleLabel::EnclosingHeader => match dir_segments.last() {
                Some(dir) => format!("{}.nsh", dir.as_ref()),
                None => CORE_BUNDLE.to_string(),
            },
        };

        ClassificationResult {
            canonical_name: rule.sigil.decorate(base_name),
            category: rule.category,
            output_file_name: base_name.to_string(),
            bundle,
        }
    }

    /// Convenience wrapper taking a path to a Markdown file.
    pub fn classify_path(&self, path: &Path) -> ClassificationResult {
        let (dir_segments, base_name) = split_doc_path(path);
        self.classify(dir_segments.as_slice(), &base_name)
    }
}

// `RuleSet::from_config` always ends with this rule; it only exists so that
// `classify` doesn't need to unwrap.
static CATCH_ALL: Rule = Rule {
    predicate: Predicate::Always,
    category: Category::Command,
    sigil: Sigil::Bare,
    bundle: BundleLabel::Core,
};

/// Split a document path into its directory segments and its base name with
/// the extension removed.
pub fn split_doc_path(path: &Path) -> (Vec<String>, String) {
    let dir_segments = match path.parent() {
        Some(parent) => parent
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect(),
        None => vec![],
    };
    let base_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir_segments, base_name)
}
