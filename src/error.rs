use std::fmt;

pub type Result<T> = std::result::Result<T, BuildError>;

/// Which part of the build a problem came from.  This is mainly useful for
/// the log output, where "Render" problems point at a specific document and
/// "Setup" problems point at the output tree or the invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorStage {
    /// Bad configuration file, bad CLI arguments, bad exclude globs.
    Config,
    /// Creating or clearing the docset directory tree, walking the docs root.
    Setup,
    /// Reading a Markdown source, rendering its template or writing the page.
    Render,
    /// Anything involving the `searchIndex` database.
    Index,
    /// Static files: icons, logo, fonts, stylesheet, Info.plist.
    Assets,
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorStage::Config => "config",
            ErrorStage::Setup => "setup",
            ErrorStage::Render => "render",
            ErrorStage::Index => "index",
            ErrorStage::Assets => "assets",
        };
        f.write_str(s)
    }
}

/// BuildError payload describing what went wrong.
#[derive(Debug)]
pub struct ErrorDetails {
    pub stage: ErrorStage,
    /// Stringified version of the lower level error.
    pub message: String,
}

/// Does the build need to stop or not?
///
/// The orchestrator turns `DocumentProblem`s into warnings and keeps going
/// with the next document; everything else propagates to `main` and ends
/// the run with a non-zero exit code.
#[derive(Debug)]
pub enum BuildError {
    /// The build cannot continue, e.g. the template failed to parse or the
    /// index database could not be created.
    Fatal(ErrorDetails),
    /// A single document could not be processed.
    DocumentProblem(ErrorDetails),
}

impl BuildError {
    pub fn fatal(stage: ErrorStage, message: impl Into<String>) -> BuildError {
        BuildError::Fatal(ErrorDetails {
            stage,
            message: message.into(),
        })
    }

    pub fn document(stage: ErrorStage, message: impl Into<String>) -> BuildError {
        BuildError::DocumentProblem(ErrorDetails {
            stage,
            message: message.into(),
        })
    }

    pub fn details(&self) -> &ErrorDetails {
        match self {
            BuildError::Fatal(details) | BuildError::DocumentProblem(details) => details,
        }
    }

    pub fn stage(&self) -> ErrorStage {
        self.details().stage
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, BuildError::Fatal(_))
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details = self.details();
        write!(f, "{} error: {}", details.stage, details.message)
    }
}

impl std::error::Error for BuildError {}

impl From<std::io::Error> for BuildError {
    fn from(err: std::io::Error) -> BuildError {
        BuildError::fatal(ErrorStage::Setup, err.to_string())
    }
}

impl From<walkdir::Error> for BuildError {
    fn from(err: walkdir::Error) -> BuildError {
        BuildError::fatal(ErrorStage::Setup, err.to_string())
    }
}

impl From<rusqlite::Error> for BuildError {
    fn from(err: rusqlite::Error) -> BuildError {
        BuildError::fatal(ErrorStage::Index, err.to_string())
    }
}

// Template errors are always fatal; a page that fails to render would fail
// for every other page too.
impl From<liquid::Error> for BuildError {
    fn from(err: liquid::Error) -> BuildError {
        BuildError::fatal(ErrorStage::Render, err.to_string())
    }
}

impl From<toml::de::Error> for BuildError {
    fn from(err: toml::de::Error) -> BuildError {
        BuildError::fatal(ErrorStage::Config, err.to_string())
    }
}

impl From<globset::Error> for BuildError {
    fn from(err: globset::Error) -> BuildError {
        BuildError::fatal(ErrorStage::Config, err.to_string())
    }
}

impl From<serde_json::Error> for BuildError {
    fn from(err: serde_json::Error) -> BuildError {
        BuildError::fatal(ErrorStage::Config, err.to_string())
    }
}

// Minification problems are specific to the markup of one page.
impl From<lol_html::errors::RewritingError> for BuildError {
    fn from(err: lol_html::errors::RewritingError) -> BuildError {
        BuildError::document(ErrorStage::Render, err.to_string())
    }
}
