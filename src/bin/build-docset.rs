use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{to_string, to_string_pretty};

use docset::logging::init_logging;
use docset::{build_docset, list_entries, BuildConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    // Pretty-printed JSON.
    Pretty,
    // Un-pretty-printed JSON, one record per line.
    Concise,
}

/// Build a Dash docset from the NSIS Markdown documentation.
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Cli {
    /// TOML config file.  Paths inside it are relative to the file.
    #[clap(long, short, value_parser, env = "DOCSET_CONFIG")]
    config: Option<PathBuf>,

    #[clap(long, value_parser)]
    docs_root: Option<PathBuf>,

    /// Directory the `.docset` bundle is created in.
    #[clap(long, short, value_parser)]
    output: Option<PathBuf>,

    #[clap(long, value_parser)]
    docset_version: Option<String>,

    /// Code highlighting theme class.
    #[clap(long, value_parser)]
    theme: Option<String>,

    /// Directory with icons, logo and fonts.
    #[clap(long, value_parser)]
    assets: Option<PathBuf>,

    #[clap(long)]
    no_minify: bool,

    /// Index `${NSIS...}` variables as plain variables.
    #[clap(long)]
    no_reserved_prefix: bool,

    /// Index `un.on...` callbacks as commands.
    #[clap(long)]
    no_uninstall_callbacks: bool,

    /// More logging; repeat for more.
    #[clap(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[clap(long, short)]
    quiet: bool,

    #[clap(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the docset (the default).
    Build,
    /// Print the index entries a build would produce, as JSON.
    List {
        #[clap(long, value_enum, default_value = "concise")]
        output_format: OutputFormat,
    },
}

impl Cli {
    fn verbosity(&self) -> i8 {
        if self.quiet {
            -1
        } else {
            self.verbose.min(i8::MAX as u8) as i8
        }
    }

    fn config(&self) -> docset::Result<BuildConfig> {
        let mut config = match &self.config {
            Some(path) => BuildConfig::load(path)?,
            None => BuildConfig::default(),
        };
        if let Some(docs_root) = &self.docs_root {
            config.docs_root = docs_root.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(version) = &self.docset_version {
            config.version = version.clone();
        }
        if let Some(theme) = &self.theme {
            config.highlight_style = theme.clone();
        }
        if let Some(assets) = &self.assets {
            config.assets_dir = Some(assets.clone());
        }
        if self.no_minify {
            config.minify = false;
        }
        if self.no_reserved_prefix {
            config.rules.reserved_variable_prefix = None;
        }
        if self.no_uninstall_callbacks {
            config.rules.uninstall_callbacks = false;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    let config = match cli.config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    match cli.cmd.unwrap_or(Command::Build) {
        Command::Build => match build_docset(&config).await {
            Ok(report) => {
                if !report.skipped.is_empty() {
                    tracing::warn!(skipped = ?report.skipped, "Some documents were not built");
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                tracing::error!("{}", err);
                ExitCode::FAILURE
            }
        },
        Command::List { output_format } => match list_entries(&config).await {
            Ok(entries) => {
                let printed = match output_format {
                    OutputFormat::Concise => entries
                        .iter()
                        .map(to_string)
                        .collect::<Result<Vec<_>, _>>()
                        .map(|lines| lines.join("\n")),
                    OutputFormat::Pretty => to_string_pretty(&entries),
                };
                match printed {
                    Ok(s) => {
                        println!("{}", s);
                        ExitCode::SUCCESS
                    }
                    Err(err) => {
                        tracing::error!("{}", err);
                        ExitCode::FAILURE
                    }
                }
            }
            Err(err) => {
                tracing::error!("{}", err);
                ExitCode::FAILURE
            }
        },
    }
}
