use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter, Registry};

/// Filter used when `RUST_LOG` isn't set, for a given `-v`/`-q` count.
pub fn default_directive(verbosity: i8) -> &'static str {
    match verbosity {
        i8::MIN..=-1 => "warn",
        0 => "docset=info,build_docset=info,warn",
        1 => "docset=debug,build_docset=debug,warn",
        _ => "docset=trace,build_docset=trace,info",
    }
}

/// Initialize logging.  If the environment variable `RUST_LOG` is set to a
/// non-empty value it is used as the filter, otherwise `default_directive`
/// picks one from the verbosity.
///
/// Calling this more than once is harmless; only the first call installs the
/// subscriber.  Tests rely on that.
pub fn init_logging(verbosity: i8) {
    // If RUST_LOG is present and *non-empty* then interpret it and use it.
    // CI scripts frequently set RUST_LOG unconditionally but potentially with
    // an empty value, and that shouldn't silence the build.
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(rustlog) if !rustlog.is_empty() => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity))),
        _ => EnvFilter::new(default_directive(verbosity)),
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(if verbosity > 1 {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        })
        .compact()
        // Build logs end up in CI output where ANSI isn't helpful.
        .with_ansi(false)
        // Wall time takes up a lot of columns and we don't care that much.
        .without_time()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let _ = Registry::default().with(layer).try_init();
}

#[test]
fn test_default_directive() {
    assert_eq!(default_directive(-1), "warn");
    assert!(default_directive(0).starts_with("docset=info"));
    assert!(default_directive(5).starts_with("docset=trace"));
}
