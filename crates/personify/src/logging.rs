//! Tracing setup for the CLI.
//!
//! Log output goes to stderr; stdout carries the persona data. The level
//! comes from `logging.level` in config, `--verbose` forces debug, and
//! `RUST_LOG` overrides both.

use personify_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the default filter directives for a base level.
///
/// ONNX Runtime, hyper, and reqwest internals are capped at warn so the
/// pipeline's own logs stay readable at debug level.
fn directives(level: &str) -> String {
    format!("{level},ort=warn,hyper=warn,reqwest=warn")
}

/// Initialize the tracing subscriber from config plus CLI overrides.
pub fn init(config: &Config, verbose: bool, json_logs: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(level)));

    let stderr = fmt::layer().with_writer(std::io::stderr);
    if json_logs || config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr.with_target(false).with_ansi(true))
            .init();
    }
}
