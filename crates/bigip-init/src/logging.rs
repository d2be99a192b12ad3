//! Tracing subscriber setup driven by the declaration's `controls` section.
//!
//! Precedence for the log filter: `RUST_LOG` when set, then `-v` flags,
//! then `controls.logLevel`. `--quiet` overrides everything with `error`.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use bigip_init_core::types::Controls;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

pub fn init_tracing(controls: &Controls, verbose: u8, quiet: bool) -> Result<()> {
    let filter = resolve_filter(controls, verbose, quiet);

    let stdout_layer = if controls.log_to_json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    let file_layer = match &controls.log_filename {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Cannot create log directory {parent}"))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {path}"))?;
            let writer = Mutex::new(file);
            let layer = if controls.log_to_json {
                fmt::layer().json().with_ansi(false).with_writer(writer).boxed()
            } else {
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed()
            };
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
    Ok(())
}

fn resolve_filter(controls: &Controls, verbose: u8, quiet: bool) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }
    if std::env::var(EnvFilter::DEFAULT_ENV).is_ok() {
        return EnvFilter::from_default_env();
    }
    match verbose {
        0 => EnvFilter::new(&controls.log_level),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}
