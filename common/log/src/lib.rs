//! Logging tools and their initialization.

#![deny(
    rustdoc::broken_intra_doc_links,
    missing_debug_implementations,
    nonstandard_style,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![warn(
    deprecated_in_future,
    missing_docs,
    unreachable_pub,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

use std::{path::Path, sync::Mutex};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, DateFrom, FileLimit},
    ContentLimit, FileRotate, TimeFrequency,
};
pub use tracing::{self, Level};
pub use tracing_log::log;
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

/// Number of rotated log files kept before the oldest one is removed.
const BACKUP_COUNT: usize = 5;

/// Initializes global logger with the given verbosity `level` ([`Info`] by
/// default, if [`None`]), returning once the subscriber is installed.
///
/// With a `file` given, log records are appended to it and the file is
/// rotated daily, keeping [`BACKUP_COUNT`] dated backups. Without one,
/// records go to stdout.
///
/// # Panics
///
/// If failed to initialize logger.
///
/// [`Info`]: tracing::Level::INFO
pub fn init(level: Option<Level>, file: Option<&Path>) {
    if let Err(e) = LogTracer::init() {
        panic!("Failed to initialize logger: {}", e);
    };
    let level = level.unwrap_or(Level::INFO);
    match file {
        Some(path) => {
            let sink = FileRotate::new(
                path,
                AppendTimestamp::with_format(
                    "%Y-%m-%d",
                    FileLimit::MaxFiles(BACKUP_COUNT),
                    DateFrom::DateYesterday,
                ),
                ContentLimit::Time(TimeFrequency::Daily),
                Compression::None,
                None,
            );
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(Mutex::new(sink))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("setting tracing subscriber failed");
        }
        None => {
            let subscriber =
                FmtSubscriber::builder().with_max_level(level).finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("setting tracing subscriber failed");
        }
    }
}
