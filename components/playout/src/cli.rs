//! CLI (command line interface).

use std::path::PathBuf;

use structopt::StructOpt;

/// CLI (command line interface) of the playout engine.
#[derive(Clone, Debug, StructOpt)]
#[structopt(about = "ffmpeg based 24/7 television playout engine")]
pub struct Opts {
    /// File to write the log to, overriding the configured path.
    #[structopt(short, long, parse(from_os_str))]
    pub log: Option<PathBuf>,
}
