//! Binary executable of the playout engine.

use structopt::StructOpt as _;
use telecast_playout::{cli, pipeline, Config};

fn main() -> anyhow::Result<()> {
    let opts = cli::Opts::from_args();

    let mut cfg = Config::load()?;
    if let Some(log) = opts.log {
        cfg.logging.path = Some(log);
    }
    telecast_log::init(cfg.logging.level(), cfg.logging.path.as_deref());

    pipeline::run(cfg)
}
