use anyhow::Result;
use clap::Parser;
use easyfind::{cli, logging, Args};

fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let mut cfg = args.load_config_file()?;
    // Before overrides, so invalid values get logged
    logging::init(&cfg.log_filter);
    args.apply_overrides(&mut cfg);

    cli::run(args, cfg)
}
