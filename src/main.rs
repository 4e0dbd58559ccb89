// External crates
use anyhow::{bail, Context, Result};
use log::info;
use std::env;

// Internal modules
use tsforecast::toolkit::tsf_reader::convert_tsf;
use tsforecast::toolkit::split_params::get_split_params;
use tsforecast::util::config::PipelineConfig;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

fn main() -> Result<()> {
    env_logger::init();
    info!(
        "{} {} built with {} for {}",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::RUSTC_VERSION,
        built_info::TARGET
    );

    // Accept the dataset and an optional configuration file as arguments
    let args: Vec<String> = env::args().collect();
    let Some(tsf_path) = args.get(1) else {
        bail!("usage: {} <file.tsf> [config.json]", built_info::PKG_NAME);
    };
    let config = match args.get(2) {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => PipelineConfig::default(),
    };

    let long = convert_tsf(tsf_path).with_context(|| format!("Failed to read {}", tsf_path))?;
    info!("Loaded {} observations from {}", long.height(), tsf_path);

    let params = get_split_params(&config.split, config.context_length);
    let frames = params
        .split(&long, &config.id_columns())
        .context("Failed to split dataset")?;

    println!("Training rows: {}", frames.train.height());
    println!("Validation rows: {}", frames.valid.height());
    println!("Test rows: {}", frames.test.height());

    Ok(())
}
