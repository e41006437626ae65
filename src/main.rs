mod app;
mod color;
mod export;
mod io;
mod metadata;
mod summary;
mod tree;

use app::{App, AppConfig};
use clap::Parser;

fn main() {
    let config = AppConfig::parse();

    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(match config.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    if let Err(err) = App::run(&config) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
