use clap::Parser;

use bookbro::config::Config;

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    bookbro::logging::init(&config.log_level);
    tracing::info!("bookbro v{}", env!("CARGO_PKG_VERSION"));

    bookbro::interface::console::run(&config)
}
