//! Process configuration from the command line and environment.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Directory holding the data files
    #[arg(env = "BOOKBRO_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Book catalog file, relative to the data directory
    #[arg(long, default_value = "books.json")]
    pub books_file: PathBuf,

    /// Reader file, relative to the data directory
    #[arg(long, default_value = "readers.json")]
    pub readers_file: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "BOOKBRO_LOG", default_value = "warn")]
    pub log_level: String,
}

impl Config {
    pub fn books_path(&self) -> PathBuf {
        self.data_dir.join(&self.books_file)
    }

    pub fn readers_path(&self) -> PathBuf {
        self.data_dir.join(&self.readers_file)
    }
}
