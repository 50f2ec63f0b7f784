//! Run configuration, built once from the command line.

use std::path::{Path, PathBuf};

use crate::auth::TokenSettings;
use crate::cli::Cli;

/// Everything a run needs to know, fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub query: String,
    pub output_dir: PathBuf,
    pub cache_token: bool,
    pub debug: bool,
    pub credentials_file: Option<PathBuf>,
    /// Program name used for the token cache file.
    pub prog_name: String,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Self {
        Self {
            query: cli.query,
            output_dir: cli.output_dir,
            cache_token: cli.cache_token,
            debug: cli.debug,
            credentials_file: cli.credentials_file,
            prog_name: prog_name(),
        }
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            cache: self.cache_token,
            debug: self.debug,
            prog_name: self.prog_name.clone(),
            cache_dir: crate::auth::cache::user_cache_dir(),
        }
    }
}

/// File name of the running executable.
pub fn prog_name() -> String {
    match std::env::args_os().next() {
        Some(argv0) => prog_name_from(Path::new(&argv0)),
        None => env!("CARGO_PKG_NAME").to_string(),
    }
}

/// Full base name of `argv0`, extension included.
fn prog_name_from(argv0: &Path) -> String {
    argv0
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}
