use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gdownload",
    version,
    about = "Download all attachments of the Gmail messages matching a search query"
)]
pub struct Cli {
    /// Gmail search query, e.g. "has:attachment from:alice"
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Output directory
    #[arg(short = 'o', long = "output-dir", value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Cache the OAuth 2.0 token for later invocations of the program
    #[arg(long = "cache-token")]
    pub cache_token: bool,

    /// Show HTTP traffic
    #[arg(long)]
    pub debug: bool,

    /// Credentials file from https://console.developers.google.com/
    #[arg(
        long = "credentials-file",
        value_name = "PATH",
        hide = crate::credentials::embedded().is_some()
    )]
    pub credentials_file: Option<PathBuf>,
}
