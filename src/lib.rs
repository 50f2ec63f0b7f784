//! Download every attachment of the Gmail messages matching a search query.

pub mod auth;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod credentials;
pub mod download;
pub mod error;
pub mod gmail;
pub mod http;
pub mod util;

pub use error::{Error, Result};

use config::Config;
use download::Totals;
use gmail::GmailClient;

/// Run one download: load credentials, authorize, walk the search results.
pub fn run(config: &Config) -> Result<Totals> {
    let oauth = credentials::load(config.credentials_file.as_deref())?;
    let settings = config.token_settings();
    let agent = http::agent(config.debug);

    let token = auth::obtain(&oauth, &settings, &agent)?;
    let tokens = auth::TokenSource::for_run(oauth, agent.clone(), token, &settings);
    let mut client = GmailClient::new(agent, tokens);

    download::download(&mut client, &config.query, &config.output_dir)
}
