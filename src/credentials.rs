//! OAuth client configuration, from a Google client-secret JSON document.
//!
//! The document is either passed on the command line or compiled into the
//! binary (see `build.rs`, which sets `cfg(embedded_credentials)` when
//! `GDOWNLOAD_CREDENTIALS` points at a file at build time).

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};

/// Read-only access to every message and attachment.
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[cfg(embedded_credentials)]
static EMBEDDED_CREDENTIALS: &[u8] = include!(concat!(env!("OUT_DIR"), "/credentials.rs"));

/// The credentials document compiled into this binary, if any.
#[cfg(embedded_credentials)]
pub fn embedded() -> Option<&'static [u8]> {
    Some(EMBEDDED_CREDENTIALS)
}

/// The credentials document compiled into this binary, if any.
#[cfg(not(embedded_credentials))]
pub fn embedded() -> Option<&'static [u8]> {
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CredentialsDocument {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

#[derive(Debug, Deserialize)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_auth_uri")]
    auth_uri: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}
fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl OAuthConfig {
    /// Parse a client-secret document and attach the scopes to request.
    pub fn from_json(data: &[u8], scopes: &[&str]) -> Result<Self> {
        let doc: CredentialsDocument = serde_json::from_slice(data)
            .map_err(|e| Error::Config(format!("unable to parse credentials: {e}")))?;
        let secret = doc.installed.or(doc.web).ok_or_else(|| {
            Error::Config("credentials have neither an \"installed\" nor a \"web\" section".into())
        })?;
        if secret.client_id.is_empty() {
            return Err(Error::Config("credentials have an empty client_id".into()));
        }
        Ok(Self {
            client_id: secret.client_id,
            client_secret: secret.client_secret,
            auth_uri: secret.auth_uri,
            token_uri: secret.token_uri,
            redirect_uris: secret.redirect_uris,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        })
    }
}

/// Load the OAuth configuration for Gmail read-only access.
///
/// An explicit file wins over embedded credentials.
pub fn load(credentials_file: Option<&Path>) -> Result<OAuthConfig> {
    let data = match (credentials_file, embedded()) {
        (Some(path), _) => std::fs::read(path).map_err(|e| Error::io(path, e))?,
        (None, Some(bytes)) => bytes.to_vec(),
        (None, None) => {
            return Err(Error::Config(
                "no credentials file given, use --credentials-file".into(),
            ));
        }
    };
    OAuthConfig::from_json(&data, &[GMAIL_READONLY_SCOPE])
}
