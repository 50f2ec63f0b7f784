//! On-disk token cache.
//!
//! One bincode file per (client id, client secret, scopes) under the user
//! cache directory, so switching credentials never picks up a stale token.

use std::io::Write;
use std::path::{Path, PathBuf};

use super::Token;
use crate::credentials::OAuthConfig;
use crate::error::{Error, Result};
use crate::util::fnv1a_32;

/// Return the OS-native user cache directory, or `.` when there is none.
pub fn user_cache_dir() -> PathBuf {
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.cache_dir().to_path_buf(),
        None => {
            tracing::warn!("No user cache directory on this platform, using current directory");
            PathBuf::from(".")
        }
    }
}

/// Cache file path for `config` under `dir`.
pub fn cache_path_in(dir: &Path, config: &OAuthConfig, prog_name: &str) -> PathBuf {
    let mut scopes: Vec<&str> = config.scopes.iter().map(String::as_str).collect();
    scopes.sort_unstable();
    let scopes = scopes.join(" ");
    let hash = fnv1a_32([
        config.client_id.as_bytes(),
        config.client_secret.as_bytes(),
        scopes.as_bytes(),
    ]);
    let name = format!("{}-tok{}", prog_name, hash);
    let escaped: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
    dir.join(escaped)
}

/// Read a cached token. `Ok(None)` when no cache file exists.
pub fn load(path: &Path) -> Result<Option<Token>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let token: Token = bincode::deserialize(&data)?;
    Ok(Some(token))
}

/// Write a token to the cache, replacing any previous one.
pub fn save(path: &Path, token: &Token) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let data = bincode::serialize(token)?;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(|e| Error::io(path, e))?;
    file.write_all(&data).map_err(|e| Error::io(path, e))?;
    Ok(())
}
