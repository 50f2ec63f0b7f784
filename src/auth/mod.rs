//! OAuth2 token acquisition: token cache, browser flow, code exchange,
//! refresh.

pub mod cache;
pub mod callback;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use self::callback::CallbackListener;
use crate::credentials::OAuthConfig;
use crate::error::{Error, Result};

/// Tokens this close to expiry are treated as expired.
const EXPIRY_DELTA_SECS: i64 = 10;

/// Access/refresh token pair as persisted in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    /// True once the access token is past (or about to reach) its expiry.
    /// Tokens without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => Utc::now() + Duration::seconds(EXPIRY_DELTA_SECS) >= expiry,
            None => false,
        }
    }

    /// Build a token from an endpoint response. Refresh responses usually
    /// omit the refresh token, in which case `previous_refresh` is kept.
    fn from_response(response: TokenResponse, previous_refresh: Option<String>) -> Self {
        let token_type = if response.token_type.is_empty() {
            "Bearer".to_string()
        } else {
            response.token_type
        };
        Self {
            access_token: response.access_token,
            token_type,
            refresh_token: response.refresh_token.or(previous_refresh),
            expiry: response
                .expires_in
                .filter(|secs| *secs > 0)
                .and_then(Duration::try_seconds)
                .and_then(|ttl| Utc::now().checked_add_signed(ttl)),
        }
    }
}

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// The parts of the run configuration the token manager cares about.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub cache: bool,
    pub debug: bool,
    pub prog_name: String,
    /// Directory holding the token cache file.
    pub cache_dir: PathBuf,
}

impl TokenSettings {
    fn cache_file(&self, config: &OAuthConfig) -> PathBuf {
        cache::cache_path_in(&self.cache_dir, config, &self.prog_name)
    }
}

/// Obtain a token: from the cache when enabled and present, otherwise by
/// running the browser authorization flow.
///
/// A token that cannot be written to the cache is only a warning.
pub fn obtain(
    config: &OAuthConfig,
    settings: &TokenSettings,
    agent: &ureq::Agent,
) -> Result<Token> {
    let cache_file = settings.cache_file(config);
    if settings.cache {
        match cache::load(&cache_file) {
            Ok(Some(token)) => {
                if settings.debug {
                    tracing::info!("Using cached token {:?} from {}", token, cache_file.display());
                } else {
                    tracing::info!("Using cached token from {}", cache_file.display());
                }
                return Ok(token);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Ignoring unreadable token cache: {}", e),
        }
    }

    let token = token_from_web(config, agent)?;
    if settings.cache {
        store(&cache_file, &token);
    }
    Ok(token)
}

/// Write a token to the cache, logging instead of failing.
fn store(cache_file: &std::path::Path, token: &Token) {
    match cache::save(cache_file, token) {
        Ok(()) => tracing::info!(
            "Saved oauth token for later use in file: {}",
            cache_file.display()
        ),
        Err(e) => tracing::warn!("Failed to cache oauth token: {}", e),
    }
}

/// Run the interactive flow: local listener, browser, code exchange.
fn token_from_web(config: &OAuthConfig, agent: &ureq::Agent) -> Result<Token> {
    let state = random_state();
    let listener = CallbackListener::bind(&state)?;
    let redirect_uri = listener.url();
    let auth_url = authorization_url(config, &redirect_uri, &state)?;

    open_browser(auth_url.as_str());
    tracing::info!("Authorize this app at: {}", auth_url);
    let code = listener.wait()?;
    tracing::info!("Authorized");

    exchange_code(config, agent, &code, &redirect_uri)
}

/// Random per-run value echoed back by the authorization server.
pub fn random_state() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    format!("st{}", suffix)
}

/// Authorization URL for the offline-access code flow.
pub fn authorization_url(config: &OAuthConfig, redirect_uri: &str, state: &str) -> Result<Url> {
    let scope = config.scopes.join(" ");
    Url::parse_with_params(
        &config.auth_uri,
        &[
            ("access_type", "offline"),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("state", state),
        ],
    )
    .map_err(|e| Error::Config(format!("invalid auth_uri {:?}: {}", config.auth_uri, e)))
}

/// Best-effort browser launch on a detached thread.
fn open_browser(url: &str) {
    let url = url.to_string();
    std::thread::spawn(move || {
        if let Err(e) = open::that(&url) {
            tracing::warn!("Error opening URL in browser: {}", e);
        }
    });
}

/// Exchange an authorization code for a token.
pub fn exchange_code(
    config: &OAuthConfig,
    agent: &ureq::Agent,
    code: &str,
    redirect_uri: &str,
) -> Result<Token> {
    let response = request_token(
        agent,
        &config.token_uri,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ],
    )?;
    Ok(Token::from_response(response, None))
}

/// Trade the refresh token of `token` for a new token.
pub fn refresh(config: &OAuthConfig, agent: &ureq::Agent, token: &Token) -> Result<Token> {
    let Some(refresh_token) = token.refresh_token.as_deref() else {
        return Err(Error::Auth(
            "access token expired and no refresh token is available".into(),
        ));
    };
    let response = request_token(
        agent,
        &config.token_uri,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ],
    )?;
    Ok(Token::from_response(response, token.refresh_token.clone()))
}

fn request_token(
    agent: &ureq::Agent,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    let response = agent
        .post(token_uri)
        .send_form(form)
        .map_err(|e| Error::Auth(format!("token exchange error: {}", Error::from(e))))?;
    response
        .into_json::<TokenResponse>()
        .map_err(|e| Error::Auth(format!("unreadable token response: {e}")))
}

/// Hands out a valid access token, refreshing it when it expires.
///
/// A refreshed token replaces the old one wholesale, in memory and, when a
/// cache file is set, on disk.
pub struct TokenSource {
    config: OAuthConfig,
    agent: ureq::Agent,
    token: Token,
    cache_file: Option<PathBuf>,
}

impl TokenSource {
    pub fn new(
        config: OAuthConfig,
        agent: ureq::Agent,
        token: Token,
        cache_file: Option<PathBuf>,
    ) -> Self {
        Self {
            config,
            agent,
            token,
            cache_file,
        }
    }

    /// Token source for a run, persisting refreshes when caching is on.
    pub fn for_run(
        config: OAuthConfig,
        agent: ureq::Agent,
        token: Token,
        settings: &TokenSettings,
    ) -> Self {
        let cache_file = settings.cache.then(|| settings.cache_file(&config));
        Self::new(config, agent, token, cache_file)
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Current access token, refreshed first if it has expired.
    pub fn access_token(&mut self) -> Result<String> {
        if self.token.is_expired() {
            tracing::debug!("Access token expired, refreshing");
            self.token = refresh(&self.config, &self.agent, &self.token)?;
            if let Some(cache_file) = &self.cache_file {
                store(cache_file, &self.token);
            }
        }
        Ok(self.token.access_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(token_uri: &str) -> OAuthConfig {
        OAuthConfig {
            client_id: "client-1".into(),
            client_secret: "secret-1".into(),
            auth_uri: "https://accounts.example.com/o/oauth2/auth".into(),
            token_uri: token_uri.into(),
            redirect_uris: vec![],
            scopes: vec!["scope-a".into(), "scope-b".into()],
        }
    }

    fn settings(cache: bool, cache_dir: &std::path::Path) -> TokenSettings {
        TokenSettings {
            cache,
            debug: false,
            prog_name: "gdownload".into(),
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    /// Any token endpoint or API call through this agent fails fast.
    fn offline_agent() -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(1))
            .build()
    }

    #[test]
    fn test_random_state_shape() {
        let a = random_state();
        let b = random_state();
        assert!(a.starts_with("st"));
        assert_eq!(a.len(), 34);
        assert_ne!(a, b);
    }

    #[test]
    fn test_authorization_url_params() {
        let cfg = config("https://token.example");
        let url = authorization_url(&cfg, "http://127.0.0.1:5555", "st-xyz").unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(url.host_str(), Some("accounts.example.com"));
        assert_eq!(pairs["client_id"], "client-1");
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:5555");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["scope"], "scope-a scope-b");
        assert_eq!(pairs["state"], "st-xyz");
        assert_eq!(pairs["access_type"], "offline");
    }

    #[test]
    fn test_authorization_url_rejects_bad_auth_uri() {
        let mut cfg = config("https://token.example");
        cfg.auth_uri = "not a url".into();
        assert!(matches!(
            authorization_url(&cfg, "http://127.0.0.1:1", "s"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_token_without_expiry_never_expires() {
        let token = Token {
            access_token: "a".into(),
            token_type: "Bearer".into(),
            refresh_token: None,
            expiry: None,
        };
        assert!(!token.is_expired());
    }

    #[test]
    fn test_token_expiry_delta() {
        let mut token = Token {
            access_token: "a".into(),
            token_type: "Bearer".into(),
            refresh_token: None,
            expiry: Some(Utc::now() + Duration::seconds(5)),
        };
        assert!(token.is_expired());
        token.expiry = Some(Utc::now() + Duration::minutes(30));
        assert!(!token.is_expired());
    }

    #[test]
    fn test_exchange_code() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("grant_type=authorization_code".into()),
                Matcher::Regex("code=the-code".into()),
                Matcher::Regex("client_secret=secret-1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token":"at-1","token_type":"Bearer","refresh_token":"rt-1","expires_in":3599}"#,
            )
            .create();

        let cfg = config(&format!("{}/token", server.url()));
        let token = exchange_code(&cfg, &ureq::agent(), "the-code", "http://127.0.0.1:1").unwrap();
        mock.assert();

        assert_eq!(token.access_token, "at-1");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.refresh_token.as_deref(), Some("rt-1"));
        assert!(!token.is_expired());
    }

    #[test]
    fn test_exchange_failure_is_auth_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create();

        let cfg = config(&format!("{}/token", server.url()));
        let err = exchange_code(&cfg, &ureq::agent(), "bad", "http://127.0.0.1:1").unwrap_err();
        match err {
            Error::Auth(msg) => assert!(msg.contains("invalid_grant"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_refresh_keeps_refresh_token() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/token")
            .match_body(Matcher::Regex("grant_type=refresh_token".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at-2","expires_in":3600}"#)
            .create();

        let cfg = config(&format!("{}/token", server.url()));
        let old = Token {
            access_token: "at-1".into(),
            token_type: "Bearer".into(),
            refresh_token: Some("rt-1".into()),
            expiry: Some(Utc::now() - Duration::minutes(1)),
        };
        let fresh = refresh(&cfg, &ureq::agent(), &old).unwrap();
        assert_eq!(fresh.access_token, "at-2");
        assert_eq!(fresh.token_type, "Bearer");
        assert_eq!(fresh.refresh_token.as_deref(), Some("rt-1"));
    }

    #[test]
    fn test_refresh_without_refresh_token_fails() {
        let cfg = config("http://127.0.0.1:1/token");
        let old = Token {
            access_token: "at-1".into(),
            token_type: "Bearer".into(),
            refresh_token: None,
            expiry: Some(Utc::now() - Duration::minutes(1)),
        };
        assert!(matches!(
            refresh(&cfg, &ureq::agent(), &old),
            Err(Error::Auth(_))
        ));
    }

    #[test]
    fn test_token_source_refreshes_and_persists() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at-2","token_type":"Bearer","expires_in":3600}"#)
            .expect(1)
            .create();

        let tmp = tempfile::TempDir::new().unwrap();
        let cache_file = tmp.path().join("tok");
        let cfg = config(&format!("{}/token", server.url()));
        let expired = Token {
            access_token: "at-1".into(),
            token_type: "Bearer".into(),
            refresh_token: Some("rt-1".into()),
            expiry: Some(Utc::now() - Duration::minutes(1)),
        };

        let mut source = TokenSource::new(cfg, ureq::agent(), expired, Some(cache_file.clone()));
        assert_eq!(source.access_token().unwrap(), "at-2");
        // Second call reuses the fresh token.
        assert_eq!(source.access_token().unwrap(), "at-2");
        mock.assert();

        let cached = cache::load(&cache_file).unwrap().unwrap();
        assert_eq!(&cached, source.token());
    }

    #[test]
    fn test_obtain_returns_cached_token() {
        let tmp = tempfile::TempDir::new().unwrap();
        // Nothing listens on port 1; a token request would fail.
        let cfg = config("http://127.0.0.1:1/token");
        let settings = settings(true, tmp.path());
        let cached = Token {
            access_token: "at-cached".into(),
            token_type: "Bearer".into(),
            refresh_token: Some("rt-cached".into()),
            expiry: Some(Utc::now() + Duration::hours(1)),
        };
        cache::save(&settings.cache_file(&cfg), &cached).unwrap();

        let token = obtain(&cfg, &settings, &offline_agent()).unwrap();
        assert_eq!(token, cached);
    }

    #[test]
    fn test_obtain_ignores_cache_when_disabled() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut cfg = config("http://127.0.0.1:1/token");
        // Makes the browser flow fail before anything is opened.
        cfg.auth_uri = "not a url".into();
        let cached = Token {
            access_token: "at-cached".into(),
            token_type: "Bearer".into(),
            refresh_token: None,
            expiry: None,
        };
        cache::save(&settings(true, tmp.path()).cache_file(&cfg), &cached).unwrap();

        let result = obtain(&cfg, &settings(false, tmp.path()), &offline_agent());
        assert!(matches!(result, Err(Error::Config(_))), "{result:?}");
    }

    #[test]
    fn test_obtain_falls_back_on_unreadable_cache() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut cfg = config("http://127.0.0.1:1/token");
        cfg.auth_uri = "not a url".into();
        let settings = settings(true, tmp.path());
        std::fs::write(settings.cache_file(&cfg), [0xff, 0xff, 0xff]).unwrap();

        let result = obtain(&cfg, &settings, &offline_agent());
        assert!(matches!(result, Err(Error::Config(_))), "{result:?}");
    }

    #[test]
    fn test_token_source_survives_cache_write_failure() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at-2","expires_in":3600}"#)
            .create();

        let tmp = tempfile::TempDir::new().unwrap();
        let not_a_dir = tmp.path().join("file");
        std::fs::write(&not_a_dir, b"").unwrap();
        let cache_file = not_a_dir.join("tok");

        let cfg = config(&format!("{}/token", server.url()));
        let expired = Token {
            access_token: "at-1".into(),
            token_type: "Bearer".into(),
            refresh_token: Some("rt-1".into()),
            expiry: Some(Utc::now() - Duration::minutes(1)),
        };
        let mut source = TokenSource::new(cfg, ureq::agent(), expired, Some(cache_file.clone()));

        assert_eq!(source.access_token().unwrap(), "at-2");
        assert!(!cache_file.exists());
    }

    #[test]
    fn test_for_run_persists_only_when_caching() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = config("http://127.0.0.1:1/token");
        let token = Token {
            access_token: "a".into(),
            token_type: "Bearer".into(),
            refresh_token: None,
            expiry: None,
        };

        let on = settings(true, tmp.path());
        let source = TokenSource::for_run(cfg.clone(), offline_agent(), token.clone(), &on);
        assert_eq!(source.cache_file, Some(on.cache_file(&cfg)));

        let off = settings(false, tmp.path());
        let source = TokenSource::for_run(cfg, offline_agent(), token, &off);
        assert!(source.cache_file.is_none());
    }
}
