//! Local HTTP listener receiving the OAuth redirect.
//!
//! The accept loop runs on its own thread and hands the authorization code
//! to the waiting caller over a one-slot channel. If the listener goes away
//! before a code arrives, the sender is dropped and `wait` returns an error
//! instead of blocking forever.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use tiny_http::{Header, Response, Server};

use crate::error::{Error, Result};

const SUCCESS_PAGE: &str = "<h1>Success</h1>Authorized.";

/// What to do with one request hitting the callback URL.
#[derive(Debug, PartialEq, Eq)]
pub enum Callback {
    /// The browser asking for an icon.
    NotFound,
    /// Forged, stale, or incomplete redirect.
    Reject(&'static str),
    /// A valid redirect carrying the authorization code.
    Code(String),
}

/// Classify a raw request URL (`/path?query`) against the expected state.
pub fn classify(raw_url: &str, expected_state: &str) -> Callback {
    let (path, query) = raw_url.split_once('?').unwrap_or((raw_url, ""));
    if path == "/favicon.ico" {
        return Callback::NotFound;
    }

    let mut state = None;
    let mut code = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "state" if state.is_none() => state = Some(value.into_owned()),
            "code" if code.is_none() => code = Some(value.into_owned()),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Callback::Reject("state doesn't match");
    }
    match code {
        Some(code) if !code.is_empty() => Callback::Code(code),
        _ => Callback::Reject("no code"),
    }
}

/// Tears the listener down from another thread, releasing any `wait`.
#[derive(Clone)]
pub struct CancelHandle {
    server: Arc<Server>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.server.unblock();
    }
}

pub struct CallbackListener {
    server: Arc<Server>,
    addr: SocketAddr,
    code_rx: Receiver<String>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackListener {
    /// Bind an ephemeral loopback port and start accepting redirects for
    /// `state`.
    pub fn bind(state: &str) -> Result<Self> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|e| Error::Auth(format!("cannot start callback listener: {e}")))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| Error::Auth("callback listener is not bound to an IP address".into()))?;
        let server = Arc::new(server);

        let (code_tx, code_rx) = mpsc::sync_channel(1);
        let loop_server = Arc::clone(&server);
        let state = state.to_string();
        let handle = thread::spawn(move || accept_loop(&loop_server, &state, code_tx));

        tracing::debug!("Callback listener on {}", addr);
        Ok(Self {
            server,
            addr,
            code_rx,
            handle: Some(handle),
        })
    }

    /// Redirect URL to register in the authorization request.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            server: Arc::clone(&self.server),
        }
    }

    /// Block until the browser delivers a code, or the listener is cancelled.
    pub fn wait(self) -> Result<String> {
        self.code_rx.recv().map_err(|_| {
            Error::Auth("callback listener closed before an authorization code arrived".into())
        })
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn accept_loop(server: &Server, state: &str, code_tx: SyncSender<String>) {
    for request in server.incoming_requests() {
        match classify(request.url(), state) {
            Callback::Code(code) => {
                let mut response = Response::from_string(SUCCESS_PAGE);
                if let Ok(header) = "Content-Type: text/html; charset=utf-8".parse::<Header>() {
                    response = response.with_header(header);
                }
                if let Err(e) = request.respond(response) {
                    tracing::warn!("Failed to answer authorization callback: {}", e);
                }
                let _ = code_tx.send(code);
                return;
            }
            Callback::NotFound => {
                let _ = request.respond(Response::from_string("").with_status_code(404u16));
            }
            Callback::Reject(reason) => {
                tracing::warn!("Rejected authorization callback {}: {}", request.url(), reason);
                let _ = request.respond(Response::from_string("").with_status_code(500u16));
            }
        }
    }
}
