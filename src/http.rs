//! Shared blocking HTTP agent.

use std::time::Duration;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build the agent used for both the token endpoint and the Gmail API.
///
/// With `debug`, every request and response line is logged.
pub fn agent(debug: bool) -> ureq::Agent {
    let builder = ureq::AgentBuilder::new()
        .user_agent(USER_AGENT)
        .timeout_connect(Duration::from_secs(30));
    if debug {
        builder.middleware(log_traffic).build()
    } else {
        builder.build()
    }
}

fn log_traffic(
    request: ureq::Request,
    next: ureq::MiddlewareNext<'_>,
) -> Result<ureq::Response, ureq::Error> {
    tracing::debug!("> {} {}", request.method(), request.url());
    for name in request.header_names() {
        let value = if name.eq_ignore_ascii_case("authorization") {
            "<redacted>"
        } else {
            request.header(&name).unwrap_or("")
        };
        tracing::debug!("> {}: {}", name, value);
    }

    let result = next.handle(request);
    match &result {
        Ok(response) => log_response(response),
        Err(ureq::Error::Status(_, response)) => log_response(response),
        Err(ureq::Error::Transport(t)) => tracing::debug!("< transport error: {}", t),
    }
    result
}

fn log_response(response: &ureq::Response) {
    tracing::debug!(
        "< {} {} {}",
        response.http_version(),
        response.status(),
        response.status_text()
    );
    for name in response.headers_names() {
        tracing::debug!("< {}: {}", name, response.header(&name).unwrap_or(""));
    }
}
