//! Gmail REST API: response types, the `Mailbox` seam, and a blocking client.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::auth::TokenSource;
use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com";

/// The authenticated user, as the API spells it.
const USER_ID: &str = "me";

// --- Gmail API response types ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    /// Milliseconds since the epoch, as a decimal string.
    #[serde(default)]
    pub internal_date: Option<String>,
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub part_id: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    #[serde(default)]
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub size: u64,
    /// Base64url payload, present for small inline bodies.
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentBody {
    #[serde(default)]
    pub size: u64,
    /// Base64url payload.
    #[serde(default)]
    pub data: String,
}

impl Message {
    /// Value of the first top-level header called `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn subject(&self) -> &str {
        self.header("Subject").unwrap_or("")
    }

    /// Delivery time in whole seconds since the epoch.
    pub fn internal_date_secs(&self) -> Option<i64> {
        let millis: i64 = self.internal_date.as_deref()?.trim().parse().ok()?;
        Some(millis / 1000)
    }

    /// Every part carrying a filename, depth-first in document order.
    pub fn attachment_parts(&self) -> Vec<&MessagePart> {
        let mut found = Vec::new();
        if let Some(payload) = &self.payload {
            for part in &payload.parts {
                collect_named_parts(part, &mut found);
            }
        }
        found
    }
}

fn collect_named_parts<'a>(part: &'a MessagePart, found: &mut Vec<&'a MessagePart>) {
    if !part.filename.is_empty() {
        found.push(part);
    }
    for child in &part.parts {
        collect_named_parts(child, found);
    }
}

/// The three mailbox operations the attachment walker needs.
pub trait Mailbox {
    /// One page of message references matching `query`.
    fn list_messages(&mut self, query: &str, page_token: Option<&str>) -> Result<MessageList>;

    /// A full message, headers and part tree included.
    fn get_message(&mut self, id: &str) -> Result<Message>;

    /// The body of one attachment of a message.
    fn get_attachment(&mut self, message_id: &str, attachment_id: &str) -> Result<AttachmentBody>;
}

/// Blocking Gmail API client.
pub struct GmailClient {
    agent: ureq::Agent,
    base_url: String,
    tokens: TokenSource,
}

impl GmailClient {
    pub fn new(agent: ureq::Agent, tokens: TokenSource) -> Self {
        Self::with_base_url(agent, tokens, DEFAULT_BASE_URL)
    }

    /// Point the client at another server, e.g. a local mock.
    pub fn with_base_url(agent: ureq::Agent, tokens: TokenSource, base_url: &str) -> Self {
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/gmail/v1/users/{}/messages", self.base_url, USER_ID)
    }

    fn get(&mut self, url: &str, query: &[(&str, &str)]) -> Result<ureq::Response> {
        let access_token = self.tokens.access_token()?;
        let mut request = self
            .agent
            .get(url)
            .set("Authorization", &format!("Bearer {}", access_token));
        for (name, value) in query {
            request = request.query(name, value);
        }
        Ok(request.call()?)
    }

    fn get_json<T: DeserializeOwned>(&mut self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self.get(url, query)?;
        let status = response.status();
        response.into_json::<T>().map_err(|e| Error::Api {
            url: url.to_string(),
            status,
            body: format!("unexpected response body: {e}"),
        })
    }
}

impl Mailbox for GmailClient {
    fn list_messages(&mut self, query: &str, page_token: Option<&str>) -> Result<MessageList> {
        let url = self.messages_url();
        let mut params = vec![("q", query)];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        self.get_json(&url, &params)
    }

    fn get_message(&mut self, id: &str) -> Result<Message> {
        let url = format!("{}/{}", self.messages_url(), encode_segment(id));
        self.get_json(&url, &[])
    }

    fn get_attachment(&mut self, message_id: &str, attachment_id: &str) -> Result<AttachmentBody> {
        let url = format!(
            "{}/{}/attachments/{}",
            self.messages_url(),
            encode_segment(message_id),
            encode_segment(attachment_id)
        );
        self.get_json(&url, &[])
    }
}

/// Percent-encode an id for use as one URL path segment.
fn encode_segment(id: &str) -> String {
    url::form_urlencoded::byte_serialize(id.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
