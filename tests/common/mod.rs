//! Shared test fixtures and helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use gdownload::Result;
use gdownload::gmail::{
    AttachmentBody, Header, Mailbox, Message, MessageList, MessagePart, MessageRef, PartBody,
};

/// Create an empty temporary output directory.
pub fn temp_out_dir() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let dir = tmp.path().to_path_buf();
    (tmp, dir)
}

/// Create empty files with the given names.
pub fn touch(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), b"").unwrap();
    }
}

/// Sorted file names in a directory.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// A message with a subject header and one attachment part per
/// `(filename, attachment_id)`.
pub fn message(id: &str, subject: &str, internal_ms: i64, attachments: &[(&str, &str)]) -> Message {
    let mut parts = vec![MessagePart {
        part_id: "0".into(),
        mime_type: "text/plain".into(),
        body: Some(PartBody {
            data: Some("aGVsbG8".into()),
            size: 5,
            ..PartBody::default()
        }),
        ..MessagePart::default()
    }];
    for (n, (filename, attachment_id)) in attachments.iter().enumerate() {
        parts.push(MessagePart {
            part_id: (n + 1).to_string(),
            mime_type: "application/octet-stream".into(),
            filename: filename.to_string(),
            body: Some(PartBody {
                attachment_id: Some(attachment_id.to_string()),
                ..PartBody::default()
            }),
            ..MessagePart::default()
        });
    }
    Message {
        id: id.into(),
        internal_date: Some(internal_ms.to_string()),
        payload: Some(MessagePart {
            mime_type: "multipart/mixed".into(),
            headers: vec![Header {
                name: "Subject".into(),
                value: subject.into(),
            }],
            parts,
            ..MessagePart::default()
        }),
    }
}

/// In-memory mailbox serving fixed pages of search results.
#[derive(Default)]
pub struct FakeMailbox {
    /// Message ids per page, in order.
    pub pages: Vec<Vec<String>>,
    pub messages: HashMap<String, Message>,
    /// Base64url bodies keyed by (message id, attachment id).
    pub attachments: HashMap<(String, String), String>,
    /// Page tokens received by `list_messages`, in call order.
    pub page_requests: Vec<Option<String>>,
    pub queries: Vec<String>,
}

impl FakeMailbox {
    pub fn add_page(&mut self, messages: Vec<Message>) {
        let ids = messages.iter().map(|m| m.id.clone()).collect();
        for m in messages {
            self.messages.insert(m.id.clone(), m);
        }
        self.pages.push(ids);
    }

    pub fn add_attachment(&mut self, message_id: &str, attachment_id: &str, base64url: &str) {
        self.attachments.insert(
            (message_id.to_string(), attachment_id.to_string()),
            base64url.to_string(),
        );
    }
}

fn not_found(what: &str) -> gdownload::Error {
    gdownload::Error::Api {
        url: format!("fake://{what}"),
        status: 404,
        body: "not found".into(),
    }
}

impl Mailbox for FakeMailbox {
    fn list_messages(&mut self, query: &str, page_token: Option<&str>) -> Result<MessageList> {
        self.queries.push(query.to_string());
        self.page_requests.push(page_token.map(str::to_string));
        let index = match page_token {
            None => 0,
            Some(t) => t
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| not_found(t))?,
        };
        let Some(ids) = self.pages.get(index) else {
            return Ok(MessageList::default());
        };
        let next_page_token = (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1));
        Ok(MessageList {
            messages: ids
                .iter()
                .map(|id| MessageRef {
                    id: id.clone(),
                    thread_id: id.clone(),
                })
                .collect(),
            next_page_token,
        })
    }

    fn get_message(&mut self, id: &str) -> Result<Message> {
        self.messages.get(id).cloned().ok_or_else(|| not_found(id))
    }

    fn get_attachment(&mut self, message_id: &str, attachment_id: &str) -> Result<AttachmentBody> {
        let data = self
            .attachments
            .get(&(message_id.to_string(), attachment_id.to_string()))
            .cloned()
            .ok_or_else(|| not_found(attachment_id))?;
        Ok(AttachmentBody {
            size: 0,
            data,
        })
    }
}
