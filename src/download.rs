//! Walk the search results and save every attachment to disk.

use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use filetime::FileTime;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::gmail::{Mailbox, Message, MessagePart};
use crate::util::unique_filename;

/// URL-safe base64 that accepts payloads with or without padding.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Running counters of a download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub messages: usize,
    pub attachments: usize,
}

/// Download every attachment of every message matching `query` into
/// `out_dir`. The first error aborts the whole run.
pub fn download(mailbox: &mut impl Mailbox, query: &str, out_dir: &Path) -> Result<Totals> {
    std::fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;

    let mut totals = Totals::default();
    let mut page_token: Option<String> = None;
    loop {
        let page = mailbox.list_messages(query, page_token.as_deref())?;

        for reference in &page.messages {
            let message = mailbox.get_message(&reference.id)?;
            totals.messages += 1;
            tracing::info!("Message #{}: {}", totals.messages, message.subject());

            for (n, part) in message.attachment_parts().into_iter().enumerate() {
                let data = fetch_part(mailbox, &message, part)?;
                let delivered = message.internal_date_secs();
                let path = save_attachment(out_dir, &part.filename, &data, delivered)?;
                totals.attachments += 1;
                tracing::info!(
                    "Message #{} attachment #{}: {}",
                    totals.messages,
                    n + 1,
                    path.file_name().unwrap_or_default().to_string_lossy()
                );
            }
        }

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    tracing::info!(
        "Downloaded {} attachments from {} messages",
        totals.attachments,
        totals.messages
    );
    Ok(totals)
}

/// Fetch and decode the bytes of one named part.
fn fetch_part(
    mailbox: &mut impl Mailbox,
    message: &Message,
    part: &MessagePart,
) -> Result<Vec<u8>> {
    let body = part.body.as_ref();
    let encoded = match body.and_then(|b| b.attachment_id.as_deref()) {
        Some(attachment_id) => mailbox.get_attachment(&message.id, attachment_id)?.data,
        None => body.and_then(|b| b.data.clone()).unwrap_or_default(),
    };
    decode_base64url(&encoded)
}

/// Decode a Gmail base64url payload.
pub fn decode_base64url(encoded: &str) -> Result<Vec<u8>> {
    Ok(BASE64URL.decode(encoded.trim())?)
}

/// Write `data` under a free name in `out_dir` and stamp its mtime with the
/// message delivery time. Never overwrites an existing file.
pub fn save_attachment(
    out_dir: &Path,
    desired_name: &str,
    data: &[u8],
    delivered_secs: Option<i64>,
) -> Result<PathBuf> {
    let name = unique_filename(out_dir, &sanitize_filename(desired_name));
    let path = out_dir.join(name);

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| Error::io(&path, e))?;
    file.write_all(data).map_err(|e| Error::io(&path, e))?;
    drop(file);

    if let Some(secs) = delivered_secs {
        filetime::set_file_times(&path, FileTime::now(), FileTime::from_unix_time(secs, 0))
            .map_err(|e| Error::io(&path, e))?;
    }
    Ok(path)
}

/// Keep an attachment name inside the output directory.
///
/// Path separators become `_`, and names that would resolve to the
/// directory itself or its parent are replaced.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "attachment".to_string(),
        _ => cleaned,
    }
}
