//! Moving handled messages between mailbox files.
//!
//! Messages are written back with a fresh `From - <local time>` separator,
//! the form Thunderbird itself uses for local folders. Vendor status lines
//! are not carried over; the client regenerates them.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use tracing::{debug, info};

use crate::error::{ApproveError, Result};
use crate::model::message::ParsedMessage;
use crate::parser::mbox::read_mailbox_text;
use crate::parser::message::MessageDecoder;
use crate::state::write_atomic;

fn separator_line() -> String {
    format!("From - {}\n", Local::now().format("%a %b %d %Y %H:%M:%S"))
}

fn push_message(out: &mut String, raw_text: &str) {
    out.push_str(&separator_line());
    out.push_str(raw_text);
    if !raw_text.ends_with('\n') {
        out.push('\n');
    }
}

/// Append one raw message to `target`, creating the file if needed.
pub fn append_message(target: &Path, raw_text: &str) -> Result<()> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ApproveError::io(parent, e))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(target)
        .map_err(|e| ApproveError::io(target, e))?;
    let existing = file
        .metadata()
        .map_err(|e| ApproveError::io(target, e))?
        .len();

    let mut out = String::new();
    if existing > 0 {
        out.push('\n');
    }
    push_message(&mut out, raw_text);
    file.write_all(out.as_bytes())
        .map_err(|e| ApproveError::io(target, e))?;
    Ok(())
}

/// Rewrite `mailbox` without the messages matching `target`.
///
/// Matching uses the Message-ID when `target` has one, otherwise the
/// (subject, from) pair. Raw messages that do not decode are kept as they
/// are. Returns the number of messages removed.
pub fn remove_message(
    decoder: &MessageDecoder,
    mailbox: &Path,
    target: &ParsedMessage,
) -> Result<usize> {
    let content = read_mailbox_text(mailbox)?;

    let mut kept: Vec<String> = Vec::new();
    let mut removed = 0usize;
    decoder.splitter().split(&content, &mut |raw| {
        let matches = matches!(
            decoder.decode(&raw, mailbox),
            Ok(Some(ref msg)) if target.same_message(msg)
        );
        if matches {
            removed += 1;
        } else {
            kept.push(raw);
        }
        true
    });

    if removed == 0 {
        debug!(mailbox = %mailbox.display(), "Nothing to remove");
        return Ok(0);
    }

    let mut out = String::new();
    for (i, raw) in kept.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        push_message(&mut out, raw);
    }
    write_atomic(mailbox, out.as_bytes())?;

    info!(
        mailbox = %mailbox.display(),
        removed,
        remaining = kept.len(),
        "Removed message from mailbox"
    );
    Ok(removed)
}

/// Append `message` to `target`, then remove it from `source`.
pub fn move_message(
    decoder: &MessageDecoder,
    message: &ParsedMessage,
    source: &Path,
    target: &Path,
) -> Result<()> {
    if message.raw_text.is_empty() {
        return Err(ApproveError::MessageDecode(
            "message has no raw text to move".to_string(),
        ));
    }
    append_message(target, &message.raw_text)?;
    remove_message(decoder, source, message)?;
    info!(subject = %message.subject, target = %target.display(), "Moved handled message");
    Ok(())
}
