//! Mailbox parsing: Thunderbird mbox splitter, header block, MIME body and message decoding.

pub mod header;
pub mod mbox;
pub mod message;
pub mod mime;
