//! Mailbox file mutation.

pub mod relocate;
