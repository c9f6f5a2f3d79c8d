//! `mboxapprove`: answers ServiceNow approval requests found in a
//! Thunderbird mailbox.
//!
//! The library splits Thunderbird-flavoured mbox files into messages,
//! extracts ticket fields from their bodies, derives approval replies and
//! keeps the bookkeeping (dedup state, summary journal, mailbox relocation)
//! that makes repeated passes safe.

pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod parser;
pub mod processor;
pub mod reply;
pub mod sender;
pub mod state;
pub mod store;
pub mod summary;
