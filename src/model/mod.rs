//! Core data model types: parsed messages, ticket fields and summary records.

pub mod message;
pub mod summary;
