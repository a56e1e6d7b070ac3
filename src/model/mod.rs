//! Core data model types: email addresses and SMTP envelopes.

pub mod address;
pub mod envelope;
