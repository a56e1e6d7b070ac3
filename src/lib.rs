//! `postsink` — an SMTP sink and relay for mail testing.
//!
//! This crate provides the core library for two complementary workflows:
//! replaying folders of captured email files against a test SMTP server
//! (`ingest`), and receiving live SMTP sessions into a local spool (`smtp`).

pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod parser;
pub mod relay;
pub mod smtp;
pub mod store;
