//! Data models: document payloads and configuration.

pub mod config;
pub mod document;
