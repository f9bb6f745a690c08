//! Locflow - Automated Catalog Metadata Localization
//!
//! A workflow for translating localized metadata fields on a remote catalog
//! service using pluggable AI translation backends, with bounded-concurrency
//! locale fan-out and a conflict-retrying authenticated API client.

pub mod auth;
pub mod catalog;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod session;
pub mod workflow;
