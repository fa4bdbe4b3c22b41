//! Layered Team Configuration Library
//!
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod logging;
pub mod migrate;
pub mod prompt;
pub mod schema;
pub mod service;
pub mod vault;
