//! Import subcommand
//!
//! Copies a configuration, and the schema it references by relative path,
//! from a URL or local file into one layer.

use super::LayerArgs;
use crate::config::document::is_url;
use crate::service::{ConfigService, ImportOptions, ImportOutcome};
use anyhow::{Context, Result};
use clap::Args;

/// Arguments for the import subcommand
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// URL or file path of the configuration to import
    #[arg(value_name = "LOCATION")]
    pub location: String,

    #[command(flatten)]
    pub target: LayerArgs,

    /// Replace an existing configuration
    ///
    /// Without this flag an existing target file is left untouched.
    #[arg(long)]
    pub overwrite: bool,
}

impl ImportArgs {
    /// Check if the location is fetched over HTTP(S)
    pub fn is_remote(&self) -> bool {
        is_url(&self.location)
    }

    pub fn options(&self) -> ImportOptions {
        ImportOptions {
            location: self.location.clone(),
            target: self.target.layer(),
            overwrite: self.overwrite,
        }
    }
}

pub fn run(service: &mut ConfigService, args: &ImportArgs) -> Result<ImportOutcome> {
    let source = if args.is_remote() { "remote configuration" } else { "configuration file" };
    let outcome = service
        .import(&args.options())
        .with_context(|| format!("Failed to import {source} {}", args.location))?;
    if !outcome.imported {
        eprintln!(
            "Skipped: {} already exists. Use --overwrite to replace it.",
            outcome.path.display()
        );
    }
    Ok(outcome)
}
