//! `schema` and `update-schemas` commands.

use crate::service::{ConfigService, SchemaUpdate};
use anyhow::{Context, Result};
use clap::Args;
use std::collections::BTreeMap;

/// Arguments for the update-schemas command.
#[derive(Args, Debug)]
pub struct UpdateSchemasArgs {
    /// How many directory levels below the current one to search
    #[arg(long, default_value_t = 0)]
    pub depth: usize,
}

pub fn run_update(service: &mut ConfigService, args: &UpdateSchemasArgs) -> Result<BTreeMap<String, SchemaUpdate>> {
    service
        .update_schemas(args.depth)
        .context("Failed to update schema files")
}
