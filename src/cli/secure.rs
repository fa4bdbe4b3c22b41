//! `secure` command.

use super::LayerArgs;
use crate::prompt::Prompter;
use crate::service::{ConfigService, SecureOutcome};
use anyhow::{Context, Result};
use clap::Args;

/// Arguments for the secure command.
#[derive(Args, Debug)]
pub struct SecureArgs {
    #[command(flatten)]
    pub target: LayerArgs,

    /// Also remove vault entries for config files that no longer exist
    #[arg(long)]
    pub prune: bool,
}

pub fn run(service: &mut ConfigService, args: &SecureArgs, prompter: &mut dyn Prompter) -> Result<SecureOutcome> {
    service
        .secure(args.target.layer(), args.prune, prompter)
        .context("Failed to update secure values")
}
