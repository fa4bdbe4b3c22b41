//! `init` command.

use super::LayerArgs;
use crate::prompt::Prompter;
use crate::service::{ConfigService, InitOptions, InitOutcome, InitStatus};
use anyhow::{Context, Result};
use clap::Args;

/// Arguments for the init command.
#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub target: LayerArgs,

    /// Prompt for secure template values (default)
    #[arg(long, overrides_with = "no_prompt")]
    pub prompt: bool,

    /// Do not prompt
    #[arg(long, overrides_with = "prompt")]
    pub no_prompt: bool,

    /// Replace an existing configuration
    #[arg(long)]
    pub overwrite: bool,

    /// Show the document that would be written without writing it
    #[arg(long)]
    pub dry_run: bool,
}

impl InitArgs {
    pub fn options(&self) -> InitOptions {
        InitOptions {
            target: self.target.layer(),
            prompt: !self.no_prompt,
            overwrite: self.overwrite,
            dry_run: self.dry_run,
        }
    }
}

/// Run the init command.
pub fn run(service: &mut ConfigService, args: &InitArgs, prompter: &mut dyn Prompter) -> Result<InitOutcome> {
    let outcome = service
        .init(args.options(), prompter)
        .context("Failed to initialize configuration")?;
    if outcome.status == InitStatus::Skipped {
        eprintln!(
            "Skipped: {} already exists. Use --overwrite to replace it.",
            outcome.path.display()
        );
    }
    Ok(outcome)
}
