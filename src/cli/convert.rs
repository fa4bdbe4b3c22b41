//! Conversion of legacy profiles into the layered configuration.

use crate::migrate::ConvertReport;
use crate::prompt::Prompter;
use crate::service::ConfigService;
use anyhow::{Context, Result};
use clap::Args;

/// Arguments for the convert-profiles command.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Convert without prompting, even when the global config has content.
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Delete the old profiles after conversion.
    #[arg(long)]
    pub delete: bool,
}

/// Run the convert-profiles command.
pub fn run(service: &mut ConfigService, args: &ConvertArgs, prompter: &mut dyn Prompter) -> Result<ConvertReport> {
    let report = service
        .convert_profiles(args.force, args.delete, prompter)
        .context("Failed to convert profiles")?;

    for message in &report.messages {
        eprintln!("{message}");
    }
    for failure in &report.failed {
        match &failure.name {
            Some(name) => eprintln!("Failed to load {} profile \"{}\": {}", failure.kind, name, failure.reason),
            None => eprintln!("Failed to read {} profiles: {}", failure.kind, failure.reason),
        }
    }
    Ok(report)
}
