//! `set` command.

use super::LayerArgs;
use crate::config::SetOptions;
use crate::service::{ConfigService, SetRequest};
use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Value, json};

/// Arguments for the set command.
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Dot-path of the property (e.g. profiles.base.properties.host)
    pub path: String,

    /// Value to store
    pub value: String,

    #[command(flatten)]
    pub target: LayerArgs,

    /// Store the value in the credential vault (`--secure=false` stores it in plaintext)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub secure: Option<bool>,

    /// Parse the value as JSON
    #[arg(long)]
    pub json: bool,
}

impl SetArgs {
    pub fn request(&self) -> SetRequest {
        SetRequest {
            target: self.target.layer(),
            path: self.path.clone(),
            value: self.value.clone(),
            options: SetOptions {
                secure: self.secure,
                json: self.json,
            },
        }
    }
}

/// Run the set command.
pub fn run(service: &mut ConfigService, args: &SetArgs) -> Result<Value> {
    let file = service
        .set(&args.request())
        .with_context(|| format!("Failed to set {}", args.path))?;
    Ok(json!({
        "path": args.path,
        "layer": args.target.layer(),
        "file": file,
    }))
}
