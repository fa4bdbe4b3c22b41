//! `list` command.

use crate::service::{ConfigService, ListOptions};
use clap::Args;
use serde_json::Value;

/// Arguments for the list command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Dot-path of the node to show (e.g. profiles.base.properties)
    pub path: Option<String>,

    /// Show each layer separately, keyed by file path
    #[arg(long)]
    pub locations: bool,

    /// Show top-level keys only
    #[arg(long)]
    pub root: bool,

    /// Show key names only
    #[arg(long)]
    pub name_only: bool,

    /// Reveal secure values instead of masking them
    #[arg(long)]
    pub show_secure: bool,
}

impl From<&ListArgs> for ListOptions {
    fn from(args: &ListArgs) -> Self {
        ListOptions {
            path: args.path.clone(),
            locations: args.locations,
            root: args.root,
            name_only: args.name_only,
            show_secure: args.show_secure,
        }
    }
}

pub fn run(service: &ConfigService, args: &ListArgs) -> Value {
    service.list(&ListOptions::from(args))
}
