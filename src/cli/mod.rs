//! CLI command definitions for teamcfg
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod convert;
pub mod import;
pub mod init;
pub mod list;
pub mod profiles;
pub mod schema;
pub mod secure;
pub mod set;

use crate::config::{Layer, PathResolver, env_prefix};
use crate::fetch::UreqFetcher;
use crate::format::OutputFormat;
use crate::service::ConfigService;
use crate::vault::{SecureVault, StoreKind, open_store};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use convert::ConvertArgs;
use import::ImportArgs;
use init::InitArgs;
use list::ListArgs;
use schema::UpdateSchemasArgs;
use secure::SecureArgs;
use set::SetArgs;

/// Default application name when neither `--app` nor `TEAMCFG_APP` is given.
pub const DEFAULT_APP: &str = "teamcfg";

/// Layered team configuration manager
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Application whose configuration is managed
    #[arg(long, env = "TEAMCFG_APP", default_value = DEFAULT_APP, global = true)]
    pub app: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Credential backend (default: keyring, or <APP>_VAULT)
    #[arg(long, value_enum, global = true)]
    pub vault: Option<StoreKind>,

    /// Print the result as JSON
    #[arg(long, global = true)]
    pub rfj: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a configuration layer from the profile template
    Init(InitArgs),

    /// Show configuration values
    List(ListArgs),

    /// Set one configuration property
    Set(SetArgs),

    /// Prompt for every secure property of a layer
    Secure(SecureArgs),

    /// Import a configuration from a URL or file
    Import(ImportArgs),

    /// Print the configuration schema
    Schema,

    /// Rewrite local schema files
    UpdateSchemas(UpdateSchemasArgs),

    /// Convert legacy profiles into the global configuration
    ConvertProfiles(ConvertArgs),

    /// List profile names
    Profiles,
}

/// Target layer selection shared by writing commands.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct LayerArgs {
    /// Target the user (not version-controlled) layer
    #[arg(long = "user-config", alias = "uc")]
    pub user: bool,

    /// Target the global layer instead of the project layer
    #[arg(long = "global-config", alias = "gc")]
    pub global: bool,
}

impl LayerArgs {
    pub fn layer(&self) -> Layer {
        Layer::from_flags(self.user, self.global)
    }
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.rfj {
            OutputFormat::Json
        } else {
            OutputFormat::Yaml
        }
    }

    /// Backend from `--vault`, then `<APP>_VAULT`, then the OS keychain.
    pub fn store_kind(&self) -> Result<StoreKind> {
        if let Some(kind) = self.vault {
            return Ok(kind);
        }
        let var = format!("{}_VAULT", env_prefix(&self.app));
        match std::env::var(&var) {
            Ok(value) if !value.is_empty() => value
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .with_context(|| format!("invalid {var}")),
            _ => Ok(StoreKind::default()),
        }
    }

    /// Build the service for this invocation.
    pub fn open_service(&self) -> Result<ConfigService> {
        let resolver = PathResolver::discover(&self.app);
        let vault = SecureVault::new(open_store(self.store_kind()?), self.app.clone());
        ConfigService::open(resolver, vault, Box::new(UreqFetcher))
            .context("Failed to load configuration")
    }
}
