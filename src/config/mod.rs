//! Layered team configuration.
//!
//! Combines up to four JSON layers, highest precedence first:
//! 1. **Project user** - `<app>.config.user.json` found upward from the project dir
//! 2. **Project** - `<app>.config.json` found upward from the project dir
//! 3. **Global user** - `<home>/<app>.config.user.json`
//! 4. **Global** - `<home>/<app>.config.json`
//!
//! ## Merge Strategy
//! - `profiles`: leaf-wise, `secure` arrays unioned
//! - `defaults`: first layer naming a type wins
//! - `autoStore`: first layer that sets it wins
//!
//! ## Environment Variables
//! - `<APP>_CLI_HOME` - Global home directory (default: `~/.<app>`)
//! - `<APP>_PROJECT_DIR` - Where the project search starts (default: cwd)
//! - `<APP>_VAULT` - Credential backend: `keyring`, `memory` or `none`
//! - `<APP>_LOG` - Log filter directive for the binary
//!
//! A stored string of the form `$NAME` reads as the environment variable `NAME`.

pub mod document;
pub mod dot_path;
pub mod env;
pub mod layers;
mod merge;
pub mod paths;
pub mod profiles;

pub use document::{ConfigDocument, Profile, SECURE_PLACEHOLDER, SchemaInfo, SecretView, secure_info_for_prop};
pub use layers::{LayerStack, SetOptions};
pub use merge::{deep_merge, merge_layers};
pub use paths::{Layer, LayerLocation, LayerPaths, PathResolver, env_prefix};
pub use profiles::{coerce_value, profile_path};
