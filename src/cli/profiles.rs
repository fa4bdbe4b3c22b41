//! `profiles` command.

use crate::service::ConfigService;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ProfileEntry {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// True when this profile is the default for its type.
    pub default: bool,
}

pub fn run(service: &ConfigService) -> Vec<ProfileEntry> {
    let stack = service.stack();
    service
        .profiles()
        .into_iter()
        .map(|name| {
            let kind = stack
                .get(&format!("{}.type", crate::config::profile_path(&name)), false)
                .and_then(|v| v.as_str().map(str::to_string));
            let default = kind
                .as_deref()
                .and_then(|k| stack.default_profile_name(k))
                .is_some_and(|d| d == name);
            ProfileEntry { name, kind, default }
        })
        .collect()
}
