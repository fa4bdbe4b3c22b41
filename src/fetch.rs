//! Remote document retrieval for `import`.

use crate::config::document::parse_document;
use crate::error::{ConfigError, Result};
use serde_json::Value;
use std::io::Read;
use tracing::debug;

const USER_AGENT: &str = concat!("teamcfg/", env!("CARGO_PKG_VERSION"));

/// Largest remote document accepted.
const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

/// Fetch a document over HTTP(S).
///
/// Non-2xx answers and transport failures are `RemoteFetchFailure`.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetch and parse a JSON object. Parse failures and non-object bodies
/// are `Malformed`.
pub fn fetch_json(fetcher: &dyn Fetcher, url: &str) -> Result<Value> {
    let bytes = fetcher.fetch(url)?;
    parse_document(url, &String::from_utf8_lossy(&bytes))
}

/// Blocking HTTP client.
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqFetcher;

impl Fetcher for UreqFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "fetching remote document");
        let response = ureq::get(url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", "application/json")
            .call();

        match response {
            Ok(resp) => {
                let mut body = Vec::new();
                resp.into_reader()
                    .take(MAX_BODY_BYTES)
                    .read_to_end(&mut body)
                    .map_err(|e| ConfigError::fetch(url, None, e.to_string()))?;
                Ok(body)
            }
            Err(ureq::Error::Status(code, _)) => {
                Err(ConfigError::fetch(url, Some(code), format!("HTTP {code}")))
            }
            Err(e) => Err(ConfigError::fetch(url, None, e.to_string())),
        }
    }
}
