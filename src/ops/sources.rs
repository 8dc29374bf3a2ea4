#![allow(async_fn_in_trait)]

use std::collections::HashMap;
use std::path;

use anyhow::Result;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use tracing::instrument;

use crate::error::Error;

/// Default location of the niv pin store, relative to the repository root.
pub const DEFAULT_SOURCES_FILE: &str = "nix/sources.json";

/// Read access to the pinned sources written by niv.
#[cfg_attr(test, automock)]
pub trait PinStore {
    /// Load the pin recorded for `name`.
    async fn read_pin(&self, name: &str) -> Result<SourcePin>;
}

/// One GitHub-hosted entry of `sources.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourcePin {
    pub repo: String,
    pub owner: String,
    pub branch: String,
    #[serde(rename = "rev")]
    pub revision: String,
}

/// Reads pins straight from the JSON file on every call, so changes made by
/// niv between calls are picked up.
pub struct RealPinStore {
    path: path::PathBuf,
}

impl RealPinStore {
    pub fn new(path: path::PathBuf) -> Self {
        Self { path }
    }
}

impl PinStore for RealPinStore {
    #[instrument(skip(self))]
    async fn read_pin(&self, name: &str) -> Result<SourcePin> {
        let what = format!("source {}", name);
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::not_found(&what, format!("{}: {}", self.path.display(), e)))?;

        parse_pin(&contents, name).map_err(|reason| Error::not_found(what, reason).into())
    }
}

fn parse_pin(contents: &str, name: &str) -> std::result::Result<SourcePin, String> {
    let mut sources: HashMap<String, serde_json::Value> =
        serde_json::from_str(contents).map_err(|e| format!("malformed sources file: {}", e))?;

    let entry = sources
        .remove(name)
        .ok_or_else(|| "no such entry in sources file".to_string())?;

    serde_json::from_value(entry).map_err(|e| format!("malformed entry: {}", e))
}
