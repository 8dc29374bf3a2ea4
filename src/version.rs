//! Human-readable versions of pinned sources.
//!
//! A pin only records a commit revision. When that revision carries a tag in
//! the upstream repository the tag name is a far better label for commit
//! messages, so the tag is preferred and the raw revision is the fallback.

use anyhow::Result;

use crate::ops::github::TagMap;
use crate::ops::sources::PinStore;
use crate::ops::sources::SourcePin;

/// Tag name of the pin's revision if known, else the revision itself.
pub fn version_of(pin: &SourcePin, tags: &TagMap) -> String {
    tags.get(&pin.revision)
        .cloned()
        .unwrap_or_else(|| pin.revision.clone())
}

/// Read the current pin for `name` and label it with [`version_of`].
pub async fn resolve_version(pins: &impl PinStore, name: &str, tags: &TagMap) -> Result<String> {
    let pin = pins.read_pin(name).await?;
    Ok(version_of(&pin, tags))
}
