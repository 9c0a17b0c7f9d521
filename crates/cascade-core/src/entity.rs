//! Resolved entities: fully identified units of work.

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;

/// Where an entity's raw content lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Fetched over HTTP.
    Remote(String),
    /// Read from an existing local file.
    Local(PathBuf),
}

/// Capability interface for a resolved entity. One implementation per seed
/// family; the coordinator drives these without knowing the family.
pub trait Entity: Send {
    /// Stable key for deduplication: the entity's natural id if it has one,
    /// else its content-source path.
    fn identity_key(&self) -> String;

    /// Output title (becomes the filename stem, sanitized on write).
    fn title(&self) -> &str;

    fn source(&self) -> ContentSource;

    /// Extension for the persisted raw content.
    fn raw_extension(&self) -> &str;

    /// Extension for the derived artifact.
    fn derived_extension(&self) -> &str;

    /// Convert collaborator: raw content in, derived artifact out. Families
    /// without a converter return an error, which is isolated per item.
    fn render_derived(&self, raw: &str) -> Result<String>;

    /// Extra request headers for this entity's remote fetches.
    fn request_headers(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

pub type BoxedEntity = Box<dyn Entity>;
