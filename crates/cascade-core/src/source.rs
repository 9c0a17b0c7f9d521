//! Seed family interface: resolvers for remote locators, loaders for local
//! references.
//!
//! The coordinator only depends on this trait; site-specific URL and payload
//! parsing lives behind it.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::entity::{BoxedEntity, ContentSource, Entity};

/// Lazily produced, finite sequence of resolved entities. Consumed
/// item-by-item so memory stays bounded for large collections; the producer
/// may perform paginated network calls between items.
pub type EntityStream<'a> = Box<dyn Iterator<Item = Result<BoxedEntity>> + 'a>;

/// One seed family (e.g. a specific site).
pub trait SeedSource: Send + Sync {
    /// Expands a remote locator into zero or more entities.
    fn resolve(&self, url: &str) -> Result<EntityStream<'_>>;

    /// Loads exactly one entity from a local reference.
    fn load(&self, path: &Path) -> Result<BoxedEntity>;
}

/// Built-in 1:1 family: every remote seed is itself a downloadable resource
/// and every local seed a single file. No converter.
#[derive(Debug, Default)]
pub struct DirectSource;

impl SeedSource for DirectSource {
    fn resolve(&self, url: &str) -> Result<EntityStream<'_>> {
        let entity = DirectEntity::from_url(url);
        Ok(Box::new(std::iter::once(Ok(
            Box::new(entity) as BoxedEntity
        ))))
    }

    fn load(&self, path: &Path) -> Result<BoxedEntity> {
        if !path.exists() {
            anyhow::bail!("no such file: {}", path.display());
        }
        Ok(Box::new(DirectEntity::from_path(path)))
    }
}

/// Entity for the direct family, keyed by its URL or path.
#[derive(Debug)]
struct DirectEntity {
    key: String,
    title: String,
    ext: String,
    source: ContentSource,
}

impl DirectEntity {
    fn from_url(url: &str) -> Self {
        let name = crate::fsname::filename_from_url_path(url).unwrap_or_else(|| "file".to_string());
        let (title, ext) = split_extension(&name);
        Self {
            key: url.to_string(),
            title,
            ext,
            source: ContentSource::Remote(url.to_string()),
        }
    }

    fn from_path(path: &Path) -> Self {
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let ext = path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bin".to_string());
        Self {
            key: path.to_string_lossy().into_owned(),
            title,
            ext,
            source: ContentSource::Local(PathBuf::from(path)),
        }
    }
}

fn split_extension(name: &str) -> (String, String) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem.to_string(), ext.to_string())
        }
        _ => (name.to_string(), "bin".to_string()),
    }
}

impl Entity for DirectEntity {
    fn identity_key(&self) -> String {
        self.key.clone()
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn source(&self) -> ContentSource {
        self.source.clone()
    }

    fn raw_extension(&self) -> &str {
        &self.ext
    }

    fn derived_extension(&self) -> &str {
        "txt"
    }

    fn render_derived(&self, _raw: &str) -> Result<String> {
        Err(anyhow::anyhow!("direct resources have no derived format"))
            .context("convert not supported for this family")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_yields_one_entity_keyed_by_url() {
        let src = DirectSource;
        let mut stream = src.resolve("https://example.com/a/123.xml").unwrap();
        let e = stream.next().unwrap().unwrap();
        assert_eq!(e.identity_key(), "https://example.com/a/123.xml");
        assert_eq!(e.title(), "123");
        assert_eq!(e.raw_extension(), "xml");
        assert!(stream.next().is_none());
    }

    #[test]
    fn load_uses_file_stem_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved subtitles.xml");
        std::fs::write(&path, "<xml/>").unwrap();
        let src = DirectSource;
        let e = src.load(&path).unwrap();
        assert_eq!(e.title(), "saved subtitles");
        assert_eq!(e.raw_extension(), "xml");
        assert_eq!(e.source(), ContentSource::Local(path));
    }

    #[test]
    fn load_missing_file_errors() {
        let src = DirectSource;
        assert!(src.load(Path::new("/definitely/not/here.xml")).is_err());
    }

    #[test]
    fn direct_family_has_no_converter() {
        let e = DirectEntity::from_url("https://example.com/x.bin");
        assert!(e.render_derived("raw").is_err());
    }
}
