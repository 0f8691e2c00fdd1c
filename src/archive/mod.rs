//! The archive protocol: serialize a scene to tagged markup and back.
//!
//! The format is a small XML subset: a `<document>` root holding `<page>`
//! elements, pages holding shape elements (optionally grouped under
//! `<layer>` tags), styles nested inside their owner, and resource bytes
//! stored base64-encoded under the root. Shape tags resolve through the
//! class registry, so the reader has no per-kind special cases beyond
//! attribute names.

pub mod element;
pub mod parse;
mod read;
mod registry;
mod write;

use std::path::Path;

pub use element::Element;
pub use parse::parse_document;

use crate::errors::ArchiveError;
use crate::scene::Scene;

impl Scene {
    /// Serialize this scene as archive markup.
    pub fn to_xml(&self) -> String {
        write::scene_to_element(self).to_markup()
    }

    /// Serialize this scene as archive bytes (UTF-8 markup).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }

    /// Rebuild a scene from archive markup. Never returns a partially
    /// built scene: any error aborts the whole read.
    pub fn from_xml(source: &str) -> Result<Scene, ArchiveError> {
        let root = parse::parse_document("<input>", source)?;
        read::scene_from_element(&root)
    }

    /// Rebuild a scene from archive bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Scene, ArchiveError> {
        let source = std::str::from_utf8(bytes).map_err(|e| ArchiveError::Parse {
            src: miette::NamedSource::new("<input>", String::new()),
            span: (0, 0).into(),
            message: format!("input is not valid UTF-8 (first bad byte at {})", e.valid_up_to()),
        })?;
        Scene::from_xml(source)
    }

    /// Write this scene's archive to a file.
    pub fn save_path(&self, path: impl AsRef<Path>) -> Result<(), ArchiveError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()).map_err(|cause| ArchiveError::UnreadableSource {
            name: path.display().to_string(),
            cause,
        })
    }

    /// Read a scene's archive from a file.
    pub fn load_path(path: impl AsRef<Path>) -> Result<Scene, ArchiveError> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|cause| ArchiveError::UnreadableSource {
                name: path.display().to_string(),
                cause,
            })?;
        let root = parse::parse_document(&path.display().to_string(), &source)?;
        read::scene_from_element(&root)
    }
}
