//! OPC package layer: the on-disk ZIP container holding the document parts.
//!
//! The whole package is held in memory as an ordered part map. Saving
//! rebuilds the archive into a temporary file next to the target and renames
//! it into place, so the on-disk file is either fully replaced or untouched.
//! Parts the model does not understand are carried through byte-for-byte.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::Path;

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{DocxError, Result};
use crate::xml::{self, XmlElement};

#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: BTreeMap<String, Vec<u8>>,
}

impl Package {
    /// Load a package from disk, reading every part into memory.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;
        let mut parts = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            parts.insert(name, bytes);
        }
        info!("Loaded package from {:?} ({} parts)", path, parts.len());
        Ok(Package { parts })
    }

    /// Synthesize a minimal valid empty package skeleton.
    pub fn empty() -> Result<Self> {
        let mut buffer = Cursor::new(Vec::new());
        docx_rs::Docx::new()
            .build()
            .pack(&mut buffer)
            .map_err(|e| std::io::Error::other(format!("failed to build package skeleton: {e}")))?;
        buffer.set_position(0);
        let mut archive = ZipArchive::new(buffer)?;
        let mut parts = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            parts.insert(name, bytes);
        }
        Ok(Package { parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    pub fn set_part(&mut self, name: &str, bytes: Vec<u8>) {
        self.parts.insert(name.to_string(), bytes);
    }

    /// Part names in stable (lexicographic) order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Parse a part as markup. `Ok(None)` when the part is absent.
    pub fn xml(&self, name: &str) -> Result<Option<XmlElement>> {
        let Some(bytes) = self.part(name) else {
            return Ok(None);
        };
        let text = std::str::from_utf8(bytes).map_err(|e| {
            DocxError::PartialFeatureUnavailable(format!("part '{name}' is not valid UTF-8: {e}"))
        })?;
        xml::parse_part(text).map(Some)
    }

    /// Write the package to `path`, all parts, atomically: the archive is
    /// built in a temporary file and renamed over the target only once
    /// complete.
    pub fn save(&self, path: &Path) -> Result<()> {
        let temp_path = path.with_extension("docx.tmp");
        let result = self.write_archive(&temp_path).and_then(|()| {
            fs::rename(&temp_path, path)?;
            Ok(())
        });
        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result?;
        info!("Saved package to {:?} ({} parts)", path, self.parts.len());
        Ok(())
    }

    fn write_archive(&self, temp_path: &Path) -> Result<()> {
        let file = File::create(temp_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                DocxError::WriteBlocked {
                    path: temp_path.to_path_buf(),
                    reason: "permission denied".to_string(),
                }
            } else {
                DocxError::Io(e)
            }
        })?;
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, bytes) in &self.parts {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(bytes)?;
        }
        writer.finish()?;
        Ok(())
    }
}
