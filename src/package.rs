//! OOXML package storage
//!
//! A package is a zip archive of named parts. [`Package`] inflates the whole
//! archive into memory so parts can be replaced and the archive rebuilt on
//! save. [`PackageReader`] keeps the archive closed and inflates one part at a
//! time, either whole or as a buffered stream.

use crate::error::{ExcelError, Result};
use indexmap::IndexMap;
use std::io::{BufReader, Read, Seek, Write};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive};

pub const CONTENT_TYPES: &str = "[Content_Types].xml";
pub const ROOT_RELS: &str = "_rels/.rels";
pub const WORKBOOK: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
pub const STYLES: &str = "xl/styles.xml";
pub const SHARED_STRINGS: &str = "xl/sharedStrings.xml";

/// In-memory set of package parts, kept in insertion order
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: IndexMap<String, Vec<u8>>,
}

impl Package {
    pub fn new() -> Self {
        Package::default()
    }

    /// Read every part of a zip package
    pub fn open<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let mut parts = IndexMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            parts.insert(file.name().trim_start_matches('/').to_string(), data);
        }

        if !parts.contains_key(CONTENT_TYPES) {
            return Err(ExcelError::ReadError(format!(
                "not a spreadsheet package: missing {}",
                CONTENT_TYPES
            )));
        }

        log::debug!("opened package with {} parts", parts.len());
        Ok(Package { parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    /// Look up a part that must exist
    pub fn require_part(&self, name: &str) -> Result<&[u8]> {
        self.part(name).ok_or_else(|| missing_part(name))
    }

    /// Create or replace a part
    pub fn put_part(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.parts.insert(name.into(), data);
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Write every part into a fresh zip archive
    pub fn save<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = zip::ZipWriter::new(writer);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(6));

        for (name, data) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }

        Ok(zip.finish()?)
    }
}

/// Part being inflated as it is read
pub type PartReader<'a> = BufReader<Box<dyn Read + 'a>>;

const PART_BUFFER_SIZE: usize = 64 * 1024;

/// Read-only package whose parts are inflated on demand
pub struct PackageReader<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> PackageReader<R> {
    /// Read the archive directory; no part is inflated yet
    pub fn open(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        if !archive.file_names().any(|name| name == CONTENT_TYPES) {
            return Err(ExcelError::ReadError(format!(
                "not a spreadsheet package: missing {}",
                CONTENT_TYPES
            )));
        }

        log::debug!("opened package directory with {} entries", archive.len());
        Ok(PackageReader { archive })
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.archive.file_names().any(|n| n == name)
    }

    /// Inflate a whole part, `None` when the package has no such part
    pub fn read_part(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    /// Inflate a whole part that must exist
    pub fn require_part(&mut self, name: &str) -> Result<Vec<u8>> {
        self.read_part(name)?.ok_or_else(|| missing_part(name))
    }

    /// Open a part for reading; it is inflated as the reader is consumed
    pub fn stream_part(&mut self, name: &str) -> Result<PartReader<'_>> {
        let file = self.archive.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => missing_part(name),
            other => other.into(),
        })?;
        Ok(BufReader::with_capacity(PART_BUFFER_SIZE, Box::new(file)))
    }
}

fn missing_part(name: &str) -> ExcelError {
    ExcelError::ReadError(format!("missing package part {}", name))
}

/// Resolve a relationship target against the `xl/` folder
pub fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = vec!["xl"];
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
