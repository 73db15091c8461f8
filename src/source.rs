//! Uploaded file handles and format dispatch.
//!
//! The format is chosen from the file name suffix only; content is never
//! sniffed. Size limits are a caller concern and are checked through
//! [`SourceFile::ensure_within`] before any parsing happens.

use std::{fs, path::Path};

use crate::error::{MapperError, Result};

/// Upload limit applied by the command-line front end.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetKind {
    Xlsx,
    Xls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet(SpreadsheetKind),
}

impl FileFormat {
    pub fn from_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("csv") => Ok(FileFormat::Csv),
            Some("xlsx") => Ok(FileFormat::Spreadsheet(SpreadsheetKind::Xlsx)),
            Some("xls") => Ok(FileFormat::Spreadsheet(SpreadsheetKind::Xls)),
            _ => Err(MapperError::UnsupportedFormat {
                name: name.to_string(),
            }),
        }
    }
}

/// A fully buffered upload: the display name plus its bytes.
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .ok_or_else(|| MapperError::InvalidInput(format!("{path:?} does not name a file")))?;
        if !path.exists() {
            return Err(MapperError::InvalidInput(format!(
                "No file found at {path:?}"
            )));
        }
        let bytes = fs::read(path).map_err(|source| MapperError::Io {
            name: name.clone(),
            source,
        })?;
        Ok(Self { name, bytes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn format(&self) -> Result<FileFormat> {
        FileFormat::from_name(&self.name)
    }

    pub fn ensure_within(&self, limit: u64) -> Result<()> {
        if self.size() > limit {
            return Err(MapperError::InvalidInput(format!(
                "'{}' is {} bytes; files must be at most {} bytes",
                self.name,
                self.size(),
                limit
            )));
        }
        Ok(())
    }
}
