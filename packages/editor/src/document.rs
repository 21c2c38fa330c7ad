//! # Document Handle
//!
//! A `WorksheetDocument` is a worksheet plus where it came from.
//!
//! Documents can be:
//! - **Memory-backed**: built from source text, for tests and scratch work
//! - **File-backed**: loaded from (or saved to) disk, with dirty tracking
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Parse → Edit / Evaluate → Serialize → Save
//!   ↓      ↓           ↓              ↓          ↓
//! File  Segments   Worksheet        Text       File
//! ```

use crate::events::EventChannel;
use crate::serializer;
use crate::worksheet::Worksheet;
use crate::EditorError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Editable worksheet document
#[derive(Debug)]
pub struct WorksheetDocument {
    /// Path to the worksheet file
    pub path: PathBuf,

    /// Current version number (increments on each content change)
    pub version: u64,

    worksheet: Worksheet,

    storage: DocumentStorage,
}

/// Storage backend for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStorage {
    /// In-memory only
    Memory,

    /// File-backed
    File { dirty: bool },
}

impl WorksheetDocument {
    /// Create document from source text (memory-backed)
    pub fn from_source(
        path: impl Into<PathBuf>,
        source: &str,
        channel: EventChannel,
    ) -> Result<Self, EditorError> {
        let segments = serializer::parse(source)?;

        Ok(Self {
            path: path.into(),
            version: 0,
            worksheet: Worksheet::from_segments(segments, channel),
            storage: DocumentStorage::Memory,
        })
    }

    /// A fresh, unsaved document with a single empty code segment
    pub fn empty(path: impl Into<PathBuf>, channel: EventChannel) -> Self {
        Self {
            path: path.into(),
            version: 0,
            worksheet: Worksheet::new(channel),
            storage: DocumentStorage::Memory,
        }
    }

    /// Wrap an existing worksheet (memory-backed)
    pub fn from_worksheet(path: impl Into<PathBuf>, worksheet: Worksheet) -> Self {
        Self {
            path: path.into(),
            version: 0,
            worksheet,
            storage: DocumentStorage::Memory,
        }
    }

    /// Load document from file (file-backed)
    pub fn load(path: impl Into<PathBuf>, channel: EventChannel) -> Result<Self, EditorError> {
        let path = path.into();
        let source = std::fs::read_to_string(&path)?;
        let segments = serializer::parse(&source)?;
        info!(path = %path.display(), segments = segments.len(), "loaded worksheet");

        Ok(Self {
            path,
            version: 0,
            worksheet: Worksheet::from_segments(segments, channel),
            storage: DocumentStorage::File { dirty: false },
        })
    }

    pub fn worksheet(&self) -> &Worksheet {
        &self.worksheet
    }

    /// Mutable access. Call `mark_changed` after content changes.
    pub fn worksheet_mut(&mut self) -> &mut Worksheet {
        &mut self.worksheet
    }

    pub fn storage(&self) -> DocumentStorage {
        self.storage
    }

    /// Record a content change
    pub fn mark_changed(&mut self) {
        self.version += 1;
        if let DocumentStorage::File { dirty } = &mut self.storage {
            *dirty = true;
        }
    }

    /// Check if document has unsaved changes
    pub fn is_dirty(&self) -> bool {
        match self.storage {
            DocumentStorage::File { dirty } => dirty,
            DocumentStorage::Memory => false,
        }
    }

    /// Current serialized form
    pub fn source(&self) -> String {
        self.worksheet.serialize()
    }

    /// Save document to disk (if file-backed)
    pub fn save(&mut self) -> Result<(), EditorError> {
        match &mut self.storage {
            DocumentStorage::File { dirty } => {
                std::fs::write(&self.path, self.worksheet.serialize())?;
                *dirty = false;
                info!(path = %self.path.display(), version = self.version, "saved worksheet");
                Ok(())
            }
            DocumentStorage::Memory => Err(EditorError::NotFileBacked),
        }
    }

    /// Save to a new path; the document becomes file-backed there
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<(), EditorError> {
        let path = path.as_ref();
        std::fs::write(path, self.worksheet.serialize())?;
        // Only retarget once the write went through
        self.path = path.to_path_buf();
        self.storage = DocumentStorage::File { dirty: false };
        info!(path = %self.path.display(), version = self.version, "saved worksheet");
        Ok(())
    }
}
