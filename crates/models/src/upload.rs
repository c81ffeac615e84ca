use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::DocumentCategory;

/// A file staged for upload.
///
/// The bytes are held in memory for the task's whole lifetime so a
/// failed upload can be retried without asking the user to re-pick it.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, keeping its file name as the upload name.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let bytes = std::fs::read(path)?;
        Ok(Self::new(name, "application/octet-stream", bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Form fields accompanying a document upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub dept_id: Option<i64>,
    pub project_id: Option<i64>,
    pub user_id: Option<i64>,
    pub category: Option<DocumentCategory>,
}
