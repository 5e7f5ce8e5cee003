//! Image intake: turning a picked or dropped file into a [`SelectedImage`].

use std::path::Path;

use axum::body::Bytes;

use crate::config::MAX_IMAGE_BYTES;
use crate::error::IntakeError;

const UNKNOWN_MIME: &str = "application/octet-stream";

/// A file offered by the user, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk, deriving its MIME type from the extension the
    /// way a browser file picker would.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        Ok(Self::new(name, mime_for_path(path), bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

pub fn mime_for_path(path: &Path) -> String {
    image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| UNKNOWN_MIME.to_string())
}

/// An image that passed intake validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    file: CandidateFile,
}

impl SelectedImage {
    /// Type is checked before size.
    pub fn accept(file: CandidateFile) -> Result<Self, IntakeError> {
        if !file.mime.starts_with("image/") {
            return Err(IntakeError::InvalidType { mime: file.mime });
        }
        if file.size() > MAX_IMAGE_BYTES {
            return Err(IntakeError::TooLarge { size: file.size() });
        }
        Ok(Self { file })
    }

    pub fn name(&self) -> &str {
        &self.file.name
    }

    pub fn mime(&self) -> &str {
        &self.file.mime
    }

    pub fn bytes(&self) -> &Bytes {
        &self.file.bytes
    }

    pub fn size(&self) -> u64 {
        self.file.size()
    }
}
