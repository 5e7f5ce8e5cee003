use std::path::{Path, PathBuf};

pub const EXPORT_FILE_NAME: &str = "image-caption.txt";
pub const EXPORT_MIME: &str = "text/plain";

/// A caption packaged as a downloadable text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionExport {
    pub file_name: &'static str,
    pub mime: &'static str,
    pub contents: String,
}

impl CaptionExport {
    /// `None` for an empty caption; otherwise the caption verbatim.
    pub fn from_caption(caption: &str) -> Option<Self> {
        if caption.is_empty() {
            return None;
        }
        Some(Self {
            file_name: EXPORT_FILE_NAME,
            mime: EXPORT_MIME,
            contents: caption.to_string(),
        })
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }

    /// Writes the file into `dir`, replacing any previous export.
    pub async fn save_in(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(self.file_name);
        tokio::fs::write(&path, self.contents.as_bytes()).await?;
        Ok(path)
    }
}
