//! Document text sources

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::DocumentLoadError;

/// Something that can produce raw document text
pub trait TextSource {
    fn read_text(&self) -> Result<String, DocumentLoadError>;
}

/// UTF-8 text file on disk
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextSource for FileSource {
    fn read_text(&self) -> Result<String, DocumentLoadError> {
        let text = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::InvalidData {
                DocumentLoadError::InvalidUtf8 {
                    path: self.path.clone(),
                }
            } else {
                DocumentLoadError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let text = strip_control(&text);
        if text.trim().is_empty() {
            return Err(DocumentLoadError::Empty);
        }
        tracing::debug!(path = %self.path.display(), chars = text.chars().count(), "read document");
        Ok(text)
    }
}

/// Text held in memory
pub struct StaticSource(pub String);

impl TextSource for StaticSource {
    fn read_text(&self) -> Result<String, DocumentLoadError> {
        Ok(strip_control(&self.0))
    }
}

/// Drop control characters other than line breaks and tabs
pub fn strip_control(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lector-source-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_strip_control_keeps_unicode() {
        assert_eq!(strip_control("caf\u{e9}\u{0}\u{7}\n\tok\r"), "caf\u{e9}\n\tok\r");
    }

    #[test]
    fn test_file_source_reads_text() {
        let path = temp_file("doc.txt", b"Call me Ishmael.\x0c\nSome years ago.");
        let text = FileSource::new(&path).read_text().unwrap();
        assert_eq!(text, "Call me Ishmael.\nSome years ago.");
    }

    #[test]
    fn test_missing_file() {
        let err = FileSource::new("/nonexistent/lector/doc.txt")
            .read_text()
            .unwrap_err();
        assert!(matches!(err, DocumentLoadError::Io { .. }));
    }

    #[test]
    fn test_invalid_utf8() {
        let path = temp_file("bad.txt", &[0xff, 0xfe, 0x41]);
        let err = FileSource::new(&path).read_text().unwrap_err();
        assert!(matches!(err, DocumentLoadError::InvalidUtf8 { .. }));
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        let path = temp_file("blank.txt", b"  \n\t\n");
        let err = FileSource::new(&path).read_text().unwrap_err();
        assert!(matches!(err, DocumentLoadError::Empty));
    }
}
