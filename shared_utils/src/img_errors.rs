//! Shared WebP Pipeline Error Types
//!
//! One error enum for every stage of the pipeline so the calling surface
//! receives a single structured failure (kind + message).

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebpError {
    #[error("Failed to read folder {}: {source}", path.display())]
    FolderRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Encode failed for {file}: {reason}")]
    Encode { file: String, reason: String },

    #[error("File system error at {}: {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Preview server failed to start: {0}")]
    ServerStart(String),

    #[error("Quality must be within 0-100, got {0}")]
    InvalidQuality(u8),
}

/// Coarse error classification reported alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FolderReadError,
    EncodeError,
    FileSystemError,
    ServerStartError,
    InvalidInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::FolderReadError => "FolderReadError",
            ErrorKind::EncodeError => "EncodeError",
            ErrorKind::FileSystemError => "FileSystemError",
            ErrorKind::ServerStartError => "ServerStartError",
            ErrorKind::InvalidInput => "InvalidInput",
        };
        f.write_str(name)
    }
}

impl WebpError {
    pub fn folder_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WebpError::FolderRead {
            path: path.into(),
            source,
        }
    }

    pub fn file_system(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WebpError::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub fn encode(file: impl Into<String>, reason: impl Into<String>) -> Self {
        WebpError::Encode {
            file: file.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WebpError::FolderRead { .. } => ErrorKind::FolderReadError,
            WebpError::Encode { .. } => ErrorKind::EncodeError,
            WebpError::FileSystem { .. } => ErrorKind::FileSystemError,
            WebpError::ServerStart(_) => ErrorKind::ServerStartError,
            WebpError::InvalidQuality(_) => ErrorKind::InvalidInput,
        }
    }

    /// Short status line for the calling surface.
    pub fn user_message(&self) -> String {
        match self {
            WebpError::Encode { file, .. } => format!("❌ Conversion failed on {}", file),
            WebpError::FolderRead { path, .. } => {
                format!("❌ Cannot read folder: {}", path.display())
            }
            WebpError::FileSystem { path, .. } => {
                format!("❌ Failed to write: {}", path.display())
            }
            WebpError::ServerStart(reason) => format!("❌ Preview unavailable: {}", reason),
            WebpError::InvalidQuality(q) => format!("❌ Invalid quality: {}", q),
        }
    }
}

pub type Result<T> = std::result::Result<T, WebpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let io = || std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(
            WebpError::folder_read("/x", io()).kind(),
            ErrorKind::FolderReadError
        );
        assert_eq!(
            WebpError::file_system("/x/conversion.log", io()).kind(),
            ErrorKind::FileSystemError
        );
        assert_eq!(WebpError::encode("a.png", "exit 1").kind(), ErrorKind::EncodeError);
        assert_eq!(
            WebpError::ServerStart("bind".into()).kind(),
            ErrorKind::ServerStartError
        );
        assert_eq!(WebpError::InvalidQuality(101).kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_encode_error_carries_filename() {
        let err = WebpError::encode("holiday.JPG", "exit code 255");
        assert!(err.to_string().contains("holiday.JPG"));
        assert!(err.user_message().contains("holiday.JPG"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::EncodeError.to_string(), "EncodeError");
        assert_eq!(ErrorKind::ServerStartError.to_string(), "ServerStartError");
    }
}
