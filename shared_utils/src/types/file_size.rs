//! FileSize Type-Safe Wrapper
//!
//! Byte counts with overflow-free arithmetic and the display formats used in
//! conversion logs and reports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

// ============================================================================
// FileSize Newtype
// ============================================================================

/// A file size in bytes.
///
/// # Examples
/// ```
/// use shared_utils::types::file_size::FileSize;
///
/// let size = FileSize::new(1024 * 1024);
/// assert_eq!(size.display(), "1.00 MB");
/// assert_eq!(size.kb_display(), "1024.00 KB");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSize(u64);

impl FileSize {
    pub const ZERO: FileSize = FileSize(0);

    pub const KB: u64 = 1024;
    pub const MB: u64 = 1024 * 1024;
    pub const GB: u64 = 1024 * 1024 * 1024;

    #[inline]
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn from_kb(kb: u64) -> Self {
        Self(kb * Self::KB)
    }

    #[inline]
    pub const fn bytes(&self) -> u64 {
        self.0
    }

    #[inline]
    pub fn saturating_add(&self, other: FileSize) -> FileSize {
        FileSize(self.0.saturating_add(other.0))
    }

    /// `self / original`, or `None` for a zero original.
    pub fn compression_ratio(&self, original: FileSize) -> Option<f64> {
        if original.0 == 0 {
            None
        } else {
            Some(self.0 as f64 / original.0 as f64)
        }
    }

    /// Percentage of `original` saved by shrinking it to `self`.
    ///
    /// `(1 - self/original) * 100`; negative when the output grew.
    /// A zero original saves nothing and yields `0.0`.
    pub fn percent_saved(&self, original: FileSize) -> f64 {
        self.compression_ratio(original)
            .map(|ratio| (1.0 - ratio) * 100.0)
            .unwrap_or(0.0)
    }

    /// Auto-scaled unit (B, KB, MB, GB).
    pub fn display(&self) -> String {
        if self.0 >= Self::GB {
            format!("{:.2} GB", self.0 as f64 / Self::GB as f64)
        } else if self.0 >= Self::MB {
            format!("{:.2} MB", self.0 as f64 / Self::MB as f64)
        } else if self.0 >= Self::KB {
            format!("{:.2} KB", self.0 as f64 / Self::KB as f64)
        } else {
            format!("{} B", self.0)
        }
    }

    /// Always kilobytes with two decimals, e.g. `"12.34 KB"`.
    ///
    /// This is the unit of the conversion log, so it never auto-scales.
    pub fn kb_display(&self) -> String {
        format!("{:.2} KB", self.0 as f64 / Self::KB as f64)
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl fmt::Debug for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSize({} = {})", self.0, self.display())
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl Default for FileSize {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<u64> for FileSize {
    fn from(bytes: u64) -> Self {
        Self::new(bytes)
    }
}

impl From<FileSize> for u64 {
    fn from(size: FileSize) -> Self {
        size.0
    }
}

impl Sum for FileSize {
    fn sum<I: Iterator<Item = FileSize>>(iter: I) -> Self {
        iter.fold(FileSize::ZERO, |acc, s| acc.saturating_add(s))
    }
}

// ============================================================================
// Tests
// ============================================================================
