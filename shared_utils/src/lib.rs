//! Shared Utilities for the img-webp tools
//!
//! Common functionality used by the conversion pipeline:
//! - Logging setup and external tool logging
//! - Unified error type
//! - Batch input collection
//! - File size type and formatting
//! - Progress bar and summary reporting

pub mod batch;
pub mod common_utils;
pub mod img_errors;
pub mod logging;
pub mod progress;
pub mod report;
pub mod types;

pub use batch::{collect_files, collect_files_sorted, WEBP_SOURCE_EXTENSIONS};
pub use img_errors::{ErrorKind, WebpError};
pub use progress::{create_progress_bar, format_duration};
pub use report::print_summary_report;
pub use types::FileSize;
