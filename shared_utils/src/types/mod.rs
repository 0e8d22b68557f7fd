//! Type-Safe Wrappers Module
//!
//! - `file_size`: byte counts with safe arithmetic and log/report formatting

pub mod file_size;

pub use file_size::FileSize;

// ============================================================================
// Property-Based Tests
// ============================================================================
