//! img-webp: batch WebP conversion with an HTML comparison gallery
//!
//! Pipeline: folder scan → external `cwebp` encode (parallel) → conversion
//! log → per-folder report and gallery index → optional local preview server.
//!
//! ```no_run
//! use img_webp::{convert_folder, ConversionJob, ConvertOptions, CwebpEncoder};
//!
//! let job = ConversionJob::new("photos", 80, false)?;
//! let encoder = CwebpEncoder::locate(CwebpEncoder::DEFAULT_BINARY)?;
//! let outcome = convert_folder(&job, &encoder, &ConvertOptions::default())?;
//! println!("{}", outcome.message());
//! # Ok::<(), img_webp::WebpError>(())
//! ```

pub mod conversion_api;
pub mod conversion_log;
pub mod encoder;
pub mod gallery;
pub mod preview_server;
pub mod templates;

pub use shared_utils::img_errors::{ErrorKind, Result, WebpError};

pub use conversion_api::{
    convert_folder, BatchOutcome, BatchSummary, ConversionJob, ConversionResult, ConvertOptions,
};
pub use conversion_log::{ConversionLog, ConversionLogRecord};
pub use encoder::{CwebpEncoder, Encoder};
pub use gallery::{write_folder_report, write_gallery_index, GalleryIndexEntry};
pub use preview_server::PreviewServer;
pub use templates::Templates;
