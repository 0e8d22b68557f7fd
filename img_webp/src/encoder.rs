//! Encoder Module
//!
//! Runs the external WebP encoder for one input file.

use crate::{Result, WebpError};
use shared_utils::common_utils::{file_name_string, has_extension};
use shared_utils::logging::execute_external_command;
use shared_utils::WEBP_SOURCE_EXTENSIONS;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Encodes one image to WebP.
///
/// Implementations write exactly one file at `output` and return its size,
/// or write nothing and return [`WebpError::Encode`] naming the input file.
pub trait Encoder: Send + Sync {
    fn encode(&self, input: &Path, quality: u8, lossless: bool, output: &Path) -> Result<u64>;
}

/// `cwebp` command-line encoder.
#[derive(Debug, Clone)]
pub struct CwebpEncoder {
    binary: PathBuf,
}

impl CwebpEncoder {
    pub const DEFAULT_BINARY: &'static str = "cwebp";

    /// Use `binary` as given, without checking it exists.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Resolve `binary` on PATH (or as a path) so a missing encoder fails
    /// before any file is converted.
    pub fn locate(binary: impl AsRef<OsStr>) -> Result<Self> {
        let binary = binary.as_ref();
        match which::which(binary) {
            Ok(resolved) => {
                debug!(encoder = %resolved.display(), "Found WebP encoder");
                Ok(Self::new(resolved))
            }
            Err(e) => Err(WebpError::encode(
                binary.to_string_lossy(),
                format!(
                    "encoder not found ({}). Install libwebp so `cwebp` is on PATH or pass --encoder",
                    e
                ),
            )),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// `-q <quality> [-lossless] <input> -o <output>`
    pub fn args(input: &Path, quality: u8, lossless: bool, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-q".into(), quality.to_string().into()];
        if lossless {
            args.push("-lossless".into());
        }
        args.push(input.as_os_str().to_owned());
        args.push("-o".into());
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl Default for CwebpEncoder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BINARY)
    }
}

impl Encoder for CwebpEncoder {
    fn encode(&self, input: &Path, quality: u8, lossless: bool, output: &Path) -> Result<u64> {
        let file = file_name_string(input);

        if !has_extension(input, WEBP_SOURCE_EXTENSIONS) {
            return Err(WebpError::encode(
                file,
                format!(
                    "unsupported input format (expected one of: {})",
                    WEBP_SOURCE_EXTENSIONS.join(", ")
                ),
            ));
        }

        let args = Self::args(input, quality, lossless, output);
        let result = execute_external_command(self.binary.as_os_str(), &args)
            .map_err(|e| WebpError::encode(&file, format!("{:#}", e)))?;

        if !result.success() {
            discard_partial_output(output);
            let code = result
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(WebpError::encode(
                file,
                format!("encoder exited with {}: {}", code, result.stderr.trim()),
            ));
        }

        fs::metadata(output)
            .map(|m| m.len())
            .map_err(|e| WebpError::encode(file, format!("no output written: {}", e)))
    }
}

fn discard_partial_output(output: &Path) {
    if output.exists() {
        if let Err(e) = fs::remove_file(output) {
            warn!(path = %output.display(), error = %e, "Failed to remove partial output");
        }
    }
}
