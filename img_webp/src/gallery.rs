//! Gallery Module
//!
//! Static HTML pages: one comparison report per output directory and an
//! index page on the source folder with a card per finished batch.

use crate::conversion_api::{
    BatchSummary, ConversionJob, ConversionResult, LOSSLESS_SUFFIX, OUTPUT_DIR_PREFIX,
};
use crate::conversion_log::{ConversionLogRecord, LOG_FILE_NAME};
use crate::templates::{fill_placeholders, Templates};
use crate::{Result, WebpError};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of both the folder report and the gallery index.
pub const REPORT_FILE_NAME: &str = "index.html";

const INDEX_TITLE: &str = "WebP Conversion Gallery";
const INDEX_HEADING: &str = "Conversion Results";

/// One card on the index page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryIndexEntry {
    pub dir_name: String,
    pub quality: u8,
    pub lossless: bool,
    pub percent_saved: f64,
    pub elapsed_secs: f64,
}

impl GalleryIndexEntry {
    /// Build an entry from a parsed log. Logs without a summary belong to a
    /// batch that is still running or failed and yield `None`.
    pub fn from_record(dir_name: &str, record: &ConversionLogRecord) -> Option<Self> {
        let summary = record.summary?;
        let from_name = parse_output_dir_name(dir_name);
        let quality = record.quality().or(from_name.map(|(q, _)| q))?;
        let lossless = record
            .lossless()
            .or(from_name.map(|(_, l)| l))
            .unwrap_or(false);

        Some(Self {
            dir_name: dir_name.to_string(),
            quality,
            lossless,
            percent_saved: summary.percent_saved,
            elapsed_secs: summary.elapsed_secs,
        })
    }
}

/// `conversion_q80_lossless` → `(80, true)`
pub fn parse_output_dir_name(name: &str) -> Option<(u8, bool)> {
    let rest = name.strip_prefix(OUTPUT_DIR_PREFIX)?;
    let (digits, lossless) = match rest.strip_suffix(LOSSLESS_SUFFIX) {
        Some(digits) => (digits, true),
        None => (rest, false),
    };
    let quality: u8 = digits.parse().ok()?;
    (quality <= 100).then_some((quality, lossless))
}

// ═══════════════════════════════════════════════════════════════
// Folder report
// ═══════════════════════════════════════════════════════════════

pub fn render_folder_report(
    job: &ConversionJob,
    results: &[ConversionResult],
    summary: &BatchSummary,
    templates: &Templates,
) -> String {
    let rows: String = results.iter().map(render_row).collect();
    let summary_html = format!(
        "<span><strong>Quality:</strong> {}</span>\n\
         <span><strong>Lossless:</strong> {}</span>\n\
         <span><strong>Images:</strong> {}</span>\n\
         <span><strong>Original:</strong> {}</span>\n\
         <span><strong>Converted:</strong> {}</span>\n\
         <span><strong>Filesize saved:</strong> {:.2}%</span>\n\
         <span><strong>Time:</strong> {:.2} seconds</span>",
        job.quality(),
        yes_no(job.lossless()),
        summary.total_images,
        summary.total_original.kb_display(),
        summary.total_converted.kb_display(),
        summary.percent_saved,
        summary.elapsed_secs
    );
    let title = escape_html(&job.output_dir_name());
    let generated_at = generated_at();

    fill_placeholders(
        &templates.report,
        &[
            ("TITLE", title.as_str()),
            ("SUMMARY", summary_html.as_str()),
            ("CONTENT", rows.as_str()),
            ("GENERATED_AT", generated_at.as_str()),
        ],
    )
}

/// Write `index.html` into `output_dir`. Originals are linked one level up.
pub fn write_folder_report(
    output_dir: &Path,
    job: &ConversionJob,
    results: &[ConversionResult],
    summary: &BatchSummary,
    templates: &Templates,
) -> Result<PathBuf> {
    let path = output_dir.join(REPORT_FILE_NAME);
    let html = render_folder_report(job, results, summary, templates);
    fs::write(&path, html).map_err(|e| WebpError::file_system(&path, e))?;
    debug!(path = %path.display(), rows = results.len(), "Wrote folder report");
    Ok(path)
}

fn render_row(result: &ConversionResult) -> String {
    let original_href = format!("../{}", encode_href(&result.original_name));
    let converted_href = encode_href(&result.converted_name);
    let original_name = escape_html(&result.original_name);
    let converted_name = escape_html(&result.converted_name);

    format!(
        "      <tr class=\"pair\">\n\
         \x20       <td><a href=\"{oh}\" target=\"_blank\"><img src=\"{oh}\" alt=\"{on}\" loading=\"lazy\"></a><small>{on}<br>Original: {os}</small></td>\n\
         \x20       <td><a href=\"{ch}\" target=\"_blank\"><img src=\"{ch}\" alt=\"{cn}\" loading=\"lazy\"></a><small>{cn}<br>Converted: {cs}</small></td>\n\
         \x20     </tr>\n",
        oh = original_href,
        on = original_name,
        os = result.original_size.kb_display(),
        ch = converted_href,
        cn = converted_name,
        cs = result.converted_size.kb_display(),
    )
}

// ═══════════════════════════════════════════════════════════════
// Gallery index
// ═══════════════════════════════════════════════════════════════

/// Finished batches under `root`, ordered by directory name.
pub fn scan_gallery_entries(root: &Path) -> Result<Vec<GalleryIndexEntry>> {
    let dir = fs::read_dir(root).map_err(|e| WebpError::folder_read(root, e))?;
    let mut entries = Vec::new();

    for entry in dir.filter_map(|e| e.ok()) {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let dir_name = entry.file_name().to_string_lossy().into_owned();
        if !file_type.is_dir() || !dir_name.starts_with(OUTPUT_DIR_PREFIX) {
            continue;
        }

        let log_path = entry.path().join(LOG_FILE_NAME);
        let record = match ConversionLogRecord::read(&log_path) {
            Ok(record) => record,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(dir = %dir_name, "No conversion log, skipping");
                continue;
            }
            Err(e) => {
                warn!(path = %log_path.display(), error = %e, "Unreadable conversion log, skipping");
                continue;
            }
        };

        match GalleryIndexEntry::from_record(&dir_name, &record) {
            Some(card) => entries.push(card),
            None => debug!(dir = %dir_name, "Conversion log has no summary, skipping"),
        }
    }

    entries.sort_by(|a, b| a.dir_name.cmp(&b.dir_name));
    Ok(entries)
}

pub fn render_gallery_index(entries: &[GalleryIndexEntry], templates: &Templates) -> String {
    let generated_at = generated_at();
    let cards: String = if entries.is_empty() {
        "<p class=\"empty\">No finished conversions yet.</p>\n".to_string()
    } else {
        entries.iter().map(|e| render_card(e, templates)).collect()
    };

    let mut page = String::new();
    page.push_str(&fill_placeholders(&templates.common_head, &[("TITLE", INDEX_TITLE)]));
    page.push_str(&fill_placeholders(&templates.header, &[("TITLE", INDEX_TITLE)]));
    page.push_str("<main>\n<h2>");
    page.push_str(INDEX_HEADING);
    page.push_str("</h2>\n<div class=\"grid\">\n");
    page.push_str(&cards);
    page.push_str("</div>\n</main>\n");
    page.push_str(&fill_placeholders(
        &templates.footer,
        &[("GENERATED_AT", generated_at.as_str())],
    ));
    page.push_str(&templates.common_tail);
    page
}

/// Rebuild `<root>/index.html` from the logs of every output directory.
pub fn write_gallery_index(root: &Path, templates: &Templates) -> Result<PathBuf> {
    let entries = scan_gallery_entries(root)?;
    let path = root.join(REPORT_FILE_NAME);
    fs::write(&path, render_gallery_index(&entries, templates))
        .map_err(|e| WebpError::file_system(&path, e))?;
    info!(path = %path.display(), cards = entries.len(), "Wrote gallery index");
    Ok(path)
}

fn render_card(entry: &GalleryIndexEntry, templates: &Templates) -> String {
    let link = format!("{}/{}", encode_href(&entry.dir_name), REPORT_FILE_NAME);
    let name = escape_html(&entry.dir_name);
    let quality = entry.quality.to_string();
    let saved = format!("{:.2}%", entry.percent_saved);
    let time = format!("{:.2} seconds", entry.elapsed_secs);

    let mut card = fill_placeholders(
        &templates.card,
        &[
            ("LINK_PLACEHOLDER", link.as_str()),
            ("LINK_NAME", name.as_str()),
            ("QUALITY_PLACEHOLDER", quality.as_str()),
            ("LOSSLESS_PLACEHOLDER", yes_no(entry.lossless)),
            ("FILESIZE_SAVED_PLACEHOLDER", saved.as_str()),
            ("TIME_PLACEHOLDER", time.as_str()),
        ],
    );
    if !card.ends_with('\n') {
        card.push('\n');
    }
    card
}

// ═══════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn generated_at() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encode one relative path segment for an `href`/`src`.
pub fn encode_href(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
