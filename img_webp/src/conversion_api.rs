//! Conversion API Module
//!
//! Batch orchestration: scan a folder, encode every eligible image in
//! parallel, then record the summary and regenerate the reports.

use crate::conversion_log::ConversionLog;
use crate::encoder::Encoder;
use crate::gallery;
use crate::templates::Templates;
use crate::{Result, WebpError};
use rayon::prelude::*;
use serde::Serialize;
use shared_utils::common_utils::{file_name_string, file_stem_string};
use shared_utils::{collect_files_sorted, create_progress_bar, FileSize, WEBP_SOURCE_EXTENSIONS};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Name prefix shared by every batch output directory.
pub const OUTPUT_DIR_PREFIX: &str = "conversion_q";
pub const LOSSLESS_SUFFIX: &str = "_lossless";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionJob {
    source: PathBuf,
    quality: u8,
    lossless: bool,
}

impl ConversionJob {
    pub fn new(source: impl Into<PathBuf>, quality: u8, lossless: bool) -> Result<Self> {
        if quality > 100 {
            return Err(WebpError::InvalidQuality(quality));
        }
        Ok(Self {
            source: source.into(),
            quality,
            lossless,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn lossless(&self) -> bool {
        self.lossless
    }

    /// `conversion_q<quality>[_lossless]`
    pub fn output_dir_name(&self) -> String {
        format!(
            "{}{}{}",
            OUTPUT_DIR_PREFIX,
            self.quality,
            if self.lossless { LOSSLESS_SUFFIX } else { "" }
        )
    }

    pub fn output_dir(&self) -> PathBuf {
        self.source.join(self.output_dir_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub original_name: String,
    pub converted_name: String,
    pub original_size: FileSize,
    pub converted_size: FileSize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_images: usize,
    pub total_original: FileSize,
    pub total_converted: FileSize,
    /// `(1 - converted/original) * 100`, `0.0` for an empty batch.
    pub percent_saved: f64,
    pub elapsed_secs: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[ConversionResult], elapsed: Duration) -> Self {
        let total_original: FileSize = results.iter().map(|r| r.original_size).sum();
        let total_converted: FileSize = results.iter().map(|r| r.converted_size).sum();
        Self {
            total_images: results.len(),
            total_original,
            total_converted,
            percent_saved: total_converted.percent_saved(total_original),
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Overrides for the built-in page templates.
    pub templates_dir: Option<PathBuf>,
    /// Encoder worker count; `0` uses rayon's global pool.
    pub jobs: usize,
    /// Hide the progress bar.
    pub quiet: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            templates_dir: None,
            jobs: num_cpus::get(),
            quiet: false,
        }
    }
}

/// Everything a finished batch produced.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub output_dir: PathBuf,
    pub results: Vec<ConversionResult>,
    pub summary: BatchSummary,
    pub report_path: PathBuf,
    pub index_path: PathBuf,
}

impl BatchOutcome {
    pub fn converted(&self) -> usize {
        self.results.len()
    }

    pub fn message(&self) -> String {
        format!("Converted {} images", self.converted())
    }
}

/// Convert every supported image directly inside the job's source folder.
///
/// Per-file log lines are appended as encodes complete. The summary, the
/// folder report and the gallery index are written only after every encode
/// succeeded; on the first failure the error is returned once the encodes
/// already running have finished, and the log is left without a summary.
pub fn convert_folder(
    job: &ConversionJob,
    encoder: &dyn Encoder,
    options: &ConvertOptions,
) -> Result<BatchOutcome> {
    let start = Instant::now();

    let inputs = collect_files_sorted(job.source(), WEBP_SOURCE_EXTENSIONS)
        .map_err(|e| WebpError::folder_read(job.source(), e))?;
    let templates = Templates::load(options.templates_dir.as_deref())?;

    let output_dir = job.output_dir();
    fs::create_dir_all(&output_dir).map_err(|e| WebpError::file_system(&output_dir, e))?;
    let log = ConversionLog::create(&output_dir)?;

    info!(
        source = %job.source().display(),
        output = %output_dir.display(),
        quality = job.quality(),
        lossless = job.lossless(),
        images = inputs.len(),
        "Starting WebP batch"
    );

    let results = match encode_all(job, encoder, &inputs, &output_dir, &log, options) {
        Ok(results) => results,
        Err(e) => {
            retract_reports(job, &output_dir, &templates);
            return Err(e);
        }
    };

    let summary = BatchSummary::from_results(&results, start.elapsed());
    log.append_summary(&summary)?;

    let report_path = gallery::write_folder_report(&output_dir, job, &results, &summary, &templates)?;
    let index_path = gallery::write_gallery_index(job.source(), &templates)?;

    info!(
        images = summary.total_images,
        percent_saved = summary.percent_saved,
        elapsed_secs = summary.elapsed_secs,
        "WebP batch complete"
    );

    Ok(BatchOutcome {
        output_dir,
        results,
        summary,
        report_path,
        index_path,
    })
}

/// A failed batch leaves its log without a summary, so pages rendered by an
/// earlier successful run of the same settings no longer match it. Drop the
/// folder report and rebuild the index, which then skips this directory.
fn retract_reports(job: &ConversionJob, output_dir: &Path, templates: &Templates) {
    let report = output_dir.join(gallery::REPORT_FILE_NAME);
    match fs::remove_file(&report) {
        Ok(()) => debug!(path = %report.display(), "Removed stale folder report"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %report.display(), error = %e, "Failed to remove stale folder report"),
    }

    let index = job.source().join(gallery::REPORT_FILE_NAME);
    if index.exists() {
        if let Err(e) = gallery::write_gallery_index(job.source(), templates) {
            warn!(error = %e, "Failed to refresh gallery index after failed batch");
        }
    }
}

fn encode_all(
    job: &ConversionJob,
    encoder: &dyn Encoder,
    inputs: &[PathBuf],
    output_dir: &Path,
    log: &ConversionLog,
    options: &ConvertOptions,
) -> Result<Vec<ConversionResult>> {
    if inputs.is_empty() {
        return Ok(Vec::new());
    }

    let pb = create_progress_bar(inputs.len() as u64, "WebP", options.quiet);
    let run = || {
        inputs
            .par_iter()
            .map(|input| {
                let result = encode_one(job, encoder, input, output_dir, log);
                if let Ok(r) = &result {
                    pb.set_message(r.converted_name.clone());
                }
                pb.inc(1);
                result
            })
            .collect::<Result<Vec<_>>>()
    };

    let results = if options.jobs == 0 {
        run()
    } else {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!(error = %e, jobs = options.jobs, "Failed to build encoder pool, using global pool");
                run()
            }
        }
    };

    pb.finish_and_clear();
    results
}

fn encode_one(
    job: &ConversionJob,
    encoder: &dyn Encoder,
    input: &Path,
    output_dir: &Path,
    log: &ConversionLog,
) -> Result<ConversionResult> {
    let original_name = file_name_string(input);
    let converted_name = format!("{}.webp", file_stem_string(input));
    let output = output_dir.join(&converted_name);

    let original_size = fs::metadata(input)
        .map_err(|e| WebpError::file_system(input, e))?
        .len();
    let converted_size = encoder.encode(input, job.quality(), job.lossless(), &output)?;

    let result = ConversionResult {
        original_name,
        converted_name,
        original_size: FileSize::new(original_size),
        converted_size: FileSize::new(converted_size),
    };
    log.append_entry(&result, job.quality(), job.lossless())?;

    debug!(
        file = %result.original_name,
        original = %result.original_size,
        converted = %result.converted_size,
        "Encoded"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion_log::{ConversionLogRecord, LOG_FILE_NAME};
    use crate::gallery::REPORT_FILE_NAME;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Writes `percent`% of the input's size.
    struct FakeEncoder {
        percent: u64,
        calls: AtomicUsize,
    }

    impl FakeEncoder {
        fn new(percent: u64) -> Self {
            Self {
                percent,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Encoder for FakeEncoder {
        fn encode(&self, input: &Path, _quality: u8, _lossless: bool, output: &Path) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let len = fs::metadata(input).unwrap().len() * self.percent / 100;
            fs::write(output, vec![0u8; len as usize]).unwrap();
            Ok(len)
        }
    }

    /// Fails on one file name, succeeds (50%) on everything else.
    struct FailingEncoder {
        fail_on: &'static str,
    }

    impl Encoder for FailingEncoder {
        fn encode(&self, input: &Path, q: u8, l: bool, output: &Path) -> Result<u64> {
            let name = file_name_string(input);
            if name == self.fail_on {
                return Err(WebpError::encode(name, "corrupt input"));
            }
            FakeEncoder::new(50).encode(input, q, l, output)
        }
    }

    fn write_kb(dir: &Path, name: &str, kb: usize) {
        fs::write(dir.join(name), vec![1u8; kb * 1024]).unwrap();
    }

    fn quiet() -> ConvertOptions {
        ConvertOptions {
            quiet: true,
            ..ConvertOptions::default()
        }
    }

    #[test]
    fn test_job_rejects_quality_over_100() {
        let err = ConversionJob::new("/tmp", 101, false).unwrap_err();
        assert!(matches!(err, WebpError::InvalidQuality(101)));
        assert!(ConversionJob::new("/tmp", 100, false).is_ok());
        assert!(ConversionJob::new("/tmp", 0, true).is_ok());
    }

    #[test]
    fn test_output_dir_name() {
        let job = ConversionJob::new("/photos", 80, false).unwrap();
        assert_eq!(job.output_dir_name(), "conversion_q80");
        assert_eq!(job.output_dir(), PathBuf::from("/photos/conversion_q80"));

        let job = ConversionJob::new("/photos", 100, true).unwrap();
        assert_eq!(job.output_dir_name(), "conversion_q100_lossless");
    }

    #[test]
    fn test_summary_of_empty_batch() {
        let summary = BatchSummary::from_results(&[], Duration::ZERO);
        assert_eq!(summary.total_images, 0);
        assert_eq!(summary.percent_saved, 0.0);
    }

    #[test]
    fn test_sixty_percent_example() {
        let temp = TempDir::new().unwrap();
        write_kb(temp.path(), "a.png", 100);
        write_kb(temp.path(), "b.jpg", 50);

        let job = ConversionJob::new(temp.path(), 80, false).unwrap();
        let outcome = convert_folder(&job, &FakeEncoder::new(40), &quiet()).unwrap();

        assert_eq!(outcome.message(), "Converted 2 images");
        assert!((outcome.summary.percent_saved - 60.0).abs() < 1e-9);

        let text = fs::read_to_string(outcome.output_dir.join(LOG_FILE_NAME)).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.contains(&"a.png -> a.webp: 100.00 KB -> 40.00 KB | Quality: 80 | Lossless: false"));
        assert!(lines.contains(&"b.jpg -> b.webp: 50.00 KB -> 20.00 KB | Quality: 80 | Lossless: false"));
        assert_eq!(lines[2], "Total filesize saved: 60.00%");
        assert!(lines[3].starts_with("Total time: "));

        let report = fs::read_to_string(&outcome.report_path).unwrap();
        assert_eq!(report.matches("<tr class=\"pair\">").count(), 2);
        assert!(outcome.output_dir.join("a.webp").exists());
        assert!(outcome.output_dir.join("b.webp").exists());
    }

    #[test]
    fn test_log_matches_summary_for_many_images() {
        let temp = TempDir::new().unwrap();
        for i in 0..20 {
            write_kb(temp.path(), &format!("img{:02}.png", i), i + 1);
        }

        let job = ConversionJob::new(temp.path(), 60, false).unwrap();
        let options = ConvertOptions {
            jobs: 4,
            ..quiet()
        };
        let outcome = convert_folder(&job, &FakeEncoder::new(30), &options).unwrap();

        let record = ConversionLogRecord::read(&outcome.output_dir.join(LOG_FILE_NAME)).unwrap();
        assert_eq!(record.entries.len(), 20);
        let summary = record.summary.unwrap();
        let expected = (1.0
            - outcome.summary.total_converted.bytes() as f64
                / outcome.summary.total_original.bytes() as f64)
            * 100.0;
        assert!((summary.percent_saved - expected).abs() < 0.01);
    }

    #[test]
    fn test_empty_folder_completes_with_zero() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), b"not an image").unwrap();

        let job = ConversionJob::new(temp.path(), 80, false).unwrap();
        let encoder = FakeEncoder::new(40);
        let outcome = convert_folder(&job, &encoder, &quiet()).unwrap();

        assert_eq!(outcome.converted(), 0);
        assert_eq!(outcome.summary.percent_saved, 0.0);
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 0);

        let record = ConversionLogRecord::read(&outcome.output_dir.join(LOG_FILE_NAME)).unwrap();
        assert!(record.entries.is_empty());
        assert_eq!(record.summary.map(|s| s.percent_saved), Some(0.0));
        assert!(outcome.report_path.exists());
        assert!(outcome.index_path.exists());
    }

    #[test]
    fn test_subfolders_are_ignored() {
        let temp = TempDir::new().unwrap();
        write_kb(temp.path(), "top.png", 1);
        fs::create_dir(temp.path().join("nested")).unwrap();
        write_kb(&temp.path().join("nested"), "deep.png", 1);

        let job = ConversionJob::new(temp.path(), 80, false).unwrap();
        let outcome = convert_folder(&job, &FakeEncoder::new(50), &quiet()).unwrap();

        let names: Vec<_> = outcome.results.iter().map(|r| r.original_name.as_str()).collect();
        assert_eq!(names, vec!["top.png"]);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let temp = TempDir::new().unwrap();
        write_kb(temp.path(), "a.png", 10);
        write_kb(temp.path(), "b.gif", 20);

        let job = ConversionJob::new(temp.path(), 75, true).unwrap();
        let first = convert_folder(&job, &FakeEncoder::new(50), &quiet()).unwrap();
        let second = convert_folder(&job, &FakeEncoder::new(50), &quiet()).unwrap();

        assert_eq!(first.output_dir, second.output_dir);
        assert_eq!(first.results, second.results);

        let record = ConversionLogRecord::read(&second.output_dir.join(LOG_FILE_NAME)).unwrap();
        assert_eq!(record.entries.len(), 2);
        assert_eq!(record.lossless(), Some(true));
    }

    #[test]
    fn test_two_settings_give_two_directories_and_cards() {
        let temp = TempDir::new().unwrap();
        write_kb(temp.path(), "a.png", 10);

        let lossy = ConversionJob::new(temp.path(), 80, false).unwrap();
        let lossless = ConversionJob::new(temp.path(), 100, true).unwrap();
        let a = convert_folder(&lossy, &FakeEncoder::new(40), &quiet()).unwrap();
        let b = convert_folder(&lossless, &FakeEncoder::new(90), &quiet()).unwrap();

        assert_ne!(a.output_dir, b.output_dir);
        assert!(a.output_dir.join("a.webp").exists());
        assert!(b.output_dir.join("a.webp").exists());

        let index = fs::read_to_string(temp.path().join(REPORT_FILE_NAME)).unwrap();
        assert_eq!(index.matches("class=\"card\"").count(), 2);
        assert!(index.contains("conversion_q80/index.html"));
        assert!(index.contains("conversion_q100_lossless/index.html"));
    }

    #[test]
    fn test_encode_failure_writes_no_summary() {
        let temp = TempDir::new().unwrap();
        write_kb(temp.path(), "a.png", 10);
        write_kb(temp.path(), "b.png", 10);
        write_kb(temp.path(), "c.png", 10);

        let job = ConversionJob::new(temp.path(), 80, false).unwrap();
        let err = convert_folder(&job, &FailingEncoder { fail_on: "b.png" }, &quiet()).unwrap_err();

        match err {
            WebpError::Encode { file, .. } => assert_eq!(file, "b.png"),
            other => panic!("unexpected error: {other:?}"),
        }

        let output_dir = job.output_dir();
        let record = ConversionLogRecord::read(&output_dir.join(LOG_FILE_NAME)).unwrap();
        assert!(!record.is_complete());
        assert!(!output_dir.join(REPORT_FILE_NAME).exists());
        assert!(!temp.path().join(REPORT_FILE_NAME).exists());
    }

    #[test]
    fn test_failed_rerun_retracts_previous_pages() {
        let temp = TempDir::new().unwrap();
        write_kb(temp.path(), "a.png", 100);
        write_kb(temp.path(), "b.jpg", 50);
        fs::create_dir(temp.path().join("conversion_q50")).unwrap();
        fs::write(
            temp.path().join("conversion_q50").join(LOG_FILE_NAME),
            "Total filesize saved: 10.00%\nTotal time: 1.00 seconds\n",
        )
        .unwrap();

        let job = ConversionJob::new(temp.path(), 80, false).unwrap();
        let first = convert_folder(&job, &FakeEncoder::new(40), &quiet()).unwrap();
        let index = fs::read_to_string(&first.index_path).unwrap();
        assert!(index.contains("conversion_q80/index.html"));

        convert_folder(&job, &FailingEncoder { fail_on: "b.jpg" }, &quiet()).unwrap_err();

        let record = ConversionLogRecord::read(&first.output_dir.join(LOG_FILE_NAME)).unwrap();
        assert!(!record.is_complete());
        assert!(!first.report_path.exists());

        let index = fs::read_to_string(&first.index_path).unwrap();
        assert!(!index.contains("conversion_q80"));
        assert!(!index.contains("60.00%"));
        assert!(index.contains("conversion_q50/index.html"));
    }

    #[test]
    fn test_default_jobs_is_cpu_count() {
        assert_eq!(ConvertOptions::default().jobs, num_cpus::get());
    }

    #[test]
    fn test_zero_jobs_uses_global_pool() {
        let temp = TempDir::new().unwrap();
        write_kb(temp.path(), "a.png", 4);
        write_kb(temp.path(), "b.png", 4);

        let job = ConversionJob::new(temp.path(), 80, false).unwrap();
        let options = ConvertOptions {
            jobs: 0,
            ..quiet()
        };
        let outcome = convert_folder(&job, &FakeEncoder::new(50), &options).unwrap();
        assert_eq!(outcome.converted(), 2);
    }

    #[test]
    fn test_missing_folder_is_folder_read_error() {
        let temp = TempDir::new().unwrap();
        let job = ConversionJob::new(temp.path().join("missing"), 80, false).unwrap();
        let err = convert_folder(&job, &FakeEncoder::new(40), &quiet()).unwrap_err();
        assert_eq!(err.kind(), shared_utils::ErrorKind::FolderReadError);
    }
}
