//! Report Module
//!
//! Terminal summary for finished batch operations.

use crate::progress::format_duration;
use crate::types::FileSize;
use std::time::Duration;

pub fn print_summary_report(
    total: usize,
    duration: Duration,
    input_bytes: u64,
    output_bytes: u64,
    operation_name: &str,
) {
    let reduction = FileSize::new(output_bytes).percent_saved(FileSize::new(input_bytes));

    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║  📊 {:<45}║", format!("{} Summary Report", operation_name));
    println!("╠══════════════════════════════════════════════════╣");
    println!("║  📁 Files Converted:    {:>15}          ║", total);
    println!(
        "║  💾 Input Size:         {:>15}          ║",
        FileSize::new(input_bytes).display()
    );
    println!(
        "║  💾 Output Size:        {:>15}          ║",
        FileSize::new(output_bytes).display()
    );
    println!("║  📉 Size Reduction:     {:>14.2}%          ║", reduction);
    println!(
        "║  ⏱️  Total Time:         {:>15}          ║",
        format_duration(duration)
    );
    if total > 0 {
        let avg_time = duration.as_secs_f64() / total as f64;
        println!("║  ⏱️  Avg Time/File:      {:>14.2}s          ║", avg_time);
    }
    println!("╚══════════════════════════════════════════════════╝");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_summary_report_no_panic() {
        print_summary_report(2, Duration::from_secs(10), 150 * 1024, 60 * 1024, "WebP");
    }

    #[test]
    fn test_print_summary_report_zero_input() {
        print_summary_report(0, Duration::from_secs(0), 0, 0, "WebP");
    }
}
