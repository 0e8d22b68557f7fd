use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use console::style;
use img_webp::{
    convert_folder, write_gallery_index, BatchOutcome, ConversionJob, ConvertOptions,
    CwebpEncoder, PreviewServer, Templates, WebpError,
};
use serde_json::json;
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::print_summary_report;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

#[derive(Parser)]
#[command(name = "img-webp")]
#[command(version, about = "Batch WebP converter with HTML comparison gallery", long_about = None)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every supported image in FOLDER to WebP
    Convert(ConvertArgs),

    /// Regenerate the gallery index page of FOLDER
    Index {
        #[arg(value_name = "FOLDER")]
        folder: PathBuf,

        #[arg(long, value_name = "DIR")]
        templates: Option<PathBuf>,
    },

    /// Serve FOLDER on a local port until Ctrl-C
    Serve {
        #[arg(value_name = "FOLDER")]
        folder: PathBuf,
    },

    /// Convert, then serve the gallery
    #[command(name = "run")]
    Run(ConvertArgs),
}

#[derive(Args, Clone)]
struct ConvertArgs {
    #[arg(value_name = "FOLDER")]
    folder: PathBuf,

    #[arg(short, long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: u8,

    #[arg(long)]
    lossless: bool,

    /// Encoder binary name or path
    #[arg(long, default_value = CwebpEncoder::DEFAULT_BINARY)]
    encoder: PathBuf,

    /// Directory with template overrides
    #[arg(long, value_name = "DIR")]
    templates: Option<PathBuf>,

    /// Parallel encodes (default: CPU count)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Print a JSON payload instead of the human summary
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let _ = init_logging("img_webp", LogConfig::new().with_level(level));

    let json_output = match &cli.command {
        Commands::Convert(args) | Commands::Run(args) => args.json,
        _ => false,
    };

    if let Err(e) = run(cli) {
        tracing::error!(error = %format!("{:#}", e), "Command failed");
        let webp_error = e.downcast_ref::<WebpError>();
        if json_output {
            println!(
                "{}",
                json!({
                    "success": false,
                    "kind": webp_error.map(|w| w.kind().to_string()),
                    "message": format!("{:#}", e),
                })
            );
        }
        match webp_error {
            Some(w) => eprintln!("{}", style(w.user_message()).red()),
            None => eprintln!("{} {:#}", style("❌").red(), e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Convert(args) => {
            convert(&args)?;
        }

        Commands::Index { folder, templates } => {
            let templates = Templates::load(templates.as_deref())?;
            let path = write_gallery_index(&folder, &templates)?;
            println!("{} Index written: {}", style("✅").green(), path.display());
        }

        Commands::Serve { folder } => serve(&folder)?,

        Commands::Run(args) => {
            convert(&args)?;
            serve(&args.folder)?;
        }
    }

    Ok(())
}

fn convert(args: &ConvertArgs) -> anyhow::Result<BatchOutcome> {
    let job = ConversionJob::new(&args.folder, args.quality, args.lossless)?;
    let encoder = CwebpEncoder::locate(&args.encoder)?;

    let mut options = ConvertOptions {
        templates_dir: args.templates.clone(),
        quiet: args.json,
        ..ConvertOptions::default()
    };
    if let Some(jobs) = args.jobs {
        options.jobs = jobs;
    }

    if !args.json {
        eprintln!(
            "🖼️  {} → {} (quality {}{}, {} jobs)",
            args.folder.display(),
            job.output_dir_name(),
            job.quality(),
            if job.lossless() { ", lossless" } else { "" },
            options.jobs
        );
    }

    let outcome = convert_folder(&job, &encoder, &options)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "success": true,
                "converted": outcome.converted(),
                "message": outcome.message(),
                "outcome": outcome,
            }))?
        );
    } else {
        print_summary_report(
            outcome.summary.total_images,
            Duration::from_secs_f64(outcome.summary.elapsed_secs),
            outcome.summary.total_original.bytes(),
            outcome.summary.total_converted.bytes(),
            "WebP",
        );
        println!("{} {}", style("✅").green(), style(outcome.message()).bold());
        println!("   Report: {}", outcome.report_path.display());
        println!("   Index:  {}", outcome.index_path.display());
    }

    Ok(outcome)
}

fn serve(folder: &Path) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(async {
        let mut server = PreviewServer::new();
        let url = server.start(folder).await?;
        println!("🌐 Preview: {}", style(&url).cyan().underlined());
        println!("   Press Ctrl-C to stop");

        let signal = tokio::signal::ctrl_c().await;
        server.stop().await;
        signal.context("Failed to listen for Ctrl-C")
    })
}
