mod analyzer;
mod batch;
mod gemini;
mod record;
mod response;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::bail;
use clap::{Parser, Subcommand};

use crate::gemini::{GeminiClient, VisionModel};

const DESCRIBE_PROMPT: &str = "What is in this image? Describe it in detail.";

#[derive(Parser)]
#[command(
    name = "slide_cataloguer",
    about = "Slide image cataloguer via the Gemini vision API"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every slide image in a directory and write a catalogue report
    Batch {
        /// Directory containing the slide images
        #[arg(short, long, default_value = "images/slides")]
        dir: PathBuf,
        /// Process only the first image and write test_results.json
        #[arg(long)]
        test: bool,
    },
    /// Describe a single image with a free-form prompt
    Analyze {
        /// Path to the image file
        image: PathBuf,
        /// Custom prompt (default asks for a detailed description)
        prompt: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Batch { dir, test } => run_batch_command(&dir, test).await,
        Commands::Analyze { image, prompt } => run_analyze_command(&image, prompt).await,
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run_batch_command(dir: &Path, test: bool) -> anyhow::Result<()> {
    let mut files = batch::list_image_files(dir)?;
    println!("Found {} image(s) in {}", files.len(), dir.display());
    if files.is_empty() {
        bail!("No image files found in {}", dir.display());
    }
    if test {
        files.truncate(1);
        println!("Test mode: processing only the first image");
    }

    let api_key = gemini::load_api_key()?;
    let client = GeminiClient::new(api_key);
    println!("Gemini client initialized");
    println!(
        "Rate limit: 5 images per minute ({}s between requests)\n",
        batch::RATE_LIMIT_DELAY.as_secs()
    );

    let report = batch::run_batch(
        &client,
        &files,
        batch::CATALOGUE_PROMPT,
        batch::RATE_LIMIT_DELAY,
    )
    .await;

    let output = if test {
        "test_results.json"
    } else {
        "batch_results.json"
    };
    batch::save_report(&report, Path::new(output))?;
    println!("\nResults saved to: {output}");

    let (ok, errors) = report.counts();
    println!(
        "Done: {} processed ({} ok, {} errors).",
        report.images.len(),
        ok,
        errors
    );
    Ok(())
}

async fn run_analyze_command(image: &Path, prompt: Option<String>) -> anyhow::Result<()> {
    println!("Analyzing image: {}", image.display());
    let encoded = analyzer::load_image(image)?;

    let api_key = gemini::load_api_key()?;
    let client = GeminiClient::new(api_key);
    let prompt = prompt.unwrap_or_else(|| DESCRIBE_PROMPT.to_string());

    println!("Sending request to Gemini...");
    let reply = client.describe_image(&prompt, &encoded).await?;

    println!("\nGemini's response:");
    println!("{}", "=".repeat(50));
    println!("{reply}");
    println!("{}", "=".repeat(50));
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
