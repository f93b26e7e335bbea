use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use crate::analyzer;
use crate::gemini::VisionModel;
use crate::record::{self, CatalogueRecord};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Minimum interval between model calls: 5 requests per minute.
pub const RATE_LIMIT_DELAY: Duration = Duration::from_secs(12);

/// Museum catalogue-style prompt for structured extraction.
pub const CATALOGUE_PROMPT: &str = r#"Analyze this slide image and extract the following information in JSON format:

1. "EADUnitTitle": Extract all handwritten text, labels, or annotations visible on the slide mount or border. Include reference numbers, titles, or any written information. If none visible, use empty string.

2. "EADScope+Content": Provide a museum catalogue-style description of the photograph itself. Describe what is depicted in the image as you would for a museum or archive catalogue entry. Be detailed and professional. Focus on the subject matter, composition, and notable features of the photograph.

3. "EADUnitDate": Extract any dates mentioned on the slide (in handwriting or printed). This could be a year, full date, or date range. If no date is visible, use empty string.

Return ONLY valid JSON in this exact format:
{
  "EADUnitTitle": "text here",
  "EADScope+Content": "description here",
  "EADUnitDate": "date here"
}"#;

/// The complete artifact of one run: run metadata plus one catalogue record
/// per input file, in sorted filename order.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub timestamp: String,
    pub total_images: usize,
    pub prompt: String,
    pub images: Vec<CatalogueRecord>,
}

impl BatchReport {
    /// (ok, errors) counts by record status.
    pub fn counts(&self) -> (usize, usize) {
        let ok = self.images.iter().filter(|r| r.status == "success").count();
        (ok, self.images.len() - ok)
    }
}

/// List image files in `dir`, filtered by extension (case-insensitive) and
/// sorted lexicographically by filename so runs are reproducible.
pub fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Directory not found: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Could not read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    info!("Found {} image files in {}", files.len(), dir.display());
    Ok(files)
}

/// Pacing policy for the external rate quota: enforce a minimum interval
/// between successive calls. The first call goes through immediately and
/// there is no trailing wait after the last one.
pub struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Block until at least `interval` has elapsed since the previous call.
    pub async fn pace(&mut self) {
        if let Some(last) = self.last {
            let wait = self.interval.saturating_sub(last.elapsed());
            if !wait.is_zero() {
                println!(
                    "  Waiting {:.0}s before next image (rate limit: 5 images/min)...",
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

/// Process every file in order, strictly sequentially, pacing calls to the
/// rate quota. Per-item failures are absorbed into error-tagged records;
/// every input file yields exactly one record.
pub async fn run_batch<M: VisionModel>(
    model: &M,
    files: &[PathBuf],
    prompt: &str,
    pace_interval: Duration,
) -> BatchReport {
    let total = files.len();
    let mut report = BatchReport {
        timestamp: Local::now().to_rfc3339(),
        total_images: total,
        prompt: prompt.to_string(),
        images: Vec::with_capacity(total),
    };
    let mut pacer = Pacer::new(pace_interval);

    for (idx, path) in files.iter().enumerate() {
        pacer.pace().await;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        println!("[{}/{}] Analyzing: {}", idx + 1, total, name);

        let extraction = analyzer::analyze_image(model, path, prompt).await;

        if let Some(error) = &extraction.error {
            println!("  Error: {error}");
            warn!("analysis failed for {}: {}", name, error);
        } else {
            println!("  Analysis complete");
            if let Some(parse_error) = &extraction.parse_error {
                println!("  Warning: could not parse JSON response: {parse_error}");
            }
            if !extraction.title.is_empty() {
                println!("    Title: {}", truncate(&extraction.title, 60));
            }
            if !extraction.date.is_empty() {
                println!("    Date: {}", extraction.date);
            }
        }

        report.images.push(record::build_record(path, &extraction));
    }

    let (ok, errors) = report.counts();
    info!("Processed {} images ({} ok, {} errors)", total, ok, errors);
    report
}

/// Write the report as indented UTF-8 JSON. serde_json leaves non-ASCII
/// characters unescaped, so catalogue text survives verbatim.
pub fn save_report(report: &BatchReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

// ── Tests ──
