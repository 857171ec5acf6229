//! PDF Layout Translator CLI - translate a PDF in place, keeping its layout.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_layout_core::{
    AppConfig, DocumentEngine, Lang, LayoutTranslator, PageProgress, PdfDocument,
    TranslationCache,
};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pdf-layout-translate")]
#[command(
    author,
    version,
    about = "Translate PDF documents without losing their layout",
    long_about = None
)]
struct Args {
    /// Input PDF file
    #[arg(required_unless_present = "clear_cache")]
    input: Option<PathBuf>,

    /// Output PDF file (default: input-<target>.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language code (default from config: en)
    #[arg(short = 's', long)]
    source: Option<String>,

    /// Target language code (default from config: tr)
    #[arg(short = 't', long)]
    target: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENROUTER_BASE_URL")]
    api_base: Option<String>,

    /// API key for the provider
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model used for translation
    #[arg(long, env = "OPENROUTER_TRANSLATE_MODEL")]
    translate_model: Option<String>,

    /// Vision model used for OCR of scanned pages
    #[arg(long, env = "OPENROUTER_OCR_MODEL")]
    ocr_model: Option<String>,

    /// Directory holding the configured font files
    #[arg(long)]
    font_dir: Option<PathBuf>,

    /// Remote calls in flight per page
    #[arg(long)]
    concurrency: Option<usize>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Translate only specific pages (e.g., "1-5" or "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Disable caching
    #[arg(long)]
    no_cache: bool,

    /// Clear the disk translation cache (exits if no input is given)
    #[arg(long)]
    clear_cache: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    summary_json: bool,
}

fn parse_page_range(pages: &str, total: usize) -> Result<Vec<usize>> {
    let mut result = Vec::new();

    for part in pages.split(',') {
        let part = part.trim();
        if let Some((start, end)) = part.split_once('-') {
            let start: usize = start.trim().parse().context("Invalid page range start")?;
            let end: usize = end.trim().parse().context("Invalid page range end")?;
            for p in start..=end {
                if p > 0 && p <= total {
                    result.push(p - 1); // Convert to 0-indexed
                }
            }
        } else {
            let page: usize = part.parse().context("Invalid page number")?;
            if page > 0 && page <= total {
                result.push(page - 1); // Convert to 0-indexed
            }
        }
    }

    result.sort_unstable();
    result.dedup();
    Ok(result)
}

/// Fold command-line overrides into the loaded configuration.
fn apply_args(config: &mut AppConfig, args: &Args) {
    if let Some(ref source) = args.source {
        config.source_lang = Lang::new(source);
    }
    if let Some(ref target) = args.target {
        config.target_lang = Lang::new(target);
    }

    let provider = &mut config.provider;
    if let Some(ref api_base) = args.api_base {
        provider.api_base.clone_from(api_base);
    }
    if args.api_key.is_some() {
        provider.api_key.clone_from(&args.api_key);
    }
    if let Some(ref model) = args.translate_model {
        provider.translate_model.clone_from(model);
    }
    if let Some(ref model) = args.ocr_model {
        provider.ocr_model.clone_from(model);
    }

    if args.font_dir.is_some() {
        config.fonts.dir.clone_from(&args.font_dir);
    }
    if let Some(concurrency) = args.concurrency {
        config.pipeline.concurrency = concurrency;
    }

    if args.no_cache {
        config.cache.memory_enabled = false;
        config.cache.disk_enabled = false;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    apply_args(&mut config, &args);

    if args.clear_cache {
        let cleared = TranslationCache::clear_disk(&config.cache)
            .context("Failed to clear translation cache")?;
        #[allow(clippy::print_stdout)]
        {
            println!("Cleared {cleared} cached translations");
        }
    }

    let Some(input) = args.input.clone() else {
        return Ok(());
    };

    // Load input PDF
    info!("Loading PDF: {}", input.display());
    let mut doc = PdfDocument::from_file(&input)
        .context(format!("Failed to load PDF: {}", input.display()))?;

    let total_pages = doc.page_count();
    info!("Document has {} pages", total_pages);

    // Determine which pages to translate
    let pages = if let Some(ref page_spec) = args.pages {
        parse_page_range(page_spec, total_pages)?
    } else {
        (0..total_pages).collect()
    };

    if pages.is_empty() {
        anyhow::bail!("No valid pages to translate");
    }

    info!(
        "Translating {} pages from {} to {}",
        pages.len(),
        config.source_lang,
        config.target_lang
    );

    let translator =
        LayoutTranslator::new(config.clone()).context("Failed to initialize translator")?;

    // Stop issuing remote calls on Ctrl-C; nothing is written afterwards
    let cancel = translator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling translation");
            cancel.cancel();
        }
    });

    // Setup progress bar
    #[allow(clippy::cast_possible_truncation)]
    let pb = ProgressBar::new(pages.len() as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<PageProgress>();
    let bar = pb.clone();
    let progress = async move {
        while let Some(event) = rx.recv().await {
            bar.set_message(format!("page {} ({})", event.page_number, event.mode));
            bar.inc(1);
        }
    };
    let work = async {
        let result = translator.translate_pages(&mut doc, &pages, Some(&tx)).await;
        // Closing the channel ends the progress loop
        drop(tx);
        result
    };

    let (result, ()) = tokio::join!(work, progress);
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            pb.abandon();
            let code = e.code();
            return Err(anyhow::Error::new(e)
                .context(format!("Translation failed ({})", code.as_str())));
        }
    };

    pb.finish_with_message("Translation complete");

    // Determine output path
    let output_path = args.output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        input.with_file_name(format!("{}-{}.pdf", stem, config.target_lang))
    });

    // Save output
    doc.save_to(&output_path)
        .context(format!("Failed to write output: {}", output_path.display()))?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        if args.summary_json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
            );
        }
        println!("Translated PDF saved to: {}", output_path.display());
    }

    Ok(())
}
