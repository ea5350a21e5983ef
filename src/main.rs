//! CLI entry point for bookfinder.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use bookfinder_core::cache::MessageId;
use bookfinder_core::download::resolve_unique_path;
use bookfinder_core::presentation::{
    Category, HELP_TEXT, PageWindow, SelectionError, SelectionView, UserId, item_summary,
    magazine_link, reply_for,
};
use bookfinder_core::search::SearchCategory;
use bookfinder_core::transport::HttpTransport;
use bookfinder_core::{Pipeline, PipelineConfig, health};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

mod app_config;
mod cli;

use app_config::{FileConfig, load_config};
use cli::{Args, Command};

const MIB: u64 = 1024 * 1024;
const CLI_MESSAGE_ID: MessageId = MessageId(1);
const CLI_USER: UserId = UserId(0);

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let loaded = load_config(args.config.as_deref())?;
    let file_config = loaded.file_config();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_config.verbosity.map_or("info", |v| v.filter()),
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, config_path = ?loaded.path, "CLI arguments parsed");

    match args.command {
        Command::Guide => {
            print!("{HELP_TEXT}");
            Ok(())
        }
        Command::Serve { port } => {
            info!(port, "starting liveness endpoint");
            health::serve(port)
                .await
                .with_context(|| format!("Liveness endpoint on port {port} failed"))
        }
        Command::Search {
            ref query,
            category,
            page,
            json,
        } => {
            let config = pipeline_config(&args, &file_config);
            run_search(config, query, category, page, json).await
        }
        Command::Fetch {
            ref query,
            index,
            category,
            ref output_dir,
        } => {
            let config = pipeline_config(&args, &file_config);
            let output_dir = output_dir
                .clone()
                .or_else(|| file_config.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            run_fetch(config, query, category, index, &output_dir, args.quiet).await
        }
    }
}

/// Config file first, then CLI flags on top.
fn pipeline_config(args: &Args, file_config: &FileConfig) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    file_config.apply(&mut config);
    if let Some(size_cap_mb) = args.size_cap_mb {
        config.size_cap_bytes = size_cap_mb * MIB;
    }
    if args.no_head {
        config.head_probe = false;
    }
    config
}

fn build_pipeline(config: PipelineConfig) -> Result<Pipeline> {
    let transport = HttpTransport::new(config.connect_timeout)
        .context("Failed to build HTTP client")?;
    Pipeline::new(config, Arc::new(transport)).context("Invalid configuration")
}

async fn run_search(
    config: PipelineConfig,
    query: &str,
    category: Category,
    page: u64,
    json: bool,
) -> Result<()> {
    let Some(search_category) = category.search_category() else {
        println!("Magazine results for '{query}': {}", magazine_link(query));
        return Ok(());
    };

    let per_page = config.results_per_page;
    let pipeline = build_pipeline(config)?;
    let results = pipeline.search(query, search_category).await?.into_inner();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("No results found for '{query}' in {}.", category.label());
        return Ok(());
    }

    let page_index = usize::try_from(page.saturating_sub(1)).unwrap_or(usize::MAX);
    let window = PageWindow::new(results.len(), per_page, page_index);
    println!("Search results for '{query}' ({})", category.label());
    println!("{}", window.describe());
    for (display_index, item) in window
        .display_indices()
        .zip(window.slice(results.items()))
    {
        println!();
        println!("{}", item_summary(display_index, item));
    }
    if let Some(footer) = window.footer() {
        println!();
        println!("{footer}");
    }
    Ok(())
}

async fn run_fetch(
    config: PipelineConfig,
    query: &str,
    category: Category,
    index: u64,
    output_dir: &Path,
    quiet: bool,
) -> Result<()> {
    let search_category = match SearchCategory::try_from(category) {
        Ok(search_category) => search_category,
        Err(err) => bail!("{err}; browse {}", magazine_link(query)),
    };

    let per_page = config.results_per_page;
    let selection_window = config.selection_window;
    let pipeline = build_pipeline(config)?;
    let pending = pipeline.search(query, search_category).await?;
    if pending.results().is_empty() {
        bail!("No results found for '{query}' in {}", category.label());
    }

    let total = pending.results().len();
    let view = SelectionView::new(CLI_USER, CLI_MESSAGE_ID, total, per_page);
    pending.promote(CLI_MESSAGE_ID, pipeline.cache());
    if view.expired(Instant::now(), selection_window) {
        view.expire(pipeline.cache());
        return Err(SelectionError::Expired.into());
    }
    let display_index = usize::try_from(index).unwrap_or(usize::MAX);
    let selection = view.select(CLI_USER, display_index, pipeline.cache())?;
    let item = selection.item();
    info!(title = %item.title(), "fetching selected result");

    let spinner = (!quiet && io::stderr().is_terminal()).then(|| {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(format!("Fetching '{}'...", item.title()));
        spinner
    });
    let result = pipeline.fetch(item, selection.source_url()).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    view.expire(pipeline.cache());

    let reply = reply_for(&result, item, pipeline.article_link(item).as_ref());
    let Some(attachment) = &reply.attachment else {
        bail!("{}", reply.render());
    };

    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create '{}'", output_dir.display()))?;
    let path = resolve_unique_path(output_dir, &attachment.filename);
    tokio::fs::write(&path, &attachment.bytes)
        .await
        .with_context(|| format!("Failed to write '{}'", path.display()))?;
    println!("{}", reply.render());
    println!("Saved to {}", path.display());
    Ok(())
}
