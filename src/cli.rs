//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use bookfinder_core::health::DEFAULT_PORT;
use bookfinder_core::presentation::Category;
use clap::{Parser, Subcommand};

/// Search shadow-library mirrors and download what you find.
///
/// Bookfinder searches the aggregator, resolves the chosen result's mirror
/// page to a direct link, and downloads it under a size cap.
#[derive(Parser, Debug)]
#[command(name = "bookfinder")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/bookfinder/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Largest file to download, in MiB (1-2048)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..=2048))]
    pub size_cap_mb: Option<u64>,

    /// Skip the HEAD size probe before downloading
    #[arg(long, global = true)]
    pub no_head: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search and print one page of results
    #[command(alias = "s")]
    Search {
        /// Title, author, ISBN or DOI
        query: String,

        /// libgen, fiction, scimag or magz
        #[arg(short, long, default_value_t = Category::NonFiction)]
        category: Category,

        /// Result page to show (1-based)
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        page: u64,

        /// Print the whole result set as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search, then download the chosen result
    #[command(alias = "f")]
    Fetch {
        /// Title, author, ISBN or DOI
        query: String,

        /// Result number as shown by `search` (1-based)
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
        index: u64,

        /// libgen, fiction or scimag
        #[arg(short, long, default_value_t = Category::NonFiction)]
        category: Category,

        /// Directory to write the file into
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Run the liveness endpoint
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Show usage, search tips and the copyright notice
    Guide,
}
