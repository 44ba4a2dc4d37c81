use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Crawl a newspaper archive, download page images and build dataset splits")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to a timestamped file in this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Root of the data directory
    #[arg(short, long, global = true, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Write the stage summary as JSON to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub summary: Option<PathBuf>,

    /// Seed for random sampling (random when omitted)
    #[arg(long, global = true)]
    pub seed: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl archive pages and log image links
    Links(LinksArgs),

    /// Download images listed in the link log
    Download(DownloadArgs),

    /// Report files whose names are not canonical
    Check(CheckArgs),

    /// Copy sampled complete issues into train/val/test
    Split(SplitArgs),

    /// Crawl, download and check in one run
    Pipeline(PipelineArgs),
}

#[derive(Args, Clone)]
pub struct LinksArgs {
    /// Archive listing base URL
    #[arg(long, default_value = archive_harvest::types::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// First page id to crawl
    #[arg(long, default_value = "1")]
    pub first_page: u32,

    /// Last page id to crawl
    #[arg(long, default_value = "12609")]
    pub last_page: u32,

    /// Seconds to wait for an image to appear
    #[arg(long, default_value = "10")]
    pub timeout: u64,

    /// Milliseconds between re-fetches of a page without an image
    #[arg(long, default_value = "500")]
    pub poll_ms: u64,

    /// Seconds to sleep before each page request
    #[arg(long, default_value = "1")]
    pub sleep: f64,

    /// Log progress every N pages
    #[arg(long, default_value = "100")]
    pub progress_every: u32,

    /// Link log file name inside <data-dir>/parser
    #[arg(long, default_value = "image_links.txt")]
    pub links_file: String,
}

#[derive(Args, Clone)]
pub struct DownloadArgs {
    /// Link log file name inside <data-dir>/parser
    #[arg(long, default_value = "image_links.txt")]
    pub links_file: String,

    /// Download directory name inside <data-dir>
    #[arg(long, default_value = "raw_data")]
    pub download_dir: String,

    /// Download log CSV name inside <data-dir>/parser
    #[arg(long, default_value = "download_log.csv")]
    pub log_file: String,

    /// Seconds to sleep after each processed line
    #[arg(long, default_value = "2")]
    pub sleep: f64,

    /// Only process this many randomly chosen lines (0 = all)
    #[arg(long, default_value = "0")]
    pub sample: usize,

    /// Record already downloaded files as successful without fetching them again
    #[arg(long)]
    pub skip_existing: bool,

    /// Log progress every N lines
    #[arg(long, default_value = "500")]
    pub progress_every: usize,
}

#[derive(Args, Clone)]
pub struct CheckArgs {
    /// Directory name inside <data-dir> to audit
    #[arg(default_value = "raw_data")]
    pub directory: String,
}

#[derive(Args, Clone)]
pub struct SplitArgs {
    /// Download log CSV name inside <data-dir>/parser
    #[arg(long, default_value = "download_log.csv")]
    pub log_file: String,

    /// Source image directory name inside <data-dir>
    #[arg(long, default_value = "raw_data")]
    pub raw_dir: String,

    /// First year to sample
    #[arg(long, default_value = "1946")]
    pub start_year: i32,

    /// Last year to sample
    #[arg(long, default_value = "1991")]
    pub end_year: i32,
}

#[derive(Args, Clone)]
pub struct PipelineArgs {
    #[command(flatten)]
    pub links: LinksArgs,

    /// Seconds to sleep after each download
    #[arg(long, default_value = "2")]
    pub download_sleep: f64,

    /// Only download this many randomly chosen lines (0 = all)
    #[arg(long, default_value = "0")]
    pub sample: usize,

    /// Record already downloaded files as successful without fetching them again
    #[arg(long)]
    pub skip_existing: bool,
}
