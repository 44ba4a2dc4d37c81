//! # Archive Harvest Library
//!
//! Crawls a newspaper archive for page-image links, downloads the images under
//! canonical `{YYYY-MM-DD}_{issue:03}_{page:02}.{ext}` names, audits the names and
//! samples complete issues into train/val/test splits.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use archive_harvest::{DatasetSplitter, Downloader, HttpFetcher, DownloadConfig, SplitConfig};
//! use rand::SeedableRng;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//!
//!     // Download every link found by an earlier crawl
//!     let mut downloader = Downloader::new(HttpFetcher::new()?, DownloadConfig::default())?;
//!     let summary = downloader.run(&mut rng).await?;
//!     println!("Downloaded {} images", summary.success);
//!
//!     // Sample three complete issues per year
//!     let splitter = DatasetSplitter::new(SplitConfig::default())?;
//!     splitter.run(&mut rng)?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod services;
pub mod types;

// Re-export main types and services for easier usage
pub use error::{HarvestError, Result};
pub use services::{
    Crawler, DatasetSplitter, Downloader, FetchedImage, FilenameNormalizer, FilenameValidator,
    HttpFetcher, HttpRenderer, ImageFetcher, LinkLogger, PageRenderer, RenderOutcome,
};
pub use types::{
    CheckReport, CrawlConfig, CrawlSummary, DownloadConfig, DownloadRecord, DownloadStatus,
    DownloadSummary, PageRecord, PageStatus, Split, SplitConfig, SplitSummary,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_names_pass_the_audit() {
        let normalizer = FilenameNormalizer::new().unwrap();
        let validator = FilenameValidator::new().unwrap();

        let links = [
            "https://h/u/%D0%9A%D0%9F/1946/1-5-1-1946/5-1-1946_1.jpg",
            "https://h/u/%D0%9A%D0%9F/1965/12-15-06-1965/15--06--1965--02.JPG",
            "https://h/u/%D0%9A%D0%9F/1991/399-31-12-1991/31%20-%2012%20-%201991%20-%204..png",
        ];
        for link in links {
            let name = normalizer.normalize(link).expect("link should match");
            assert!(
                validator.is_canonical(&name.filename()),
                "{} is not canonical",
                name.filename()
            );
        }
    }

    #[test]
    fn test_default_configs_share_paths() {
        let crawl = CrawlConfig::default();
        let download = DownloadConfig::default();
        let split = SplitConfig::default();

        assert_eq!(crawl.links_file, download.links_file);
        assert_eq!(download.log_file, split.log_file);
        assert_eq!(download.download_dir, split.raw_dir);
    }
}
