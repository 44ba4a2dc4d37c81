use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Marker written in place of an image source when a page yields nothing.
pub const FAILED_SRC: &str = "failed";

pub const DEFAULT_BASE_URL: &str = "https://kaliningradka.kantiana.ru/archive/newspapers";

/// Outcome of crawling one archive page, stored as a numeric code in the link log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Ok,
    NoImage,
    Timeout,
}

impl PageStatus {
    pub fn code(self) -> u8 {
        match self {
            PageStatus::Ok => 1,
            PageStatus::NoImage => 2,
            PageStatus::Timeout => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(PageStatus::Ok),
            2 => Some(PageStatus::NoImage),
            3 => Some(PageStatus::Timeout),
            _ => None,
        }
    }
}

/// One line of the link log: `page_number,status_code,url,image_src`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub page_number: u32,
    pub status: PageStatus,
    pub url: String,
    pub image_src: String,
}

impl PageRecord {
    pub fn found(page_number: u32, url: &str, image_src: &str) -> Self {
        Self {
            page_number,
            status: PageStatus::Ok,
            url: url.to_string(),
            image_src: image_src.to_string(),
        }
    }

    pub fn failed(page_number: u32, status: PageStatus, url: &str) -> Self {
        Self {
            page_number,
            status,
            url: url.to_string(),
            image_src: FAILED_SRC.to_string(),
        }
    }
}

impl fmt::Display for PageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.page_number,
            self.status.code(),
            self.url,
            self.image_src
        )
    }
}

impl FromStr for PageRecord {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut head = line.splitn(3, ',');
        let page_number = head
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(|| "missing page number".to_string())?;
        let status = head
            .next()
            .and_then(|s| s.parse::<u8>().ok())
            .and_then(PageStatus::from_code)
            .ok_or_else(|| "missing or unknown status code".to_string())?;
        let (url, image_src) = head
            .next()
            .and_then(|rest| rest.rsplit_once(','))
            .ok_or_else(|| "missing url or image source".to_string())?;

        Ok(Self {
            page_number,
            status,
            url: url.to_string(),
            image_src: image_src.to_string(),
        })
    }
}

/// Outcome of one download attempt, serialized as 1/2/3 in the download log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DownloadStatus {
    Success,
    HttpFail,
    PatternFail,
}

impl From<DownloadStatus> for u8 {
    fn from(status: DownloadStatus) -> Self {
        match status {
            DownloadStatus::Success => 1,
            DownloadStatus::HttpFail => 2,
            DownloadStatus::PatternFail => 3,
        }
    }
}

impl TryFrom<u8> for DownloadStatus {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            1 => Ok(DownloadStatus::Success),
            2 => Ok(DownloadStatus::HttpFail),
            3 => Ok(DownloadStatus::PatternFail),
            other => Err(format!("unknown download status {}", other)),
        }
    }
}

/// One row of the download log CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub line_number: usize,
    pub date: Option<String>,
    pub number: Option<String>,
    pub page: Option<String>,
    pub status: DownloadStatus,
    pub link: String,
    pub filename: Option<String>,
    pub extension: Option<String>,
}

impl DownloadRecord {
    /// Year taken from the `YYYY` prefix of the date column.
    pub fn year(&self) -> Option<i32> {
        self.date.as_deref()?.get(..4)?.parse().ok()
    }

    pub fn page_number(&self) -> Option<u32> {
        self.page.as_deref()?.parse().ok()
    }

    /// Issue key: the `YYYY-MM-DD` prefix of the filename.
    pub fn issue(&self) -> Option<&str> {
        self.filename.as_deref()?.get(..10)
    }
}

/// A dataset partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    /// Positional order used when handing out sampled issues.
    pub const ALL: [Split; 3] = [Split::Train, Split::Val, Split::Test];

    pub fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: String,
    pub first_page: u32,
    pub last_page: u32,
    pub render_timeout: Duration,
    pub delay: Duration,
    pub progress_every: u32,
    pub links_file: PathBuf,
}

impl CrawlConfig {
    pub fn page_url(&self, page_number: u32) -> String {
        format!("{}/{}/", self.base_url.trim_end_matches('/'), page_number)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)?;
        if self.first_page == 0 || self.first_page > self.last_page {
            return Err(HarvestError::InvalidConfig {
                reason: format!(
                    "page range {}..={} is empty or starts at 0",
                    self.first_page, self.last_page
                ),
            });
        }
        Ok(())
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            first_page: 1,
            // Highest page id seen on the archive (2023-06-18).
            last_page: 12609,
            render_timeout: Duration::from_secs(10),
            delay: Duration::from_secs(1),
            progress_every: 100,
            links_file: PathBuf::from("data/parser/image_links.txt"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub links_file: PathBuf,
    pub download_dir: PathBuf,
    pub log_file: PathBuf,
    pub delay: Duration,
    /// Process only this many randomly chosen lines; 0 processes everything.
    pub sample: usize,
    pub skip_existing: bool,
    pub progress_every: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            links_file: PathBuf::from("data/parser/image_links.txt"),
            download_dir: PathBuf::from("data/raw_data"),
            log_file: PathBuf::from("data/parser/download_log.csv"),
            delay: Duration::from_secs(2),
            sample: 0,
            skip_existing: false,
            progress_every: 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub log_file: PathBuf,
    pub raw_dir: PathBuf,
    pub dataset_dir: PathBuf,
    pub start_year: i32,
    pub end_year: i32,
}

impl SplitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(HarvestError::InvalidConfig {
                reason: format!(
                    "start year {} is after end year {}",
                    self.start_year, self.end_year
                ),
            });
        }
        Ok(())
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("data/parser/download_log.csv"),
            raw_dir: PathBuf::from("data/raw_data"),
            dataset_dir: PathBuf::from("data"),
            start_year: 1946,
            end_year: 1991,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub success_pages: usize,
    pub no_image_pages: usize,
    pub timeout_pages: usize,
    pub records_written: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadSummary {
    pub processed: usize,
    pub success: usize,
    pub http_failed: usize,
    pub pattern_failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub checked: usize,
    pub invalid: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueAssignment {
    pub year: i32,
    pub split: Split,
    pub issue: String,
    pub filenames: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitPlan {
    pub assignments: Vec<IssueAssignment>,
    pub skipped_years: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub years_used: usize,
    pub skipped_years: Vec<i32>,
    pub files_copied: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_record_line_format() {
        let record = PageRecord::found(7, "https://host/7/", "https://img/a.jpg");
        assert_eq!(record.to_string(), "7,1,https://host/7/,https://img/a.jpg");

        let failed = PageRecord::failed(8, PageStatus::Timeout, "https://host/8/");
        assert_eq!(failed.to_string(), "8,3,https://host/8/,failed");
    }

    #[test]
    fn test_page_record_parse_keeps_last_field_as_source() {
        let record: PageRecord = "12,2,https://host/12/,failed\n".parse().unwrap();
        assert_eq!(record.page_number, 12);
        assert_eq!(record.status, PageStatus::NoImage);
        assert_eq!(record.url, "https://host/12/");
        assert_eq!(record.image_src, FAILED_SRC);

        assert!("12,9,https://host/12/,failed".parse::<PageRecord>().is_err());
        assert!("twelve,1,u,s".parse::<PageRecord>().is_err());
    }

    #[test]
    fn test_download_record_derived_fields() {
        let record = DownloadRecord {
            line_number: 3,
            date: Some("1950-01-08".to_string()),
            number: Some("002".to_string()),
            page: Some("03".to_string()),
            status: DownloadStatus::Success,
            link: "https://host/x.jpg".to_string(),
            filename: Some("1950-01-08_002_03.jpg".to_string()),
            extension: Some("jpg".to_string()),
        };
        assert_eq!(record.year(), Some(1950));
        assert_eq!(record.page_number(), Some(3));
        assert_eq!(record.issue(), Some("1950-01-08"));
    }

    #[test]
    fn test_crawl_config_page_url_and_validation() {
        let config = CrawlConfig {
            base_url: "https://archive.example/papers/".to_string(),
            ..CrawlConfig::default()
        };
        assert_eq!(config.page_url(42), "https://archive.example/papers/42/");
        assert!(config.validate().is_ok());

        let empty = CrawlConfig {
            first_page: 5,
            last_page: 4,
            ..CrawlConfig::default()
        };
        assert!(empty.validate().is_err());
    }
}
