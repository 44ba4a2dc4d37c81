use crate::error::Result;
use crate::services::link_log::read_lines;
use crate::services::normalizer::FilenameNormalizer;
use crate::types::{DownloadConfig, DownloadRecord, DownloadStatus, DownloadSummary, FAILED_SRC};
use rand::Rng;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use tracing::{debug, info, info_span, warn, Instrument, Span};

/// Status code and body of an image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub status: u16,
    pub bytes: Vec<u8>,
}

#[allow(async_fn_in_trait)]
pub trait ImageFetcher {
    async fn fetch(&mut self, url: &str) -> Result<FetchedImage>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("archive-harvest/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpFetcher {
    async fn fetch(&mut self, url: &str) -> Result<FetchedImage> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        // Error bodies are not kept.
        let bytes = if response.status() == reqwest::StatusCode::OK {
            response.bytes().await?.to_vec()
        } else {
            Vec::new()
        };
        Ok(FetchedImage { status, bytes })
    }
}

pub struct Downloader<F> {
    fetcher: F,
    normalizer: FilenameNormalizer,
    config: DownloadConfig,
    span: Span,
}

impl<F: ImageFetcher> Downloader<F> {
    pub fn new(fetcher: F, config: DownloadConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            normalizer: FilenameNormalizer::new()?,
            config,
            span: info_span!("download"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Downloads every link in the link log and writes the CSV download log.
    pub async fn run<R: Rng>(&mut self, rng: &mut R) -> Result<DownloadSummary> {
        let lines = read_lines(&self.config.links_file)?;
        fs::create_dir_all(&self.config.download_dir)?;
        if let Some(parent) = self
            .config
            .log_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            fs::create_dir_all(parent)?;
        }

        let selection = self.select_lines(lines.len(), rng);
        let mut writer = download_log_writer(fs::File::create(&self.config.log_file)?)?;
        self.download_lines(&lines, selection.as_ref(), &mut writer)
            .await
    }

    /// Picks the 1-based line numbers to process when sampling is enabled.
    fn select_lines<R: Rng>(&self, total: usize, rng: &mut R) -> Option<BTreeSet<usize>> {
        if self.config.sample == 0 {
            return None;
        }
        let amount = self.config.sample.min(total);
        let picked: BTreeSet<usize> = rand::seq::index::sample(rng, total, amount)
            .into_iter()
            .map(|idx| idx + 1)
            .collect();
        let _enter = self.span.enter();
        info!("Test the following random links: {:?}", picked);
        Some(picked)
    }

    pub async fn download_lines<W: Write>(
        &mut self,
        lines: &[String],
        selection: Option<&BTreeSet<usize>>,
        writer: &mut csv::Writer<W>,
    ) -> Result<DownloadSummary> {
        let span = self.span.clone();
        async move {
            let mut summary = DownloadSummary::default();

            for (idx, line) in lines.iter().enumerate() {
                let line_number = idx + 1;
                if line.trim() == FAILED_SRC {
                    continue;
                }
                if selection.is_some_and(|picked| !picked.contains(&line_number)) {
                    continue;
                }

                let record = self.download_line(line_number, line).await?;
                match record.status {
                    DownloadStatus::Success => summary.success += 1,
                    DownloadStatus::HttpFail => summary.http_failed += 1,
                    DownloadStatus::PatternFail => summary.pattern_failed += 1,
                }
                summary.processed += 1;

                writer.serialize(&record)?;
                writer.flush()?;

                if self.config.progress_every > 0 && line_number % self.config.progress_every == 0 {
                    log_progress(line_number, &summary);
                }
                tokio::time::sleep(self.config.delay).await;
            }

            info!("The file processed. Results:");
            log_progress(lines.len(), &summary);
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Normalizes and fetches a single link log line.
    pub async fn download_line(&mut self, line_number: usize, line: &str) -> Result<DownloadRecord> {
        let link = line.trim().rsplit(',').next().unwrap_or_default().to_string();

        let Some(name) = self.normalizer.normalize(&link) else {
            warn!("URL does not match expected format. Line {}", line_number);
            return Ok(DownloadRecord {
                line_number,
                date: None,
                number: None,
                page: None,
                status: DownloadStatus::PatternFail,
                link,
                filename: None,
                extension: None,
            });
        };

        let filename = name.filename();
        let target = self.config.download_dir.join(&filename);

        let status = if self.config.skip_existing && target.is_file() {
            debug!("Keeping existing {}", target.display());
            DownloadStatus::Success
        } else {
            let image = self.fetcher.fetch(&link).await?;
            if image.status == 200 {
                fs::write(&target, &image.bytes)?;
                DownloadStatus::Success
            } else {
                warn!(
                    "Failed to download image from line: {}. Response code is {}",
                    line_number, image.status
                );
                DownloadStatus::HttpFail
            }
        };

        Ok(DownloadRecord {
            line_number,
            date: Some(name.date()),
            number: Some(name.number),
            page: Some(name.page),
            status,
            link,
            filename: Some(filename),
            extension: Some(name.extension),
        })
    }
}

/// Header of the download log, written even when no line is processed.
pub const DOWNLOAD_LOG_HEADER: [&str; 8] = [
    "line_number",
    "date",
    "number",
    "page",
    "status",
    "link",
    "filename",
    "extension",
];

pub fn download_log_writer<W: Write>(out: W) -> Result<csv::Writer<W>> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(DOWNLOAD_LOG_HEADER)?;
    writer.flush()?;
    Ok(writer)
}

fn log_progress(line_number: usize, summary: &DownloadSummary) {
    info!(
        "PROCESSED {} lines. SUCCESS: {}. FAIL CODE: {}. FAIL FORMAT: {}",
        line_number, summary.success, summary.http_failed, summary.pattern_failed
    );
}
