use crate::error::Result;
use crate::services::link_log::LinkLogger;
use crate::services::renderer::{create_selector, PageRenderer, RenderOutcome};
use crate::types::{CrawlConfig, CrawlSummary, PageRecord, PageStatus};
use scraper::Html;
use std::io::Write;
use tracing::{info, info_span, warn, Instrument, Span};

pub struct Crawler<R> {
    renderer: R,
    config: CrawlConfig,
    span: Span,
}

impl<R: PageRenderer> Crawler<R> {
    pub fn new(renderer: R, config: CrawlConfig) -> Self {
        Self {
            renderer,
            config,
            span: info_span!("links"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Crawls the configured page range into a fresh link log file.
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        self.config.validate()?;
        let mut logger = LinkLogger::create(&self.config.links_file)?;
        self.crawl_into(&mut logger).await
    }

    pub async fn crawl_into<W: Write>(&mut self, logger: &mut LinkLogger<W>) -> Result<CrawlSummary> {
        let span = self.span.clone();
        async move {
            let mut summary = CrawlSummary::default();
            let already_written = logger.written();
            let (first, last) = (self.config.first_page, self.config.last_page);
            info!("Crawling pages {}..={} of {}", first, last, self.config.base_url);

            for page_number in first..=last {
                tokio::time::sleep(self.config.delay).await;

                let records = self.crawl_page(page_number).await?;
                match records.first().map(|r| r.status) {
                    Some(PageStatus::Ok) => summary.success_pages += 1,
                    Some(PageStatus::NoImage) => {
                        warn!("No images! Page {} failed to load.", page_number);
                        summary.no_image_pages += 1;
                    }
                    Some(PageStatus::Timeout) => {
                        warn!("Timeout! Page {} failed to load.", page_number);
                        summary.timeout_pages += 1;
                    }
                    None => {}
                }
                logger.append(&records)?;

                if self.config.progress_every > 0 && page_number % self.config.progress_every == 0 {
                    info!("Processed {} pages.", page_number);
                }
            }

            summary.records_written = logger.written() - already_written;
            info!("SUCCESS: {} pages", summary.success_pages);
            info!("NO IMAGES FAIL: {} pages", summary.no_image_pages);
            info!("TIMEOUT FAIL: {} pages", summary.timeout_pages);
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Renders one page and turns it into link log records.
    pub async fn crawl_page(&mut self, page_number: u32) -> Result<Vec<PageRecord>> {
        let url = self.config.page_url(page_number);
        let outcome = self
            .renderer
            .render(&url, self.config.render_timeout)
            .await?;

        match outcome {
            RenderOutcome::Rendered(markup) => {
                let sources = extract_image_sources(&markup)?;
                Ok(classify_page(page_number, &url, &sources))
            }
            RenderOutcome::TimedOut => Ok(vec![PageRecord::failed(
                page_number,
                PageStatus::Timeout,
                &url,
            )]),
        }
    }
}

/// `src` of every `<img>` in document order; `None` where the attribute is missing.
pub fn extract_image_sources(markup: &str) -> Result<Vec<Option<String>>> {
    let selector = create_selector("img")?;
    let document = Html::parse_document(markup);
    let sources = document
        .select(&selector)
        .map(|img| img.value().attr("src").map(str::to_string))
        .collect();
    Ok(sources)
}

/// A page counts as found only when its first image carries a `src`.
pub fn classify_page(page_number: u32, url: &str, sources: &[Option<String>]) -> Vec<PageRecord> {
    match sources.first() {
        Some(Some(_)) => sources
            .iter()
            .flatten()
            .map(|src| PageRecord::found(page_number, url, src))
            .collect(),
        _ => vec![PageRecord::failed(page_number, PageStatus::NoImage, url)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::renderer::HttpRenderer;
    use crate::types::FAILED_SRC;
    use std::time::Duration;

    #[test]
    fn test_extract_image_sources_in_order() {
        let markup = r#"<html><body>
            <img src="https://h/p1.jpg"><div><img alt="logo"></div><img src="https://h/p2.jpg">
        </body></html>"#;
        let sources = extract_image_sources(markup).unwrap();
        assert_eq!(
            sources,
            vec![
                Some("https://h/p1.jpg".to_string()),
                None,
                Some("https://h/p2.jpg".to_string())
            ]
        );
    }

    #[test]
    fn test_classify_found_page() {
        let sources = vec![Some("a.jpg".to_string()), None, Some("b.jpg".to_string())];
        let records = classify_page(3, "https://h/3/", &sources);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == PageStatus::Ok && r.page_number == 3));
        assert_eq!(records[1].image_src, "b.jpg");
    }

    #[test]
    fn test_classify_page_without_usable_source() {
        for sources in [vec![], vec![None, Some("b.jpg".to_string())]] {
            let records = classify_page(4, "https://h/4/", &sources);
            assert_eq!(records, vec![PageRecord::failed(4, PageStatus::NoImage, "https://h/4/")]);
            assert_eq!(records[0].image_src, FAILED_SRC);
        }
    }

    #[tokio::test]
    async fn test_unreachable_archive_logs_timeouts() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let config = CrawlConfig {
            base_url,
            first_page: 1,
            last_page: 2,
            render_timeout: Duration::from_millis(200),
            delay: Duration::ZERO,
            ..CrawlConfig::default()
        };
        let renderer = HttpRenderer::new()
            .unwrap()
            .with_poll_interval(Duration::from_millis(50));
        let mut crawler = Crawler::new(renderer, config);
        let mut logger = LinkLogger::new(Vec::new());

        let summary = crawler.crawl_into(&mut logger).await.unwrap();

        assert_eq!(summary.timeout_pages, 2);
        assert_eq!(summary.records_written, 2);
        let log = String::from_utf8(logger.into_inner()).unwrap();
        assert!(log.lines().all(|line| line.contains(",3,") && line.ends_with(",failed")));
    }
}
