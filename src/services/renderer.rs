use crate::error::{HarvestError, Result};
use scraper::{Html, Selector};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Result of waiting for a page to show an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered(String),
    TimedOut,
}

/// Loads a page and waits until an `<img>` element is present.
///
/// Pages that never show an image, including unreachable ones, end as
/// [`RenderOutcome::TimedOut`].
#[allow(async_fn_in_trait)]
pub trait PageRenderer {
    async fn render(&mut self, url: &str, timeout: Duration) -> Result<RenderOutcome>;
}

/// Renderer over plain HTTP. The page is re-fetched until its markup contains
/// an image or the deadline passes.
pub struct HttpRenderer {
    client: reqwest::Client,
    poll_interval: Duration,
}

impl HttpRenderer {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("archive-harvest/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            poll_interval: Duration::from_millis(500),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl PageRenderer for HttpRenderer {
    async fn render(&mut self, url: &str, timeout: Duration) -> Result<RenderOutcome> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(RenderOutcome::TimedOut);
            }

            match tokio::time::timeout(remaining, self.fetch(url)).await {
                Ok(Ok(markup)) => {
                    if contains_image(&markup)? {
                        return Ok(RenderOutcome::Rendered(markup));
                    }
                    debug!("No <img> on {} yet, retrying", url);
                }
                // Unreachable pages behave like pages that never finish loading.
                Ok(Err(e)) if e.is_connect() || e.is_timeout() || e.is_request() => {
                    debug!("Request to {} failed ({}), retrying", url, e);
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Ok(RenderOutcome::TimedOut),
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }
}

impl HttpRenderer {
    async fn fetch(&self, url: &str) -> reqwest::Result<String> {
        self.client.get(url).send().await?.text().await
    }
}

pub(crate) fn create_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| HarvestError::Selector(selector.to_string()))
}

fn contains_image(markup: &str) -> Result<bool> {
    let selector = create_selector("img")?;
    let document = Html::parse_document(markup);
    let found = document.select(&selector).next().is_some();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::stub_server;

    #[test]
    fn test_contains_image() {
        assert!(contains_image(r#"<html><body><img src="a.jpg"></body></html>"#).unwrap());
        assert!(contains_image("<p>loading</p><img>").unwrap());
        assert!(!contains_image("<html><body><p>loading</p></body></html>").unwrap());
    }

    fn fast_renderer() -> HttpRenderer {
        HttpRenderer::new()
            .unwrap()
            .with_poll_interval(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_render_returns_markup_with_image() {
        let base = stub_server::serve("200 OK", r#"<html><body><img src="p1.jpg"></body></html>"#).await;

        let outcome = fast_renderer()
            .render(&format!("{}/1/", base), Duration::from_secs(5))
            .await
            .unwrap();

        match outcome {
            RenderOutcome::Rendered(markup) => assert!(markup.contains("p1.jpg")),
            RenderOutcome::TimedOut => panic!("page with an image should render"),
        }
    }

    #[tokio::test]
    async fn test_render_times_out_without_image() {
        let base = stub_server::serve("200 OK", "<html><body><p>loading</p></body></html>").await;

        let started = std::time::Instant::now();
        let outcome = fast_renderer()
            .render(&format!("{}/2/", base), Duration::from_millis(300))
            .await
            .unwrap();

        assert_eq!(outcome, RenderOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_unreachable_page_times_out_instead_of_failing() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = fast_renderer()
            .render(&format!("http://{}/3/", addr), Duration::from_millis(300))
            .await
            .unwrap();

        assert_eq!(outcome, RenderOutcome::TimedOut);
    }
}
