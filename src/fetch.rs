use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use tracing::debug;

use crate::settings::ScrapeSettings;
use crate::parser;
use crate::price::{AttemptError, Lookup, Miss};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// A fetched page: status code plus body text.
pub struct Page {
    pub status: u16,
    pub body: String,
}

/// Where product pages come from. The retry loop only sees this trait.
pub trait PageFetcher {
    async fn fetch(&self, url: &str) -> Result<Page>;
}

/// Plain GET over one shared client with browser-like headers.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(settings: &ScrapeSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent).context("Invalid user agent")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&settings.accept_language).context("Invalid accept-language")?,
        );
        if let Some(referer) = &settings.referer {
            headers.insert(
                REFERER,
                HeaderValue::from_str(referer).context("Invalid referer")?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout())
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(HttpFetcher { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(Page { status, body })
    }
}

/// Bounded-retry price lookup over a [`PageFetcher`]. A fixed delay separates
/// the end of one attempt from the start of the next, across the whole run.
pub struct PriceScraper<F> {
    fetcher: F,
    max_attempts: u32,
    delay: Duration,
    last_attempt: Option<Instant>,
}

impl<F: PageFetcher> PriceScraper<F> {
    pub fn new(fetcher: F, settings: &ScrapeSettings) -> Self {
        PriceScraper {
            fetcher,
            max_attempts: settings.max_attempts.max(1),
            delay: settings.delay(),
            last_attempt: None,
        }
    }

    #[cfg(test)]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Never fails: every attempt error is absorbed and, once attempts are
    /// exhausted, reported as [`Lookup::Unknown`].
    pub async fn lookup(&mut self, url: &str) -> Lookup {
        let mut last = AttemptError::NoPrice;

        for attempt in 1..=self.max_attempts {
            self.throttle().await;
            let outcome = self.attempt(url).await;
            self.last_attempt = Some(Instant::now());

            match outcome {
                Ok(lookup) => return lookup,
                Err(e) => {
                    debug!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt, self.max_attempts, url, e
                    );
                    last = e;
                }
            }
        }

        Lookup::Unknown(Miss::Exhausted {
            attempts: self.max_attempts,
            last,
        })
    }

    async fn attempt(&self, url: &str) -> Result<Lookup, AttemptError> {
        let page = self.fetcher.fetch(url).await.map_err(classify_error)?;
        if page.status != 200 {
            return Err(AttemptError::Status(page.status));
        }
        let (price, strategy) = parser::find_price(&page.body).ok_or(AttemptError::NoPrice)?;
        debug!("Found {} via {} at {}", price, strategy, url);
        Ok(Lookup::Found { price, strategy })
    }

    /// Wait until `delay` has passed since the previous attempt finished.
    async fn throttle(&self) {
        if let Some(prev) = self.last_attempt {
            let since = prev.elapsed();
            if since < self.delay {
                tokio::time::sleep(self.delay - since).await;
            }
        }
    }
}

fn classify_error(e: anyhow::Error) -> AttemptError {
    match e.downcast_ref::<reqwest::Error>() {
        Some(re) if re.is_timeout() => AttemptError::Timeout,
        _ => AttemptError::Transport(format!("{:#}", e)),
    }
}
