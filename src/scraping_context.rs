use chrono::{Local, NaiveDate};
use log::warn;

use crate::{
    browser_client::BrowserClient,
    config::{FetcherKind, ScrapingConfig},
    fetcher::DocumentFetcher,
    pipeline::{self, PipelineRun},
    requests::RequestClient,
};

pub struct ScrapingContext {
    pub scraping_config: ScrapingConfig,
    pub fetcher: Box<dyn DocumentFetcher>,
}

impl ScrapingContext {
    pub fn new() -> anyhow::Result<Self> {
        let scraping_config = ScrapingConfig::new()?;
        let fetcher = build_fetcher(&scraping_config)?;
        Ok(Self::with_fetcher(scraping_config, fetcher))
    }

    pub fn with_fetcher(scraping_config: ScrapingConfig, fetcher: Box<dyn DocumentFetcher>) -> Self {
        ScrapingContext {
            scraping_config,
            fetcher,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.scraping_config
            .today
            .unwrap_or_else(|| Local::now().date_naive())
    }

    /// Runs the whole pipeline and releases the fetcher afterwards. The
    /// pipeline itself cannot fail, so the release always happens.
    pub async fn run(&mut self) -> PipelineRun {
        let today = self.today();
        let run = pipeline::run(self.fetcher.as_mut(), today).await;
        if let Err(err) = self.fetcher.close().await {
            warn!("Could not release the {} fetcher: {err}", self.fetcher.name());
        }
        run
    }
}

/// Picks the fetcher realization once, at startup.
pub fn build_fetcher(config: &ScrapingConfig) -> anyhow::Result<Box<dyn DocumentFetcher>> {
    let fetcher: Box<dyn DocumentFetcher> = match config.fetcher {
        FetcherKind::Http => Box::new(RequestClient::new(config.http_timeout)?),
        FetcherKind::Browser => Box::new(BrowserClient::new(&config.webdriver_url, config.browser_timeout)?),
    };
    Ok(fetcher)
}
