use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, ClientBuilder, Response};

use crate::{
    ScrapeError,
    fetcher::{DocumentFetcher, FetchRequest},
};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// Plain request/response fetcher. Fast, but it only ever sees the HTML the
/// server sends; anything a page renders with script stays invisible.
pub struct RequestClient {
    client: Client,
    timeout: Duration,
}

impl RequestClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }

    pub async fn fetch_url_response(&self, request: &FetchRequest) -> Result<Response, ScrapeError> {
        let mut builder = self.client.get(&request.url);
        if let Some(date) = &request.date_input {
            builder = builder.query(&[(date.query_param, date.value.as_str())]);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_error(request, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                source_name: request.source_name.clone(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    pub async fn fetch_url_body(&self, request: &FetchRequest) -> Result<String, ScrapeError> {
        let response = self.fetch_url_response(request).await?;
        debug!("{}: fetched {}", request.source_name, response.url());
        let body = response.text().await.map_err(|e| self.map_error(request, e))?;
        Ok(body)
    }

    fn map_error(&self, request: &FetchRequest, err: reqwest::Error) -> ScrapeError {
        ScrapeError::from_reqwest(&request.source_name, self.timeout.as_secs(), err)
    }
}

#[async_trait]
impl DocumentFetcher for RequestClient {
    fn name(&self) -> &'static str {
        "http"
    }

    fn runs_scripts(&self) -> bool {
        false
    }

    async fn fetch(&mut self, request: &FetchRequest) -> Result<String, ScrapeError> {
        self.fetch_url_body(request).await
    }
}
