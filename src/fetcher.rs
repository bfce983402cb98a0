use std::time::Duration;

use async_trait::async_trait;

use crate::ScrapeError;

/// A date typed into the page before reading it.
///
/// Plain HTTP sends it as a query parameter; a browser types it into the
/// form field and presses the search button.
#[derive(Debug, Clone)]
pub struct DateInput {
    /// Already formatted as `dd/mm/yyyy`.
    pub value: String,
    pub query_param: &'static str,
    pub field_selector: &'static str,
    /// Visible text of the button that runs the search.
    pub submit_text: &'static str,
}

/// Something whose appearance means the page finished rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    Selector(&'static str),
    Text(&'static str),
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Used in logs and error messages, e.g. `"rates 31/05/2024"`.
    pub source_name: String,
    pub url: String,
    pub date_input: Option<DateInput>,
    /// Any one of these is enough. Only a browser waits; an empty list means
    /// read the page as soon as it loads.
    pub wait_for: Vec<WaitCondition>,
    pub wait_timeout: Duration,
}

/// Turns a [`FetchRequest`] into a rendered HTML document.
///
/// `fetch` takes `&mut self`: one navigation has to finish before the next
/// one starts. `close` releases whatever the fetcher holds and must be called
/// once the run is over, whether it succeeded or not.
#[async_trait]
pub trait DocumentFetcher: Send {
    fn name(&self) -> &'static str;

    /// Whether content injected by client-side script is visible.
    fn runs_scripts(&self) -> bool;

    async fn fetch(&mut self, request: &FetchRequest) -> Result<String, ScrapeError>;

    async fn close(&mut self) -> Result<(), ScrapeError> {
        Ok(())
    }
}
