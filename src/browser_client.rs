//! Scripted-browser fetcher speaking the W3C WebDriver protocol.
//!
//! Works against any WebDriver server (chromedriver, geckodriver, a Selenium
//! grid). One browser session is opened on the first fetch and reused for
//! the rest of the run; [`DocumentFetcher::close`] ends it.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};

use crate::{
    ScrapeError,
    fetcher::{DateInput, DocumentFetcher, FetchRequest, WaitCondition},
};

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

// Read-only date pickers ignore typed keys, so the value is set directly and
// the events the page listens for are fired by hand.
const FILL_DATE_SCRIPT: &str = "\
    const field = arguments[0];\
    field.removeAttribute('readonly');\
    field.value = arguments[1];\
    field.dispatchEvent(new Event('input', { bubbles: true }));\
    field.dispatchEvent(new Event('change', { bubbles: true }));";

pub struct BrowserClient {
    http: Client,
    webdriver_url: String,
    timeout: Duration,
    session_id: Option<String>,
}

impl BrowserClient {
    pub fn new(webdriver_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = ClientBuilder::new().timeout(timeout).build()?;
        Ok(Self {
            http,
            webdriver_url: webdriver_url.trim_end_matches('/').to_string(),
            timeout,
            session_id: None,
        })
    }

    async fn session(&mut self, source_name: &str) -> Result<String, ScrapeError> {
        if let Some(id) = &self.session_id {
            return Ok(id.clone());
        }

        let timeout_ms = self.timeout.as_millis() as u64;
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": ["--headless=new", "--no-sandbox", "--disable-gpu"]
                    },
                    "timeouts": { "pageLoad": timeout_ms, "script": timeout_ms }
                }
            }
        });
        let value = self
            .command(source_name, Method::POST, "/session", Some(capabilities))
            .await?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ScrapeError::webdriver(source_name, "new session response has no sessionId"))?
            .to_string();

        info!("Opened browser session {id}");
        self.session_id = Some(id.clone());
        Ok(id)
    }

    async fn send(
        &self,
        source_name: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value), ScrapeError> {
        debug!("{source_name}: webdriver {method} {path}");
        let mut builder = self.http.request(method, format!("{}{path}", self.webdriver_url));
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let response = builder.send().await.map_err(|e| self.map_error(source_name, e))?;
        let status = response.status();
        let mut body: Value = response.json().await.map_err(|e| self.map_error(source_name, e))?;
        let value = body.get_mut("value").map(Value::take).unwrap_or(Value::Null);
        Ok((status, value))
    }

    async fn command(
        &self,
        source_name: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ScrapeError> {
        let (status, value) = self.send(source_name, method, path, body).await?;
        if status.is_success() {
            Ok(value)
        } else {
            Err(driver_error(source_name, &value))
        }
    }

    async fn navigate(&self, session: &str, source_name: &str, url: &str) -> Result<(), ScrapeError> {
        self.command(
            source_name,
            Method::POST,
            &format!("/session/{session}/url"),
            Some(json!({ "url": url })),
        )
        .await?;
        Ok(())
    }

    /// `Ok(None)` when nothing matches yet.
    async fn find_element(
        &self,
        session: &str,
        source_name: &str,
        using: &str,
        value: &str,
    ) -> Result<Option<String>, ScrapeError> {
        let (status, found) = self
            .send(
                source_name,
                Method::POST,
                &format!("/session/{session}/element"),
                Some(json!({ "using": using, "value": value })),
            )
            .await?;

        if status.is_success() {
            let id = found
                .get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .ok_or_else(|| ScrapeError::webdriver(source_name, "element reference missing"))?;
            Ok(Some(id.to_string()))
        } else if found["error"] == "no such element" {
            Ok(None)
        } else {
            Err(driver_error(source_name, &found))
        }
    }

    async fn require_element(
        &self,
        session: &str,
        source_name: &str,
        using: &str,
        value: &str,
    ) -> Result<String, ScrapeError> {
        self.find_element(session, source_name, using, value)
            .await?
            .ok_or_else(|| ScrapeError::structure(source_name, format!("no element matches {value:?}")))
    }

    async fn fill_date(&self, session: &str, source_name: &str, input: &DateInput) -> Result<(), ScrapeError> {
        let field = self
            .require_element(session, source_name, "css selector", input.field_selector)
            .await?;
        self.command(
            source_name,
            Method::POST,
            &format!("/session/{session}/execute/sync"),
            Some(json!({
                "script": FILL_DATE_SCRIPT,
                "args": [{ ELEMENT_KEY: field }, input.value],
            })),
        )
        .await?;

        let button_xpath = format!("//button[contains(normalize-space(.), {})]", xpath_literal(input.submit_text));
        let button = self
            .require_element(session, source_name, "xpath", &button_xpath)
            .await?;
        self.command(
            source_name,
            Method::POST,
            &format!("/session/{session}/element/{button}/click"),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    /// Polls until one condition holds. Running out of time is not an error:
    /// whatever is on the page by then gets parsed.
    async fn wait_for(&self, session: &str, request: &FetchRequest) -> Result<(), ScrapeError> {
        if request.wait_for.is_empty() {
            return Ok(());
        }
        let deadline = Instant::now() + request.wait_timeout;
        loop {
            for condition in &request.wait_for {
                let (using, value) = match condition {
                    WaitCondition::Selector(css) => ("css selector", css.to_string()),
                    WaitCondition::Text(text) => ("xpath", text_xpath(text)),
                };
                if self
                    .find_element(session, &request.source_name, using, &value)
                    .await?
                    .is_some()
                {
                    debug!("{}: page ready ({condition:?})", request.source_name);
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                warn!(
                    "{}: nothing to wait for appeared within {}s, reading the page as is",
                    request.source_name,
                    request.wait_timeout.as_secs()
                );
                return Ok(());
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn page_source(&self, session: &str, source_name: &str) -> Result<String, ScrapeError> {
        let value = self
            .command(source_name, Method::GET, &format!("/session/{session}/source"), None)
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ScrapeError::webdriver(source_name, "page source is not a string"))
    }

    fn map_error(&self, source_name: &str, err: reqwest::Error) -> ScrapeError {
        ScrapeError::from_reqwest(source_name, self.timeout.as_secs(), err)
    }
}

#[async_trait]
impl DocumentFetcher for BrowserClient {
    fn name(&self) -> &'static str {
        "browser"
    }

    fn runs_scripts(&self) -> bool {
        true
    }

    async fn fetch(&mut self, request: &FetchRequest) -> Result<String, ScrapeError> {
        let session = self.session(&request.source_name).await?;
        self.navigate(&session, &request.source_name, &request.url).await?;
        if let Some(input) = &request.date_input {
            self.fill_date(&session, &request.source_name, input).await?;
        }
        self.wait_for(&session, request).await?;
        self.page_source(&session, &request.source_name).await
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        let Some(id) = self.session_id.take() else {
            return Ok(());
        };
        self.command("browser session", Method::DELETE, &format!("/session/{id}"), None)
            .await?;
        info!("Closed browser session {id}");
        Ok(())
    }
}

/// Ends a session that was never closed, e.g. when the run was cancelled or
/// panicked. The request is sent from a task on the current runtime; without
/// one the session is left to the driver's own timeout.
impl Drop for BrowserClient {
    fn drop(&mut self) {
        let Some(id) = self.session_id.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Browser session {id} left open: no runtime to end it");
            return;
        };
        let request = self.http.delete(format!("{}/session/{id}", self.webdriver_url));
        runtime.spawn(async move {
            match request.send().await {
                Ok(_) => info!("Closed abandoned browser session {id}"),
                Err(err) => warn!("Could not close browser session {id}: {err}"),
            }
        });
    }
}

fn driver_error(source_name: &str, value: &Value) -> ScrapeError {
    let error = value["error"].as_str().unwrap_or("unknown error");
    let message = value["message"].as_str().unwrap_or_default();
    ScrapeError::webdriver(source_name, format!("{error}: {message}"))
}

/// Quotes `text` for use inside an XPath 1.0 expression. XPath has no escape
/// sequences, so text holding both quote kinds is glued together with
/// `concat`.
fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{text}'")
    } else if !text.contains('"') {
        format!("\"{text}\"")
    } else {
        let parts: Vec<String> = text
            .split('\'')
            .map(|part| format!("'{part}'"))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Innermost rendered element whose text contains `text`, even when inline
/// markup splits it. Script and style bodies never count.
fn text_xpath(text: &str) -> String {
    let literal = xpath_literal(text);
    format!(
        "//body//*[not(self::script or self::style)][contains(normalize-space(.), {literal})]\
         [not(*[contains(normalize-space(.), {literal})])]"
    )
}
