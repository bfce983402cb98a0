use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, de::DeserializeOwned};

/// Retroactive foreign exchange history (rates, volume, settlement).
pub const RATES_URL: &str = "https://sistemaswebb3-clearing.b3.com.br/historicalForeignExchangePage/retroactive";
/// Trading session bulletin filtered to the FRP contract.
pub const FORWARD_POINTS_URL: &str = "https://www2.bmf.com.br/pages/portal/bmfbovespa/boletim1/SistemaPregao1.asp?pagetype=pop&caminho=Resumo%20Estat%EDstico%20-%20Sistema%20Preg%E3o&Data=&Mercadoria=FRP";
/// Financial indicators page, mostly rendered client-side.
pub const INDICATORS_URL: &str = "https://sistemaswebb3-derivativos.b3.com.br/financialIndicatorsPage/?language=pt-br";

const ENV_PREFIX: &str = "TCAM_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    #[default]
    Http,
    Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Env vars read at startup, all prefixed with `TCAM_`.
#[derive(Debug, Deserialize)]
pub struct ScrapingEnv {
    #[serde(default)]
    fetcher: FetcherKind,
    #[serde(default = "default_webdriver_url")]
    webdriver_url: String,
    #[serde(default = "default_http_timeout_secs")]
    http_timeout_secs: u64,
    #[serde(default = "default_browser_timeout_secs")]
    browser_timeout_secs: u64,
    today: Option<NaiveDate>,
    #[serde(default)]
    output: OutputFormat,
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_http_timeout_secs() -> u64 {
    15
}

fn default_browser_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone)]
pub struct ScrapingConfig {
    pub fetcher: FetcherKind,
    pub webdriver_url: String,
    pub http_timeout: Duration,
    pub browser_timeout: Duration,
    /// Overrides the local date fed to the business date rule.
    pub today: Option<NaiveDate>,
    pub output: OutputFormat,
}

impl ScrapingConfig {
    pub fn new() -> anyhow::Result<Self> {
        Ok(ScrapingEnv::load_from_env()?.into())
    }

    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env = envy::prefixed(ENV_PREFIX)
            .from_iter::<_, ScrapingEnv>(vars)
            .context("failed to read TCAM_ settings")?;
        Ok(env.into())
    }
}

impl From<ScrapingEnv> for ScrapingConfig {
    fn from(env: ScrapingEnv) -> Self {
        Self {
            fetcher: env.fetcher,
            webdriver_url: env.webdriver_url,
            http_timeout: Duration::from_secs(env.http_timeout_secs),
            browser_timeout: Duration::from_secs(env.browser_timeout_secs),
            today: env.today,
            output: env.output,
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            fetcher: FetcherKind::default(),
            webdriver_url: default_webdriver_url(),
            http_timeout: Duration::from_secs(default_http_timeout_secs()),
            browser_timeout: Duration::from_secs(default_browser_timeout_secs()),
            today: None,
            output: OutputFormat::default(),
        }
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config = envy::prefixed(ENV_PREFIX)
            .from_env::<Self>()
            .context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}
