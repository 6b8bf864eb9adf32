use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppCfg {
    #[serde(default)]
    pub http: HttpCfg,
    #[serde(default)]
    pub prices: PriceCfg,
    #[serde(default)]
    pub llm: LlmCfg,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpCfg {
    #[serde(rename = "userAgent", default = "default_ua")]
    pub user_agent: String,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
    #[serde(rename = "poolIdleTimeout", with = "humantime_serde", default = "default_pool_idle")]
    pub pool_idle_timeout: Duration,
    #[serde(rename = "tcpKeepAlive", with = "humantime_serde", default = "default_keep_alive")]
    pub tcp_keep_alive: Duration,
    #[serde(rename = "poolMaxIdlePerHost", default = "default_pool")]
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            user_agent: default_ua(),
            timeout: default_timeout(),
            pool_idle_timeout: default_pool_idle(),
            tcp_keep_alive: default_keep_alive(),
            pool_max_idle_per_host: default_pool(),
        }
    }
}
fn default_ua() -> String {
    "runlens/0.1".into()
}
fn default_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_pool_idle() -> Duration {
    Duration::from_secs(90)
}
fn default_keep_alive() -> Duration {
    Duration::from_secs(60)
}
fn default_pool() -> usize {
    16
}

#[derive(Debug, Deserialize, Clone)]
pub struct PriceCfg {
    #[serde(rename = "baseUrl", default = "default_price_base_url")]
    pub base_url: String,
}

impl Default for PriceCfg {
    fn default() -> Self {
        Self {
            base_url: default_price_base_url(),
        }
    }
}
fn default_price_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmCfg {
    #[serde(rename = "apiKey", default)]
    pub api_key: String,
    #[serde(rename = "baseUrl", default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(rename = "maxTokens", default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(rename = "rateLimitRpm", default = "default_rpm")]
    pub rate_limit_rpm: u32,
    /// Process-wide ceiling on explained runs per ticker. Always dominates the
    /// caller-requested count.
    #[serde(rename = "maxExplainedRuns", default = "default_max_explained")]
    pub max_explained_runs: usize,
}

impl Default for LlmCfg {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_llm_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            rate_limit_rpm: default_rpm(),
            max_explained_runs: default_max_explained(),
        }
    }
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_max_tokens() -> u32 {
    350
}
fn default_temperature() -> f64 {
    0.3
}
fn default_rpm() -> u32 {
    30
}
fn default_max_explained() -> usize {
    2
}

impl AppCfg {
    pub fn load(path: &str) -> Result<Self> {
        let cfg = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(config::Environment::default().separator("__"))
            .build()
            .context("building config")?;

        let mut app: AppCfg = cfg.try_deserialize().context("deserializing config")?;
        if app.llm.api_key.is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                app.llm.api_key = key;
            }
        }
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.prices.base_url.is_empty(), "prices.baseUrl missing");
        anyhow::ensure!(!self.llm.base_url.is_empty(), "llm.baseUrl missing");
        anyhow::ensure!(!self.llm.model.is_empty(), "llm.model missing");
        anyhow::ensure!(
            self.llm.max_explained_runs > 0,
            "llm.maxExplainedRuns must be > 0"
        );
        anyhow::ensure!(self.llm.rate_limit_rpm > 0, "llm.rateLimitRpm must be > 0");
        Ok(())
    }
}
