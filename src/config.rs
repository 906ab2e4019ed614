use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// OpenAI API key; hosted chat is disabled when absent
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Base URL of a local OpenAI-compatible model server used as fallback
    #[serde(default)]
    pub local_model_url: Option<String>,

    #[serde(default = "default_local_model_name")]
    pub local_model_name: String,

    /// Gemini API key; Gemini enrichment is disabled when absent
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Secret for signing JWTs; a random per-process secret is used when absent
    #[serde(default)]
    pub jwt_secret_key: Option<String>,

    #[serde(default = "default_jwt_expiration_hours")]
    pub jwt_expiration_hours: i64,

    /// Pages scraped by the scheduled catalog refresh
    #[serde(default = "default_scrape_sources")]
    pub scrape_sources: Vec<String>,

    /// Seconds between scheduled catalog refreshes
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Number of events enriched concurrently
    #[serde(default = "default_enrichment_concurrency")]
    pub enrichment_concurrency: usize,

    /// Retry budget for transient upstream failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_openai_api_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_local_model_name() -> String {
    "gpt2".to_string()
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_jwt_expiration_hours() -> i64 {
    24
}

fn default_scrape_sources() -> Vec<String> {
    vec![
        "https://www.playo.co/events".to_string(),
        "https://www.meetup.com/cities/us/ny/sports-outdoors/".to_string(),
    ]
}

fn default_update_interval_secs() -> u64 {
    3600
}

fn default_enrichment_concurrency() -> usize {
    4
}

fn default_max_retries() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            openai_api_key: None,
            openai_api_url: default_openai_api_url(),
            openai_model: default_openai_model(),
            local_model_url: None,
            local_model_name: default_local_model_name(),
            gemini_api_key: None,
            gemini_api_url: default_gemini_api_url(),
            gemini_model: default_gemini_model(),
            jwt_secret_key: None,
            jwt_expiration_hours: default_jwt_expiration_hours(),
            scrape_sources: default_scrape_sources(),
            update_interval_secs: default_update_interval_secs(),
            enrichment_concurrency: default_enrichment_concurrency(),
            max_retries: default_max_retries(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the background jobs can't run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.update_interval_secs == 0 {
            anyhow::bail!("UPDATE_INTERVAL_SECS must be at least 1");
        }
        if self.enrichment_concurrency == 0 {
            anyhow::bail!("ENRICHMENT_CONCURRENCY must be at least 1");
        }
        Ok(())
    }

    /// Socket address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
