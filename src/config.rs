use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub providers: ProvidersConfig,
    pub analysis: AnalysisConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file; `None` runs an in-memory database.
    pub path: Option<String>,
}

/// Per-provider API keys. A provider is enabled iff its key is set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub google_ai_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
    pub xai_api_key: Option<String>,
    /// Separate key for the cheap query-expansion model. Expansion is skipped
    /// when unset.
    pub anthropic_expansion_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Kill switch: `ANALYSIS_ENABLED=false` rejects all analysis requests.
    pub enabled: bool,
    /// Per (provider, subtopic-query) call bound.
    pub call_timeout_secs: u64,
}

impl AnalysisConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
    pub sweep_interval_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
            },
            database: DatabaseConfig {
                path: env::var("DATABASE_PATH").ok(),
            },
            providers: ProvidersConfig {
                anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
                openai_api_key: env::var("OPENAI_API_KEY").ok(),
                google_ai_api_key: env::var("GOOGLE_AI_API_KEY").ok(),
                perplexity_api_key: env::var("PERPLEXITY_API_KEY").ok(),
                xai_api_key: env::var("XAI_API_KEY").ok(),
                anthropic_expansion_api_key: env::var("ANTHROPIC_EXPANSION_API_KEY").ok(),
            },
            analysis: AnalysisConfig {
                enabled: env::var("ANALYSIS_ENABLED")
                    .map(|v| v != "false")
                    .unwrap_or(true),
                call_timeout_secs: env::var("ANALYSIS_CALL_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()?,
            },
            rate_limit: RateLimitConfig {
                max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()?,
                sweep_interval_secs: env::var("RATE_LIMIT_SWEEP_INTERVAL_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()?,
            },
        })
    }
}
