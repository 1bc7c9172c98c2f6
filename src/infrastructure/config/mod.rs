use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Synthesis endpoint
    pub synthesis_url: String,
    pub synthesis_api_key: String,
    // Blob store
    pub storage_url: String,
    pub storage_api_key: String,
    pub storage_bucket: String,
    // Record store
    pub records_url: String,
    pub records_api_key: String,
    pub records_table: String,
    // Naming collaborator
    pub naming_url: String,
    pub naming_api_key: String,
    // Pipeline tuning
    pub pipeline: PipelineConfig,
}

/// Every pacing and limit constant of the pipeline, exposed as configuration
/// rather than hard-coded (the fixed delays were tuned against one provider's
/// rate limit and may need adjustment for another).
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub max_concurrency: usize,
    pub chunk_size: usize,
    pub worker_stagger_ms: u64,
    pub chunk_cooldown_ms: u64,
    pub max_retries: u32,
    pub synthesis_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub health_probe_timeout_secs: u64,
    pub health_cache_ms: u64,
    pub breaker_failure_threshold: u32,
    pub breaker_reset_timeout_secs: u64,
    pub record_batch_size: usize,
    pub record_batch_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            chunk_size: 8,
            worker_stagger_ms: 200,
            chunk_cooldown_ms: 2000,
            max_retries: 2,
            synthesis_timeout_secs: 30,
            upload_timeout_secs: 60,
            health_probe_timeout_secs: 5,
            health_cache_ms: 60_000,
            breaker_failure_threshold: 3,
            breaker_reset_timeout_secs: 30,
            record_batch_size: 20,
            record_batch_delay_ms: 250,
        }
    }
}

impl PipelineConfig {
    pub fn worker_stagger(&self) -> Duration {
        Duration::from_millis(self.worker_stagger_ms)
    }

    pub fn chunk_cooldown(&self) -> Duration {
        Duration::from_millis(self.chunk_cooldown_ms)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn health_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.health_probe_timeout_secs)
    }

    pub fn health_cache_validity(&self) -> Duration {
        Duration::from_millis(self.health_cache_ms)
    }

    pub fn breaker_reset_timeout(&self) -> Duration {
        Duration::from_secs(self.breaker_reset_timeout_secs)
    }

    pub fn record_batch_delay(&self) -> Duration {
        Duration::from_millis(self.record_batch_delay_ms)
    }

    fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = Self::default();
        Ok(Self {
            max_concurrency: env_or("MAX_CONCURRENCY", defaults.max_concurrency)?,
            chunk_size: env_or("CHUNK_SIZE", defaults.chunk_size)?,
            worker_stagger_ms: env_or("WORKER_STAGGER_MS", defaults.worker_stagger_ms)?,
            chunk_cooldown_ms: env_or("CHUNK_COOLDOWN_MS", defaults.chunk_cooldown_ms)?,
            max_retries: env_or("MAX_RETRIES", defaults.max_retries)?,
            synthesis_timeout_secs: env_or(
                "SYNTHESIS_TIMEOUT_SECS",
                defaults.synthesis_timeout_secs,
            )?,
            upload_timeout_secs: env_or("UPLOAD_TIMEOUT_SECS", defaults.upload_timeout_secs)?,
            health_probe_timeout_secs: env_or(
                "HEALTH_PROBE_TIMEOUT_SECS",
                defaults.health_probe_timeout_secs,
            )?,
            health_cache_ms: env_or("HEALTH_CACHE_MS", defaults.health_cache_ms)?,
            breaker_failure_threshold: env_or(
                "BREAKER_FAILURE_THRESHOLD",
                defaults.breaker_failure_threshold,
            )?,
            breaker_reset_timeout_secs: env_or(
                "BREAKER_RESET_TIMEOUT_SECS",
                defaults.breaker_reset_timeout_secs,
            )?,
            record_batch_size: env_or("RECORD_BATCH_SIZE", defaults.record_batch_size)?,
            record_batch_delay_ms: env_or("RECORD_BATCH_DELAY_MS", defaults.record_batch_delay_ms)?,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T::Err: std::error::Error + 'static,
{
    match env::var(key) {
        Ok(value) => Ok(value.parse()?),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let config = Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            environment: match env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .as_str()
            {
                "production" => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            synthesis_url: env::var("SYNTHESIS_URL")?,
            synthesis_api_key: env::var("SYNTHESIS_API_KEY")?,
            storage_url: env::var("STORAGE_URL")?,
            storage_api_key: env::var("STORAGE_API_KEY")?,
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "guide-audio".to_string()),
            records_url: env::var("RECORDS_URL")?,
            records_api_key: env::var("RECORDS_API_KEY")?,
            records_table: env::var("RECORDS_TABLE")
                .unwrap_or_else(|_| "audio_segments".to_string()),
            naming_url: env::var("NAMING_URL").unwrap_or_default(),
            naming_api_key: env::var("NAMING_API_KEY").unwrap_or_default(),
            pipeline: PipelineConfig::from_env()?,
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}
