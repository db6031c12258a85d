use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{error, info};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Secret used to verify the auth provider's HS256 access tokens
    pub supabase_jwt_secret: Option<String>,

    /// Database URL
    pub db_url: Option<String>,

    /// LLM provider API key
    pub anthropic_api_key: Option<String>,

    /// LLM provider base URL
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,

    /// Model used for completions
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,

    /// Completion token budget
    #[serde(default = "default_anthropic_max_tokens")]
    pub anthropic_max_tokens: u32,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Install the global configuration. Should be called once at startup.
pub fn init_config(config: Config) {
    let _ = CONFIG.set(config);
}

/// Get the global configuration instance.
pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration not initialized. Call init_config() first.")
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            supabase_jwt_secret: None,
            db_url: None,
            anthropic_api_key: None,
            anthropic_base_url: default_anthropic_base_url(),
            anthropic_model: default_anthropic_model(),
            anthropic_max_tokens: default_anthropic_max_tokens(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-sonnet-20240229".to_string()
}

fn default_anthropic_max_tokens() -> u32 {
    4000
}
