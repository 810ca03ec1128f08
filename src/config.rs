use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

// YAML-serializable configuration structure
#[derive(Serialize, Deserialize, Debug)]
pub struct ConfigYaml {
    pub environment: String,
    pub port: u16,
    pub reference_symbol: Option<String>,
    pub provider_base_url: Option<String>,
    pub rate_limit_per_minute: Option<u32>,
    pub random_agent: Option<bool>,
}

// Holds application-wide settings
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub environment: String,
    pub port: u16,
    /// Symbol whose snapshot seeds the field catalog at startup.
    pub reference_symbol: String,
    pub provider_base_url: Option<String>,
    pub rate_limit_per_minute: u32,
    pub random_agent: bool,
}

impl AppConfig {
    // Load configuration from YAML file or environment variables
    pub fn load() -> Self {
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_yaml(&config_file)
        } else {
            Self::from_env()
        }
    }

    // Load configuration from YAML file
    pub fn from_yaml(file_path: &str) -> Self {
        let yaml_content = fs::read_to_string(file_path)
            .unwrap_or_else(|e| panic!("Failed to read config file {}: {}", file_path, e));

        let yaml_config: ConfigYaml = serde_yaml::from_str(&yaml_content)
            .unwrap_or_else(|e| panic!("Failed to parse YAML config: {}", e));

        Self {
            environment: yaml_config.environment,
            port: yaml_config.port,
            reference_symbol: yaml_config
                .reference_symbol
                .unwrap_or_else(|| "AAPL".to_string()),
            provider_base_url: yaml_config.provider_base_url,
            rate_limit_per_minute: yaml_config.rate_limit_per_minute.unwrap_or(30),
            random_agent: yaml_config.random_agent.unwrap_or(true),
        }
    }

    // Load all configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present

        let environment =
            env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8888);

        let reference_symbol =
            env::var("REFERENCE_SYMBOL").unwrap_or_else(|_| "AAPL".to_string());

        let provider_base_url = env::var("PROVIDER_BASE_URL").ok();

        let rate_limit_per_minute = env::var("RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let random_agent = env::var("RANDOM_AGENT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        Self {
            environment,
            port,
            reference_symbol,
            provider_base_url,
            rate_limit_per_minute,
            random_agent,
        }
    }
}
