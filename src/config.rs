use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_seed")]
    pub seed: SeedConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,
}

/// Thresholds for the seed-data check run at adapter construction.
#[derive(Debug, Deserialize, Clone)]
pub struct SeedConfig {
    #[serde(default = "default_min_customers")]
    pub min_customers: u64,

    #[serde(default = "default_min_products")]
    pub min_products: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

fn default_seed() -> SeedConfig {
    SeedConfig {
        min_customers: default_min_customers(),
        min_products: default_min_products(),
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        json: false,
    }
}

fn default_min_customers() -> u64 {
    5
}

fn default_min_products() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            seed: default_seed(),
            logging: default_logging(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }
}

/// Installs the global tracing subscriber; a second call is a no-op so tests
/// can run it freely.
pub fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    if config.json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}
