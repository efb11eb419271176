use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_MODELS: [&str; 7] = [
    "gpt-4o-mini",
    "gpt-4o",
    "gpt-4.1-mini",
    "gpt-4.1",
    "gpt-5-nano",
    "gpt-5-mini",
    "gpt-5.1",
];

fn default_endpoint() -> String {
    "http://localhost:8000/api/generate-description".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_available_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
}

fn default_model() -> String {
    DEFAULT_MODELS[0].to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Whole-request deadline. Zero leaves the transport default in place.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelsConfig {
    #[serde(default = "default_available_models")]
    pub available: Vec<String>,
    #[serde(default = "default_model")]
    pub default: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        ModelsConfig {
            available: default_available_models(),
            default: default_model(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 1100,
            height: 720,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Reads the config file, falling back to defaults. The second value is
    /// a warning to log once logging is up.
    pub fn load() -> (Self, Option<String>) {
        let config_path = Self::get_config_path();

        if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => return (config, None),
                    Err(e) => {
                        let warning = format!("Error parsing {}: {}. Using defaults.", config_path.display(), e);
                        return (Config::default(), Some(warning));
                    }
                },
                Err(e) => {
                    let warning = format!("Error reading {}: {}. Using defaults.", config_path.display(), e);
                    return (Config::default(), Some(warning));
                }
            }
        }

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        (Config::default(), None)
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn get_config_path() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/product-vision/config.toml")
        } else {
            PathBuf::from("config.toml")
        }
    }
}
