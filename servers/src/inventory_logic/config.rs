use bms_common::imaging::NormalizeOptions;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "server_inventory.conf";
/// Photos travel base64-encoded inside JSON bodies, so the cap sits well above
/// the size of a phone picture.
pub const DEFAULT_BODY_LIMIT_MB: usize = 25;

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "BMS inventory backend with live notifications", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "BMS_PORT", help = "Port to listen on for HTTP and WebSocket clients.")]
    pub port: Option<u16>,

    #[clap(long, env = "BMS_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "BMS_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "BMS_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "CORS_ORIGINS", help = "Comma separated list of allowed origins, or '*'.")]
    pub cors_origins: Option<String>,

    #[clap(long, env = "BMS_BODY_LIMIT_MB", help = "Maximum request body size in megabytes.")]
    pub body_limit_mb: Option<usize>,

    #[clap(long, env = "BMS_IMAGE_MAX_WIDTH", help = "Maximum width of stored images in pixels.")]
    pub image_max_width: Option<u32>,

    #[clap(long, env = "BMS_IMAGE_MAX_HEIGHT", help = "Maximum height of stored images in pixels.")]
    pub image_max_height: Option<u32>,

    #[clap(long, env = "BMS_IMAGE_QUALITY", help = "JPEG quality (1-100) of stored images.")]
    pub image_quality: Option<u8>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    pub fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            cors_origins: other.cors_origins.or(self.cors_origins),
            body_limit_mb: other.body_limit_mb.or(self.body_limit_mb),
            image_max_width: other.image_max_width.or(self.image_max_width),
            image_max_height: other.image_max_height.or(self.image_max_height),
            image_quality: other.image_quality.or(self.image_quality),
        }
    }

    pub fn defaults() -> Config {
        let images = NormalizeOptions::default();
        Config {
            port: Some(8001),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            cors_origins: Some("*".to_string()),
            body_limit_mb: Some(DEFAULT_BODY_LIMIT_MB),
            image_max_width: Some(images.max_width),
            image_max_height: Some(images.max_height),
            image_quality: Some(images.quality),
            ..Default::default()
        }
    }

    /// Reads a JSON config file. Missing or malformed files yield `None`.
    pub fn from_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            log::info!("Config file not found at {}. Using defaults and environment/CLI variables.", path.display());
            return None;
        }
        match fs::read_to_string(path) {
            Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
                Ok(file_config) => Some(file_config),
                Err(e) => {
                    log::warn!("Failed to parse config file {}: {}. Falling back to other sources.", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read config file {}: {}. Falling back to other sources.", path.display(), e);
                None
            }
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(8001)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn cors_origins(&self) -> &str {
        self.cors_origins.as_deref().unwrap_or("*")
    }

    /// Request body cap in bytes.
    pub fn body_limit(&self) -> usize {
        self.body_limit_mb
            .unwrap_or(DEFAULT_BODY_LIMIT_MB)
            .max(1)
            .saturating_mul(1024 * 1024)
    }

    pub fn image_options(&self) -> NormalizeOptions {
        let defaults = NormalizeOptions::default();
        NormalizeOptions::new(
            self.image_max_width.unwrap_or(defaults.max_width),
            self.image_max_height.unwrap_or(defaults.max_height),
            self.image_quality.unwrap_or(defaults.quality),
        )
    }
}

/// Resolves the configuration: defaults, then the JSON file, then env/CLI.
pub fn load_config() -> Config {
    // Parse CLI (and env) first so --config-path can point at the file.
    let cli_args = Config::parse();

    let config_file_path = cli_args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();
    if let Some(file_config) = Config::from_file(&config_file_path) {
        current_config = current_config.merge(file_config);
    }
    current_config.merge(cli_args)
}
