//! Settings loading from pixgen.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use pixgen_client::{ClientOptions, DEFAULT_GUIDANCE_SCALE, DEFAULT_SERVER_URL, DEFAULT_STEPS};
use pixgen_matte::{MatteOptions, NearBlack, DEFAULT_THRESHOLD};

use crate::driver::RequestDefaults;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub matte: MatteConfig,
}

/// Generation service connection and request tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Denoising steps sent with every request
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f64,
    /// Give up on a job after this many seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            steps: default_steps(),
            guidance_scale: default_guidance_scale(),
            timeout_secs: default_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            health_timeout_secs: default_health_timeout_secs(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}
fn default_steps() -> u32 {
    DEFAULT_STEPS
}
fn default_guidance_scale() -> f64 {
    DEFAULT_GUIDANCE_SCALE
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_poll_interval_secs() -> u64 {
    2
}
fn default_health_timeout_secs() -> u64 {
    5
}

impl ServerConfig {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.url.clone(),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            health_timeout: Duration::from_secs(self.health_timeout_secs),
        }
    }

    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            steps: self.steps,
            guidance_scale: self.guidance_scale,
        }
    }
}

/// Background removal settings
#[derive(Debug, Clone, Deserialize)]
pub struct MatteConfig {
    /// R, G and B must all be below this for a pixel to count as background
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    /// Directories to process, in order
    #[serde(default = "default_dirs")]
    pub dirs: Vec<PathBuf>,
    /// File-name fragments that are never processed
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for MatteConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            dirs: default_dirs(),
            exclude: default_exclude(),
        }
    }
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

fn default_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("public/assets/sprites"),
        PathBuf::from("public/assets/backgrounds"),
    ]
}

fn default_exclude() -> Vec<String> {
    vec!["terrarium_bg".to_string()]
}

impl MatteConfig {
    pub fn matte_options(&self) -> MatteOptions {
        MatteOptions {
            near_black: NearBlack::new(self.threshold),
            exclude: self.exclude.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from `path` if it exists, built-in defaults otherwise
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config = Self::load(path)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(config)
    }
}
