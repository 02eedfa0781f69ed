//! Asset catalog: the list of images a batch run should produce

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use pixgen_client::Prompt;

/// Edge length used when neither the asset nor the catalog sets one.
pub const FALLBACK_SIZE: u32 = 512;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Values shared by every asset of a catalog
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogDefaults {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Keys added to structured prompts that do not set them
    #[serde(default)]
    pub prompt: Map<String, Value>,
    /// Order structured prompt keys are sent in. Unlisted keys follow the
    /// listed ones, keeping their relative order.
    #[serde(default)]
    pub key_order: Vec<String>,
}

impl CatalogDefaults {
    fn apply(&self, prompt: &Prompt) -> Prompt {
        match prompt {
            Prompt::Text(_) => prompt.clone(),
            Prompt::Structured(own) => {
                let mut merged: Vec<(String, Value)> =
                    own.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                for (key, value) in &self.prompt {
                    if !own.contains_key(key) {
                        merged.push((key.clone(), value.clone()));
                    }
                }
                merged.sort_by_key(|(key, _)| self.rank(key));
                Prompt::Structured(merged.into_iter().collect())
            }
        }
    }

    fn rank(&self, key: &str) -> usize {
        self.key_order
            .iter()
            .position(|k| k == key)
            .unwrap_or(self.key_order.len())
    }
}

/// One `[[asset]]` entry as written in the file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetEntry {
    pub path: PathBuf,
    pub prompt: Prompt,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub seed: Option<u64>,
    #[serde(default)]
    pub input_images: Vec<String>,
}

/// A fully resolved asset, ready to be requested
#[derive(Debug, Clone, PartialEq)]
pub struct AssetDescriptor {
    pub prompt: Prompt,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
    pub input_images: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    #[serde(default)]
    pub defaults: CatalogDefaults,
    #[serde(default, rename = "asset")]
    pub assets: Vec<AssetEntry>,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::parse(&content)?;
        log::info!(
            "Loaded catalog {} with {} assets",
            path.as_ref().display(),
            catalog.assets.len()
        );
        Ok(catalog)
    }

    pub fn parse(content: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve every entry against the catalog defaults, in file order.
    pub fn descriptors(&self) -> Vec<AssetDescriptor> {
        self.assets
            .iter()
            .map(|entry| AssetDescriptor {
                prompt: self.defaults.apply(&entry.prompt),
                path: entry.path.clone(),
                width: entry.width.or(self.defaults.width).unwrap_or(FALLBACK_SIZE),
                height: entry.height.or(self.defaults.height).unwrap_or(FALLBACK_SIZE),
                seed: entry.seed,
                input_images: entry.input_images.clone(),
            })
            .collect()
    }
}
