//! Wire types exchanged with the generation service

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_SIZE: u32 = 1024;
pub const DEFAULT_STEPS: u32 = 20;
pub const DEFAULT_GUIDANCE_SCALE: f64 = 5.0;

/// Either free text or a structured key/value description of the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt {
    Text(String),
    Structured(Map<String, Value>),
}

impl Prompt {
    /// Treat `raw` as a structured prompt when it is a JSON object, as text otherwise.
    pub fn detect(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Self::Structured(map),
            _ => Self::Text(raw.to_string()),
        }
    }
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Body of a submit call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: Prompt,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance_scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Reference images for image-to-image generation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub input_images: Vec<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<Prompt>) -> Self {
        Self {
            prompt: prompt.into(),
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            steps: DEFAULT_STEPS,
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
            seed: None,
            input_images: Vec::new(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_guidance_scale(mut self, guidance_scale: f64) -> Self {
        self.guidance_scale = guidance_scale;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_input_images(mut self, input_images: Vec<String>) -> Self {
        self.input_images = input_images;
        self
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Health {
    #[serde(default)]
    pub pipeline_loaded: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Submitted {
    pub job_id: String,
}

/// Job state reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed {
        /// Server-relative location of the produced image.
        output_path: String,
    },
    Failed {
        #[serde(default)]
        error: Option<String>,
    },
    /// Any state this client does not know; polling continues.
    #[serde(other)]
    Unknown,
}

/// Outcome of a finished job, printed as JSON by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generated {
    pub job_id: String,
    pub seed: Option<u64>,
    pub save_path: PathBuf,
}
