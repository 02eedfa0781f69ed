//! Blocking HTTP client: health probe, submit, poll and fetch

use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use thiserror::Error;

use crate::request::{GenerationRequest, Generated, Health, JobStatus, Submitted};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8190";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Image generation server not reachable at {url}")]
    Unreachable { url: String },
    #[error("Server is up but model not loaded yet")]
    PipelineNotLoaded,
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Generation failed: {0}")]
    JobFailed(String),
    #[error("Generation timed out after {secs}s (job_id={job_id})")]
    TimedOut { secs: u64, job_id: String },
    #[error("Failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

/// Connection and polling settings.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    /// Pause between two status checks.
    pub poll_interval: Duration,
    /// Wall-clock budget for one job, measured from submission.
    pub timeout: Duration,
    pub health_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(300),
            health_timeout: Duration::from_secs(5),
        }
    }
}

/// Anything that can turn a request into an image file.
pub trait Generator {
    fn generate(
        &self,
        request: &GenerationRequest,
        save_path: &Path,
    ) -> Result<Generated, ClientError>;
}

pub struct GenerationClient {
    http: Client,
    options: ClientOptions,
}

impl GenerationClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let http = Client::builder().build()?;
        Ok(Self { http, options })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.options.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Check that the server answers and has its pipeline loaded.
    pub fn health(&self) -> Result<(), ClientError> {
        let response = self
            .http
            .get(self.url("/health"))
            .timeout(self.options.health_timeout)
            .send()
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ClientError::Unreachable {
                        url: self.options.base_url.clone(),
                    }
                } else {
                    ClientError::Http(e)
                }
            })?;

        let health: Health = response.error_for_status()?.json()?;
        if !health.pipeline_loaded {
            return Err(ClientError::PipelineNotLoaded);
        }
        Ok(())
    }

    /// Queue a job and return its identifier.
    pub fn submit(&self, request: &GenerationRequest) -> Result<String, ClientError> {
        let submitted: Submitted = self
            .http
            .post(self.url("/generate"))
            .json(request)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(submitted.job_id)
    }

    pub fn status(&self, job_id: &str) -> Result<JobStatus, ClientError> {
        let status = self
            .http
            .get(self.url(&format!("/jobs/{}", job_id)))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(status)
    }

    /// Download the bytes a completed job produced.
    pub fn fetch(&self, output_path: &str) -> Result<Vec<u8>, ClientError> {
        let bytes = self
            .http
            .get(self.url(output_path))
            .send()?
            .error_for_status()?
            .bytes()?;
        Ok(bytes.to_vec())
    }

    /// Run one job to completion and save the image at `save_path`.
    ///
    /// Parent directories of `save_path` are created as needed.
    pub fn generate(
        &self,
        request: &GenerationRequest,
        save_path: &Path,
    ) -> Result<Generated, ClientError> {
        self.health()?;

        let job_id = self.submit(request)?;
        log::info!("Submitted job {} for {}", job_id, save_path.display());

        // A timeout too large to represent means no deadline
        let deadline = Instant::now().checked_add(self.options.timeout);
        while deadline.map_or(true, |d| Instant::now() < d) {
            match self.status(&job_id)? {
                JobStatus::Completed { output_path } => {
                    let bytes = self.fetch(&output_path)?;
                    write_output(save_path, &bytes)?;
                    log::debug!("Job {} saved {} bytes", job_id, bytes.len());
                    return Ok(Generated {
                        job_id,
                        seed: request.seed,
                        save_path: save_path.to_path_buf(),
                    });
                }
                JobStatus::Failed { error } => {
                    return Err(ClientError::JobFailed(
                        error.unwrap_or_else(|| "unknown".to_string()),
                    ));
                }
                pending => {
                    log::debug!("Job {} is {:?}", job_id, pending);
                    std::thread::sleep(self.options.poll_interval);
                }
            }
        }

        Err(ClientError::TimedOut {
            secs: self.options.timeout.as_secs(),
            job_id,
        })
    }
}

impl Generator for GenerationClient {
    fn generate(
        &self,
        request: &GenerationRequest,
        save_path: &Path,
    ) -> Result<Generated, ClientError> {
        GenerationClient::generate(self, request, save_path)
    }
}

fn write_output(save_path: &Path, bytes: &[u8]) -> Result<(), ClientError> {
    if let Some(parent) = save_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(save_path, bytes)?;
    Ok(())
}
