//! # pixgen-client
//!
//! Blocking client for an image generation service that works in jobs:
//! a request is submitted, its status is polled at a fixed interval until it
//! completes or fails, and the produced image is downloaded.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use pixgen_client::{ClientOptions, GenerationClient, GenerationRequest, Prompt};
//!
//! let client = GenerationClient::new(ClientOptions::default()).unwrap();
//! let request = GenerationRequest::new(Prompt::detect("a red mushroom, pixel art"))
//!     .with_size(512, 512)
//!     .with_seed(Some(7));
//! let generated = client.generate(&request, Path::new("out/mushroom.png")).unwrap();
//! println!("job {} done", generated.job_id);
//! ```

mod client;
mod request;

pub use client::{ClientError, ClientOptions, GenerationClient, Generator, DEFAULT_SERVER_URL};
pub use request::{
    GenerationRequest, Generated, JobStatus, Prompt, DEFAULT_GUIDANCE_SCALE, DEFAULT_SIZE,
    DEFAULT_STEPS,
};
