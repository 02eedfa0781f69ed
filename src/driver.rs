//! Batch driver: request every catalog asset, one job at a time

use std::path::PathBuf;

use pixgen_client::{GenerationRequest, Generator};

use crate::catalog::AssetDescriptor;

/// Request settings that come from the settings file rather than the catalog
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestDefaults {
    pub steps: u32,
    pub guidance_scale: f64,
}

impl AssetDescriptor {
    pub fn to_request(&self, defaults: &RequestDefaults) -> GenerationRequest {
        GenerationRequest::new(self.prompt.clone())
            .with_size(self.width, self.height)
            .with_steps(defaults.steps)
            .with_guidance_scale(defaults.guidance_scale)
            .with_seed(self.seed)
            .with_input_images(self.input_images.clone())
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub generated: Vec<PathBuf>,
    /// Output path and error message of every asset that did not make it
    pub failed: Vec<(PathBuf, String)>,
}

/// Generate each asset in order. A failing asset is reported and skipped;
/// the batch always runs to the end.
pub fn run_batch<G: Generator>(
    generator: &G,
    assets: &[AssetDescriptor],
    defaults: &RequestDefaults,
) -> BatchReport {
    let total = assets.len();
    let mut report = BatchReport::default();

    for (i, asset) in assets.iter().enumerate() {
        let name = asset
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("[{}/{}] Generating {}...", i + 1, total, name);

        match generator.generate(&asset.to_request(defaults), &asset.path) {
            Ok(generated) => {
                println!("  -> Done: {}", generated.save_path.display());
                report.generated.push(generated.save_path);
            }
            Err(e) => {
                log::error!("  -> FAILED: {}: {}", name, e);
                report.failed.push((asset.path.clone(), e.to_string()));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixgen_client::{ClientError, Generated, Prompt};
    use std::cell::RefCell;
    use std::path::Path;

    /// Records every request; fails for paths containing "broken".
    #[derive(Default)]
    struct FakeGenerator {
        seen: RefCell<Vec<(PathBuf, GenerationRequest)>>,
    }

    impl Generator for FakeGenerator {
        fn generate(
            &self,
            request: &GenerationRequest,
            save_path: &Path,
        ) -> Result<Generated, ClientError> {
            self.seen
                .borrow_mut()
                .push((save_path.to_path_buf(), request.clone()));
            if save_path.to_string_lossy().contains("broken") {
                return Err(ClientError::JobFailed("model crashed".into()));
            }
            Ok(Generated {
                job_id: format!("job-{}", self.seen.borrow().len()),
                seed: request.seed,
                save_path: save_path.to_path_buf(),
            })
        }
    }

    fn asset(path: &str, seed: Option<u64>) -> AssetDescriptor {
        AssetDescriptor {
            prompt: Prompt::Text(format!("sprite for {}", path)),
            path: PathBuf::from(path),
            width: 512,
            height: 512,
            seed,
            input_images: Vec::new(),
        }
    }

    const DEFAULTS: RequestDefaults = RequestDefaults {
        steps: 28,
        guidance_scale: 4.0,
    };

    #[test]
    fn test_failure_does_not_stop_batch() {
        let generator = FakeGenerator::default();
        let assets = vec![
            asset("sprites/a.png", Some(1)),
            asset("sprites/broken.png", Some(2)),
            asset("sprites/c.png", None),
        ];

        let report = run_batch(&generator, &assets, &DEFAULTS);

        assert_eq!(
            report.generated,
            vec![PathBuf::from("sprites/a.png"), PathBuf::from("sprites/c.png")]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, PathBuf::from("sprites/broken.png"));
        assert_eq!(report.failed[0].1, "Generation failed: model crashed");

        let seen: Vec<PathBuf> = generator.seen.borrow().iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], PathBuf::from("sprites/c.png"));
    }

    #[test]
    fn test_request_built_from_descriptor_and_defaults() {
        let generator = FakeGenerator::default();
        let mut baby = asset("sprites/baby_gecko.png", Some(220));
        baby.input_images = vec!["sprites/animal_gecko.png".into()];
        baby.width = 256;

        run_batch(&generator, &[baby], &DEFAULTS);

        let seen = generator.seen.borrow();
        let request = &seen[0].1;
        assert_eq!((request.width, request.height), (256, 512));
        assert_eq!(request.steps, 28);
        assert_eq!(request.guidance_scale, 4.0);
        assert_eq!(request.seed, Some(220));
        assert_eq!(request.input_images, vec!["sprites/animal_gecko.png"]);
    }

    #[test]
    fn test_empty_batch() {
        let report = run_batch(&FakeGenerator::default(), &[], &DEFAULTS);
        assert!(report.generated.is_empty());
        assert!(report.failed.is_empty());
    }
}
