//! Applying the matte to PNG files on disk

use std::path::{Path, PathBuf};

use glob::glob;
use thiserror::Error;

use crate::flood::{strip_background, NearBlack};

#[derive(Error, Debug)]
pub enum MatteError {
    #[error("Failed to process image: {0}")]
    ImageError(#[from] image::ImageError),
    #[error("Invalid file pattern: {0}")]
    PatternError(#[from] glob::PatternError),
}

/// How a batch of files is selected and carved.
#[derive(Debug, Clone, Default)]
pub struct MatteOptions {
    pub near_black: NearBlack,
    /// File-name fragments that exempt a file, e.g. a scene whose dark
    /// areas belong to the picture.
    pub exclude: Vec<String>,
}

impl MatteOptions {
    fn is_excluded(&self, path: &Path) -> bool {
        let name = file_name(path);
        self.exclude.iter().any(|fragment| name.contains(fragment.as_str()))
    }
}

/// Files chosen for a batch, in processing order.
#[derive(Debug, Default)]
pub struct Targets {
    pub files: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Result of one batch run.
#[derive(Debug, Default)]
pub struct MatteReport {
    /// Processed files and how many pixels each lost to the matte.
    pub processed: Vec<(PathBuf, usize)>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, MatteError)>,
}

impl MatteReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Load a PNG, carve its border-connected background and overwrite it.
pub fn process_file(path: &Path, near_black: NearBlack) -> Result<usize, MatteError> {
    let img = image::open(path)?;
    let (rgba, carved) = strip_background(img, near_black);
    rgba.save(path)?;
    Ok(carved)
}

/// List the `*.png` files of each directory, directories in the given order
/// and files sorted by name within each one.
pub fn collect_targets<P: AsRef<Path>>(
    dirs: &[P],
    options: &MatteOptions,
) -> Result<Targets, MatteError> {
    let mut targets = Targets::default();

    for dir in dirs {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            log::warn!("Skipping missing directory: {}", dir.display());
            continue;
        }

        let clean_path = dir.to_string_lossy();
        let clean_path = clean_path.trim_end_matches('/');
        let pattern = format!("{}/*.png", glob::Pattern::escape(clean_path));

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in glob(&pattern)? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => log::warn!("Unreadable entry in {}: {}", dir.display(), e),
            }
        }
        files.sort_by_key(|path| file_name(path));

        for path in files {
            if options.is_excluded(&path) {
                log::info!("Excluded: {}", path.display());
                targets.skipped.push(path);
            } else {
                targets.files.push(path);
            }
        }
    }

    Ok(targets)
}

/// Carve the background of every PNG under `dirs`.
///
/// A file that cannot be decoded or written is logged and recorded in the
/// report; the remaining files are still processed.
pub fn remove_backgrounds<P: AsRef<Path>>(
    dirs: &[P],
    options: &MatteOptions,
) -> Result<MatteReport, MatteError> {
    let targets = collect_targets(dirs, options)?;
    let total = targets.files.len();
    let mut report = MatteReport {
        skipped: targets.skipped,
        ..Default::default()
    };

    println!("Processing {} sprites...", total);

    for (i, path) in targets.files.into_iter().enumerate() {
        println!("  [{}/{}] {}", i + 1, total, file_name(&path));
        match process_file(&path, options.near_black) {
            Ok(carved) => {
                log::debug!("{}: {} pixels made transparent", path.display(), carved);
                report.processed.push((path, carved));
            }
            Err(e) => {
                log::warn!("Failed to process {}: {}", path.display(), e);
                report.failed.push((path, e));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::fs;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn write_sprite(path: &Path) {
        let mut img = RgbaImage::from_pixel(4, 4, BLACK);
        img.put_pixel(1, 1, WHITE);
        img.save(path).unwrap();
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| file_name(p)).collect()
    }

    struct Fixture {
        _root: tempfile::TempDir,
        sprites: PathBuf,
        backgrounds: PathBuf,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let sprites = root.path().join("sprites");
        let backgrounds = root.path().join("backgrounds");
        fs::create_dir_all(&sprites).unwrap();
        fs::create_dir_all(&backgrounds).unwrap();

        write_sprite(&sprites.join("coin.png"));
        write_sprite(&sprites.join("animal_gecko.png"));
        write_sprite(&backgrounds.join("terrarium_bg.png"));
        write_sprite(&backgrounds.join("terrarium_desert.png"));
        fs::write(sprites.join("notes.txt"), "not an image").unwrap();

        Fixture {
            _root: root,
            sprites,
            backgrounds,
        }
    }

    fn options() -> MatteOptions {
        MatteOptions {
            exclude: vec!["terrarium_bg".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_collect_targets_order_and_exclusion() {
        let fx = fixture();
        let targets = collect_targets(&[&fx.sprites, &fx.backgrounds], &options()).unwrap();

        assert_eq!(
            names(&targets.files),
            vec!["animal_gecko.png", "coin.png", "terrarium_desert.png"]
        );
        assert_eq!(names(&targets.skipped), vec!["terrarium_bg.png"]);
    }

    #[test]
    fn test_collect_targets_skips_missing_directory() {
        let fx = fixture();
        let missing = fx.sprites.join("does_not_exist");
        let targets = collect_targets(&[&missing, &fx.backgrounds], &options()).unwrap();

        assert_eq!(names(&targets.files), vec!["terrarium_desert.png"]);
    }

    #[test]
    fn test_png_suffix_is_case_sensitive() {
        let fx = fixture();
        write_sprite(&fx.sprites.join("LOUD.PNG"));
        let targets = collect_targets(&[&fx.sprites], &options()).unwrap();

        assert!(!names(&targets.files).contains(&"LOUD.PNG".to_string()));
    }

    #[test]
    fn test_process_file_rewrites_in_place() {
        let fx = fixture();
        let path = fx.sprites.join("coin.png");

        let carved = process_file(&path, NearBlack::default()).unwrap();
        let img = image::open(&path).unwrap().into_rgba8();

        assert_eq!(carved, 15);
        assert_eq!(*img.get_pixel(1, 1), WHITE);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_corrupt_file_does_not_stop_batch() {
        let fx = fixture();
        fs::write(fx.sprites.join("broken.png"), b"definitely not a png").unwrap();

        let report = remove_backgrounds(&[&fx.sprites, &fx.backgrounds], &options()).unwrap();

        assert!(!report.is_clean());
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].0.ends_with("broken.png"));
        assert_eq!(report.processed.len(), 3);
        assert!(report.processed.iter().all(|(_, carved)| *carved == 15));
    }

    #[test]
    fn test_excluded_file_left_alone() {
        let fx = fixture();
        let excluded = fx.backgrounds.join("terrarium_bg.png");
        let before = fs::read(&excluded).unwrap();

        let report = remove_backgrounds(&[&fx.sprites, &fx.backgrounds], &options()).unwrap();

        assert!(report.is_clean());
        assert_eq!(fs::read(&excluded).unwrap(), before);
        let img = image::open(&excluded).unwrap().into_rgba8();
        assert_eq!(img.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn test_batch_twice_matches_once() {
        let fx = fixture();
        let path = fx.sprites.join("animal_gecko.png");

        remove_backgrounds(&[&fx.sprites], &options()).unwrap();
        let once = image::open(&path).unwrap().into_rgba8();
        remove_backgrounds(&[&fx.sprites], &options()).unwrap();
        let twice = image::open(&path).unwrap().into_rgba8();

        assert_eq!(once, twice);
    }
}
