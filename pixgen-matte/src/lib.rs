//! # pixgen-matte
//!
//! Removes the solid near-black backdrop that generated sprites are painted on.
//!
//! The fill starts from every near-black pixel on the image border and spreads
//! through 4-connected near-black neighbours, making them transparent. Dark
//! detail fully enclosed by the subject is never reached, so eyes, outlines
//! and inner shadows stay opaque.
//!
//! ## Example
//!
//! ```no_run
//! use pixgen_matte::{remove_backgrounds, MatteOptions};
//!
//! let options = MatteOptions::default();
//! let report = remove_backgrounds(&["public/assets/sprites"], &options).unwrap();
//! println!("{} files carved", report.processed.len());
//! ```

pub mod batch;
pub mod flood;

pub use batch::{
    collect_targets, process_file, remove_backgrounds, MatteError, MatteOptions, MatteReport,
    Targets,
};
pub use flood::{flood_fill_transparency, strip_background, NearBlack, DEFAULT_THRESHOLD};
