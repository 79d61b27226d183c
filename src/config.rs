//! Runtime configuration, constructed once by the host and passed to the
//! components that need it. An explicit value rather than process-wide
//! statics, so two configs (e.g. in tests) can coexist.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::geom::Size;

/// Default number of source-image pixels covered by a single mask cell.
///
/// * higher number → blockier shadows
/// * lower number → finer shadows, but more memory and CPU per rebuild
pub const PIXELS_PER_MASK: u32 = 5;

#[derive(Clone, Debug)]
pub struct Config {
    /// Folder the operator picks paint sources from.
    pub paint_folder: PathBuf,
    /// Folder that holds saved masks and `.data` records, kept separate
    /// from the session images themselves.
    pub data_folder: PathBuf,
    /// Resolution of the audience-facing display.
    pub display_size: Size,
    /// Source pixels per mask cell (`K`). Fixed for the config's lifetime.
    pub pixels_per_mask: u32,
}

impl Config {
    /// Build a config rooted at `base`: sources under `base/Paint`, saved
    /// state under `base/Data/Paint`.
    pub fn new(base: &Path, display_size: Size) -> Self {
        Self {
            paint_folder: base.join("Paint"),
            data_folder: base.join("Data").join("Paint"),
            display_size,
            pixels_per_mask: PIXELS_PER_MASK,
        }
    }

    /// Create the source and data folders if they do not exist.
    pub fn ensure_folders(&self) -> Result<(), Error> {
        fs::create_dir_all(&self.paint_folder)?;
        fs::create_dir_all(&self.data_folder)?;
        Ok(())
    }
}
