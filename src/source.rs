//! Source discovery: a paint source is either a single image file or a
//! folder of numbered, individually toggleable layer images.
//!
//! Folder layout (all matching is case-insensitive on the file stem):
//! * `Background.*` — optional backdrop, also sampled under fogged cells
//! * `Guide.*` — optional operator-only preview image
//! * `<digits>.*` — layer files; lower numbers render on top

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Error;

/// Extensions accepted as paintable images: PNG, JPG, JPEG, GIF.
pub fn has_image_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("png")
            || ext.eq_ignore_ascii_case("jpg")
            || ext.eq_ignore_ascii_case("jpeg")
            || ext.eq_ignore_ascii_case("gif")
    )
}

/// One numbered image inside a folder source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerFile {
    /// The numeric file stem. Ordering is numeric, so "10" sorts after "2".
    pub number: u32,
    pub path: PathBuf,
}

/// An opened paint source. Immutable once opened; switching sources
/// replaces the whole working set built on top of it.
#[derive(Clone, Debug)]
pub enum Source {
    File {
        path: PathBuf,
    },
    Folder {
        path: PathBuf,
        background: Option<PathBuf>,
        guide: Option<PathBuf>,
        /// Ascending numeric order.
        layers: Vec<LayerFile>,
    },
}

impl Source {
    /// Open a file or folder as a paint source.
    pub fn open(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Err(Error::SourceLoad {
                path: path.to_path_buf(),
                reason: "file does not exist".into(),
            });
        }
        if !path.is_dir() {
            return Ok(Source::File {
                path: path.to_path_buf(),
            });
        }

        let mut background = None;
        let mut guide = None;
        let mut layers = Vec::new();
        for entry in list_files_in_order(path)? {
            if !entry.is_file() {
                continue;
            }
            let Some(stem) = entry.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.eq_ignore_ascii_case("background") {
                background.get_or_insert(entry);
            } else if stem.eq_ignore_ascii_case("guide") {
                guide.get_or_insert(entry);
            } else if let Ok(number) = stem.parse::<u32>() {
                layers.push(LayerFile {
                    number,
                    path: entry,
                });
            }
        }
        layers.sort_by_key(|layer| layer.number);

        if layers.is_empty() {
            return Err(Error::SourceLoad {
                path: path.to_path_buf(),
                reason: "folder contains no numbered layer images".into(),
            });
        }

        Ok(Source::Folder {
            path: path.to_path_buf(),
            background,
            guide,
            layers,
        })
    }

    /// The file or folder this source was opened from.
    pub fn path(&self) -> &Path {
        match self {
            Source::File { path } | Source::Folder { path, .. } => path,
        }
    }

    /// The source's display/persistence name (its file or folder name).
    pub fn name(&self) -> &str {
        self.path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Source::Folder { .. })
    }

    /// Layers of a folder source (empty for file sources), ascending
    /// numeric order.
    pub fn layers(&self) -> &[LayerFile] {
        match self {
            Source::File { .. } => &[],
            Source::Folder { layers, .. } => layers,
        }
    }

    pub fn background(&self) -> Option<&Path> {
        match self {
            Source::File { .. } => None,
            Source::Folder { background, .. } => background.as_deref(),
        }
    }
}

/// Selectable sources inside the configured paint folder: sub-folders and
/// image files, in alphabetical path order.
pub fn list_sources(config: &Config) -> Result<Vec<PathBuf>, Error> {
    Ok(list_files_in_order(&config.paint_folder)?
        .into_iter()
        .filter(|p| p.is_dir() || has_image_extension(p))
        .collect())
}

/// `read_dir` with a stable alphabetical order (the OS order is arbitrary).
fn list_files_in_order(folder: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files: Vec<PathBuf> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    files.sort();
    Ok(files)
}
