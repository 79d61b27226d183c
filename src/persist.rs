//! Saving and restoring per-source state: the control mask as a lossless
//! PNG and the zoom/pan/grid record as a small JSON file.
//!
//! Both files live in the config's data folder, keyed by the source's name.
//! Folder sources get an `.f` infix on the mask file so a folder and a
//! file with the same name cannot collide. A saved mask is only trusted if
//! it is strictly newer than the source it was painted over; otherwise the
//! session starts from a fresh, fully-hidden mask.
//!
//! Load failures are never fatal — they log and fall back to defaults.
//! Write failures log and leave the in-memory state running.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use image::codecs::png::PngEncoder;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::geom::{Point, Size};
use crate::grid::GridData;
use crate::mask::ControlMask;
use crate::source::Source;
use crate::{log_err, log_warn};

/// The persisted viewport/grid record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaintData {
    #[serde(default = "PaintData::default_zoom")]
    pub display_zoom: f64,
    #[serde(default)]
    pub window_center: Point,
    #[serde(default)]
    pub grid: Option<GridData>,
}

impl Default for PaintData {
    fn default() -> Self {
        Self {
            display_zoom: Self::default_zoom(),
            window_center: Point::default(),
            grid: None,
        }
    }
}

impl PaintData {
    fn default_zoom() -> f64 {
        1.0
    }
}

/// Where the source's mask PNG is stored.
pub fn mask_path(config: &Config, source: &Source) -> PathBuf {
    let name = if source.is_folder() {
        format!("{}.f.mask", source.name())
    } else {
        format!("{}.mask", source.name())
    };
    config.data_folder.join(name)
}

/// Where the source's `.data` record is stored.
pub fn data_path(config: &Config, source: &Source) -> PathBuf {
    config.data_folder.join(format!("{}.data", source.name()))
}

/// Load the saved mask for a source, or a fresh fully-hidden mask when the
/// file is absent, stale, unreadable, or the wrong size for the source.
pub fn load_mask(config: &Config, source: &Source, source_size: Size) -> ControlMask {
    let path = mask_path(config, source);
    let expected = ControlMask::dimensions_for(source_size, config.pixels_per_mask);

    if is_strictly_newer(&path, source) {
        match open_mask_image(&path) {
            Ok(image) => {
                let image = image.to_rgba8();
                if image.dimensions() == (expected.width, expected.height) {
                    return ControlMask::from_image(image);
                }
                log_warn!(
                    "saved mask {:?} is {}x{} but source needs {}x{}; starting fresh",
                    path,
                    image.width(),
                    image.height(),
                    expected.width,
                    expected.height
                );
            }
            Err(e) => {
                log_err!("cannot load saved mask {:?}: {}", path, e);
            }
        }
    }
    ControlMask::new(source_size, config.pixels_per_mask)
}

/// Decode a saved mask. The `.mask` extension says nothing about the
/// format, so sniff it from the file contents.
fn open_mask_image(path: &std::path::Path) -> Result<image::DynamicImage, Error> {
    let reader = image::io::Reader::open(path)?.with_guessed_format()?;
    Ok(reader.decode()?)
}

/// Save the mask as a lossless PNG.
pub fn save_mask(config: &Config, source: &Source, mask: &ControlMask) -> Result<(), Error> {
    fs::create_dir_all(&config.data_folder)?;
    let path = mask_path(config, source);
    let file = File::create(&path).map_err(|e| Error::Persist(format!("{:?}: {}", path, e)))?;
    let mut writer = BufWriter::new(file);
    let encoder = PngEncoder::new(&mut writer);
    let image = mask.image();
    #[allow(deprecated)]
    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| Error::Persist(format!("{:?}: {}", path, e)))?;
    Ok(())
}

/// Load the saved `.data` record, falling back to defaults on any failure.
pub fn load_data(config: &Config, source: &Source) -> PaintData {
    let path = data_path(config, source);
    if !path.exists() {
        return PaintData::default();
    }
    match fs::read_to_string(&path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(e) => {
                log_err!("cannot parse {:?}: {}", path, e);
                PaintData::default()
            }
        },
        Err(e) => {
            log_err!("cannot read {:?}: {}", path, e);
            PaintData::default()
        }
    }
}

/// Write the `.data` record as JSON.
pub fn save_data(config: &Config, source: &Source, data: &PaintData) -> Result<(), Error> {
    fs::create_dir_all(&config.data_folder)?;
    let path = data_path(config, source);
    let text = serde_json::to_string(data)?;
    fs::write(&path, text).map_err(|e| Error::Persist(format!("{:?}: {}", path, e)))?;
    Ok(())
}

/// True when the mask file's mtime is strictly newer than the source's —
/// a repainted or re-exported source invalidates old fog.
fn is_strictly_newer(mask_file: &std::path::Path, source: &Source) -> bool {
    let mask_time = fs::metadata(mask_file).and_then(|m| m.modified());
    let source_time = fs::metadata(source.path()).and_then(|m| m.modified());
    match (mask_time, source_time) {
        (Ok(mask), Ok(source)) => mask > source,
        _ => false,
    }
}
