//! Builds the two images a session shows: the operator's control preview
//! and the audience-facing display composite, plus the derived display mask.
//!
//! Folder sources rebuild the composite whenever layer visibility changes;
//! both that rebuild and the display-mask recompute are O(width×height) and
//! are meant to run on the session's background worker.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::error::Error;
use crate::geom::Size;
use crate::mask::{ControlMask, MaskState};
use crate::source::Source;

/// Fully transparent display-mask cell (the audience sees the map).
const SEE_THROUGH: [u8; 4] = [0, 0, 0, 0];

/// Opaque black display-mask cell (plain fog).
const FOG: [u8; 4] = [0, 0, 0, 255];

/// Load an image file as RGBA, with the path attached to any failure.
pub fn load_image(path: &Path) -> Result<RgbaImage, Error> {
    let image = image::open(path).map_err(|e| Error::SourceLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(image.to_rgba8())
}

/// The operator-side preview image. For folders this is the guide file when
/// present, else the highest-numbered layer — either way it establishes the
/// source's canonical dimensions.
pub fn load_control_image(source: &Source) -> Result<RgbaImage, Error> {
    match source {
        Source::File { path } => load_image(path),
        Source::Folder { guide, layers, .. } => {
            if let Some(guide) = guide {
                load_image(guide)
            } else {
                // Source::open guarantees at least one layer.
                load_image(&layers[layers.len() - 1].path)
            }
        }
    }
}

/// Build the audience-facing composite at `canvas` resolution.
///
/// Folder sources: fill with black (or the background file, stretched),
/// then draw visible layers in descending numeric order so the
/// lowest-numbered layer ends up topmost. `visible` runs parallel to
/// `source.layers()`.
pub fn compose_display(
    source: &Source,
    visible: &[bool],
    canvas: Size,
) -> Result<RgbaImage, Error> {
    match source {
        Source::File { path } => load_image(path),
        Source::Folder {
            background, layers, ..
        } => {
            let mut composite =
                RgbaImage::from_pixel(canvas.width, canvas.height, Rgba([0, 0, 0, 255]));
            if let Some(background) = background {
                let bg = load_image(background)?;
                draw_fitted(&mut composite, bg, canvas);
            }
            for (index, layer) in layers.iter().enumerate().rev() {
                if !visible.get(index).copied().unwrap_or(false) {
                    continue;
                }
                let image = load_image(&layer.path)?;
                draw_fitted(&mut composite, image, canvas);
            }
            Ok(composite)
        }
    }
}

/// Overlay `image` across the whole canvas, stretching if dimensions differ.
fn draw_fitted(canvas: &mut RgbaImage, image: RgbaImage, size: Size) {
    if image.width() == size.width && image.height() == size.height {
        imageops::overlay(canvas, &image, 0, 0);
    } else {
        let scaled = imageops::resize(&image, size.width, size.height, FilterType::Triangle);
        imageops::overlay(canvas, &scaled, 0, 0);
    }
}

/// Load the folder source's background downsampled to mask resolution, for
/// use under fogged cells. `None` when the source has no background file.
pub fn scaled_background(source: &Source, mask_size: Size) -> Result<Option<RgbaImage>, Error> {
    match source.background() {
        None => Ok(None),
        Some(path) => {
            let image = load_image(path)?;
            Ok(Some(imageops::resize(
                &image,
                mask_size.width,
                mask_size.height,
                FilterType::Triangle,
            )))
        }
    }
}

/// Derive the display mask from the control mask: revealed cells go fully
/// transparent; hidden cells go opaque black, or take the matching pixel of
/// the downsampled background so fog shows a dim echo of the terrain.
///
/// This is the expensive conversion that only runs on an explicit commit.
pub fn recompute_display_mask(
    mask: &ControlMask,
    background: Option<&RgbaImage>,
) -> Result<RgbaImage, Error> {
    let width = mask.width() as usize;
    let height = mask.height() as usize;
    let mask_image = mask.image();

    let mut buffer = vec![0u8; width * height * 4];
    buffer
        .par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                let cell = MaskState::from_color(*mask_image.get_pixel(x as u32, y as u32));
                let pixel = match cell {
                    MaskState::Revealed => SEE_THROUGH,
                    MaskState::Hidden => match background {
                        Some(bg) => {
                            let bx = (x as u32).min(bg.width().saturating_sub(1));
                            let by = (y as u32).min(bg.height().saturating_sub(1));
                            bg.get_pixel(bx, by).0
                        }
                        None => FOG,
                    },
                };
                row[x * 4..x * 4 + 4].copy_from_slice(&pixel);
            }
        });

    RgbaImage::from_raw(mask.width(), mask.height(), buffer)
        .ok_or_else(|| Error::Recompute("display mask buffer size mismatch".into()))
}
