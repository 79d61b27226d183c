//! The pan/zoom window mapping source-image space onto the fixed-resolution
//! audience display.
//!
//! Zoom is measured in source pixels per display pixel: higher zooms out,
//! lower zooms in. The pan center is stored verbatim in mask-cell units and
//! the top-left window offset is re-derived (and clamped) whenever either
//! changes.

use crate::geom::{Point, Size};

/// Fully zoomed in — one display pixel shows a hundredth of a source pixel.
pub const MIN_ZOOM: f64 = 0.01;

#[derive(Clone, Debug)]
pub struct Viewport {
    /// Source image dimensions, in source pixels.
    source_size: Size,
    /// Audience display dimensions, in display pixels.
    display_size: Size,
    /// Source pixels per mask cell.
    pixels_per_mask: u32,
    /// Current zoom (source pixels per display pixel), always within
    /// `[MIN_ZOOM, max_zoom]`.
    zoom: f64,
    /// Window center in mask-cell units, stored verbatim.
    window_center: Point,
    /// Derived top-left corner of the window, in source pixels.
    offset: Point,
}

impl Viewport {
    pub fn new(
        source_size: Size,
        display_size: Size,
        pixels_per_mask: u32,
        zoom: f64,
        window_center: Point,
    ) -> Self {
        let mut viewport = Self {
            source_size,
            display_size,
            pixels_per_mask,
            zoom: 1.0,
            window_center,
            offset: Point::default(),
        };
        viewport.zoom = viewport.bound_zoom(zoom);
        viewport.update_offset();
        viewport
    }

    /// Zooming out stops once the image fills the display on its tighter
    /// axis; beyond that both axes would show blank space at once.
    pub fn max_zoom(&self) -> f64 {
        (self.source_size.width as f64 / self.display_size.width as f64)
            .max(self.source_size.height as f64 / self.display_size.height as f64)
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn window_center(&self) -> Point {
        self.window_center
    }

    /// Top-left corner of the audience window, in source-image pixels.
    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Set the zoom, clamped to `[MIN_ZOOM, max_zoom]`, and re-derive the
    /// offset around the existing center.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = self.bound_zoom(zoom);
        self.update_offset();
    }

    /// Move the window center (mask-cell units, stored verbatim) and
    /// re-derive the offset.
    pub fn set_window_center(&mut self, center: Point) {
        self.window_center = center;
        self.update_offset();
    }

    /// The rectangle to outline on an editing surface of the given size,
    /// showing the operator what the audience currently sees. When the
    /// zoomed window is larger than the surface on an axis the rectangle
    /// overhangs symmetrically instead of clamping.
    pub fn indicator_rect(&self, surface: Size) -> (i32, i32, i32, i32) {
        let w = (self.display_size.width as f64 * self.zoom * surface.width as f64
            / self.source_size.width as f64)
            .round() as i32;
        let h = (self.display_size.height as f64 * self.zoom * surface.height as f64
            / self.source_size.height as f64)
            .round() as i32;
        let x = if w > surface.width as i32 {
            -(w - surface.width as i32) / 2
        } else {
            self.offset.x * surface.width as i32 / self.source_size.width as i32
        };
        let y = if h > surface.height as i32 {
            -(h - surface.height as i32) / 2
        } else {
            self.offset.y * surface.height as i32 / self.source_size.height as i32
        };
        (x, y, w, h)
    }

    fn bound_zoom(&self, zoom: f64) -> f64 {
        let max = self.max_zoom();
        if zoom < MIN_ZOOM {
            MIN_ZOOM
        } else if zoom > max {
            max
        } else {
            zoom
        }
    }

    fn update_offset(&mut self) {
        let half_w = (self.display_size.width as f64 * self.zoom / 2.0).round() as i32;
        let half_h = (self.display_size.height as f64 * self.zoom / 2.0).round() as i32;
        let x = self.window_center.x * self.pixels_per_mask as i32 - half_w;
        let y = self.window_center.y * self.pixels_per_mask as i32 - half_h;
        let x_max = self.source_size.width as i32
            - (self.display_size.width as f64 * self.zoom).round() as i32;
        let y_max = self.source_size.height as i32
            - (self.display_size.height as f64 * self.zoom).round() as i32;
        self.offset = Point::new(bound_to(x, 0, x_max), bound_to(y, 0, y_max));
    }
}

/// Clamp with the upper bound checked first. When the zoomed window is
/// larger than the source on an axis the bounds invert (`max < min`) and
/// values above `max` still resolve to `max`; this is long-standing
/// behavior the display relies on, so keep the check order as-is (see the
/// `inverted_clamp_*` tests before changing anything here).
fn bound_to(value: i32, min: i32, max: i32) -> i32 {
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}
