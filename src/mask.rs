//! The reveal/hide raster ("control mask") the operator paints on.
//!
//! The mask lives at a much lower resolution than the source image: one cell
//! covers `pixels_per_mask` source pixels on each axis. Cells hold exactly
//! one of two paint states, encoded as two fixed RGBA colors so the buffer
//! can be blitted straight over the control preview and color-keyed when the
//! display mask is rebuilt. The same buffer is what gets persisted as a PNG.

use image::{Rgba, RgbaImage};

use crate::geom::Size;

/// Cell color for regions the audience can see (semi-transparent green on
/// the operator's preview).
pub const REVEAL_COLOR: Rgba<u8> = Rgba([100, 255, 100, 153]);

/// Cell color for fogged regions (semi-transparent red on the operator's
/// preview).
pub const HIDE_COLOR: Rgba<u8> = Rgba([255, 100, 100, 153]);

/// Paint state of a single mask cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskState {
    Revealed,
    Hidden,
}

impl MaskState {
    pub fn color(self) -> Rgba<u8> {
        match self {
            MaskState::Revealed => REVEAL_COLOR,
            MaskState::Hidden => HIDE_COLOR,
        }
    }

    /// Color-keyed decode: exactly the reveal color means revealed, anything
    /// else counts as hidden. Keeps old saved masks valid even if stray
    /// pixels crept in.
    pub fn from_color(color: Rgba<u8>) -> Self {
        if color == REVEAL_COLOR {
            MaskState::Revealed
        } else {
            MaskState::Hidden
        }
    }
}

/// The operator-editable mask raster.
///
/// Dimensions are derived once from the source image and never change for
/// the life of a source.
pub struct ControlMask {
    image: RgbaImage,
}

impl ControlMask {
    /// Mask dimensions for a source image: `ceil(source / pixels_per_mask)`
    /// per axis, so edge pixels of non-multiple sources still get a cell.
    pub fn dimensions_for(source: Size, pixels_per_mask: u32) -> Size {
        Size::new(
            source.width.div_ceil(pixels_per_mask),
            source.height.div_ceil(pixels_per_mask),
        )
    }

    /// Create a fresh, fully-hidden mask for a source image.
    pub fn new(source: Size, pixels_per_mask: u32) -> Self {
        let dims = Self::dimensions_for(source, pixels_per_mask);
        Self {
            image: RgbaImage::from_pixel(dims.width, dims.height, HIDE_COLOR),
        }
    }

    /// Wrap a previously saved mask image (dimensions are taken as-is; the
    /// caller is responsible for checking them against the source).
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }

    /// The raw raster, used for blitting onto the control preview and for
    /// persistence.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Paint state at a cell, or `None` outside the mask.
    pub fn point(&self, x: i32, y: i32) -> Option<MaskState> {
        if x < 0 || y < 0 || x as u32 >= self.image.width() || y as u32 >= self.image.height() {
            return None;
        }
        Some(MaskState::from_color(*self.image.get_pixel(x as u32, y as u32)))
    }

    /// Set a single cell. Out-of-bounds coordinates are ignored.
    pub fn set_point(&mut self, x: i32, y: i32, state: MaskState) {
        if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height() {
            self.image.put_pixel(x as u32, y as u32, state.color());
        }
    }

    /// Set every cell to `state`. This is a bulk memory fill — cheap enough
    /// to run on the interaction thread even for large masks.
    pub fn fill_all(&mut self, state: MaskState) {
        let color = state.color();
        for pixel in self.image.pixels_mut() {
            *pixel = color;
        }
    }

    /// Fill an axis-aligned rectangle, clipped to the mask. `w`/`h` at or
    /// below zero fill nothing (matches the deferred rectangle pen, which
    /// uses the raw press/release difference).
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, state: MaskState) {
        if w <= 0 || h <= 0 {
            return;
        }
        let color = state.color();
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.image.width() as i32);
        let y1 = (y + h).min(self.image.height() as i32);
        for cy in y0..y1 {
            for cx in x0..x1 {
                self.image.put_pixel(cx as u32, cy as u32, color);
            }
        }
    }

    /// Fill an axis-aligned ellipse centered on a cell, with independent
    /// per-axis radii (the stroke layer scales a round on-screen pen into
    /// mask space, where the two axes usually differ).
    pub fn fill_ellipse(&mut self, cx: i32, cy: i32, rx: f64, ry: f64, state: MaskState) {
        if rx <= 0.0 || ry <= 0.0 {
            self.set_point(cx, cy, state);
            return;
        }
        let color = state.color();
        let x0 = ((cx as f64 - rx).floor() as i32).max(0);
        let y0 = ((cy as f64 - ry).floor() as i32).max(0);
        let x1 = ((cx as f64 + rx).ceil() as i32).min(self.image.width() as i32 - 1);
        let y1 = ((cy as f64 + ry).ceil() as i32).min(self.image.height() as i32 - 1);
        for y in y0..=y1 {
            let dy = (y - cy) as f64 / ry;
            for x in x0..=x1 {
                let dx = (x - cx) as f64 / rx;
                if dx * dx + dy * dy <= 1.0 {
                    self.image.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }

    /// Scanline-fill a polygon (even-odd rule). Vertices are cell
    /// coordinates; a cell is filled when its center lies inside. Handles
    /// the convex quads and hexes the pens produce, degenerate (zero-area)
    /// polygons fill nothing.
    pub fn fill_polygon(&mut self, xs: &[i32], ys: &[i32], state: MaskState) {
        let n = xs.len();
        if n < 3 || ys.len() != n {
            return;
        }
        let color = state.color();
        let min_y = ys.iter().copied().min().unwrap_or(0).max(0);
        let max_y = ys
            .iter()
            .copied()
            .max()
            .unwrap_or(-1)
            .min(self.image.height() as i32 - 1);

        let mut crossings: Vec<f64> = Vec::with_capacity(n);
        for y in min_y..=max_y {
            let yc = y as f64 + 0.5;
            crossings.clear();
            let mut j = n - 1;
            for i in 0..n {
                let yi = ys[i] as f64;
                let yj = ys[j] as f64;
                if (yi <= yc && yj > yc) || (yj <= yc && yi > yc) {
                    let t = (yc - yi) / (yj - yi);
                    crossings.push(xs[i] as f64 + t * (xs[j] - xs[i]) as f64);
                }
                j = i;
            }
            crossings.sort_by(f64::total_cmp);
            for pair in crossings.chunks_exact(2) {
                let x0 = ((pair[0] - 0.5).ceil() as i32).max(0);
                let x1 = ((pair[1] - 0.5).floor() as i32).min(self.image.width() as i32 - 1);
                for x in x0..=x1 {
                    self.image.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }

    /// Number of cells currently in `state`.
    pub fn count(&self, state: MaskState) -> usize {
        self.image
            .pixels()
            .filter(|p| MaskState::from_color(**p) == state)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_round_up() {
        assert_eq!(
            ControlMask::dimensions_for(Size::new(2000, 1000), 5),
            Size::new(400, 200)
        );
        assert_eq!(
            ControlMask::dimensions_for(Size::new(2001, 999), 5),
            Size::new(401, 200)
        );
        assert_eq!(
            ControlMask::dimensions_for(Size::new(1, 1), 5),
            Size::new(1, 1)
        );
    }

    #[test]
    fn new_mask_fully_hidden() {
        let mask = ControlMask::new(Size::new(100, 50), 5);
        assert_eq!(mask.size(), Size::new(20, 10));
        assert_eq!(mask.count(MaskState::Hidden), 200);
    }

    #[test]
    fn fill_all_overwrites_every_cell() {
        let mut mask = ControlMask::new(Size::new(100, 100), 5);
        mask.fill_all(MaskState::Hidden);
        mask.fill_all(MaskState::Revealed);
        assert_eq!(mask.count(MaskState::Revealed), 400);
        assert_eq!(mask.count(MaskState::Hidden), 0);
    }

    #[test]
    fn set_point_ignores_out_of_bounds() {
        let mut mask = ControlMask::new(Size::new(50, 50), 5);
        mask.set_point(-1, 0, MaskState::Revealed);
        mask.set_point(0, 100, MaskState::Revealed);
        assert_eq!(mask.count(MaskState::Revealed), 0);
        mask.set_point(3, 4, MaskState::Revealed);
        assert_eq!(mask.point(3, 4), Some(MaskState::Revealed));
        assert_eq!(mask.point(60, 4), None);
    }

    #[test]
    fn fill_rect_clips_and_rejects_empty() {
        let mut mask = ControlMask::new(Size::new(50, 50), 5);
        mask.fill_rect(8, 8, 10, 10, MaskState::Revealed);
        // Clipped to the 10x10 mask: columns 8..10, rows 8..10.
        assert_eq!(mask.count(MaskState::Revealed), 4);
        mask.fill_rect(0, 0, 0, 5, MaskState::Revealed);
        assert_eq!(mask.count(MaskState::Revealed), 4);
    }

    #[test]
    fn ellipse_area_close_to_analytic() {
        let mut mask = ControlMask::new(Size::new(2000, 2000), 5);
        mask.fill_ellipse(200, 200, 25.0, 25.0, MaskState::Revealed);
        let area = mask.count(MaskState::Revealed) as f64;
        let expected = std::f64::consts::PI * 25.0 * 25.0;
        assert!(
            (area - expected).abs() < expected * 0.05,
            "area {} vs {}",
            area,
            expected
        );
    }

    #[test]
    fn polygon_fills_square() {
        let mut mask = ControlMask::new(Size::new(100, 100), 5);
        mask.fill_polygon(&[2, 8, 8, 2], &[2, 2, 8, 8], MaskState::Revealed);
        // Cells whose centers lie in [2,8)x[2,8).
        assert_eq!(mask.count(MaskState::Revealed), 36);
        assert_eq!(mask.point(5, 5), Some(MaskState::Revealed));
        assert_eq!(mask.point(9, 5), Some(MaskState::Hidden));
    }

    #[test]
    fn degenerate_polygon_fills_nothing() {
        let mut mask = ControlMask::new(Size::new(100, 100), 5);
        mask.fill_polygon(&[4, 4, 4, 4], &[2, 8, 8, 2], MaskState::Revealed);
        assert_eq!(mask.count(MaskState::Revealed), 0);
    }

    #[test]
    fn reveal_is_monotonic_under_more_reveals() {
        let mut mask = ControlMask::new(Size::new(500, 500), 5);
        mask.fill_ellipse(20, 20, 5.0, 5.0, MaskState::Revealed);
        assert_eq!(mask.point(20, 20), Some(MaskState::Revealed));
        // A reveal elsewhere never hides previously revealed cells.
        mask.fill_ellipse(80, 80, 5.0, 5.0, MaskState::Revealed);
        assert_eq!(mask.point(20, 20), Some(MaskState::Revealed));
    }
}
