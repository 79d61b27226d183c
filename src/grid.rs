//! Non-destructive grid overlay for the audience display.
//!
//! The grid is a pure rendering description carried inside the persisted
//! paint data; it is composited over the display frame at draw time and is
//! never written into the control or display masks.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::geom::{Point, Size};

/// Grid description: square size and line offset are in source-image
/// pixels, color is straight RGBA.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridData {
    #[serde(default = "GridData::default_square_size")]
    pub square_size: Size,
    #[serde(default = "GridData::default_line_width")]
    pub line_width: u32,
    #[serde(default)]
    pub offset: Point,
    #[serde(default = "GridData::default_color")]
    pub color: [u8; 4],
}

impl Default for GridData {
    fn default() -> Self {
        Self {
            square_size: Self::default_square_size(),
            line_width: Self::default_line_width(),
            offset: Point::default(),
            color: Self::default_color(),
        }
    }
}

impl GridData {
    fn default_square_size() -> Size {
        Size::new(100, 100)
    }

    fn default_line_width() -> u32 {
        4
    }

    /// Semi-transparent grey.
    fn default_color() -> [u8; 4] {
        [128, 128, 128, 192]
    }

    /// Composite the grid over a display frame. `origin` is where the
    /// source image's top-left corner lands on the frame (negative while
    /// the viewport is panned into the image), so grid lines stay glued to
    /// the map as it pans.
    pub fn render(&self, frame: &mut RgbaImage, origin: Point) {
        if self.square_size.width == 0 || self.square_size.height == 0 || self.line_width == 0 {
            return;
        }
        let (w, h) = (frame.width() as i32, frame.height() as i32);
        let color = Rgba(self.color);

        let mut x = self.offset.x + origin.x;
        while x <= w {
            fill_band(frame, color, x, 0, self.line_width as i32, h);
            x += self.square_size.width as i32;
        }
        let mut y = self.offset.y + origin.y;
        while y <= h {
            fill_band(frame, color, 0, y, w, self.line_width as i32);
            y += self.square_size.height as i32;
        }
    }
}

/// Source-over blend a solid rectangle onto the frame, clipped.
fn fill_band(frame: &mut RgbaImage, color: Rgba<u8>, x: i32, y: i32, w: i32, h: i32) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(frame.width() as i32);
    let y1 = (y + h).min(frame.height() as i32);
    for cy in y0..y1 {
        for cx in x0..x1 {
            let dst = frame.get_pixel_mut(cx as u32, cy as u32);
            *dst = blend_over(color, *dst);
        }
    }
}

fn blend_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as u32;
    let ia = 255 - sa;
    let mut out = [0u8; 4];
    for c in 0..3 {
        out[c] = ((src[c] as u32 * sa + dst[c] as u32 * ia) / 255) as u8;
    }
    out[3] = (sa + dst[3] as u32 * ia / 255) as u8;
    Rgba(out)
}
