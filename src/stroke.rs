//! Turns pointer samples from the editing surface into mask edits.
//!
//! Samples arrive in editing-surface pixels and are floored into mask-cell
//! space with an independent scale per axis (the surface and the mask need
//! not share an aspect ratio). Each motion sample stamps the pen shape and,
//! for circle/square pens, also fills a connecting quadrilateral back to the
//! previous sample so fast strokes leave no gaps.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::geom::{Point, Size};
use crate::mask::{ControlMask, MaskState};

/// Pen radius in editing-surface pixels when a stroke layer is first set up.
pub const DEFAULT_RADIUS: u32 = 25;

/// The pen shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pen {
    #[default]
    Circle,
    Square,
    /// Stamp-only: no connecting sweep between samples, so spaced samples
    /// stay separate hexes (useful for hex-grid maps).
    Hex,
    /// Deferred: fills the press-to-release bounding box on pointer-up only.
    Rect,
}

impl Pen {
    /// Cycle order used by a single toggle control.
    pub fn next(self) -> Self {
        match self {
            Pen::Circle => Pen::Square,
            Pen::Square => Pen::Hex,
            Pen::Hex => Pen::Rect,
            Pen::Rect => Pen::Circle,
        }
    }
}

/// Optional straight-line lock applied to each sample before rasterizing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DirectionLock {
    #[default]
    None,
    /// X is pinned to the previous sample (stroke moves vertically).
    Vertical,
    /// Y is pinned to the previous sample (stroke moves horizontally).
    Horizontal,
}

impl DirectionLock {
    pub fn next(self) -> Self {
        match self {
            DirectionLock::None => DirectionLock::Vertical,
            DirectionLock::Vertical => DirectionLock::Horizontal,
            DirectionLock::Horizontal => DirectionLock::None,
        }
    }
}

/// Touch-pad mode: forces a paint state regardless of button, or routes all
/// input to window panning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawMode {
    /// Button picks the action: primary reveals, secondary hides, middle pans.
    #[default]
    Any,
    /// Every stroke reveals.
    Visible,
    /// Every stroke hides.
    Invisible,
    /// Every click/drag moves the audience window.
    Window,
}

impl DrawMode {
    pub fn next(self) -> Self {
        match self {
            DrawMode::Any => DrawMode::Visible,
            DrawMode::Visible => DrawMode::Invisible,
            DrawMode::Invisible => DrawMode::Window,
            DrawMode::Window => DrawMode::Any,
        }
    }
}

/// Pointer button identifier from the host toolkit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// What a pointer event did, so the session can mark the mask dirty or
/// forward a pan to the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrokeEffect {
    None,
    /// The mask changed.
    Painted,
    /// The audience window should recenter on this mask-cell point.
    PanWindow(Point),
}

/// Per-stroke state machine: idle → dragging (pointer-down) → idle
/// (pointer-up).
#[derive(Clone, Debug)]
pub struct StrokeRasterizer {
    pen: Pen,
    radius: u32,
    lock: DirectionLock,
    mode: DrawMode,
    /// Current pen color. Persists between strokes, like a dipped brush.
    paint: MaskState,
    /// False while input is routed to window panning.
    can_draw: bool,
    dragging: bool,
    /// Previous sample in mask cells.
    last: Point,
    /// Press position in surface pixels (rectangle pen fills from here).
    start_of_click: Option<Point>,
}

impl Default for StrokeRasterizer {
    fn default() -> Self {
        Self {
            pen: Pen::Circle,
            radius: DEFAULT_RADIUS,
            lock: DirectionLock::None,
            mode: DrawMode::Any,
            paint: MaskState::Hidden,
            can_draw: false,
            dragging: false,
            last: Point::default(),
            start_of_click: None,
        }
    }
}

impl StrokeRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pen(&self) -> Pen {
        self.pen
    }

    pub fn set_pen(&mut self, pen: Pen) {
        self.pen = pen;
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: u32) {
        self.radius = radius;
    }

    pub fn direction_lock(&self) -> DirectionLock {
        self.lock
    }

    pub fn set_direction_lock(&mut self, lock: DirectionLock) {
        self.lock = lock;
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.mode
    }

    /// Change the touch-pad mode; Visible/Invisible arm the pen immediately,
    /// Window disarms it.
    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        self.mode = mode;
        match mode {
            DrawMode::Any => {}
            DrawMode::Visible => {
                self.paint = MaskState::Revealed;
                self.can_draw = true;
            }
            DrawMode::Invisible => {
                self.paint = MaskState::Hidden;
                self.can_draw = true;
            }
            DrawMode::Window => self.can_draw = false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Map an editing-surface point to mask cells (independent floor scale
    /// per axis).
    pub fn to_mask_point(surface: Size, mask: Size, p: Point) -> Point {
        Point::new(
            p.x * mask.width as i32 / surface.width as i32,
            p.y * mask.height as i32 / surface.height as i32,
        )
    }

    /// Pointer pressed on the editing surface.
    pub fn pointer_down(
        &mut self,
        mask: &mut ControlMask,
        surface: Size,
        p: Point,
        button: PointerButton,
    ) -> StrokeEffect {
        let mp = Self::to_mask_point(surface, mask.size(), p);
        self.last = mp;
        match self.mode {
            DrawMode::Any => match button {
                PointerButton::Middle => {
                    self.can_draw = false;
                    StrokeEffect::PanWindow(mp)
                }
                PointerButton::Primary | PointerButton::Secondary => {
                    self.paint = if button == PointerButton::Primary {
                        MaskState::Revealed
                    } else {
                        MaskState::Hidden
                    };
                    self.can_draw = true;
                    self.start_of_click = Some(p);
                    self.dragging = true;
                    self.add_point(mask, surface, mp)
                }
            },
            DrawMode::Visible | DrawMode::Invisible => {
                self.start_of_click = Some(p);
                self.dragging = true;
                self.add_point(mask, surface, mp)
            }
            DrawMode::Window => StrokeEffect::PanWindow(mp),
        }
    }

    /// Pointer moved while a button is held.
    pub fn pointer_drag(&mut self, mask: &mut ControlMask, surface: Size, p: Point) -> StrokeEffect {
        let mp = Self::to_mask_point(surface, mask.size(), p);
        if self.can_draw && self.dragging {
            self.add_point(mask, surface, mp)
        } else {
            StrokeEffect::PanWindow(mp)
        }
    }

    /// Pointer released. The rectangle pen does all its filling here.
    pub fn pointer_up(&mut self, mask: &mut ControlMask, surface: Size, p: Point) -> StrokeEffect {
        let mut effect = StrokeEffect::None;
        if self.can_draw && self.dragging && self.pen == Pen::Rect {
            if let Some(start) = self.start_of_click {
                let a = Self::to_mask_point(surface, mask.size(), p);
                let b = Self::to_mask_point(surface, mask.size(), start);
                mask.fill_rect(
                    a.x.min(b.x),
                    a.y.min(b.y),
                    (a.x - b.x).abs(),
                    (a.y - b.y).abs(),
                    self.paint,
                );
                effect = StrokeEffect::Painted;
            }
        }
        self.dragging = false;
        self.start_of_click = None;
        effect
    }

    /// Rasterize one sample: stamp the pen at `new_p` and, for circle and
    /// square pens, sweep-fill back to the previous sample.
    fn add_point(&mut self, mask: &mut ControlMask, surface: Size, mut new_p: Point) -> StrokeEffect {
        match self.lock {
            DirectionLock::Horizontal => new_p.y = self.last.y,
            DirectionLock::Vertical => new_p.x = self.last.x,
            DirectionLock::None => {}
        }
        // Per-axis radius so a round on-screen pen stays visually round in
        // mask space even when mask and surface resolutions differ.
        let width_mod = mask.width() as f64 / surface.width as f64;
        let height_mod = mask.height() as f64 / surface.height as f64;
        let radius_w = self.radius as f64 * width_mod;
        let radius_h = self.radius as f64 * height_mod;
        match self.pen {
            Pen::Circle => {
                let (xs, ys) = circle_drag_polygon(new_p, self.last, radius_w, radius_h);
                mask.fill_polygon(&xs, &ys, self.paint);
                mask.fill_ellipse(new_p.x, new_p.y, radius_w, radius_h, self.paint);
            }
            Pen::Square => {
                let (xs, ys) = square_drag_polygon(
                    new_p,
                    self.last,
                    radius_w.round() as i32,
                    radius_h.round() as i32,
                );
                mask.fill_polygon(&xs, &ys, self.paint);
                mask.fill_rect(
                    new_p.x - radius_w.round() as i32,
                    new_p.y - radius_h.round() as i32,
                    (2.0 * radius_w).round() as i32,
                    (2.0 * radius_h).round() as i32,
                    self.paint,
                );
            }
            Pen::Hex => {
                let (xs, ys) =
                    hex_polygon(new_p, radius_w.round() as i32, radius_h.round() as i32);
                mask.fill_polygon(&xs, &ys, self.paint);
            }
            Pen::Rect => {}
        }
        self.last = new_p;
        match self.pen {
            Pen::Rect => StrokeEffect::None,
            _ => StrokeEffect::Painted,
        }
    }
}

/// Quadrilateral connecting two circle stamps: the two centers offset by
/// ± the perpendicular of the travel direction, scaled per axis.
fn circle_drag_polygon(
    new_p: Point,
    old_p: Point,
    radius_w: f64,
    radius_h: f64,
) -> ([i32; 4], [i32; 4]) {
    let angle = -f64::atan2((new_p.y - old_p.y) as f64, (new_p.x - old_p.x) as f64);
    let angle_pos = angle + FRAC_PI_2;
    let angle_neg = angle - FRAC_PI_2;
    let cos_p = (angle_pos.cos() * radius_w).round() as i32;
    let cos_n = (angle_neg.cos() * radius_w).round() as i32;
    let sin_p = (angle_pos.sin() * radius_h).round() as i32;
    let sin_n = (angle_neg.sin() * radius_h).round() as i32;
    (
        [
            new_p.x + cos_p,
            new_p.x + cos_n,
            old_p.x + cos_n,
            old_p.x + cos_p,
        ],
        [
            new_p.y - sin_p,
            new_p.y - sin_n,
            old_p.y - sin_n,
            old_p.y - sin_p,
        ],
    )
}

/// Quadrilateral connecting two square stamps. The height offset flips sign
/// when the stroke moves through mismatched quadrants (down-right or
/// up-left), otherwise the four corners would cross into a bow-tie.
fn square_drag_polygon(
    new_p: Point,
    old_p: Point,
    radius_w: i32,
    radius_h: i32,
) -> ([i32; 4], [i32; 4]) {
    let radius_h = if (new_p.x > old_p.x && new_p.y > old_p.y)
        || (new_p.x < old_p.x && new_p.y < old_p.y)
    {
        -radius_h
    } else {
        radius_h
    };
    (
        [
            new_p.x - radius_w,
            new_p.x + radius_w,
            old_p.x + radius_w,
            old_p.x - radius_w,
        ],
        [
            new_p.y - radius_h,
            new_p.y + radius_h,
            old_p.y + radius_h,
            old_p.y - radius_h,
        ],
    )
}

/// Regular hexagon stamp centered on a cell, per-axis radii.
fn hex_polygon(center: Point, radius_w: i32, radius_h: i32) -> ([i32; 6], [i32; 6]) {
    let mut xs = [0i32; 6];
    let mut ys = [0i32; 6];
    for i in 0..6 {
        let angle = PI / 3.0 * i as f64;
        xs[i] = center.x + (radius_w as f64 * angle.cos()).round() as i32;
        ys[i] = center.y + (radius_h as f64 * angle.sin()).round() as i32;
    }
    (xs, ys)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2000x1000 source at K=5 → 400x200 mask; 900x450 surface keeps the
    // mask-to-surface scale equal on both axes.
    const SURFACE: Size = Size {
        width: 900,
        height: 450,
    };

    fn mask() -> ControlMask {
        ControlMask::new(Size::new(2000, 1000), 5)
    }

    #[test]
    fn surface_points_floor_into_mask_cells() {
        let mask = Size::new(400, 200);
        assert_eq!(
            StrokeRasterizer::to_mask_point(SURFACE, mask, Point::new(450, 225)),
            Point::new(200, 100)
        );
        // 899*400/900 = 399.55 → floors to 399.
        assert_eq!(
            StrokeRasterizer::to_mask_point(SURFACE, mask, Point::new(899, 449)),
            Point::new(399, 199)
        );
    }

    #[test]
    fn circle_tap_reveals_a_disc_of_scaled_radius() {
        let mut mask = mask();
        let mut stroke = StrokeRasterizer::new();
        let effect = stroke.pointer_down(
            &mut mask,
            SURFACE,
            Point::new(450, 225),
            PointerButton::Primary,
        );
        assert_eq!(effect, StrokeEffect::Painted);
        stroke.pointer_up(&mut mask, SURFACE, Point::new(450, 225));
        // radius 25 surface px → 25*400/900 ≈ 11.1 cells; area ≈ π r².
        let revealed = mask.count(MaskState::Revealed);
        let expected = std::f64::consts::PI * (25.0_f64 * 400.0 / 900.0).powi(2);
        assert!(
            (revealed as f64 - expected).abs() < expected * 0.10,
            "revealed {} expected ≈{}",
            revealed,
            expected
        );
    }

    #[test]
    fn fast_drag_leaves_no_gap_between_samples() {
        let mut mask = mask();
        let mut stroke = StrokeRasterizer::new();
        stroke.pointer_down(&mut mask, SURFACE, Point::new(100, 100), PointerButton::Primary);
        // One big jump, far larger than the pen diameter.
        stroke.pointer_drag(&mut mask, SURFACE, Point::new(700, 340));
        stroke.pointer_up(&mut mask, SURFACE, Point::new(700, 340));
        // Every midpoint along the surface segment must land on a revealed cell.
        for step in 0..=20 {
            let t = step as f64 / 20.0;
            let sx = 100.0 + t * 600.0;
            let sy = 100.0 + t * 240.0;
            let mp = StrokeRasterizer::to_mask_point(
                SURFACE,
                mask.size(),
                Point::new(sx as i32, sy as i32),
            );
            assert_eq!(
                mask.point(mp.x, mp.y),
                Some(MaskState::Revealed),
                "gap at t={}",
                t
            );
        }
    }

    #[test]
    fn square_pen_diagonal_drag_has_no_bowtie_hole() {
        let mut mask = mask();
        let mut stroke = StrokeRasterizer::new();
        stroke.set_pen(Pen::Square);
        // Down-right diagonal: the quadrant combination that flips the
        // perpendicular sign.
        stroke.pointer_down(&mut mask, SURFACE, Point::new(150, 120), PointerButton::Primary);
        stroke.pointer_drag(&mut mask, SURFACE, Point::new(600, 380));
        stroke.pointer_up(&mut mask, SURFACE, Point::new(600, 380));
        for step in 0..=20 {
            let t = step as f64 / 20.0;
            let sx = 150.0 + t * 450.0;
            let sy = 120.0 + t * 260.0;
            let mp = StrokeRasterizer::to_mask_point(
                SURFACE,
                mask.size(),
                Point::new(sx as i32, sy as i32),
            );
            assert_eq!(mask.point(mp.x, mp.y), Some(MaskState::Revealed));
        }
    }

    #[test]
    fn vertical_lock_pins_the_column() {
        let mut mask = mask();
        let mut stroke = StrokeRasterizer::new();
        stroke.set_direction_lock(DirectionLock::Vertical);
        stroke.pointer_down(&mut mask, SURFACE, Point::new(450, 100), PointerButton::Primary);
        // Drift right while moving down: x must stay locked.
        stroke.pointer_drag(&mut mask, SURFACE, Point::new(700, 300));
        stroke.pointer_up(&mut mask, SURFACE, Point::new(700, 300));
        let center_col = 450 * 400 / 900;
        let radius_cells = (25.0_f64 * 400.0 / 900.0).ceil() as i32;
        // Nothing revealed beyond the pen radius from the locked column.
        for y in 0..200 {
            for x in 0..400 {
                if mask.point(x, y) == Some(MaskState::Revealed) {
                    assert!(
                        (x - center_col).abs() <= radius_cells + 1,
                        "cell ({}, {}) escaped the lock",
                        x,
                        y
                    );
                }
            }
        }
        // And the locked column itself got painted down the drag.
        assert_eq!(
            mask.point(center_col, 300 * 200 / 450),
            Some(MaskState::Revealed)
        );
    }

    #[test]
    fn rect_pen_fills_only_on_release() {
        let mut mask = mask();
        let mut stroke = StrokeRasterizer::new();
        stroke.set_pen(Pen::Rect);
        stroke.pointer_down(&mut mask, SURFACE, Point::new(90, 90), PointerButton::Primary);
        stroke.pointer_drag(&mut mask, SURFACE, Point::new(450, 225));
        assert_eq!(mask.count(MaskState::Revealed), 0, "rect must defer filling");
        let effect = stroke.pointer_up(&mut mask, SURFACE, Point::new(450, 225));
        assert_eq!(effect, StrokeEffect::Painted);
        // (90,90)→(40,40) cells, (450,225)→(200,100) cells: 160x60 box.
        assert_eq!(mask.count(MaskState::Revealed), 160 * 60);
        assert_eq!(mask.point(40, 40), Some(MaskState::Revealed));
        assert_eq!(mask.point(199, 99), Some(MaskState::Revealed));
        assert_eq!(mask.point(200, 100), Some(MaskState::Hidden));
    }

    #[test]
    fn hex_pen_is_stamp_only() {
        let mut mask = mask();
        let mut stroke = StrokeRasterizer::new();
        stroke.set_pen(Pen::Hex);
        stroke.pointer_down(&mut mask, SURFACE, Point::new(100, 225), PointerButton::Primary);
        stroke.pointer_drag(&mut mask, SURFACE, Point::new(800, 225));
        stroke.pointer_up(&mut mask, SURFACE, Point::new(800, 225));
        // Midpoint between the two stamps stays hidden: no connecting sweep.
        let mid = StrokeRasterizer::to_mask_point(SURFACE, mask.size(), Point::new(450, 225));
        assert_eq!(mask.point(mid.x, mid.y), Some(MaskState::Hidden));
        // But both stamp sites are revealed.
        let a = StrokeRasterizer::to_mask_point(SURFACE, mask.size(), Point::new(100, 225));
        let b = StrokeRasterizer::to_mask_point(SURFACE, mask.size(), Point::new(800, 225));
        assert_eq!(mask.point(a.x, a.y), Some(MaskState::Revealed));
        assert_eq!(mask.point(b.x, b.y), Some(MaskState::Revealed));
    }

    #[test]
    fn secondary_button_hides_and_middle_pans() {
        let mut mask = mask();
        mask.fill_all(MaskState::Revealed);
        let mut stroke = StrokeRasterizer::new();
        let effect = stroke.pointer_down(
            &mut mask,
            SURFACE,
            Point::new(450, 225),
            PointerButton::Secondary,
        );
        assert_eq!(effect, StrokeEffect::Painted);
        stroke.pointer_up(&mut mask, SURFACE, Point::new(450, 225));
        assert_eq!(mask.point(200, 100), Some(MaskState::Hidden));

        let before = mask.count(MaskState::Hidden);
        let effect = stroke.pointer_down(
            &mut mask,
            SURFACE,
            Point::new(90, 90),
            PointerButton::Middle,
        );
        assert_eq!(effect, StrokeEffect::PanWindow(Point::new(40, 40)));
        assert_eq!(mask.count(MaskState::Hidden), before, "pan must not paint");
    }

    #[test]
    fn window_mode_routes_drags_to_panning() {
        let mut mask = mask();
        let mut stroke = StrokeRasterizer::new();
        stroke.set_draw_mode(DrawMode::Window);
        let down = stroke.pointer_down(&mut mask, SURFACE, Point::new(450, 225), PointerButton::Primary);
        assert_eq!(down, StrokeEffect::PanWindow(Point::new(200, 100)));
        let drag = stroke.pointer_drag(&mut mask, SURFACE, Point::new(900, 450));
        assert_eq!(drag, StrokeEffect::PanWindow(Point::new(400, 200)));
        assert_eq!(mask.count(MaskState::Revealed), 0);
    }

    #[test]
    fn toggles_cycle_through_all_variants() {
        let mut pen = Pen::Circle;
        for _ in 0..4 {
            pen = pen.next();
        }
        assert_eq!(pen, Pen::Circle);
        assert_eq!(DirectionLock::Horizontal.next(), DirectionLock::None);
        assert_eq!(DrawMode::Window.next(), DrawMode::Any);
    }
}
