//! One open paint source and everything built on top of it: the control
//! preview, the mask being edited, the audience composite, the viewport and
//! the background worker that rebuilds the expensive pieces.
//!
//! The session is single-threaded from the host's point of view: pointer
//! events, commits and setting changes mutate it directly, and `poll` is
//! called from the host's tick to collect finished rebuilds and hand back a
//! fresh frame for the audience display.

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;

use crate::compositor;
use crate::config::Config;
use crate::error::Error;
use crate::geom::{Point, Size};
use crate::grid::GridData;
use crate::log_err;
use crate::mask::{ControlMask, MaskState};
use crate::persist::{self, PaintData};
use crate::source::Source;
use crate::stroke::{PointerButton, StrokeEffect, StrokeRasterizer};
use crate::viewport::Viewport;
use crate::worker::{JobOutput, Worker};

/// A snapshot of everything the audience display needs to draw itself. The
/// images are shared, not copied; the display holds the frame until the next
/// one arrives.
#[derive(Clone)]
pub struct DisplayFrame {
    /// The composited source image, at source resolution.
    pub composite: Arc<RgbaImage>,
    /// The committed fog, at mask resolution. Scaled over the composite by
    /// the display.
    pub display_mask: Arc<RgbaImage>,
    /// Top-left corner of the audience window, in source pixels.
    pub offset: Point,
    /// Source pixels per display pixel.
    pub zoom: f64,
    pub grid: Option<GridData>,
}

pub struct Session {
    config: Config,
    source: Source,
    /// The operator-side preview image; also fixes the source dimensions.
    control_image: RgbaImage,
    composite: Arc<RgbaImage>,
    mask: ControlMask,
    /// Last committed fog. Edits to `mask` do not touch this until commit.
    display_mask: Arc<RgbaImage>,
    /// Folder background downsampled to mask resolution, sampled under
    /// fogged cells on every recompute.
    background: Option<Arc<RgbaImage>>,
    viewport: Viewport,
    grid: Option<GridData>,
    /// Parallel to `source.layers()`. Layers start hidden.
    visibility: Vec<bool>,
    stroke: StrokeRasterizer,
    /// True when the mask has edits the audience has not seen yet.
    dirty: bool,
    worker: Worker,
}

impl Session {
    /// Open a source and restore its saved mask, zoom, pan and grid.
    ///
    /// The initial composite and display mask are built synchronously so the
    /// session is fully drawable on return.
    pub fn open(config: Config, path: &Path) -> Result<Self, Error> {
        let source = Source::open(path)?;
        let control_image = compositor::load_control_image(&source)?;
        let source_size = Size::new(control_image.width(), control_image.height());

        let visibility = vec![false; source.layers().len()];
        let composite = compositor::compose_display(&source, &visibility, source_size)?;

        let mask = persist::load_mask(&config, &source, source_size);
        let data = persist::load_data(&config, &source);
        let viewport = Viewport::new(
            source_size,
            config.display_size,
            config.pixels_per_mask,
            data.display_zoom,
            data.window_center,
        );

        let background = match compositor::scaled_background(&source, mask.size()) {
            Ok(bg) => bg.map(Arc::new),
            Err(e) => {
                log_err!("cannot load background for {:?}: {}", source.path(), e);
                None
            }
        };
        let display_mask = compositor::recompute_display_mask(&mask, background.as_deref())?;

        Ok(Self {
            config,
            source,
            control_image,
            composite: Arc::new(composite),
            mask,
            display_mask: Arc::new(display_mask),
            background,
            viewport,
            grid: data.grid,
            visibility,
            stroke: StrokeRasterizer::new(),
            dirty: false,
            worker: Worker::spawn(),
        })
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Source image dimensions, in source pixels.
    pub fn source_size(&self) -> Size {
        Size::new(self.control_image.width(), self.control_image.height())
    }

    pub fn control_image(&self) -> &RgbaImage {
        &self.control_image
    }

    pub fn mask(&self) -> &ControlMask {
        &self.mask
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn stroke(&self) -> &StrokeRasterizer {
        &self.stroke
    }

    pub fn stroke_mut(&mut self) -> &mut StrokeRasterizer {
        &mut self.stroke
    }

    pub fn grid(&self) -> Option<&GridData> {
        self.grid.as_ref()
    }

    pub fn set_grid(&mut self, grid: Option<GridData>) {
        self.grid = grid;
    }

    /// True while mask edits have not been committed to the display.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True while a rebuild is queued or running on the worker.
    pub fn is_loading(&self) -> bool {
        self.worker.is_busy()
    }

    /// Layer visibility flags, parallel to `source.layers()`.
    pub fn layer_visibility(&self) -> &[bool] {
        &self.visibility
    }

    // ---- pointer input ------------------------------------------------

    pub fn pointer_down(&mut self, surface: Size, p: Point, button: PointerButton) {
        let effect = self.stroke.pointer_down(&mut self.mask, surface, p, button);
        self.apply_effect(effect);
    }

    pub fn pointer_drag(&mut self, surface: Size, p: Point) {
        let effect = self.stroke.pointer_drag(&mut self.mask, surface, p);
        self.apply_effect(effect);
    }

    pub fn pointer_up(&mut self, surface: Size, p: Point) {
        let effect = self.stroke.pointer_up(&mut self.mask, surface, p);
        self.apply_effect(effect);
    }

    fn apply_effect(&mut self, effect: StrokeEffect) {
        match effect {
            StrokeEffect::None => {}
            StrokeEffect::Painted => self.dirty = true,
            StrokeEffect::PanWindow(center) => self.viewport.set_window_center(center),
        }
    }

    // ---- bulk mask edits ----------------------------------------------

    pub fn show_all(&mut self) {
        self.mask.fill_all(MaskState::Revealed);
        self.dirty = true;
    }

    pub fn hide_all(&mut self) {
        self.mask.fill_all(MaskState::Hidden);
        self.dirty = true;
    }

    // ---- viewport -----------------------------------------------------

    pub fn set_zoom(&mut self, zoom: f64) {
        self.viewport.set_zoom(zoom);
    }

    pub fn set_window_center(&mut self, center: Point) {
        self.viewport.set_window_center(center);
    }

    // ---- layers -------------------------------------------------------

    /// Toggle a folder layer and queue a composite rebuild behind any
    /// pending work. Out-of-range indices are ignored.
    pub fn set_layer_visible(&mut self, index: usize, visible: bool) {
        let Some(slot) = self.visibility.get_mut(index) else {
            return;
        };
        if *slot == visible {
            return;
        }
        *slot = visible;
        let source = self.source.clone();
        let visibility = self.visibility.clone();
        let canvas = self.source_size();
        self.worker.submit(move || {
            compositor::compose_display(&source, &visibility, canvas).map(JobOutput::Composite)
        });
    }

    // ---- commit & poll ------------------------------------------------

    /// Push the current mask to the audience: queue the display-mask
    /// recompute on the worker and clear the dirty flag. No-op when there is
    /// nothing to push.
    pub fn commit(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        let mask_image = self.mask.image().clone();
        let background = self.background.clone();
        self.worker.submit(move || {
            let mask = ControlMask::from_image(mask_image);
            compositor::recompute_display_mask(&mask, background.as_deref())
                .map(JobOutput::DisplayMask)
        });
    }

    /// Collect finished rebuilds. Returns a fresh frame when anything the
    /// audience sees changed this tick. A failed recompute (e.g. allocation
    /// failure on a huge source) re-arms the dirty flag so the operator can
    /// commit again.
    pub fn poll(&mut self) -> Option<DisplayFrame> {
        let mut changed = false;
        for result in self.worker.poll() {
            match result.output {
                Ok(JobOutput::DisplayMask(image)) => {
                    self.display_mask = Arc::new(image);
                    changed = true;
                }
                Ok(JobOutput::Composite(image)) => {
                    self.composite = Arc::new(image);
                    changed = true;
                }
                Err(e) => {
                    log_err!("background rebuild failed: {}", e);
                    self.dirty = true;
                }
            }
        }
        changed.then(|| self.frame())
    }

    /// The current audience frame, built from the last committed images and
    /// the live viewport.
    pub fn frame(&self) -> DisplayFrame {
        DisplayFrame {
            composite: Arc::clone(&self.composite),
            display_mask: Arc::clone(&self.display_mask),
            offset: self.viewport.offset(),
            zoom: self.viewport.zoom(),
            grid: self.grid.clone(),
        }
    }

    // ---- persistence & switching --------------------------------------

    /// Save the mask and the zoom/pan/grid record. Failures log and leave
    /// the session running.
    pub fn save(&self) {
        if let Err(e) = persist::save_mask(&self.config, &self.source, &self.mask) {
            log_err!("cannot save mask for {:?}: {}", self.source.path(), e);
        }
        let data = PaintData {
            display_zoom: self.viewport.zoom(),
            window_center: self.viewport.window_center(),
            grid: self.grid.clone(),
        };
        if let Err(e) = persist::save_data(&self.config, &self.source, &data) {
            log_err!("cannot save data for {:?}: {}", self.source.path(), e);
        }
    }

    /// Save the current source's state and open another one in its place.
    ///
    /// Any rebuild still in flight is superseded: its result is dropped
    /// when it arrives instead of being applied to the wrong source. On a
    /// failed open the old session stays intact (minus the save, which
    /// already happened) with the dirty flag re-armed, since a superseded
    /// commit may never have reached the display.
    pub fn switch(&mut self, path: &Path) -> Result<(), Error> {
        self.save();
        self.worker.supersede();
        match Session::open(self.config.clone(), path) {
            Ok(next) => {
                *self = next;
                Ok(())
            }
            Err(e) => {
                self.dirty = true;
                Err(e)
            }
        }
    }

    /// Save and tear the session down.
    pub fn close(self) {
        self.save();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::thread::sleep;
    use std::time::{Duration, Instant};

    const SURFACE: Size = Size {
        width: 500,
        height: 250,
    };

    fn setup() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path(), Size::new(1000, 500));
        config.ensure_folders().unwrap();
        (dir, config)
    }

    fn write_source(config: &Config, name: &str) -> std::path::PathBuf {
        let path = config.paint_folder.join(name);
        RgbaImage::from_pixel(1000, 500, Rgba([30, 30, 30, 255]))
            .save(&path)
            .unwrap();
        path
    }

    fn drain_frame(session: &mut Session) -> DisplayFrame {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut frame = None;
        while session.is_loading() && Instant::now() < deadline {
            if let Some(f) = session.poll() {
                frame = Some(f);
            }
            sleep(Duration::from_millis(1));
        }
        frame.expect("no frame before deadline")
    }

    #[test]
    fn opens_fully_fogged_with_drawable_frame() {
        let (_dir, config) = setup();
        let path = write_source(&config, "cave.png");
        let session = Session::open(config, &path).unwrap();
        assert!(!session.is_dirty());
        let frame = session.frame();
        assert_eq!(frame.composite.dimensions(), (1000, 500));
        assert_eq!(frame.display_mask.dimensions(), (200, 100));
        // Nothing revealed yet: every fog cell is opaque black.
        assert!(frame.display_mask.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn paint_commit_poll_reveals_on_the_display() {
        let (_dir, config) = setup();
        let path = write_source(&config, "cave.png");
        let mut session = Session::open(config, &path).unwrap();

        session.pointer_down(SURFACE, Point::new(250, 125), PointerButton::Primary);
        session.pointer_up(SURFACE, Point::new(250, 125));
        assert!(session.is_dirty());
        // The audience sees nothing until the commit lands.
        assert!(session
            .frame()
            .display_mask
            .pixels()
            .all(|p| p.0 == [0, 0, 0, 255]));

        session.commit();
        assert!(!session.is_dirty());
        let frame = drain_frame(&mut session);
        let transparent = frame
            .display_mask
            .pixels()
            .filter(|p| p.0 == [0, 0, 0, 0])
            .count();
        assert!(transparent > 0, "committed reveal never reached the display");
        assert!(!session.is_loading());
    }

    #[test]
    fn commit_without_edits_is_a_no_op() {
        let (_dir, config) = setup();
        let path = write_source(&config, "cave.png");
        let mut session = Session::open(config, &path).unwrap();
        session.commit();
        assert!(!session.is_loading());
        assert!(session.poll().is_none());
    }

    #[test]
    fn middle_drag_pans_instead_of_painting() {
        let (_dir, config) = setup();
        let path = write_source(&config, "cave.png");
        let mut session = Session::open(config, &path).unwrap();
        session.set_zoom(0.5);
        session.pointer_down(SURFACE, Point::new(250, 125), PointerButton::Middle);
        // (250,125) surface → (100,50) mask cells → center (500,250) px,
        // offset = 500 - round(1000*0.5/2) = 250 (and 125 vertically).
        assert_eq!(session.viewport().offset(), Point::new(250, 125));
        assert!(!session.is_dirty());
    }

    #[test]
    fn layer_toggle_rebuilds_the_composite() {
        let (_dir, config) = setup();
        let folder = config.paint_folder.join("dungeon");
        std::fs::create_dir(&folder).unwrap();
        RgbaImage::from_pixel(100, 100, Rgba([200, 0, 0, 255]))
            .save(folder.join("1.png"))
            .unwrap();
        let mut session = Session::open(config, &folder).unwrap();
        // Layers start hidden: black canvas.
        assert_eq!(session.frame().composite.get_pixel(50, 50).0, [0, 0, 0, 255]);

        session.set_layer_visible(0, true);
        let frame = drain_frame(&mut session);
        assert_eq!(frame.composite.get_pixel(50, 50).0, [200, 0, 0, 255]);
    }

    #[test]
    fn switch_supersedes_an_in_flight_commit() {
        let (_dir, config) = setup();
        let path = write_source(&config, "one.png");
        let other = write_source(&config, "two.png");
        let mut session = Session::open(config, &path).unwrap();

        session.show_all();
        session.commit();
        // Switch before the commit is polled in: the new source must come
        // up fully fogged, not wearing the old source's reveal.
        session.switch(&other).unwrap();
        assert_eq!(session.source().name(), "two.png");
        assert!(!session.is_loading());
        assert!(session
            .frame()
            .display_mask
            .pixels()
            .all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn failed_switch_keeps_the_old_source_and_rearms_commit() {
        let (_dir, config) = setup();
        let path = write_source(&config, "one.png");
        let missing = config.paint_folder.join("nope.png");
        let mut session = Session::open(config, &path).unwrap();

        session.show_all();
        session.commit();
        assert!(session.switch(&missing).is_err());
        assert_eq!(session.source().name(), "one.png");
        // The in-flight rebuild was superseded: its result never lands,
        // and the dirty flag is re-armed so the reveal can be pushed again.
        assert!(session.is_dirty());
        assert!(!session.is_loading());
        sleep(Duration::from_millis(50));
        assert!(session.poll().is_none());
        assert!(session
            .frame()
            .display_mask
            .pixels()
            .all(|p| p.0 == [0, 0, 0, 255]));

        session.commit();
        let frame = drain_frame(&mut session);
        assert!(frame.display_mask.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn switch_saves_and_reopening_restores_the_mask() {
        let (_dir, config) = setup();
        let path = write_source(&config, "one.png");
        let other = write_source(&config, "two.png");
        // Saved masks are only trusted when strictly newer than the source.
        sleep(Duration::from_millis(20));

        let mut session = Session::open(config.clone(), &path).unwrap();
        session.show_all();
        session.set_zoom(0.25);
        session.switch(&other).unwrap();

        let restored = Session::open(config, &path).unwrap();
        assert_eq!(
            restored.mask().count(MaskState::Revealed),
            200 * 100,
            "saved mask not restored"
        );
        assert_eq!(restored.viewport().zoom(), 0.25);
    }

    #[test]
    fn close_saves_state() {
        let (_dir, config) = setup();
        let path = write_source(&config, "one.png");
        sleep(Duration::from_millis(20));

        let mut session = Session::open(config.clone(), &path).unwrap();
        session.show_all();
        session.set_grid(Some(GridData::default()));
        session.close();

        let restored = Session::open(config, &path).unwrap();
        assert_eq!(restored.mask().count(MaskState::Hidden), 0);
        assert!(restored.grid().is_some());
    }
}
