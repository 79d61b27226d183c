//! Fog-of-war engine for tabletop map displays.
//!
//! An operator paints a low-resolution reveal/hide mask over a map image on
//! an editing surface; an audience-facing display shows the map composited
//! under the committed fog, panned and zoomed through a [`Viewport`]. The
//! crate owns the model and the background rebuild pipeline; the host
//! toolkit owns windows, input devices and actual blitting.
//!
//! The usual flow:
//!
//! 1. Build a [`Config`] and open a [`Session`] on a file or folder source.
//! 2. Forward pointer events from the editing surface; the session paints
//!    the mask and pans the audience window.
//! 3. On the operator's commit, call [`Session::commit`] and keep calling
//!    [`Session::poll`] each tick; finished rebuilds come back as
//!    [`DisplayFrame`]s for the display to draw.
//! 4. [`Session::switch`] and [`Session::close`] persist the mask and the
//!    zoom/pan/grid record so the next open resumes where this one left off.

pub mod compositor;
pub mod config;
pub mod error;
pub mod geom;
pub mod grid;
pub mod logger;
pub mod mask;
pub mod persist;
pub mod session;
pub mod source;
pub mod stroke;
pub mod viewport;
pub mod worker;

pub use config::{Config, PIXELS_PER_MASK};
pub use error::Error;
pub use geom::{Point, Size};
pub use grid::GridData;
pub use mask::{ControlMask, MaskState};
pub use session::{DisplayFrame, Session};
pub use source::Source;
pub use stroke::{DirectionLock, DrawMode, Pen, PointerButton, StrokeRasterizer};
pub use viewport::Viewport;
