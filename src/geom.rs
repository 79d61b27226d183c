//! Small geometry primitives shared across the crate.
//!
//! Points are signed because window offsets can go negative while a zoomed
//! viewport is larger than the source image on an axis.

use serde::{Deserialize, Serialize};

/// An integer point. Units depend on context: editing-surface pixels,
/// mask cells, or source-image pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A pixel dimension pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}
