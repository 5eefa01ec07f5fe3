use serde::{Deserialize, Serialize};

/// Axis-aligned face rectangle in source-image pixel coordinates.
///
/// `(x, y)` is the top-left corner and may lie outside the image when a
/// detector reports a face cut by the frame edge. Zero-sized boxes are legal;
/// they simply produce empty crops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point, using floor division of the box dimensions. Saturates
    /// at `i32::MAX` for boxes reaching past the coordinate range.
    pub fn center(&self) -> (i32, i32) {
        (
            offset(self.x, self.width / 2),
            offset(self.y, self.height / 2),
        )
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn to_tuple(&self) -> (i32, i32, u32, u32) {
        (self.x, self.y, self.width, self.height)
    }
}

fn offset(origin: i32, delta: u32) -> i32 {
    (origin as i64 + delta as i64).min(i32::MAX as i64) as i32
}
