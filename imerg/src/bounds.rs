//! Request bounding boxes.

use serde::{Deserialize, Serialize};

/// A geographic rectangle given by its four edges, in decimal degrees.
///
/// Callers are not required to order the edges: `top` may be south of
/// `bottom` and `left` east of `right`. Everything that consumes a box goes
/// through [`BoundingBox::lat_range`] and [`BoundingBox::lon_range`], so a box
/// and its corner-swapped variant always select the same cells.
///
/// The box is echoed back verbatim in JSON payloads, which is why it keeps
/// the caller's edge order instead of normalizing on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Northern edge latitude (as supplied).
    pub top: f64,
    /// Southern edge latitude (as supplied).
    pub bottom: f64,
    /// Western edge longitude (as supplied).
    pub left: f64,
    /// Eastern edge longitude (as supplied).
    pub right: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    ///
    /// # Arguments
    ///
    /// * `top` - Northern edge latitude
    /// * `bottom` - Southern edge latitude
    /// * `left` - Western edge longitude
    /// * `right` - Eastern edge longitude
    pub fn new(top: f64, bottom: f64, left: f64, right: f64) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Inclusive `(min, max)` latitude range, independent of edge order.
    pub fn lat_range(&self) -> (f64, f64) {
        (self.top.min(self.bottom), self.top.max(self.bottom))
    }

    /// Inclusive `(min, max)` longitude range, independent of edge order.
    pub fn lon_range(&self) -> (f64, f64) {
        (self.left.min(self.right), self.left.max(self.right))
    }

    /// The same box with `top`/`bottom` exchanged.
    pub fn swap_lat_edges(&self) -> Self {
        Self::new(self.bottom, self.top, self.left, self.right)
    }

    /// The same box with `left`/`right` exchanged.
    pub fn swap_lon_edges(&self) -> Self {
        Self::new(self.top, self.bottom, self.right, self.left)
    }
}
