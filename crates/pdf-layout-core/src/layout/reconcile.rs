//! Mapping OCR geometry into page space.
//!
//! OCR providers disagree on coordinate conventions: some report pixels of
//! the rendered bitmap, some report page points. The decision is made once
//! per page from the largest reported extents, so the whole page's OCR
//! output goes through a single linear transform.
//!
//! A page whose OCR genuinely reports page-space boxes that spill more than
//! the threshold past the page edge is treated as pixel space. This is a
//! known approximation of the single global threshold.

use super::geometry::{BoundingBox, PageSize};
use crate::translator::OcrRegion;

/// Coordinate space an OCR response was judged to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSpace {
    Pixel,
    Page,
}

/// The page-wide transform from OCR coordinates to page points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciliation {
    pub space: CoordinateSpace,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Reconciliation {
    pub const fn identity() -> Self {
        Self {
            space: CoordinateSpace::Page,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn apply(&self, bbox: &BoundingBox) -> BoundingBox {
        bbox.scaled(self.scale_x, self.scale_y)
    }
}

/// Decide the coordinate space for one page of OCR output.
///
/// If the maximum `x1` or `y1` exceeds the page width or height by more
/// than `threshold` (1.25 means 25%), every box is treated as raster pixels
/// and scaled by page size over raster size. Otherwise boxes are used as is.
#[allow(clippy::cast_precision_loss)] // Raster dimensions are far below f32 precision limits
pub fn reconcile(
    regions: &[OcrRegion],
    page: PageSize,
    raster_width: u32,
    raster_height: u32,
    threshold: f32,
) -> Reconciliation {
    let (max_x, max_y) = regions
        .iter()
        .filter(|r| r.bbox.x1.is_finite() && r.bbox.y1.is_finite())
        .fold((0.0_f32, 0.0_f32), |(mx, my), r| (mx.max(r.bbox.x1), my.max(r.bbox.y1)));

    if max_x > page.width * threshold || max_y > page.height * threshold {
        Reconciliation {
            space: CoordinateSpace::Pixel,
            scale_x: page.width / raster_width.max(1) as f32,
            scale_y: page.height / raster_height.max(1) as f32,
        }
    } else {
        Reconciliation::identity()
    }
}
