//! Geometry, region classification, style inference and text fitting.

mod fit;
mod geometry;
mod reconcile;
mod region;
mod style;

pub use fit::{Alignment, FitOutcome, RenderPlan, TextFitter, choose_alignment, ocr_preferred_size};
pub use geometry::{BoundingBox, PageSize, Point};
pub use reconcile::{CoordinateSpace, Reconciliation, reconcile};
pub use region::{PageMode, classify_page, is_vertical_or_margin};
pub use style::{FontAlias, SpanFlags, StyleHint, infer_font};
