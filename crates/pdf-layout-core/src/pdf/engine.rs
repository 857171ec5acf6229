//! The document capability the translation pipeline works against.
//!
//! [`crate::pdf::PdfDocument`] implements it with mupdf (reading) and lopdf
//! (painting); tests substitute an in-memory page model.

use serde::{Deserialize, Serialize};

use crate::config::TextColor;
use crate::error::Result;
use crate::layout::{Alignment, BoundingBox, FontAlias, PageSize, Point, SpanFlags};

/// One line of extracted text with the style of its first span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub bbox: BoundingBox,
    pub font_name: String,
    pub flags: SpanFlags,
    pub size: f32,
    /// Span fill color, when the engine can report it
    pub color: Option<TextColor>,
}

/// A rendered page bitmap
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// PNG-encoded pixels
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A request to lay out text inside a box
#[derive(Debug, Clone, Copy)]
pub struct TextPlacement<'a> {
    pub rect: BoundingBox,
    pub text: &'a str,
    pub size: f32,
    /// Baseline advance as a multiple of `size`
    pub line_height_factor: f32,
    pub font: FontAlias,
    pub align: Alignment,
    pub color: TextColor,
}

/// Result of trying to place text in a box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The text was drawn inside the box
    Fitted,
    /// The text would not fit; nothing was drawn
    Overflow,
}

/// Read and paint access to a document, page by page.
///
/// Pages are 0-indexed. Boxes and points use top-left origin page points.
pub trait DocumentEngine {
    fn page_count(&self) -> usize;

    fn page_size(&self, page: usize) -> Result<PageSize>;

    /// Plain text of the page, used to choose the extraction path
    fn page_text(&self, page: usize) -> Result<String>;

    /// Text lines with geometry and style
    fn text_runs(&self, page: usize) -> Result<Vec<TextRun>>;

    fn rasterize(&self, page: usize, dpi: u32) -> Result<RasterImage>;

    /// Register a font file for an output alias
    fn embed_font(&mut self, alias: FontAlias, data: Vec<u8>) -> Result<()>;

    /// Cover a region with an opaque white fill
    fn paint_opaque(&mut self, page: usize, rect: BoundingBox) -> Result<()>;

    /// Wrap and draw text inside `placement.rect`, or report overflow
    fn insert_text(&mut self, page: usize, placement: &TextPlacement<'_>) -> Result<InsertOutcome>;

    /// Draw a single unwrapped line with its baseline at `origin`
    fn insert_line(
        &mut self,
        page: usize,
        origin: Point,
        text: &str,
        size: f32,
        color: TextColor,
    ) -> Result<()>;

    /// Serialize the document with all painting applied
    fn save(&mut self) -> Result<Vec<u8>>;
}
