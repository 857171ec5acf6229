//! Per-page building blocks of the translation pipeline.
//!
//! Extraction produces [`TextUnit`]s from either a text layer or OCR output,
//! with every non-prose region filtered out before any remote call is made.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{LayoutConfig, TextColor};
use crate::layout::{
    BoundingBox, PageMode, PageSize, Reconciliation, SpanFlags, StyleHint, is_vertical_or_margin,
    ocr_preferred_size,
};
use crate::pdf::TextRun;
use crate::text::{normalize, should_translate};
use crate::translator::{LengthConstraint, OcrRegion};

/// Size assumed for text-layer spans that report none
const DEFAULT_SPAN_SIZE: f32 = 10.0;

/// Average glyph advance as a fraction of font size, for capacity estimates
const AVG_CHAR_WIDTH: f32 = 0.5;

/// One candidate translation target on a page
#[derive(Debug, Clone, PartialEq)]
pub struct TextUnit {
    /// Normalized source text
    pub text: String,
    pub bbox: BoundingBox,
    pub style: StyleHint,
    pub color: TextColor,
    pub origin: PageMode,
}

/// Emitted once per page after it has been painted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageProgress {
    /// 1-based page number
    pub page_number: usize,
    pub mode: PageMode,
}

/// Counters for a whole document run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub pages_total: usize,
    pub text_layer_pages: usize,
    pub ocr_pages: usize,
    pub regions_painted: usize,
    pub fallback_insertions: usize,
}

impl DocumentSummary {
    pub(crate) fn record_page(&mut self, mode: PageMode) {
        match mode {
            PageMode::TextLayer => self.text_layer_pages += 1,
            PageMode::Scanned => self.ocr_pages += 1,
        }
    }
}

/// Turn text-layer runs into translatable units.
pub fn text_layer_units(
    runs: Vec<TextRun>,
    page: PageSize,
    config: &LayoutConfig,
) -> Vec<TextUnit> {
    runs.into_iter()
        .filter_map(|run| {
            let text = normalize(&run.text);
            if !should_translate(&text, config) {
                debug!("Skipping non-prose run {:?}", text);
                return None;
            }
            if is_vertical_or_margin(&run.bbox, page, config) {
                debug!("Skipping vertical or margin run {:?} at {:?}", text, run.bbox.as_array());
                return None;
            }

            let size = if run.size > 0.0 { run.size } else { DEFAULT_SPAN_SIZE };
            Some(TextUnit {
                text,
                bbox: run.bbox,
                style: StyleHint {
                    font_name: run.font_name,
                    flags: run.flags,
                    size,
                },
                color: run.color.unwrap_or_default(),
                origin: PageMode::TextLayer,
            })
        })
        .collect()
}

/// Turn OCR regions into translatable units in page space.
///
/// Low-confidence regions and boxes smaller than `min_box_size` on either
/// side after reconciliation are dropped. OCR text is always painted black.
pub fn ocr_units(
    regions: Vec<OcrRegion>,
    reconciliation: &Reconciliation,
    page: PageSize,
    min_confidence: f32,
    config: &LayoutConfig,
) -> Vec<TextUnit> {
    regions
        .into_iter()
        .filter_map(|region| {
            if region.confidence < min_confidence {
                debug!("Skipping OCR region below confidence {:.2}", region.confidence);
                return None;
            }

            let bbox = reconciliation.apply(&region.bbox);
            if bbox.width() < config.min_box_size || bbox.height() < config.min_box_size {
                return None;
            }

            let text = normalize(&region.text);
            if !should_translate(&text, config) || is_vertical_or_margin(&bbox, page, config) {
                debug!("Skipping OCR region {:?}", text);
                return None;
            }

            Some(TextUnit {
                text,
                bbox,
                style: StyleHint {
                    font_name: String::new(),
                    flags: SpanFlags::default(),
                    size: ocr_preferred_size(bbox.height(), config),
                },
                color: TextColor::black(),
                origin: PageMode::Scanned,
            })
        })
        .collect()
}

/// Rough capacity of a box at the size the fitter will try first.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn estimate_capacity(unit: &TextUnit, config: &LayoutConfig) -> LengthConstraint {
    let size = unit.style.size.clamp(config.min_font_size, config.max_font_size);
    let per_line = (unit.bbox.width() / (size * AVG_CHAR_WIDTH)).floor().max(1.0) as usize;
    let lines = (unit.bbox.height() / (size * config.line_height_factor))
        .floor()
        .max(1.0) as usize;

    LengthConstraint {
        max_chars: Some(per_line * lines),
        max_lines: Some(lines),
    }
}
