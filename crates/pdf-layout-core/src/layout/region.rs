//! Page-level and region-level gates that run before any remote call.

use serde::{Deserialize, Serialize};

use super::geometry::{BoundingBox, PageSize};
use crate::config::LayoutConfig;

/// Which extraction path a page takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageMode {
    /// The page carries an extractable text layer
    TextLayer,
    /// The page is an image and goes through OCR
    #[serde(rename = "ocr")]
    Scanned,
}

impl PageMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TextLayer => "text_layer",
            Self::Scanned => "ocr",
        }
    }
}

impl std::fmt::Display for PageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide the extraction path from the page's raw text.
///
/// A sparse text-layer page may land on the OCR path; that costs more but
/// still produces a translation.
pub fn classify_page(raw_text: &str, config: &LayoutConfig) -> PageMode {
    if raw_text.trim().chars().count() > config.text_layer_min_chars {
        PageMode::TextLayer
    } else {
        PageMode::Scanned
    }
}

/// Geometry-based exclusion of non-prose regions.
///
/// Skips degenerate boxes, rotated side labels (much taller than wide) and
/// tall annotations that sit entirely inside the left or right page margin.
pub fn is_vertical_or_margin(bbox: &BoundingBox, page: PageSize, config: &LayoutConfig) -> bool {
    if bbox.is_degenerate() {
        return true;
    }

    let height = bbox.height();
    if height > config.vertical_aspect_ratio * bbox.width() {
        return true;
    }

    let in_left_margin = bbox.x1 < page.width * config.left_margin_ratio;
    let in_right_margin = bbox.x0 > page.width * config.right_margin_ratio;
    (in_left_margin || in_right_margin) && height > config.margin_min_height
}

#[cfg(test)]
mod tests {
    use super::*;

    const A4: PageSize = PageSize::new(595.0, 842.0);

    #[test]
    fn test_classify_page() {
        let config = LayoutConfig::default();
        assert_eq!(classify_page("   short   ", &config), PageMode::Scanned);
        assert_eq!(classify_page(&"x".repeat(20), &config), PageMode::Scanned);
        assert_eq!(classify_page(&"x".repeat(21), &config), PageMode::TextLayer);
    }

    #[test]
    fn test_page_mode_labels() {
        assert_eq!(PageMode::TextLayer.to_string(), "text_layer");
        assert_eq!(PageMode::Scanned.to_string(), "ocr");
    }

    #[test]
    fn test_body_line_is_kept() {
        let config = LayoutConfig::default();
        let line = BoundingBox::new(72.0, 100.0, 520.0, 112.0);
        assert!(!is_vertical_or_margin(&line, A4, &config));
    }

    #[test]
    fn test_rotated_label_is_skipped() {
        let config = LayoutConfig::default();
        let label = BoundingBox::new(300.0, 100.0, 310.0, 200.0);
        assert!(is_vertical_or_margin(&label, A4, &config));
    }

    #[test]
    fn test_tall_margin_annotation_is_skipped() {
        let config = LayoutConfig::default();
        // Left margin ends at 47.6pt; height 30pt, width 20pt (not vertical by ratio)
        let left = BoundingBox::new(10.0, 300.0, 30.0, 330.0);
        assert!(is_vertical_or_margin(&left, A4, &config));
        let right = BoundingBox::new(560.0, 300.0, 580.0, 330.0);
        assert!(is_vertical_or_margin(&right, A4, &config));
    }

    #[test]
    fn test_short_margin_text_is_kept() {
        let config = LayoutConfig::default();
        let footnote_marker = BoundingBox::new(10.0, 300.0, 40.0, 312.0);
        assert!(!is_vertical_or_margin(&footnote_marker, A4, &config));
    }

    #[test]
    fn test_degenerate_box_is_skipped() {
        let config = LayoutConfig::default();
        assert!(is_vertical_or_margin(&BoundingBox::new(5.0, 5.0, 5.0, 9.0), A4, &config));
    }
}
