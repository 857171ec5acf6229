//! Shrink-to-fit insertion of translated text.
//!
//! The box is always painted white before anything is drawn, so translated
//! text never sits on top of the original glyphs. Sizes are tried from the
//! preferred size downwards in 1pt steps; when nothing fits, the text is
//! written as one small line at the top-left of the box so no translated
//! unit disappears.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::geometry::{BoundingBox, Point};
use super::style::FontAlias;
use crate::config::{LayoutConfig, TextColor};
use crate::error::Result;
use crate::pdf::{DocumentEngine, InsertOutcome, TextPlacement};

/// Horizontal alignment of inserted text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Center,
}

/// Everything needed to paint one translated unit
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub rect: BoundingBox,
    pub text: String,
    pub font: FontAlias,
    pub color: TextColor,
    pub align: Alignment,
    /// Size inherited from the source, before clamping
    pub preferred_size: f32,
}

/// How a plan ended up on the page
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitOutcome {
    Fitted { size: f32 },
    Fallback,
}

/// Center lines whose midpoint sits near the page's horizontal center.
pub fn choose_alignment(bbox: &BoundingBox, page_width: f32, config: &LayoutConfig) -> Alignment {
    let offset = (bbox.center_x() - page_width / 2.0).abs();
    if offset <= page_width * config.center_tolerance_ratio {
        Alignment::Center
    } else {
        Alignment::Left
    }
}

/// Preferred size for an OCR region, derived from its height.
pub fn ocr_preferred_size(box_height: f32, config: &LayoutConfig) -> f32 {
    (box_height * config.ocr_font_height_factor)
        .clamp(config.ocr_min_font_size, config.ocr_max_font_size)
}

/// Paints render plans onto pages of a document.
pub struct TextFitter<'a> {
    config: &'a LayoutConfig,
}

impl<'a> TextFitter<'a> {
    pub const fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    pub fn paint<E: DocumentEngine + ?Sized>(
        &self,
        engine: &mut E,
        page: usize,
        plan: &RenderPlan,
    ) -> Result<FitOutcome> {
        engine.paint_opaque(page, plan.rect)?;

        let min = self.config.min_font_size;
        let mut size = plan.preferred_size.clamp(min, self.config.max_font_size);

        for _ in 0..self.config.max_fit_attempts {
            let placement = TextPlacement {
                rect: plan.rect,
                text: &plan.text,
                size,
                line_height_factor: self.config.line_height_factor,
                font: plan.font,
                align: plan.align,
                color: plan.color,
            };
            if engine.insert_text(page, &placement)? == InsertOutcome::Fitted {
                return Ok(FitOutcome::Fitted { size });
            }

            size -= 1.0;
            if size < min {
                break;
            }
        }

        debug!(
            "Text does not fit {:?} on page {}, using fallback line",
            plan.rect.as_array(),
            page + 1
        );
        let origin = Point::new(plan.rect.x0.max(2.0), (plan.rect.y0 + 8.0).max(8.0));
        let text: String = plan.text.chars().take(self.config.fallback_max_chars).collect();
        engine.insert_line(page, origin, &text, self.config.fallback_font_size, plan.color)?;

        Ok(FitOutcome::Fallback)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::layout::PageSize;
    use crate::pdf::{RasterImage, TextRun};

    #[derive(Debug, PartialEq)]
    enum Op {
        Paint(BoundingBox),
        Text { size: f32 },
        Line { origin: Point, text: String, size: f32 },
    }

    /// Accepts text only at or below `fits_at` points.
    struct Canvas {
        fits_at: f32,
        ops: Vec<Op>,
    }

    impl Canvas {
        fn new(fits_at: f32) -> Self {
            Self { fits_at, ops: Vec::new() }
        }

        fn attempts(&self) -> Vec<f32> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Text { size } => Some(*size),
                    _ => None,
                })
                .collect()
        }
    }

    impl DocumentEngine for Canvas {
        fn page_count(&self) -> usize {
            1
        }

        fn page_size(&self, _page: usize) -> Result<PageSize> {
            Ok(PageSize::new(595.0, 842.0))
        }

        fn page_text(&self, _page: usize) -> Result<String> {
            Ok(String::new())
        }

        fn text_runs(&self, _page: usize) -> Result<Vec<TextRun>> {
            Ok(Vec::new())
        }

        fn rasterize(&self, _page: usize, _dpi: u32) -> Result<RasterImage> {
            Ok(RasterImage { png: Vec::new(), width: 0, height: 0 })
        }

        fn embed_font(&mut self, _alias: FontAlias, _data: Vec<u8>) -> Result<()> {
            Ok(())
        }

        fn paint_opaque(&mut self, _page: usize, rect: BoundingBox) -> Result<()> {
            self.ops.push(Op::Paint(rect));
            Ok(())
        }

        fn insert_text(
            &mut self,
            _page: usize,
            placement: &TextPlacement<'_>,
        ) -> Result<InsertOutcome> {
            self.ops.push(Op::Text { size: placement.size });
            if placement.size <= self.fits_at {
                Ok(InsertOutcome::Fitted)
            } else {
                Ok(InsertOutcome::Overflow)
            }
        }

        fn insert_line(
            &mut self,
            _page: usize,
            origin: Point,
            text: &str,
            size: f32,
            _color: TextColor,
        ) -> Result<()> {
            self.ops.push(Op::Line {
                origin,
                text: text.to_string(),
                size,
            });
            Ok(())
        }

        fn save(&mut self) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn plan(text: &str, preferred_size: f32) -> RenderPlan {
        RenderPlan {
            rect: BoundingBox::new(50.0, 100.0, 300.0, 114.0),
            text: text.to_string(),
            font: FontAlias::SansRegular,
            color: TextColor::black(),
            align: Alignment::Left,
            preferred_size,
        }
    }

    #[test]
    fn test_fits_at_preferred_size_after_painting() {
        let config = LayoutConfig::default();
        let mut canvas = Canvas::new(10.0);
        let outcome = TextFitter::new(&config)
            .paint(&mut canvas, 0, &plan("Merhaba dünya", 10.0))
            .unwrap();

        assert_eq!(outcome, FitOutcome::Fitted { size: 10.0 });
        assert_eq!(canvas.ops[0], Op::Paint(BoundingBox::new(50.0, 100.0, 300.0, 114.0)));
        assert_eq!(canvas.ops[1], Op::Text { size: 10.0 });
        assert_eq!(canvas.ops.len(), 2);
    }

    #[test]
    fn test_shrinks_one_point_at_a_time() {
        let config = LayoutConfig::default();
        let mut canvas = Canvas::new(9.0);
        let outcome = TextFitter::new(&config).paint(&mut canvas, 0, &plan("text", 12.0)).unwrap();

        assert_eq!(outcome, FitOutcome::Fitted { size: 9.0 });
        assert_eq!(canvas.attempts(), vec![12.0, 11.0, 10.0, 9.0]);
    }

    #[test]
    fn test_preferred_size_is_clamped() {
        let config = LayoutConfig::default();
        let mut canvas = Canvas::new(100.0);
        TextFitter::new(&config).paint(&mut canvas, 0, &plan("title", 48.0)).unwrap();
        assert_eq!(canvas.attempts(), vec![20.0]);

        let mut canvas = Canvas::new(100.0);
        TextFitter::new(&config).paint(&mut canvas, 0, &plan("tiny", 3.0)).unwrap();
        assert_eq!(canvas.attempts(), vec![6.0]);
    }

    #[test]
    fn test_attempts_stop_at_floor() {
        let config = LayoutConfig::default();
        let mut canvas = Canvas::new(0.0);
        TextFitter::new(&config).paint(&mut canvas, 0, &plan("text", 8.0)).unwrap();
        assert_eq!(canvas.attempts(), vec![8.0, 7.0, 6.0]);
    }

    #[test]
    fn test_at_most_eight_attempts() {
        let config = LayoutConfig::default();
        let mut canvas = Canvas::new(0.0);
        TextFitter::new(&config).paint(&mut canvas, 0, &plan("text", 20.0)).unwrap();
        assert_eq!(canvas.attempts().len(), 8);
    }

    #[test]
    fn test_fallback_still_paints_text() {
        let config = LayoutConfig::default();
        let mut canvas = Canvas::new(0.0);
        let long = "uzun ".repeat(400);
        let outcome = TextFitter::new(&config).paint(&mut canvas, 0, &plan(&long, 10.0)).unwrap();

        assert_eq!(outcome, FitOutcome::Fallback);
        assert!(matches!(canvas.ops.first(), Some(Op::Paint(_))));
        match canvas.ops.last() {
            Some(Op::Line { origin, text, size }) => {
                assert_eq!(*origin, Point::new(50.0, 108.0));
                assert_eq!(text.chars().count(), 1200);
                assert!((size - 8.0).abs() < f32::EPSILON);
            }
            other => panic!("expected fallback line, got {other:?}"),
        }
    }

    #[test]
    fn test_fallback_origin_stays_on_page() {
        let config = LayoutConfig::default();
        let mut canvas = Canvas::new(0.0);
        let mut p = plan("edge", 10.0);
        p.rect = BoundingBox::new(-5.0, -20.0, 40.0, -10.0);
        TextFitter::new(&config).paint(&mut canvas, 0, &p).unwrap();
        assert!(matches!(
            canvas.ops.last(),
            Some(Op::Line { origin, .. }) if *origin == Point::new(2.0, 8.0)
        ));
    }

    #[test]
    fn test_alignment() {
        let config = LayoutConfig::default();
        let title = BoundingBox::new(200.0, 50.0, 400.0, 70.0);
        assert_eq!(choose_alignment(&title, 595.0, &config), Alignment::Center);
        let body = BoundingBox::new(72.0, 100.0, 300.0, 112.0);
        assert_eq!(choose_alignment(&body, 595.0, &config), Alignment::Left);
    }

    #[test]
    fn test_ocr_preferred_size() {
        let config = LayoutConfig::default();
        assert!((ocr_preferred_size(5.0, &config) - 7.0).abs() < f32::EPSILON);
        assert!((ocr_preferred_size(15.0, &config) - 10.8).abs() < 1e-4);
        assert!((ocr_preferred_size(80.0, &config) - 16.0).abs() < f32::EPSILON);
    }
}
