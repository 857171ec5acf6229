//! Painting onto PDF pages with lopdf.
//!
//! # Coordinate System
//!
//! Everything above this module uses a **top-left origin** (y grows
//! downward) on the page as displayed, the way MuPDF reports text: relative
//! to the CropBox, with `/Rotate` applied. PDF content streams use
//! **bottom-left origin** user space. The conversion happens here and
//! nowhere else. For an unrotated page with CropBox `[x0 y0 x1 y1]`:
//! ```text
//! pdf_x = x0 + x
//! pdf_y = y1 - y
//! ```
//! Rotated pages additionally turn the displayed axes back into user space,
//! and text is drawn with a matching rotation so it reads upright.
//!
//! Drawing operations are buffered per page and appended as one extra
//! content stream when the document is saved, so the original page content
//! stays untouched underneath.

use std::collections::BTreeSet;
use std::fmt::Write;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::font::OutputFont;
use crate::config::TextColor;
use crate::error::{Error, Result};
use crate::layout::{Alignment, BoundingBox, FontAlias, Point};

/// Baseline offset of the first line below the box top, as a fraction of
/// the font size.
const ASCENT_RATIO: f32 = 0.8;

/// Slack for float rounding when comparing text extents to box sizes.
const FIT_EPSILON: f32 = 0.01;

/// Maps top-left page points into PDF user space for one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    /// Visible area in user space, normalized so `x0 <= x1` and `y0 <= y1`
    crop: [f32; 4],
    /// Clockwise display rotation: 0, 90, 180 or 270
    rotation: u16,
}

impl PageFrame {
    pub fn new(crop: [f32; 4], rotate: i64) -> Self {
        let rotation = match rotate.rem_euclid(360) {
            90 => 90,
            180 => 180,
            270 => 270,
            _ => 0,
        };
        Self {
            crop: normalize_box(crop),
            rotation,
        }
    }

    /// Frame of a page object: CropBox clipped to MediaBox, plus `/Rotate`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_page(doc: &Document, page_obj: &Object) -> Self {
        let media = normalize_box(media_box(doc, page_obj));
        let crop = inherited_box(doc, page_obj, b"CropBox")
            .map(normalize_box)
            .and_then(|crop| intersect(crop, media))
            .unwrap_or(media);
        let rotate = inherited(doc, page_obj, b"Rotate")
            .and_then(|obj| number(doc, &obj))
            .map_or(0, |deg| deg.round() as i64);
        Self::new(crop, rotate)
    }

    fn width(self) -> f32 {
        self.crop[2] - self.crop[0]
    }

    fn height(self) -> f32 {
        self.crop[3] - self.crop[1]
    }

    /// A displayed top-left point in user space.
    pub fn point(self, x: f32, y: f32) -> (f32, f32) {
        // Offsets from the unrotated top-left corner
        let (u, v) = match self.rotation {
            90 => (y, self.height() - x),
            180 => (self.width() - x, self.height() - y),
            270 => (self.width() - y, x),
            _ => (x, y),
        };
        (self.crop[0] + u, self.crop[3] - v)
    }

    /// A displayed rectangle as `x y width height` in user space.
    pub fn rect(self, rect: BoundingBox) -> [f32; 4] {
        let (ax, ay) = self.point(rect.x0, rect.y0);
        let (bx, by) = self.point(rect.x1, rect.y1);
        [ax.min(bx), ay.min(by), (ax - bx).abs(), (ay - by).abs()]
    }

    /// Linear part of the text matrix that draws upright on the displayed page.
    const fn text_axes(self) -> [i8; 4] {
        match self.rotation {
            90 => [0, 1, -1, 0],
            180 => [-1, 0, 0, -1],
            270 => [0, -1, 1, 0],
            _ => [1, 0, 0, 1],
        }
    }
}

fn normalize_box(b: [f32; 4]) -> [f32; 4] {
    [b[0].min(b[2]), b[1].min(b[3]), b[0].max(b[2]), b[1].max(b[3])]
}

fn intersect(a: [f32; 4], b: [f32; 4]) -> Option<[f32; 4]> {
    let r = [a[0].max(b[0]), a[1].max(b[1]), a[2].min(b[2]), a[3].min(b[3])];
    (r[0] < r[2] && r[1] < r[3]).then_some(r)
}

/// Drawing operations queued for one page.
#[derive(Debug, Default)]
pub struct PageOps {
    content: String,
    fonts: BTreeSet<FontAlias>,
}

impl PageOps {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub const fn fonts(&self) -> &BTreeSet<FontAlias> {
        &self.fonts
    }

    pub fn content(&self) -> &[u8] {
        self.content.as_bytes()
    }

    /// Opaque white rectangle over `rect`.
    pub fn fill_white(&mut self, frame: PageFrame, rect: BoundingBox) {
        let [x, y, w, h] = frame.rect(rect);
        let _ = writeln!(self.content, "q\n1 1 1 rg\n{x:.2} {y:.2} {w:.2} {h:.2} re f\nQ");
    }

    /// One line of text with its baseline starting at `origin`.
    pub fn show_line(
        &mut self,
        frame: PageFrame,
        font: &mut OutputFont,
        origin: Point,
        text: &str,
        size: f32,
        color: TextColor,
    ) {
        let encoded = font.encode(text);
        self.fonts.insert(font.alias());
        let (x, y) = frame.point(origin.x, origin.y);
        let [a, b, c, d] = frame.text_axes();
        // Tr 0 resets invisible OCR text layers some scanners leave behind
        let _ = writeln!(
            self.content,
            "q\n{:.3} {:.3} {:.3} rg\n0 Tr\nBT\n/{} {:.2} Tf\n\
             {a} {b} {c} {d} {x:.2} {y:.2} Tm\n{} Tj\nET\nQ",
            color.r,
            color.g,
            color.b,
            font.alias().resource_name(),
            size,
            encoded
        );
    }
}

/// A wrapped line and its horizontal offset inside the box.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub origin: Point,
}

/// Lay `text` out inside `rect`, or `None` if the wrapped text is taller
/// than the box.
///
/// Explicit newlines start new lines. Words wider than the box are broken
/// between characters.
pub fn layout_text(
    text: &str,
    rect: BoundingBox,
    size: f32,
    line_height_factor: f32,
    align: Alignment,
    measure: impl Fn(&str) -> f32,
) -> Option<Vec<PlacedLine>> {
    let max_width = rect.width();
    if max_width <= 0.0 || rect.height() <= 0.0 {
        return None;
    }

    let lines = wrap_text(text, max_width, &measure);
    let line_height = size * line_height_factor;
    #[allow(clippy::cast_precision_loss)] // line counts are small
    let needed = (lines.len().saturating_sub(1)) as f32 * line_height + size;
    if needed > rect.height() + FIT_EPSILON {
        return None;
    }

    Some(
        lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                let offset = match align {
                    Alignment::Left => 0.0,
                    Alignment::Center => ((max_width - measure(&line)) / 2.0).max(0.0),
                };
                #[allow(clippy::cast_precision_loss)]
                let baseline = rect.y0 + size * ASCENT_RATIO + i as f32 * line_height;
                PlacedLine {
                    text: line,
                    origin: Point::new(rect.x0 + offset, baseline),
                }
            })
            .collect(),
    )
}

/// Greedy word wrap by measured width.
fn wrap_text(text: &str, max_width: f32, measure: &impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if measure(&candidate) <= max_width + FIT_EPSILON {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if measure(word) <= max_width + FIT_EPSILON {
                current = word.to_string();
            } else {
                let mut pieces = break_word(word, max_width, measure);
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }

        lines.push(current);
    }

    // Drop trailing empty lines from a trailing newline, keep at least one
    while lines.len() > 1 && lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

/// Split a single over-wide word into pieces that each fit.
fn break_word(word: &str, max_width: f32, measure: &impl Fn(&str) -> f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for c in word.chars() {
        current.push(c);
        if current.chars().count() > 1 && measure(&current) > max_width + FIT_EPSILON {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(c);
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Get media box from page object, walking up to inherited values.
pub fn media_box(doc: &Document, page_obj: &Object) -> [f32; 4] {
    // Default to US Letter size
    inherited_box(doc, page_obj, b"MediaBox").unwrap_or([0.0, 0.0, 612.0, 792.0])
}

/// A rectangle attribute of a page, or of the nearest ancestor that has it.
fn inherited_box(doc: &Document, page_obj: &Object, key: &[u8]) -> Option<[f32; 4]> {
    let Object::Array(arr) = inherited(doc, page_obj, key)? else {
        return None;
    };
    let values: Vec<f32> = arr.iter().filter_map(|o| number(doc, o)).collect();
    match values.as_slice() {
        [x0, y0, x1, y1] => Some([*x0, *y0, *x1, *y1]),
        _ => None,
    }
}

/// An inheritable page attribute, resolved through references.
fn inherited(doc: &Document, page_obj: &Object, key: &[u8]) -> Option<Object> {
    let mut node = page_obj;
    // Depth-limited against cycles in the page tree
    for _ in 0..32 {
        let Object::Dictionary(dict) = node else {
            return None;
        };
        if let Ok(value) = dict.get(key) {
            return match value {
                Object::Reference(id) => doc.get_object(*id).ok().cloned(),
                other => Some(other.clone()),
            };
        }
        let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") else {
            return None;
        };
        node = doc.get_object(*parent_id).ok()?;
    }
    None
}

fn number(doc: &Document, obj: &Object) -> Option<f32> {
    match obj {
        #[allow(clippy::cast_precision_loss)]
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        Object::Reference(id) => match doc.get_object(*id) {
            #[allow(clippy::cast_precision_loss)]
            Ok(Object::Integer(i)) => Some(*i as f32),
            Ok(Object::Real(r)) => Some(*r),
            _ => None,
        },
        _ => None,
    }
}

/// Append one content stream to a page.
pub fn append_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let content_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content)));

    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

    if let Object::Dictionary(dict) = page {
        let contents = match dict.get(b"Contents").ok().cloned() {
            Some(Object::Reference(existing)) => Object::Array(vec![
                Object::Reference(existing),
                Object::Reference(content_id),
            ]),
            Some(Object::Array(mut arr)) => {
                arr.push(Object::Reference(content_id));
                Object::Array(arr)
            }
            _ => Object::Reference(content_id),
        };
        dict.set("Contents", contents);
    }

    Ok(())
}

/// Reference `fonts` from a page's `/Font` resources under their alias names.
///
/// Resources may be inline, indirect, or inherited from the page tree; the
/// merged dictionary is written back inline on the page.
pub fn add_fonts_to_page(
    doc: &mut Document,
    page_id: ObjectId,
    fonts: &[(FontAlias, ObjectId)],
) -> Result<()> {
    let mut resources = resolve_resources(doc, page_id)?;

    let mut font_dict = resources
        .get(b"Font")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .unwrap_or_default();

    for (alias, id) in fonts {
        font_dict.set(alias.resource_name(), Object::Reference(*id));
    }
    resources.set("Font", Object::Dictionary(font_dict));

    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
    if let Object::Dictionary(page_dict) = page {
        page_dict.set("Resources", Object::Dictionary(resources));
    }

    Ok(())
}

fn resolve_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let page = doc
        .get_object(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

    if let Object::Dictionary(page_dict) = page {
        if let Ok(res) = page_dict.get(b"Resources")
            && let Some(dict) = resolve_dict(doc, res)
        {
            return Ok(dict);
        }

        // Pages nodes pass Resources down; depth-limited against cycles
        let mut parent = page_dict.get(b"Parent").ok();
        for _ in 0..10 {
            let Some(Object::Reference(parent_id)) = parent else {
                break;
            };
            let Ok(Object::Dictionary(node)) = doc.get_object(*parent_id) else {
                break;
            };
            if let Ok(res) = node.get(b"Resources")
                && let Some(dict) = resolve_dict(doc, res)
            {
                return Ok(dict);
            }
            parent = node.get(b"Parent").ok();
        }
    }

    Ok(Dictionary::new())
}

fn resolve_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Dictionary(d)) => Some(d.clone()),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Every character is 5pt wide at any size.
    #[allow(clippy::cast_precision_loss)]
    fn fixed(text: &str) -> f32 {
        text.chars().count() as f32 * 5.0
    }

    #[test]
    fn test_wrap_by_width() {
        let lines = wrap_text("Hello world this is a test", 50.0, &fixed);
        assert_eq!(lines, vec!["Hello", "world this", "is a test"]);
    }

    #[test]
    fn test_wrap_keeps_explicit_newlines() {
        let lines = wrap_text("Madde 1\nFiyat", 200.0, &fixed);
        assert_eq!(lines, vec!["Madde 1", "Fiyat"]);
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let lines = wrap_text("abcdefghij", 25.0, &fixed);
        assert_eq!(lines, vec!["abcde", "fghij"]);
    }

    #[test]
    fn test_wrap_empty_text() {
        assert_eq!(wrap_text("", 50.0, &fixed), vec![String::new()]);
    }

    #[test]
    fn test_layout_overflows_when_too_tall() {
        let rect = BoundingBox::new(0.0, 0.0, 50.0, 12.0);
        assert!(layout_text("Hello", rect, 10.0, 1.2, Alignment::Left, fixed).is_some());
        assert!(layout_text("Hello world", rect, 10.0, 1.2, Alignment::Left, fixed).is_none());

        let taller = BoundingBox::new(0.0, 0.0, 50.0, 22.0);
        let lines = layout_text("Hello world", taller, 10.0, 1.2, Alignment::Left, fixed).unwrap();
        assert_eq!(lines.len(), 2);
        assert!((lines[1].origin.y - lines[0].origin.y - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_layout_centers_lines() {
        let rect = BoundingBox::new(100.0, 0.0, 200.0, 20.0);
        let lines = layout_text("abcd", rect, 10.0, 1.2, Alignment::Center, fixed).unwrap();
        assert!((lines[0].origin.x - 140.0).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_box_never_fits() {
        let rect = BoundingBox::new(10.0, 10.0, 10.0, 30.0);
        assert!(layout_text("a", rect, 6.0, 1.2, Alignment::Left, fixed).is_none());
    }

    #[test]
    fn test_fill_white_flips_y() {
        let frame = PageFrame::new([0.0, 0.0, 612.0, 792.0], 0);
        let mut ops = PageOps::default();
        ops.fill_white(frame, BoundingBox::new(72.0, 100.0, 172.0, 112.0));
        let content = String::from_utf8(ops.content().to_vec()).unwrap_or_default();
        assert!(content.contains("72.00 680.00 100.00 12.00 re f"));
        assert!(ops.fonts().is_empty());
    }

    /// A one-page document whose page carries `extra` entries.
    fn page_doc(extra: Vec<(&str, Object)>) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let mut page = Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ]);
        for (key, value) in extra {
            page.set(key, value);
        }
        let id = doc.add_object(page);
        (doc, id)
    }

    #[test]
    fn test_crop_box_sets_the_top_edge() {
        let crop = Object::Array(vec![0.into(), 0.into(), 612.into(), 692.into()]);
        let (doc, id) = page_doc(vec![("CropBox", crop)]);
        let frame = PageFrame::from_page(&doc, doc.get_object(id).unwrap());

        // Source baseline at user y=600 reads as y = 692 - 600 = 92 from the top
        let line = BoundingBox::new(72.0, 80.0, 300.0, 96.0);
        let [x, y, w, h] = frame.rect(line);
        assert!((x - 72.0).abs() < 1e-4 && (w - 228.0).abs() < 1e-4);
        assert!(y <= 600.0 && y + h >= 600.0);
        assert!((y - 596.0).abs() < 1e-4);

        let mut ops = PageOps::default();
        ops.fill_white(frame, line);
        let content = String::from_utf8(ops.content().to_vec()).unwrap_or_default();
        assert!(content.contains("72.00 596.00 228.00 16.00 re f"));
    }

    #[test]
    fn test_crop_box_is_clipped_to_media_box() {
        let crop = Object::Array(vec![(-50).into(), 100.into(), 700.into(), 900.into()]);
        let (doc, id) = page_doc(vec![("CropBox", crop)]);
        let frame = PageFrame::from_page(&doc, doc.get_object(id).unwrap());
        assert_eq!(frame, PageFrame::new([0.0, 100.0, 612.0, 792.0], 0));
    }

    #[test]
    fn test_rotated_page_maps_back_to_user_space() {
        let (doc, id) = page_doc(vec![("Rotate", Object::Integer(90))]);
        let frame = PageFrame::from_page(&doc, doc.get_object(id).unwrap());

        // Displayed page is 792 wide and 612 tall
        let [x, y, w, h] = frame.rect(BoundingBox::new(100.0, 50.0, 200.0, 60.0));
        assert_eq!([x, y, w, h], [50.0, 100.0, 10.0, 100.0]);

        let mut font = OutputFont::builtin(FontAlias::SansRegular).unwrap();
        let mut ops = PageOps::default();
        let origin = Point::new(100.0, 58.0);
        ops.show_line(frame, &mut font, origin, "a", 10.0, TextColor::black());
        let content = String::from_utf8(ops.content().to_vec()).unwrap_or_default();
        assert!(content.contains("0 1 -1 0 58.00 100.00 Tm"));
    }

    #[test]
    fn test_rotation_is_normalized() {
        let square = [0.0, 0.0, 10.0, 10.0];
        assert_eq!(PageFrame::new(square, -90), PageFrame::new(square, 270));
        assert_eq!(PageFrame::new(square, 45).text_axes(), [1, 0, 0, 1]);
    }
}
