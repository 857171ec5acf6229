//! Text extraction with MuPDF.
//!
//! Line text, bounds and size come from the structured-text page itself,
//! which keeps fractional coordinates. The JSON rendering of the same page
//! truncates geometry to whole points, so it is only used for the font of
//! each line's first character and matched to lines by position.

use mupdf::{Document as MuDocument, Page, TextPage, TextPageOptions};
use serde::Deserialize;
use tracing::debug;

use super::engine::TextRun;
use super::page_index::PageIndex;
use crate::error::{Error, Result};
use crate::layout::{BoundingBox, SpanFlags};

#[derive(Debug, Deserialize)]
struct StextPage {
    #[serde(default)]
    blocks: Vec<StextBlock>,
}

#[derive(Debug, Deserialize)]
struct StextBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    lines: Vec<StextLine>,
}

#[derive(Debug, Deserialize)]
struct StextLine {
    #[serde(default)]
    font: StextFont,
}

/// Geometry and text of one structured-text line
#[derive(Debug, Clone, PartialEq)]
struct PageLine {
    text: String,
    bbox: BoundingBox,
    /// Size of the first character
    size: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StextFont {
    name: String,
    family: String,
    weight: String,
    style: String,
    size: f32,
}

impl StextFont {
    fn flags(&self) -> SpanFlags {
        SpanFlags {
            bold: self.weight.eq_ignore_ascii_case("bold"),
            italic: self.style.eq_ignore_ascii_case("italic"),
            serif: self.family.eq_ignore_ascii_case("serif"),
        }
    }
}

pub(crate) fn load_page(doc: &MuDocument, page_num: usize, total: usize) -> Result<Page> {
    let index = PageIndex::try_from_page_num(page_num, total)?;
    doc.load_page(index.into())
        .map_err(|e| Error::PdfTextExtraction {
            page: page_num,
            reason: format!("Failed to load page: {e}"),
        })
}

fn text_page(page: &Page, page_num: usize) -> Result<TextPage> {
    page.to_text_page(TextPageOptions::empty())
        .map_err(|e| Error::PdfTextExtraction {
            page: page_num,
            reason: format!("Failed to get text page: {e}"),
        })
}

/// Plain text of a page, one line per text line.
pub(crate) fn page_text(doc: &MuDocument, page_num: usize, total: usize) -> Result<String> {
    let page = load_page(doc, page_num, total)?;
    let text_page = text_page(&page, page_num)?;

    let mut all_text = String::new();
    for block in text_page.blocks() {
        for line in block.lines() {
            for text_char in line.chars() {
                if let Some(c) = text_char.char() {
                    all_text.push(c);
                }
            }
            all_text.push('\n');
        }
    }

    Ok(all_text)
}

/// Text lines of a page with geometry and first-span style.
pub(crate) fn text_runs(doc: &MuDocument, page_num: usize, total: usize) -> Result<Vec<TextRun>> {
    let page = load_page(doc, page_num, total)?;

    // Image blocks have no lines, so both walks see the same line sequence
    let lines: Vec<PageLine> = text_page(&page, page_num)?
        .blocks()
        .flat_map(|block| {
            block
                .lines()
                .map(|line| {
                    let bounds = line.bounds();
                    let mut size = 0.0;
                    let mut text = String::new();
                    for (i, ch) in line.chars().enumerate() {
                        if i == 0 {
                            size = ch.size();
                        }
                        if let Some(c) = ch.char() {
                            text.push(c);
                        }
                    }
                    PageLine {
                        text,
                        bbox: BoundingBox::new(bounds.x0, bounds.y0, bounds.x1, bounds.y1),
                        size,
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let json = page
        .stext_page_as_json_from_page(1.0)
        .map_err(|e| Error::PdfTextExtraction {
            page: page_num,
            reason: format!("Failed to get structured text: {e}"),
        })?;
    let fonts = fonts_from_stext_json(&json).map_err(|e| Error::PdfTextExtraction {
        page: page_num,
        reason: format!("Malformed structured text: {e}"),
    })?;

    if fonts.len() != lines.len() {
        debug!(
            "Page {}: {} lines but {} font records, styles left unset",
            page_num + 1,
            lines.len(),
            fonts.len()
        );
    }

    Ok(merge_runs(lines, fonts))
}

/// Font record of every line, in page order.
fn fonts_from_stext_json(json: &str) -> std::result::Result<Vec<StextFont>, serde_json::Error> {
    let page: StextPage = serde_json::from_str(json)?;

    Ok(page
        .blocks
        .into_iter()
        .filter(|block| block.kind.is_empty() || block.kind == "text")
        .flat_map(|block| block.lines)
        .map(|line| line.font)
        .collect())
}

/// Pair lines with their font records, dropping blank lines.
///
/// Fonts are only trusted when there is exactly one per line.
fn merge_runs(lines: Vec<PageLine>, fonts: Vec<StextFont>) -> Vec<TextRun> {
    let fonts = if fonts.len() == lines.len() {
        fonts
    } else {
        Vec::new()
    };
    let mut fonts = fonts.into_iter();

    lines
        .into_iter()
        .map(|line| (fonts.next().unwrap_or_default(), line))
        .filter(|(_, line)| !line.text.trim().is_empty())
        .map(|(font, line)| TextRun {
            flags: font.flags(),
            size: if line.size > 0.0 { line.size } else { font.size },
            font_name: font.name,
            bbox: line.bbox,
            text: line.text,
            color: None,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"blocks":[
        {"type":"text","bbox":{"x":72,"y":90,"w":200,"h":30},"lines":[
            {"wmode":0,"bbox":{"x":72,"y":90,"w":120,"h":14},
             "font":{"name":"Times-Bold","family":"serif","weight":"bold",
                     "style":"normal","size":12},
             "x":72,"y":101,"text":"Hello world"},
            {"wmode":0,"bbox":{"x":72,"y":106,"w":40,"h":14},
             "font":{"name":"Helvetica","family":"sans-serif","weight":"normal",
                     "style":"italic","size":10},
             "x":72,"y":117,"text":"   "}
        ]},
        {"type":"image","bbox":{"x":0,"y":0,"w":10,"h":10}}
    ]}"#;

    fn line(text: &str, bbox: BoundingBox, size: f32) -> PageLine {
        PageLine {
            text: text.to_string(),
            bbox,
            size,
        }
    }

    #[test]
    fn test_fonts_from_stext_json() {
        let fonts = fonts_from_stext_json(SAMPLE).unwrap();
        assert_eq!(fonts.len(), 2);
        assert_eq!(fonts[0].name, "Times-Bold");
        let flags = fonts[0].flags();
        assert!(flags.bold && flags.serif && !flags.italic);
        assert!(fonts[1].flags().italic);
    }

    #[test]
    fn test_merge_keeps_fractional_bounds() {
        let lines = vec![
            line("Hello world", BoundingBox::new(72.4, 90.6, 192.9, 104.8), 11.5),
            line("   ", BoundingBox::new(72.0, 106.0, 112.0, 120.0), 10.0),
        ];
        let runs = merge_runs(lines, fonts_from_stext_json(SAMPLE).unwrap());

        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.text, "Hello world");
        // Not truncated to the JSON's whole points
        assert_eq!(run.bbox, BoundingBox::new(72.4, 90.6, 192.9, 104.8));
        assert!((run.size - 11.5).abs() < f32::EPSILON);
        assert_eq!(run.font_name, "Times-Bold");
        assert!(run.flags.bold && run.flags.serif);
        assert!(run.color.is_none());
    }

    #[test]
    fn test_mismatched_fonts_are_ignored() {
        let lines = vec![
            line("first", BoundingBox::new(0.0, 0.0, 5.0, 5.0), 9.0),
            line("second", BoundingBox::new(0.0, 6.0, 5.0, 11.0), 0.0),
        ];
        let fonts = vec![StextFont {
            name: "Times-Bold".to_string(),
            size: 12.0,
            ..StextFont::default()
        }];
        let runs = merge_runs(lines, fonts);
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.font_name.is_empty()));
        assert_eq!(runs[1].flags, SpanFlags::default());
        assert!(runs[1].size.abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_font_defaults() {
        let json = r#"{"blocks":[{"type":"text","lines":[
            {"bbox":{"x":0,"y":0,"w":5,"h":5},"text":"abc"}]}]}"#;
        let fonts = fonts_from_stext_json(json).unwrap();
        assert_eq!(fonts[0].flags(), SpanFlags::default());
        assert!(fonts[0].name.is_empty());
    }

    #[test]
    fn test_empty_page() {
        assert!(fonts_from_stext_json(r#"{"blocks":[]}"#).unwrap().is_empty());
        assert!(fonts_from_stext_json("not json").is_err());
        assert!(merge_runs(Vec::new(), Vec::new()).is_empty());
    }
}
