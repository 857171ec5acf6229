use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use lopdf::{Document as LoDocument, ObjectId};
use mupdf::Document as MuDocument;
use tracing::{debug, warn};

use super::canvas::{self, PageFrame, PageOps};
use super::engine::{DocumentEngine, InsertOutcome, RasterImage, TextPlacement, TextRun};
use super::extract;
use super::font::FontSet;
use super::page_index::PageIndex;
use super::render;
use crate::config::TextColor;
use crate::error::{Error, Result};
use crate::layout::{BoundingBox, FontAlias, PageSize, Point};

/// A PDF opened for reading with MuPDF and painting with lopdf.
///
/// Reads always see the original bytes, so painting a page never changes
/// what later extraction of another page returns. Painting is buffered and
/// written into the lopdf document by [`DocumentEngine::save`].
pub struct PdfDocument {
    /// The original PDF bytes, shared with MuPDF handles
    bytes: Arc<Vec<u8>>,
    page_count: usize,
    doc: LoDocument,
    /// lopdf page object per 0-indexed page
    page_ids: Vec<ObjectId>,
    fonts: FontSet,
    pending: BTreeMap<usize, PageOps>,
}

impl PdfDocument {
    /// Open a PDF from bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();

        let mu = MuDocument::from_bytes(&bytes, "")
            .map_err(|e| Error::PdfOpen(format!("Failed to parse PDF: {e}")))?;
        let page_count = mu
            .page_count()
            .map_err(|e| Error::PdfOpen(format!("Failed to get page count: {e}")))?;
        let page_count = usize::try_from(page_count).unwrap_or(0);

        let doc = LoDocument::load_mem(&bytes)
            .map_err(|e| Error::PdfOpen(format!("Failed to load PDF for editing: {e}")))?;
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

        if page_ids.len() != page_count {
            return Err(Error::PdfOpen(format!(
                "Page tree mismatch: {} pages readable, {} editable",
                page_count,
                page_ids.len()
            )));
        }

        Ok(Self {
            bytes: Arc::new(bytes),
            page_count,
            doc,
            page_ids,
            fonts: FontSet::builtin()?,
            pending: BTreeMap::new(),
        })
    }

    /// Open a PDF from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            Error::PdfOpen(format!("Failed to read file {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_bytes(bytes)
    }

    /// Get raw PDF bytes as a slice.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Save the painted document to `path`.
    pub fn save_to(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.save()?;
        std::fs::write(path.as_ref(), bytes).map_err(|e| {
            Error::PdfSave(format!("Failed to write {}: {}", path.as_ref().display(), e))
        })
    }

    /// Open the document for reading (creates a temporary handle)
    fn open_reader(&self) -> Result<MuDocument> {
        MuDocument::from_bytes(&self.bytes, "")
            .map_err(|e| Error::PdfOpen(format!("Failed to open document: {e}")))
    }

    fn page_id(&self, page: usize) -> Result<ObjectId> {
        let index = PageIndex::try_from_page_num(page, self.page_count)?;
        self.page_ids
            .get(index.as_usize())
            .copied()
            .ok_or(Error::PdfInvalidPage {
                page,
                total: self.page_count,
            })
    }

    fn frame(&self, page: usize) -> Result<PageFrame> {
        let page_id = self.page_id(page)?;
        let page_obj = self.doc.get_object(page_id).map_err(|e| Error::PdfPaint {
            page,
            reason: format!("Failed to get page object: {e}"),
        })?;
        Ok(PageFrame::from_page(&self.doc, page_obj))
    }

    /// Warn about characters `alias` cannot draw on `page`.
    fn check_coverage(&self, page: usize, alias: FontAlias, text: &str) {
        let missing = self.fonts.get(alias).missing_glyphs(text);
        if !missing.is_empty() {
            warn!(
                "Page {}: {} has no glyph for {:?}; configure a font for this script",
                page + 1,
                alias,
                missing.iter().collect::<String>()
            );
        }
    }

    /// Write buffered painting into the lopdf document.
    ///
    /// Fonts are installed once for the whole document and referenced from
    /// every page that uses them.
    fn flush(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        let mut installed: BTreeMap<FontAlias, ObjectId> = BTreeMap::new();

        for (page, ops) in pending {
            if ops.is_empty() {
                continue;
            }
            let page_id = self.page_id(page)?;

            let mut refs = Vec::with_capacity(ops.fonts().len());
            for alias in ops.fonts() {
                let id = match installed.get(alias) {
                    Some(id) => *id,
                    None => {
                        let id = self.fonts.get(*alias).install(&mut self.doc);
                        installed.insert(*alias, id);
                        id
                    }
                };
                refs.push((*alias, id));
            }

            canvas::add_fonts_to_page(&mut self.doc, page_id, &refs)?;
            canvas::append_content(&mut self.doc, page_id, ops.content().to_vec())?;
            debug!("Wrote overlay for page {} with {} font(s)", page + 1, refs.len());
        }

        Ok(())
    }
}

impl DocumentEngine for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_size(&self, page: usize) -> Result<PageSize> {
        let doc = self.open_reader()?;
        let mu_page = extract::load_page(&doc, page, self.page_count)?;
        let bounds = mu_page.bounds().map_err(|e| Error::PdfTextExtraction {
            page,
            reason: format!("Failed to get bounds: {e}"),
        })?;
        Ok(PageSize::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
    }

    fn page_text(&self, page: usize) -> Result<String> {
        let doc = self.open_reader()?;
        extract::page_text(&doc, page, self.page_count)
    }

    fn text_runs(&self, page: usize) -> Result<Vec<TextRun>> {
        let doc = self.open_reader()?;
        extract::text_runs(&doc, page, self.page_count)
    }

    fn rasterize(&self, page: usize, dpi: u32) -> Result<RasterImage> {
        let doc = self.open_reader()?;
        render::rasterize(&doc, page, self.page_count, dpi)
    }

    fn embed_font(&mut self, alias: FontAlias, data: Vec<u8>) -> Result<()> {
        self.fonts.embed(alias, data)
    }

    fn paint_opaque(&mut self, page: usize, rect: BoundingBox) -> Result<()> {
        let frame = self.frame(page)?;
        self.pending.entry(page).or_default().fill_white(frame, rect);
        Ok(())
    }

    fn insert_text(&mut self, page: usize, placement: &TextPlacement<'_>) -> Result<InsertOutcome> {
        let frame = self.frame(page)?;

        let font = self.fonts.get(placement.font);
        let Some(lines) = canvas::layout_text(
            placement.text,
            placement.rect,
            placement.size,
            placement.line_height_factor,
            placement.align,
            |s| font.string_width(s, placement.size),
        ) else {
            return Ok(InsertOutcome::Overflow);
        };

        self.check_coverage(page, placement.font, placement.text);
        let ops = self.pending.entry(page).or_default();
        let font = self.fonts.get_mut(placement.font);
        for line in lines.iter().filter(|l| !l.text.is_empty()) {
            ops.show_line(frame, font, line.origin, &line.text, placement.size, placement.color);
        }

        Ok(InsertOutcome::Fitted)
    }

    fn insert_line(
        &mut self,
        page: usize,
        origin: Point,
        text: &str,
        size: f32,
        color: TextColor,
    ) -> Result<()> {
        let frame = self.frame(page)?;
        let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
        self.check_coverage(page, FontAlias::SansRegular, &line);
        let font = self.fonts.get_mut(FontAlias::SansRegular);
        self.pending
            .entry(page)
            .or_default()
            .show_line(frame, font, origin, &line, size, color);
        Ok(())
    }

    fn save(&mut self) -> Result<Vec<u8>> {
        self.flush()?;

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save PDF: {e}")))?;
        Ok(output)
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_count)
            .field("bytes_len", &self.bytes.len())
            .field("pending_pages", &self.pending.len())
            .finish()
    }
}
