//! PDF Layout Translator Core Library
//!
//! Translates the text of a PDF in place, keeping every translated line
//! inside the box the source text occupied:
//! - Page classification (text layer or scanned) and region filtering
//! - Chunked translation through a cache-first gateway
//! - OCR with pixel/page coordinate reconciliation
//! - Shrink-to-fit painting with a fallback that never drops text

pub mod cache;
pub mod config;
pub mod error;
pub mod layout;
pub mod pdf;
pub mod pipeline;
pub mod text;
pub mod translator;

pub use cache::{CacheKey, CancelFlag, TranslationCache, TranslationGateway};
pub use config::{
    AppConfig, CacheConfig, FontConfig, Lang, LayoutConfig, PipelineConfig, ProviderConfig,
    TextColor,
};
pub use error::{Error, ErrorCode, Result};
pub use layout::{BoundingBox, FontAlias, PageMode, PageSize};
pub use pdf::{DocumentEngine, InsertOutcome, PdfDocument, RasterImage, TextPlacement, TextRun};
pub use pipeline::{DocumentSummary, PageProgress, TextUnit};
pub use translator::{
    LengthConstraint, OcrEngine, OcrRegion, OpenAiTranslator, Translator, create_provider,
};

use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use layout::{FitOutcome, RenderPlan, TextFitter, choose_alignment, classify_page, reconcile};
use pipeline::{estimate_capacity, ocr_units, text_layer_units};
use text::{chunk_text, join_chunks};

/// What happened on one page
struct PageReport {
    mode: PageMode,
    painted: usize,
    fallbacks: usize,
}

/// Drives documents through classification, translation and painting.
///
/// One instance can process many documents; the cache and cancel flag are
/// shared by all of them.
pub struct LayoutTranslator {
    gateway: TranslationGateway,
    ocr: Arc<dyn OcrEngine>,
    config: AppConfig,
    cancel: CancelFlag,
}

impl LayoutTranslator {
    /// Create a translator backed by the configured provider and cache
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let provider = create_provider(&config.provider)?;
        let cache = Arc::new(TranslationCache::new(&config.cache)?);

        Ok(Self::with_providers(provider.clone(), provider, cache, config))
    }

    /// Create with custom translation and OCR backends
    pub fn with_providers(
        translator: Arc<dyn Translator>,
        ocr: Arc<dyn OcrEngine>,
        cache: Arc<TranslationCache>,
        config: AppConfig,
    ) -> Self {
        let cancel = CancelFlag::new();
        let gateway = TranslationGateway::new(translator, cache, cancel.clone());

        Self {
            gateway,
            ocr,
            config,
            cancel,
        }
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &TranslationCache {
        self.gateway.cache()
    }

    /// Handle for stopping new remote calls from another task
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Translate every page of a document.
    pub async fn translate_document<E: DocumentEngine + ?Sized>(
        &self,
        engine: &mut E,
        progress: Option<&UnboundedSender<PageProgress>>,
    ) -> Result<DocumentSummary> {
        let pages: Vec<usize> = (0..engine.page_count()).collect();
        self.translate_pages(engine, &pages, progress).await
    }

    /// Translate the given 0-indexed pages, in order.
    ///
    /// Other pages are left untouched. Any failure aborts the run; pages
    /// painted before it are not rolled back, so the caller must discard the
    /// document on error.
    pub async fn translate_pages<E: DocumentEngine + ?Sized>(
        &self,
        engine: &mut E,
        pages: &[usize],
        progress: Option<&UnboundedSender<PageProgress>>,
    ) -> Result<DocumentSummary> {
        let total = engine.page_count();
        if let Some(&page) = pages.iter().find(|&&p| p >= total) {
            return Err(Error::PdfInvalidPage { page, total });
        }

        self.load_fonts(engine);

        let mut summary = DocumentSummary {
            pages_total: total,
            ..DocumentSummary::default()
        };

        for &page in pages {
            let report = self.translate_page(engine, page).await?;
            summary.record_page(report.mode);
            summary.regions_painted += report.painted;
            summary.fallback_insertions += report.fallbacks;

            info!(
                "Page {}/{} done: {} region(s) via {}",
                page + 1,
                total,
                report.painted,
                report.mode
            );

            if let Some(tx) = progress
                && tx
                    .send(PageProgress {
                        page_number: page + 1,
                        mode: report.mode,
                    })
                    .is_err()
            {
                debug!("Progress receiver dropped");
            }
        }

        Ok(summary)
    }

    /// Register configured font files, leaving built-in fonts for the rest.
    fn load_fonts<E: DocumentEngine + ?Sized>(&self, engine: &mut E) {
        let fonts = &self.config.fonts;
        let files = [
            (FontAlias::SansRegular, &fonts.sans_regular),
            (FontAlias::SansBold, &fonts.sans_bold),
            (FontAlias::SerifRegular, &fonts.serif_regular),
            (FontAlias::SerifBold, &fonts.serif_bold),
        ];

        for (alias, file) in files {
            let Some(file) = file else {
                continue;
            };
            let path = fonts
                .dir
                .as_ref()
                .map_or_else(|| PathBuf::from(file), |dir| dir.join(file));

            let loaded = std::fs::read(&path)
                .map_err(Error::from)
                .and_then(|data| engine.embed_font(alias, data));
            match loaded {
                Ok(()) => debug!("Embedded {} for {}", path.display(), alias),
                Err(e) => warn!(
                    "Using {} for {}: cannot load {}: {}",
                    alias.builtin_name(),
                    alias,
                    path.display(),
                    e
                ),
            }
        }
    }

    async fn translate_page<E: DocumentEngine + ?Sized>(
        &self,
        engine: &mut E,
        page: usize,
    ) -> Result<PageReport> {
        self.cancel.check()?;

        let layout = &self.config.layout;
        let size = engine.page_size(page)?;
        let mode = classify_page(&engine.page_text(page)?, layout);
        debug!("Page {} classified as {}", page + 1, mode);

        let units = match mode {
            PageMode::TextLayer => text_layer_units(engine.text_runs(page)?, size, layout),
            PageMode::Scanned => {
                let raster = engine.rasterize(page, self.config.pipeline.ocr_dpi)?;
                self.cancel.check()?;
                let regions = self.ocr.ocr(&raster.png, &self.config.source_lang).await?;

                let reconciliation = reconcile(
                    &regions,
                    size,
                    raster.width,
                    raster.height,
                    layout.pixel_space_threshold,
                );
                debug!(
                    "Page {}: {} OCR region(s), {:?} coordinates",
                    page + 1,
                    regions.len(),
                    reconciliation.space
                );
                ocr_units(
                    regions,
                    &reconciliation,
                    size,
                    self.config.pipeline.min_ocr_confidence,
                    layout,
                )
            }
        };

        let translations = self.translate_units(&units).await?;

        let fitter = TextFitter::new(layout);
        let mut report = PageReport {
            mode,
            painted: 0,
            fallbacks: 0,
        };

        for (unit, text) in units.iter().zip(translations) {
            if text.is_empty() {
                continue;
            }
            let plan = RenderPlan {
                rect: unit.bbox,
                text,
                font: unit.style.font_alias(),
                color: unit.color,
                align: choose_alignment(&unit.bbox, size.width, layout),
                preferred_size: unit.style.size,
            };
            if matches!(fitter.paint(engine, page, &plan)?, FitOutcome::Fallback) {
                report.fallbacks += 1;
            }
            report.painted += 1;
        }

        Ok(report)
    }

    /// Translate every unit's chunks with bounded concurrency, then rejoin
    /// them per unit in their original order.
    async fn translate_units(&self, units: &[TextUnit]) -> Result<Vec<String>> {
        let pipeline = &self.config.pipeline;

        let mut jobs = Vec::new();
        for (index, unit) in units.iter().enumerate() {
            let chunks = chunk_text(&unit.text, pipeline.chunk_chars, pipeline.chunk_lookback);
            // Capacity hints only make sense when one request covers the whole box
            let constraint = (pipeline.length_hints && chunks.len() == 1)
                .then(|| estimate_capacity(unit, &self.config.layout));
            jobs.extend(chunks.into_iter().map(|chunk| (index, chunk, constraint)));
        }

        let gateway = &self.gateway;
        let source = &self.config.source_lang;
        let target = &self.config.target_lang;

        let resolved: Vec<(usize, String)> = stream::iter(jobs)
            .map(|(index, chunk, constraint)| async move {
                gateway
                    .resolve(source, target, &chunk, constraint.as_ref())
                    .await
                    .map(|translated| (index, translated))
            })
            .buffered(pipeline.concurrency.max(1))
            .try_collect()
            .await?;

        let mut parts: Vec<Vec<String>> = vec![Vec::new(); units.len()];
        for (index, translated) in resolved {
            if let Some(slot) = parts.get_mut(index) {
                slot.push(translated);
            }
        }

        Ok(parts.iter().map(Vec::as_slice).map(join_chunks).collect())
    }
}
