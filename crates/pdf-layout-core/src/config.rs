use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Language codes following ISO 639-1 with regional variants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Serde default functions for common languages
fn default_source_lang() -> Lang {
    Lang::new("en")
}

fn default_target_lang() -> Lang {
    Lang::new("tr")
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// RGB fill color for inserted text, components in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl TextColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Decode a packed `0xRRGGBB` span color.
    pub fn from_packed(rgb: u32) -> Self {
        let channel =
            |shift: u32| f32::from(u8::try_from((rgb >> shift) & 0xFF).unwrap_or(0)) / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::black()
    }
}

/// Translation/OCR provider configuration for OpenAI-compatible APIs.
///
/// Defaults target OpenRouter; any chat-completions endpoint with vision
/// support works for OCR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub translate_model: String,
    #[serde(default = "default_model")]
    pub ocr_model: String,
    #[serde(default = "default_translate_timeout_secs")]
    pub translate_timeout_secs: u64,
    #[serde(default = "default_ocr_timeout_secs")]
    pub ocr_timeout_secs: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl ProviderConfig {
    /// Create a provider config using one model for both translation and OCR
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            api_base: api_base.into(),
            api_key,
            translate_model: model.clone(),
            ocr_model: model,
            ..Self::default()
        }
    }
}

fn default_api_base() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "google/gemini-2.5-flash-lite".to_string()
}

const fn default_translate_timeout_secs() -> u64 {
    90
}

const fn default_ocr_timeout_secs() -> u64 {
    120
}

const fn default_retry_count() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            translate_model: default_model(),
            ocr_model: default_model(),
            translate_timeout_secs: default_translate_timeout_secs(),
            ocr_timeout_secs: default_ocr_timeout_secs(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable memory cache
    #[serde(default = "default_true")]
    pub memory_enabled: bool,

    /// Maximum memory cache entries
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: u64,

    /// Enable disk cache
    #[serde(default = "default_true")]
    pub disk_enabled: bool,

    /// Disk cache directory (defaults to $XDG_CACHE_HOME/pdf-layout)
    pub disk_path: Option<PathBuf>,
}

const fn default_true() -> bool {
    true
}

const fn default_memory_max_entries() -> u64 {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_enabled: true,
            memory_max_entries: default_memory_max_entries(),
            disk_enabled: true,
            disk_path: None,
        }
    }
}

impl CacheConfig {
    /// Where the disk tier lives: `disk_path`, or `$XDG_CACHE_HOME/pdf-layout`.
    pub fn resolved_disk_path(&self) -> PathBuf {
        self.disk_path.clone().unwrap_or_else(|| {
            xdg_dir("XDG_CACHE_HOME", ".cache")
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join(APP_DIR)
        })
    }
}

const APP_DIR: &str = "pdf-layout";

/// `$<var>` if set, otherwise `$HOME/<home_fallback>`.
fn xdg_dir(var: &str, home_fallback: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(home_fallback)))
}

/// Calibration parameters for classification and fitting.
///
/// Distances are in page points, ratios are fractions of page width
/// unless noted otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Stripped page text longer than this means the page has a text layer
    pub text_layer_min_chars: usize,
    /// Shortest normalized text worth translating
    pub min_text_chars: usize,
    /// Fewest alphabetic characters worth translating
    pub min_alpha_chars: usize,
    /// Alphabetic share a run must exceed to count as prose
    pub min_alpha_ratio: f32,
    /// Height/width ratio above which a run is a rotated side label
    pub vertical_aspect_ratio: f32,
    pub left_margin_ratio: f32,
    pub right_margin_ratio: f32,
    /// Margin runs taller than this are skipped
    pub margin_min_height: f32,
    /// OCR coordinates beyond this multiple of the page size are pixels
    pub pixel_space_threshold: f32,
    /// OCR boxes narrower or shorter than this are dropped
    pub min_box_size: f32,
    pub min_font_size: f32,
    pub max_font_size: f32,
    pub max_fit_attempts: u32,
    pub ocr_min_font_size: f32,
    pub ocr_max_font_size: f32,
    /// OCR preferred size as a fraction of box height
    pub ocr_font_height_factor: f32,
    pub fallback_font_size: f32,
    pub fallback_max_chars: usize,
    /// Max distance of a line's midpoint from the page center for centering
    pub center_tolerance_ratio: f32,
    /// Line advance as a multiple of font size
    pub line_height_factor: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            text_layer_min_chars: 20,
            min_text_chars: 3,
            min_alpha_chars: 3,
            min_alpha_ratio: 0.30,
            vertical_aspect_ratio: 3.5,
            left_margin_ratio: 0.08,
            right_margin_ratio: 0.92,
            margin_min_height: 25.0,
            pixel_space_threshold: 1.25,
            min_box_size: 4.0,
            min_font_size: 6.0,
            max_font_size: 20.0,
            max_fit_attempts: 8,
            ocr_min_font_size: 7.0,
            ocr_max_font_size: 16.0,
            ocr_font_height_factor: 0.72,
            fallback_font_size: 8.0,
            fallback_max_chars: 1200,
            center_tolerance_ratio: 0.08,
            line_height_factor: 1.2,
        }
    }
}

/// Pipeline tuning: chunking, rasterization and request fan-out
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum characters per chunk sent to the translator
    pub chunk_chars: usize,
    /// How far back from the limit to look for a space to cut at
    pub chunk_lookback: usize,
    /// Resolution used when rasterizing scanned pages for OCR
    pub ocr_dpi: u32,
    /// Remote calls in flight per page
    pub concurrency: usize,
    /// OCR regions below this confidence are ignored
    pub min_ocr_confidence: f32,
    /// Pass box-capacity hints to the translator
    pub length_hints: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 1800,
            chunk_lookback: 150,
            ocr_dpi: 170,
            concurrency: 4,
            min_ocr_confidence: 0.0,
            length_hints: true,
        }
    }
}

/// Font files for the four output aliases.
///
/// File names are resolved against `dir`. Aliases without a readable file
/// keep the bundled DejaVu face for that alias.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FontConfig {
    pub dir: Option<PathBuf>,
    pub sans_regular: Option<String>,
    pub sans_bold: Option<String>,
    pub serif_regular: Option<String>,
    pub serif_bold: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source language
    #[serde(default = "default_source_lang")]
    pub source_lang: Lang,

    /// Target language
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    /// Translation/OCR provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub fonts: FontConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            provider: ProviderConfig::default(),
            cache: CacheConfig::default(),
            layout: LayoutConfig::default(),
            pipeline: PipelineConfig::default(),
            fonts: FontConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/pdf-layout/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = xdg_dir("XDG_CONFIG_HOME", ".config") {
            let user_config = config_dir.join(APP_DIR).join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        // Return defaults
        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| Error::ConfigInvalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.pipeline.chunk_chars == 0 {
            return Err(invalid("pipeline.chunk_chars", "must be greater than zero"));
        }
        if self.pipeline.concurrency == 0 {
            return Err(invalid("pipeline.concurrency", "must be greater than zero"));
        }
        if self.pipeline.ocr_dpi == 0 {
            return Err(invalid("pipeline.ocr_dpi", "must be greater than zero"));
        }

        let layout = &self.layout;
        if layout.min_font_size <= 0.0 || layout.min_font_size > layout.max_font_size {
            return Err(invalid(
                "layout.min_font_size",
                "must be positive and not exceed max_font_size",
            ));
        }
        if layout.ocr_min_font_size > layout.ocr_max_font_size {
            return Err(invalid("layout.ocr_min_font_size", "must not exceed ocr_max_font_size"));
        }
        if layout.max_fit_attempts == 0 {
            return Err(invalid("layout.max_fit_attempts", "must be at least 1"));
        }
        for (field, ratio) in [
            ("layout.min_alpha_ratio", layout.min_alpha_ratio),
            ("layout.left_margin_ratio", layout.left_margin_ratio),
            ("layout.right_margin_ratio", layout.right_margin_ratio),
            ("layout.center_tolerance_ratio", layout.center_tolerance_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(invalid(field, "must be between 0 and 1"));
            }
        }
        if layout.left_margin_ratio >= layout.right_margin_ratio {
            return Err(invalid("layout.left_margin_ratio", "must be less than right_margin_ratio"));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.source_lang.as_str(), "en");
        assert_eq!(config.target_lang.as_str(), "tr");
        assert_eq!(config.provider.retry_count, 3);
        assert_eq!(config.provider.ocr_timeout_secs, 120);
        assert_eq!(config.pipeline.chunk_lookback, 150);
        assert!((config.layout.min_alpha_ratio - 0.30).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            target_lang = "de"

            [layout]
            margin_min_height = 40.0

            [pipeline]
            chunk_chars = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.target_lang.as_str(), "de");
        assert!((config.layout.margin_min_height - 40.0).abs() < f32::EPSILON);
        assert!((config.layout.vertical_aspect_ratio - 3.5).abs() < f32::EPSILON);
        assert_eq!(config.pipeline.chunk_chars, 500);
        assert_eq!(config.pipeline.ocr_dpi, 170);
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let err = AppConfig::from_toml("[pipeline]\nchunk_chars = 0\n").unwrap_err();
        assert!(matches!(
            err,
            Error::ConfigInvalid { ref field, .. } if field == "pipeline.chunk_chars"
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_font_range() {
        let err = AppConfig::from_toml("[layout]\nmin_font_size = 30.0\n").unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_packed_color() {
        let color = TextColor::from_packed(0x00FF_0080);
        assert!((color.r - 1.0).abs() < f32::EPSILON);
        assert!(color.g.abs() < f32::EPSILON);
        assert!((color.b - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_cache_path_prefers_configured_dir() {
        let cache = CacheConfig {
            disk_path: Some(PathBuf::from("/tmp/translations")),
            ..CacheConfig::default()
        };
        assert_eq!(cache.resolved_disk_path(), PathBuf::from("/tmp/translations"));
        assert!(CacheConfig::default().resolved_disk_path().ends_with("pdf-layout"));
    }
}
