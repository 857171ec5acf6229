use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Lang;
use crate::error::Result;
use crate::layout::BoundingBox;

/// Information about a translator backend
#[derive(Debug, Clone)]
pub struct TranslatorInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether this translator requires an API key
    pub requires_api_key: bool,
    /// Whether this translator supports auto-detection of source language
    pub supports_auto_detect: bool,
}

/// Target-length hints passed along with a chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LengthConstraint {
    pub max_chars: Option<usize>,
    pub max_lines: Option<usize>,
}

impl LengthConstraint {
    /// Stable tag folded into cache keys
    pub fn tag(&self) -> String {
        format!(
            "chars={};lines={}",
            self.max_chars.map_or_else(|| "-".to_string(), |n| n.to_string()),
            self.max_lines.map_or_else(|| "-".to_string(), |n| n.to_string()),
        )
    }

    pub const fn is_empty(&self) -> bool {
        self.max_chars.is_none() && self.max_lines.is_none()
    }
}

/// One text region reported by OCR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrRegion {
    pub text: String,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// Trait for translation backends
#[async_trait]
pub trait Translator: Send + Sync {
    /// Get information about this translator
    fn info(&self) -> TranslatorInfo;

    /// Get the translator name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Translate text from source language to target language
    async fn translate(
        &self,
        text: &str,
        source: &Lang,
        target: &Lang,
        constraint: Option<&LengthConstraint>,
    ) -> Result<String>;
}

/// Trait for OCR backends working on rendered page images
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Extract text regions from a PNG image
    async fn ocr(&self, png: &[u8], source_hint: &Lang) -> Result<Vec<OcrRegion>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_tags_are_distinct() {
        let none = LengthConstraint::default();
        let chars = LengthConstraint { max_chars: Some(40), max_lines: None };
        let both = LengthConstraint { max_chars: Some(40), max_lines: Some(2) };
        assert!(none.is_empty());
        assert_ne!(none.tag(), chars.tag());
        assert_ne!(chars.tag(), both.tag());
        assert_eq!(both.tag(), "chars=40;lines=2");
    }
}
