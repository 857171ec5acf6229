//! Cleanup of extracted text and the prose filter applied before any remote call.

use crate::config::LayoutConfig;

const SOFT_HYPHEN: char = '\u{00AD}';
const LIGATURE_FI: char = '\u{FB01}';
const LIGATURE_FL: char = '\u{FB02}';

/// Clean a raw text run: drop soft hyphens, expand `fi`/`fl` ligatures,
/// collapse whitespace runs to a single space and trim.
pub fn normalize(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_space = true;

    for ch in text.chars() {
        match ch {
            SOFT_HYPHEN => {}
            LIGATURE_FI => {
                result.push_str("fi");
                prev_space = false;
            }
            LIGATURE_FL => {
                result.push_str("fl");
                prev_space = false;
            }
            c if c.is_whitespace() => {
                if !prev_space {
                    result.push(' ');
                    prev_space = true;
                }
            }
            c => {
                result.push(c);
                prev_space = false;
            }
        }
    }

    if result.ends_with(' ') {
        result.pop();
    }
    result
}

/// Whether normalized text reads as prose worth translating.
///
/// Rejects short fragments, runs with too few letters, and runs dominated
/// by digits or punctuation (page numbers, dates, table cells).
pub fn should_translate(text: &str, config: &LayoutConfig) -> bool {
    let total = text.chars().count();
    if total < config.min_text_chars {
        return false;
    }

    let alpha = text.chars().filter(|c| c.is_alphabetic()).count();
    if alpha < config.min_alpha_chars {
        return false;
    }

    #[allow(clippy::cast_precision_loss)] // Run lengths are far below f32 precision limits
    let ratio = alpha as f32 / total as f32;
    ratio > config.min_alpha_ratio
}
