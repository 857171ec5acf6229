use crate::config::Lang;
use crate::translator::LengthConstraint;

/// Content-addressed key for one translated chunk.
///
/// Keys are MD5 hashes of the language pair, the normalized chunk text and
/// the length-constraint tag, so the same request always maps to the same
/// 32-character key and any differing input maps elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    pub fn new(
        source_lang: &Lang,
        target_lang: &Lang,
        text: &str,
        constraint: Option<&LengthConstraint>,
    ) -> Self {
        // Null separators keep ("a", "bc") and ("ab", "c") apart.
        let combined = format!(
            "{}\0{}\0{}\0{}",
            source_lang.as_str(),
            target_lang.as_str(),
            text,
            constraint.map_or_else(|| "-".to_string(), LengthConstraint::tag),
        );

        Self {
            hash: format!("{:x}", md5::compute(combined.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(src: &str, tgt: &str, text: &str) -> CacheKey {
        CacheKey::new(&Lang::new(src), &Lang::new(tgt), text, None)
    }

    #[test]
    fn test_cache_key_is_fixed_length_hash() {
        let k = key("en", "tr", "Hello world");
        assert_eq!(k.to_string().len(), 32);
        assert!(k.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_same_inputs_same_key() {
        assert_eq!(key("en", "tr", "Hello"), key("en", "tr", "Hello"));
    }

    #[test]
    fn test_each_input_changes_the_key() {
        let base = key("en", "tr", "Hello");
        assert_ne!(base, key("de", "tr", "Hello"));
        assert_ne!(base, key("en", "fr", "Hello"));
        assert_ne!(base, key("en", "tr", "Hello!"));
    }

    #[test]
    fn test_constraint_is_part_of_the_key() {
        let (en, tr) = (Lang::new("en"), Lang::new("tr"));
        let narrow = LengthConstraint { max_chars: Some(20), max_lines: Some(1) };
        let wide = LengthConstraint { max_chars: Some(80), max_lines: Some(1) };
        let plain = CacheKey::new(&en, &tr, "Hello", None);
        assert_ne!(plain, CacheKey::new(&en, &tr, "Hello", Some(&narrow)));
        assert_ne!(
            CacheKey::new(&en, &tr, "Hello", Some(&narrow)),
            CacheKey::new(&en, &tr, "Hello", Some(&wide))
        );
    }

    #[test]
    fn test_separator_prevents_field_bleed() {
        assert_ne!(key("en", "tr", "x"), key("e", "ntr", "x"));
    }
}
