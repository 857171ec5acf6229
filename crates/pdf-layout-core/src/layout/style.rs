//! Mapping source font metadata onto the fixed set of output fonts.
//!
//! The source document's own fonts are never reused: they are often subset
//! and may lack glyphs for the target script.

use serde::{Deserialize, Serialize};

/// Style bits reported for a source span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanFlags {
    pub bold: bool,
    pub italic: bool,
    pub serif: bool,
}

/// Style information carried by a text unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleHint {
    pub font_name: String,
    pub flags: SpanFlags,
    /// Nominal font size in points
    pub size: f32,
}

/// One of the four embedded output fonts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FontAlias {
    SansRegular,
    SansBold,
    SerifRegular,
    SerifBold,
}

impl FontAlias {
    pub const ALL: [Self; 4] = [
        Self::SansRegular,
        Self::SansBold,
        Self::SerifRegular,
        Self::SerifBold,
    ];

    pub const fn new(serif: bool, bold: bool) -> Self {
        match (serif, bold) {
            (false, false) => Self::SansRegular,
            (false, true) => Self::SansBold,
            (true, false) => Self::SerifRegular,
            (true, true) => Self::SerifBold,
        }
    }

    /// Name used in page `/Font` resources
    pub const fn resource_name(self) -> &'static str {
        match self {
            Self::SansRegular => "FLSans",
            Self::SansBold => "FLSansBold",
            Self::SerifRegular => "FLSerif",
            Self::SerifBold => "FLSerifBold",
        }
    }

    /// Built-in face used when no font file is configured for the alias
    pub const fn builtin_name(self) -> &'static str {
        match self {
            Self::SansRegular => "DejaVu Sans",
            Self::SansBold => "DejaVu Sans Bold",
            Self::SerifRegular => "DejaVu Serif",
            Self::SerifBold => "DejaVu Serif Bold",
        }
    }

    pub const fn is_serif(self) -> bool {
        matches!(self, Self::SerifRegular | Self::SerifBold)
    }

    pub const fn is_bold(self) -> bool {
        matches!(self, Self::SansBold | Self::SerifBold)
    }
}

impl std::fmt::Display for FontAlias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SansRegular => "sans-regular",
            Self::SansBold => "sans-bold",
            Self::SerifRegular => "serif-regular",
            Self::SerifBold => "serif-bold",
        };
        f.write_str(name)
    }
}

/// Pick the output font for a source span.
///
/// Serif when the font name mentions "times" or "serif", or when the italic
/// or serif bit is set. Bold when the name mentions "bold" or the bold bit
/// is set. Anything else is sans regular.
pub fn infer_font(font_name: &str, flags: SpanFlags) -> FontAlias {
    let name = font_name.to_lowercase();
    let serif = name.contains("times") || name.contains("serif") || flags.italic || flags.serif;
    let bold = name.contains("bold") || flags.bold;
    FontAlias::new(serif, bold)
}

impl StyleHint {
    pub fn font_alias(&self) -> FontAlias {
        infer_font(&self.font_name, self.flags)
    }
}
