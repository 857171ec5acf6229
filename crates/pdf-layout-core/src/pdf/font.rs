//! Output fonts for translated text.
//!
//! Every [`FontAlias`] is backed by a TrueType program: the DejaVu family
//! built into the binary, or a file configured at runtime. DejaVu covers
//! Latin (including Turkish), Greek and Cyrillic; other scripts need a
//! configured font.
//!
//! # PDF Font Structure
//!
//! TrueType files are embedded as composite fonts so any glyph the file has
//! can be drawn:
//! - **Type0 font**: the dictionary referenced from page resources, which points to
//!   - **CIDFontType2**: glyph widths, and its
//!     - **FontDescriptor**: metrics plus the **FontFile2** program
//!   - **ToUnicode CMap**: maps glyph IDs back to text for copy/paste
//!
//! Glyphs are recorded as text is encoded, so the width array and the
//! ToUnicode map describe exactly the glyphs the document draws.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::{Face, GlyphId};

use crate::error::{Error, Result};
use crate::layout::FontAlias;

/// DejaVu fonts (Bitstream Vera derived license), embedded at compile time.
const SANS_REGULAR: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");
const SANS_BOLD: &[u8] = include_bytes!("../../assets/DejaVuSans-Bold.ttf");
const SERIF_REGULAR: &[u8] = include_bytes!("../../assets/DejaVuSerif.ttf");
const SERIF_BOLD: &[u8] = include_bytes!("../../assets/DejaVuSerif-Bold.ttf");

const fn builtin_program(alias: FontAlias) -> &'static [u8] {
    match alias {
        FontAlias::SansRegular => SANS_REGULAR,
        FontAlias::SansBold => SANS_BOLD,
        FontAlias::SerifRegular => SERIF_REGULAR,
        FontAlias::SerifBold => SERIF_BOLD,
    }
}

/// A parsed TrueType program with its character map flattened.
#[derive(Debug)]
pub struct TrueTypeFont {
    data: Cow<'static, [u8]>,
    base_name: String,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    cap_height: i16,
    bbox: [i16; 4],
    glyphs: HashMap<char, u16>,
    advances: Vec<u16>,
}

impl TrueTypeFont {
    /// Parse font data, failing if it is not a usable TrueType/OpenType font.
    pub fn parse(alias: FontAlias, data: impl Into<Cow<'static, [u8]>>) -> Result<Self> {
        let data = data.into();
        let face = Face::parse(&data, 0).map_err(|e| Error::Font {
            alias: alias.to_string(),
            reason: e.to_string(),
        })?;

        let mut glyphs = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    if let Some(c) = char::from_u32(cp)
                        && let Some(gid) = subtable.glyph_index(cp)
                    {
                        glyphs.entry(c).or_insert(gid.0);
                    }
                });
            }
        }

        if glyphs.is_empty() {
            return Err(Error::Font {
                alias: alias.to_string(),
                reason: "font has no Unicode character map".to_string(),
            });
        }

        let advances = (0..face.number_of_glyphs())
            .map(|gid| face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0))
            .collect();

        let base_name = face
            .names()
            .into_iter()
            .find(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .and_then(|name| name.to_string())
            .map(|name| name.chars().filter(char::is_ascii_alphanumeric).collect::<String>())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| alias.resource_name().to_string());

        let rect = face.global_bounding_box();
        let cap_height = face.capital_height().unwrap_or_else(|| face.ascender());

        Ok(Self {
            base_name,
            units_per_em: face.units_per_em(),
            ascender: face.ascender(),
            descender: face.descender(),
            cap_height,
            bbox: [rect.x_min, rect.y_min, rect.x_max, rect.y_max],
            glyphs,
            advances,
            data,
        })
    }

    /// Glyph ID for a character, .notdef (0) if the font lacks it.
    pub fn glyph_id(&self, c: char) -> u16 {
        self.glyphs.get(&c).copied().unwrap_or(0)
    }

    pub fn has_glyph(&self, c: char) -> bool {
        self.glyphs.contains_key(&c)
    }

    fn advance(&self, gid: u16) -> u16 {
        self.advances.get(usize::from(gid)).copied().unwrap_or(0)
    }

    /// Scale a font-unit width to PDF's 1000-unit glyph space.
    fn scale_width(&self, width: u16) -> i64 {
        (i64::from(width) * 1000) / i64::from(self.units_per_em.max(1))
    }

    pub fn string_width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text
            .chars()
            .map(|c| u32::from(self.advance(self.glyph_id(c))))
            .sum();
        #[allow(clippy::cast_precision_loss)] // widths of one line stay far below 2^24
        let units = units as f32;
        units * font_size / f32::from(self.units_per_em.max(1))
    }
}

/// One output font plus the glyphs drawn with it so far.
#[derive(Debug)]
pub struct OutputFont {
    alias: FontAlias,
    font: TrueTypeFont,
    builtin: bool,
    /// Glyph ID to the character it was drawn for
    used: BTreeMap<u16, char>,
}

impl OutputFont {
    /// The DejaVu face built in for `alias`.
    pub fn builtin(alias: FontAlias) -> Result<Self> {
        Ok(Self {
            alias,
            font: TrueTypeFont::parse(alias, builtin_program(alias))?,
            builtin: true,
            used: BTreeMap::new(),
        })
    }

    pub fn truetype(alias: FontAlias, data: Vec<u8>) -> Result<Self> {
        Ok(Self {
            alias,
            font: TrueTypeFont::parse(alias, data)?,
            builtin: false,
            used: BTreeMap::new(),
        })
    }

    pub const fn alias(&self) -> FontAlias {
        self.alias
    }

    pub const fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Width of `text` in points at `font_size`.
    pub fn string_width(&self, text: &str, font_size: f32) -> f32 {
        self.font.string_width(text, font_size)
    }

    /// Printable characters of `text` the font cannot draw, in first-seen order.
    pub fn missing_glyphs(&self, text: &str) -> Vec<char> {
        let mut seen = BTreeSet::new();
        text.chars()
            .filter(|c| !c.is_whitespace() && !c.is_control() && !self.font.has_glyph(*c))
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Encode text as a hex string operand for `Tj`, recording used glyphs.
    ///
    /// Characters the font lacks are drawn as .notdef; callers check
    /// [`Self::missing_glyphs`] first.
    pub fn encode(&mut self, text: &str) -> String {
        let mut hex = String::with_capacity(text.len() * 4 + 2);
        hex.push('<');
        for c in text.chars() {
            let gid = self.font.glyph_id(c);
            if gid != 0 {
                self.used.entry(gid).or_insert(c);
            }
            let _ = write!(hex, "{gid:04X}");
        }
        hex.push('>');
        hex
    }

    /// Add the font objects to `doc`, returning the dictionary to reference
    /// from page resources.
    pub fn install(&self, doc: &mut Document) -> ObjectId {
        let font = &self.font;
        let file_id = Self::create_font_file(doc, font);
        let descriptor_id = self.create_font_descriptor(doc, font, file_id);
        let cid_font_id = self.create_cid_font(doc, font, descriptor_id);
        let to_unicode_id = self.create_to_unicode_cmap(doc);
        doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type0".to_vec())),
            ("BaseFont", Object::Name(font.base_name.as_bytes().to_vec())),
            ("Encoding", Object::Name(b"Identity-H".to_vec())),
            (
                "DescendantFonts",
                Object::Array(vec![Object::Reference(cid_font_id)]),
            ),
            ("ToUnicode", Object::Reference(to_unicode_id)),
        ]))
    }

    fn create_font_file(doc: &mut Document, font: &TrueTypeFont) -> ObjectId {
        let mut dict = Dictionary::new();
        dict.set(
            "Length1",
            Object::Integer(i64::try_from(font.data.len()).unwrap_or(i64::MAX)),
        );
        let stream = Stream::new(dict, font.data.to_vec()).with_compression(true);
        doc.add_object(Object::Stream(stream))
    }

    fn create_font_descriptor(
        &self,
        doc: &mut Document,
        font: &TrueTypeFont,
        file_id: ObjectId,
    ) -> ObjectId {
        // Nonsymbolic, plus Serif where it applies
        let flags = if self.alias.is_serif() { 32 | 2 } else { 32 };
        let stem_v = if self.alias.is_bold() { 140 } else { 80 };

        doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"FontDescriptor".to_vec())),
            ("FontName", Object::Name(font.base_name.as_bytes().to_vec())),
            ("Flags", Object::Integer(flags)),
            (
                "FontBBox",
                Object::Array(font.bbox.iter().map(|v| Object::Integer(i64::from(*v))).collect()),
            ),
            ("ItalicAngle", Object::Integer(0)),
            ("Ascent", Object::Integer(i64::from(font.ascender))),
            ("Descent", Object::Integer(i64::from(font.descender))),
            ("CapHeight", Object::Integer(i64::from(font.cap_height))),
            ("StemV", Object::Integer(stem_v)),
            ("FontFile2", Object::Reference(file_id)),
        ]))
    }

    fn create_cid_font(
        &self,
        doc: &mut Document,
        font: &TrueTypeFont,
        descriptor_id: ObjectId,
    ) -> ObjectId {
        let default_width = font.scale_width(font.advance(font.glyph_id(' ')));

        doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
            ("BaseFont", Object::Name(font.base_name.as_bytes().to_vec())),
            (
                "CIDSystemInfo",
                Object::Dictionary(Dictionary::from_iter([
                    ("Registry", Object::String(b"Adobe".to_vec(), StringFormat::Literal)),
                    ("Ordering", Object::String(b"Identity".to_vec(), StringFormat::Literal)),
                    ("Supplement", Object::Integer(0)),
                ])),
            ),
            ("FontDescriptor", Object::Reference(descriptor_id)),
            ("DW", Object::Integer(default_width)),
            ("W", Object::Array(self.widths_array(font))),
            ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
        ]))
    }

    /// W array over the used glyphs: `[gid [w1 w2 ...]]` per consecutive run.
    fn widths_array(&self, font: &TrueTypeFont) -> Vec<Object> {
        let mut result = Vec::new();
        let mut iter = self.used.keys().copied().peekable();

        while let Some(first) = iter.next() {
            let mut widths = vec![Object::Integer(font.scale_width(font.advance(first)))];
            let mut expected = first.saturating_add(1);
            while iter.peek() == Some(&expected) {
                widths.push(Object::Integer(font.scale_width(font.advance(expected))));
                expected = expected.saturating_add(1);
                iter.next();
            }
            result.push(Object::Integer(i64::from(first)));
            result.push(Object::Array(widths));
        }

        result
    }

    fn create_to_unicode_cmap(&self, doc: &mut Document) -> ObjectId {
        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
        );

        let entries: Vec<(&u16, &char)> = self.used.iter().collect();
        // bfchar sections hold at most 100 entries
        for section in entries.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", section.len());
            for (gid, c) in section {
                let mut units = [0u16; 2];
                let utf16: String = c
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{u:04X}"))
                    .collect();
                let _ = writeln!(cmap, "<{gid:04X}> <{utf16}>");
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end",
        );

        doc.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            cmap.into_bytes(),
        )))
    }
}

/// The four output fonts of a document.
#[derive(Debug)]
pub struct FontSet {
    fonts: [OutputFont; 4],
}

impl FontSet {
    /// All four aliases backed by the built-in DejaVu faces.
    pub fn builtin() -> Result<Self> {
        let [sans, sans_bold, serif, serif_bold] = FontAlias::ALL;
        Ok(Self {
            fonts: [
                OutputFont::builtin(sans)?,
                OutputFont::builtin(sans_bold)?,
                OutputFont::builtin(serif)?,
                OutputFont::builtin(serif_bold)?,
            ],
        })
    }

    const fn slot(alias: FontAlias) -> usize {
        match alias {
            FontAlias::SansRegular => 0,
            FontAlias::SansBold => 1,
            FontAlias::SerifRegular => 2,
            FontAlias::SerifBold => 3,
        }
    }

    /// Replace the built-in face for `alias` with a configured TrueType program.
    pub fn embed(&mut self, alias: FontAlias, data: Vec<u8>) -> Result<()> {
        self.fonts[Self::slot(alias)] = OutputFont::truetype(alias, data)?;
        Ok(())
    }

    pub const fn get(&self, alias: FontAlias) -> &OutputFont {
        &self.fonts[Self::slot(alias)]
    }

    pub const fn get_mut(&mut self, alias: FontAlias) -> &mut OutputFont {
        &mut self.fonts[Self::slot(alias)]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_fonts_by_default() {
        let fonts = FontSet::builtin().unwrap();
        for alias in FontAlias::ALL {
            assert_eq!(fonts.get(alias).alias(), alias);
            assert!(fonts.get(alias).is_builtin());
        }
    }

    #[test]
    fn test_builtin_fonts_cover_turkish() {
        let fonts = FontSet::builtin().unwrap();
        for alias in FontAlias::ALL {
            let font = fonts.get(alias);
            assert!(font.missing_glyphs("Merhaba şu ığdır İstanbul ÇÖÜ").is_empty());
            assert!(font.missing_glyphs("Привет мир αβγ").is_empty());
        }
    }

    #[test]
    fn test_turkish_letters_get_real_glyphs() {
        let mut fonts = FontSet::builtin().unwrap();
        let font = fonts.get_mut(FontAlias::SerifRegular);
        let encoded = font.encode("ış");
        // Two 4-digit glyph IDs, neither of them .notdef
        assert_eq!(encoded.len(), 10);
        assert!(!encoded.contains("0000"));
        assert_eq!(font.used.len(), 2);
    }

    #[test]
    fn test_missing_glyphs_are_reported_once() {
        let fonts = FontSet::builtin().unwrap();
        let font = fonts.get(FontAlias::SansRegular);
        assert_eq!(font.missing_glyphs("漢字 and 漢"), vec!['漢', '字']);
    }

    #[test]
    fn test_width_grows_with_size_and_weight() {
        let fonts = FontSet::builtin().unwrap();
        let regular = fonts.get(FontAlias::SansRegular);
        let bold = fonts.get(FontAlias::SansBold);
        let w10 = regular.string_width("Merhaba", 10.0);
        assert!(w10 > 0.0);
        assert!((regular.string_width("Merhaba", 20.0) - 2.0 * w10).abs() < 1e-3);
        assert!(bold.string_width("Merhaba", 10.0) > w10);
    }

    #[test]
    fn test_garbage_font_data_is_rejected() {
        let mut fonts = FontSet::builtin().unwrap();
        let err = fonts.embed(FontAlias::SansBold, b"not a font".to_vec()).unwrap_err();
        assert!(matches!(err, Error::Font { ref alias, .. } if alias == "sans-bold"));
        assert!(fonts.get(FontAlias::SansBold).is_builtin());
    }

    #[test]
    fn test_install_creates_type0_font() {
        let mut doc = Document::with_version("1.5");
        let mut fonts = FontSet::builtin().unwrap();
        let font = fonts.get_mut(FontAlias::SerifBold);
        font.encode("Ağ");
        let id = font.install(&mut doc);

        let Ok(Object::Dictionary(dict)) = doc.get_object(id) else {
            panic!("font object missing");
        };
        assert_eq!(dict.get(b"Subtype").ok(), Some(&Object::Name(b"Type0".to_vec())));
        assert_eq!(
            dict.get(b"Encoding").ok(),
            Some(&Object::Name(b"Identity-H".to_vec()))
        );
        let Ok(Object::Name(base)) = dict.get(b"BaseFont") else {
            panic!("BaseFont missing");
        };
        assert!(String::from_utf8_lossy(base).starts_with("DejaVuSerif"));
    }
}
