//! Validated page indices shared by the mupdf and lopdf sides.
//!
//! Callers address pages with 0-indexed `usize`; mupdf wants `i32` and
//! lopdf numbers pages from 1.

use std::fmt;

use crate::error::Error;

/// A 0-indexed page number known to be inside the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(i32);

impl PageIndex {
    /// Validate `page_num` against the document's page count.
    pub fn try_from_page_num(page_num: usize, total_pages: usize) -> Result<Self, Error> {
        if page_num >= total_pages {
            return Err(Error::PdfInvalidPage {
                page: page_num,
                total: total_pages,
            });
        }

        let index = i32::try_from(page_num).map_err(|_| Error::PdfInvalidPage {
            page: page_num,
            total: total_pages,
        })?;

        Ok(Self(index))
    }

    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn as_usize(self) -> usize {
        // Only constructed from in-range usize values
        self.0 as usize
    }

    /// 1-based page number as used by `lopdf::Document::get_pages`.
    #[must_use]
    pub const fn as_lopdf_page_number(self) -> u32 {
        (self.0 + 1).cast_unsigned()
    }
}

impl From<PageIndex> for i32 {
    fn from(index: PageIndex) -> Self {
        index.0
    }
}

impl fmt::Display for PageIndex {
    /// Shown 1-based, the way pages are numbered to users.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_lopdf_page_number())
    }
}
