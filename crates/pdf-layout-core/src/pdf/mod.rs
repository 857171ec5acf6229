mod canvas;
mod document;
mod engine;
mod extract;
mod font;
mod page_index;
mod render;

pub use canvas::{PlacedLine, layout_text};
pub use document::PdfDocument;
pub use engine::{DocumentEngine, InsertOutcome, RasterImage, TextPlacement, TextRun};
pub use font::{FontSet, OutputFont, TrueTypeFont};
pub use page_index::PageIndex;
