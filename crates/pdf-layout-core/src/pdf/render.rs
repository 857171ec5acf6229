use image::{ImageEncoder, RgbaImage};
use mupdf::{Colorspace, Document as MuDocument, Matrix};

use super::engine::RasterImage;
use super::extract::load_page;
use crate::error::{Error, Result};

/// Points per inch in PDF user space
const POINTS_PER_INCH: f32 = 72.0;

/// Render a page at `dpi` and encode it as PNG.
pub(crate) fn rasterize(
    doc: &MuDocument,
    page_num: usize,
    total: usize,
    dpi: u32,
) -> Result<RasterImage> {
    let img = render_rgba(doc, page_num, total, dpi)?;

    let mut png = Vec::new();
    // Use fast compression for better performance (still lossless)
    let encoder = image::codecs::png::PngEncoder::new_with_quality(
        &mut png,
        image::codecs::png::CompressionType::Fast,
        image::codecs::png::FilterType::Adaptive,
    );

    encoder
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| Error::PdfRender {
            page: page_num,
            reason: format!("Failed to encode PNG: {e}"),
        })?;

    Ok(RasterImage {
        png,
        width: img.width(),
        height: img.height(),
    })
}

fn render_rgba(doc: &MuDocument, page_num: usize, total: usize, dpi: u32) -> Result<RgbaImage> {
    let render_err = |reason: String| Error::PdfRender {
        page: page_num,
        reason,
    };

    let page = load_page(doc, page_num, total)?;

    #[allow(clippy::cast_precision_loss)] // dpi values are small
    let scale = dpi as f32 / POINTS_PER_INCH;
    let matrix = Matrix::new_scale(scale, scale);

    // Without alpha the page is rendered onto white
    let pixmap = page
        .to_pixmap(&matrix, &Colorspace::device_rgb(), 0.0, true)
        .map_err(|e| render_err(format!("Failed to render: {e}")))?;

    let pixels = pixmap.samples();
    let width = pixmap.width();
    let height = pixmap.height();

    let n = pixmap.n() as usize; // components per pixel
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);

    for px in pixels.chunks(n) {
        match n {
            3 => rgba.extend_from_slice(&[px[0], px[1], px[2], 255]),
            4 => rgba.extend_from_slice(px),
            1 => rgba.extend_from_slice(&[px[0], px[0], px[0], 255]),
            _ => {
                return Err(render_err(format!(
                    "Unexpected pixel format with {n} components"
                )));
            }
        }
    }

    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| render_err("Failed to create image buffer".to_string()))
}
