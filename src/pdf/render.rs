//! Page rasterization through pdfium.
//!
//! The pdfium handles are neither `Send` nor `Sync`, so rendering stays on
//! the thread that opened the document.

use super::PdfError;
use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::{
    PdfDocument as PdfiumDocument, PdfRenderConfig, Pdfium, PdfiumError, PdfiumInternalError,
};
use serde::Deserialize;
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    #[serde(alias = "jpeg")]
    #[value(alias = "jpeg")]
    Jpg,
    Webp,
}

impl ImageFormat {
    pub fn ext(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Webp => "webp",
        }
    }

    fn codec(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpg => image::ImageFormat::Jpeg,
            ImageFormat::Webp => image::ImageFormat::WebP,
        }
    }
}

/// Anything that can turn a page into pixels.
pub trait PageRenderer {
    fn page_count(&self) -> usize;

    /// Render the page at zero-based `index` at `dpi`.
    fn render(&self, index: usize, dpi: u32) -> Result<DynamicImage, PdfError>;
}

pub struct Rasterizer {
    pdfium: Pdfium,
}

impl Rasterizer {
    /// Bind pdfium from the working directory, falling back to the system
    /// library.
    pub fn new() -> Result<Self, PdfError> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| PdfError::RendererUnavailable(e.to_string()))?;
        Ok(Rasterizer {
            pdfium: Pdfium::new(bindings),
        })
    }

    pub fn open<'a>(
        &'a self,
        bytes: &'a [u8],
        password: Option<&'a str>,
    ) -> Result<RasterDocument<'a>, PdfError> {
        let doc = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|e| match e {
                PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                    if password.is_some() {
                        PdfError::IncorrectPassword
                    } else {
                        PdfError::Encrypted
                    }
                }
                other => PdfError::InvalidDocument(other.to_string()),
            })?;
        Ok(RasterDocument { doc })
    }
}

pub struct RasterDocument<'a> {
    doc: PdfiumDocument<'a>,
}

impl PageRenderer for RasterDocument<'_> {
    fn page_count(&self) -> usize {
        self.doc.pages().len() as usize
    }

    fn render(&self, index: usize, dpi: u32) -> Result<DynamicImage, PdfError> {
        let page_error = |reason: String| PdfError::Render {
            page: index + 1,
            reason,
        };

        let page = self
            .doc
            .pages()
            .get(
                index
                    .try_into()
                    .map_err(|_| page_error("page index too large".to_string()))?,
            )
            .map_err(|e| page_error(e.to_string()))?;

        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .set_target_width(pixel_size(page.width().value, dpi))
                    .set_target_height(pixel_size(page.height().value, dpi))
                    .render_form_data(true)
                    .render_annotations(true),
            )
            .map_err(|e| page_error(e.to_string()))?;

        let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
        let pixels = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())
            .ok_or_else(|| page_error("bitmap size mismatch".to_string()))?;
        Ok(DynamicImage::ImageRgba8(pixels))
    }
}

/// Points are 1/72 inch.
fn pixel_size(points: f32, dpi: u32) -> i32 {
    ((points * dpi as f32 / 72.0).round() as i32).max(1)
}

/// Encode a rendered page. JPEG has no alpha channel, so it gets RGB.
pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, PdfError> {
    let mut out = Cursor::new(Vec::new());
    let result = match format {
        ImageFormat::Jpg => DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut out, format.codec()),
        ImageFormat::Webp => {
            DynamicImage::ImageRgba8(image.to_rgba8()).write_to(&mut out, format.codec())
        }
        ImageFormat::Png => image.write_to(&mut out, format.codec()),
    };
    result.map_err(|e| PdfError::Save(e.to_string()))?;
    Ok(out.into_inner())
}
