use super::{output_dir, print_saved, select, Context};
use crate::batch::process_in_batches;
use crate::delivery::Download;
use crate::partition::stem;
use crate::pdf::render::{encode, ImageFormat, PageRenderer, Rasterizer};
use crate::pdf::PdfDocument;
use anyhow::{Context as _, Result};
use std::path::Path;

pub struct ImagesOptions<'a> {
    pub pages: Option<&'a str>,
    pub pick: Option<&'a [u32]>,
    /// Falls back to the configured format
    pub format: Option<ImageFormat>,
    pub dpi: Option<u32>,
    pub password: Option<&'a str>,
    pub output_dir: Option<&'a Path>,
}

/// `report.pdf`, page 3, png → `report_page-3.png`
pub fn image_name(base: &str, index: usize, format: ImageFormat) -> String {
    format!("{}_page-{}.{}", stem(base), index + 1, format.ext())
}

pub async fn run(ctx: &Context, input: &Path, options: &ImagesOptions<'_>) -> Result<()> {
    let format = options.format.unwrap_or(ctx.config.render.format);
    let dpi = options.dpi.unwrap_or(ctx.config.render.dpi);
    if dpi == 0 {
        anyhow::bail!("DPI must be greater than 0");
    }

    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read PDF: {}", input.display()))?;
    let doc = PdfDocument::from_bytes_with_password(
        &bytes,
        input.file_name().and_then(|s| s.to_str()).unwrap_or("document.pdf"),
        options.password,
    )?;
    let selection = select(doc.page_count(), options.pages, options.pick)?;
    let indices = selection.resolve().into_vec();

    let rasterizer = Rasterizer::new()?;
    let raster = rasterizer.open(&bytes, options.password)?;
    let raster = &raster;
    let base = doc.name.as_str();

    let cancel = ctx.operation();
    let outcome = process_in_batches(&indices, ctx.config.batch.size, &cancel, |index| async move {
        let image = raster.render(index, dpi)?;
        let encoded = encode(&image, format)?;
        Ok(Download::new(image_name(base, index, format), encoded))
    })
    .await;

    if let Some(partial) = outcome.partial_failure() {
        eprintln!("Warning: {}", partial);
    }
    if outcome.cancelled {
        anyhow::bail!("Cancelled");
    }
    let downloads = outcome.values();
    if downloads.is_empty() {
        anyhow::bail!("No pages could be rendered");
    }

    let rendered = downloads.len();
    let files = ctx
        .deliver(downloads, &output_dir(options.output_dir, input), &cancel)
        .await?;
    ctx.track_operation();
    print_saved(&files);

    println!(
        "Converted {} page(s) to {} at {} DPI",
        rendered,
        format.ext().to_uppercase(),
        dpi
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::pdf::fixtures::sample_pdf;

    #[test]
    fn test_image_name() {
        assert_eq!(image_name("report.pdf", 2, ImageFormat::Png), "report_page-3.png");
        assert_eq!(image_name("scan", 0, ImageFormat::Jpg), "scan_page-1.jpg");
    }

    #[tokio::test]
    async fn test_images_selected_pages() {
        if Rasterizer::new().is_err() {
            eprintln!("Skipping test - pdfium not available");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("slides.pdf");
        std::fs::write(&input, sample_pdf(3)).unwrap();

        let options = ImagesOptions {
            pages: Some("1,3"),
            pick: None,
            format: Some(ImageFormat::Png),
            dpi: Some(36),
            password: None,
            output_dir: None,
        };
        run(&context(), &input, &options).await.unwrap();

        assert!(dir.path().join("slides_page-1.png").exists());
        assert!(!dir.path().join("slides_page-2.png").exists());
        let third = image::open(dir.path().join("slides_page-3.png")).unwrap();
        assert_eq!((third.width(), third.height()), (306, 396));
    }
}
