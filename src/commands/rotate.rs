use super::{output_dir, prefixed_name, print_saved, select, Context, Written};
use crate::delivery::Download;
use crate::pdf::PdfDocument;
use anyhow::Result;
use std::path::Path;

pub const ANGLES: [i64; 3] = [90, 180, 270];

pub struct RotateOptions<'a> {
    pub degrees: i64,
    pub pages: Option<&'a str>,
    pub pick: Option<&'a [u32]>,
    pub password: Option<&'a str>,
    pub output_dir: Option<&'a Path>,
}

pub async fn rotate(ctx: &Context, input: &Path, options: &RotateOptions<'_>) -> Result<Written> {
    if !ANGLES.contains(&options.degrees) {
        anyhow::bail!(
            "Rotation must be 90, 180 or 270 degrees, got {}",
            options.degrees
        );
    }

    let mut doc = PdfDocument::open_with_password(input, options.password)?;
    let selection = select(doc.page_count(), options.pages, options.pick)?;
    let pages = selection.resolve();
    tracing::debug!("rotating pages {:?}", pages.page_numbers());

    doc.rotate(pages.as_slice(), options.degrees)?;
    let bytes = doc.to_bytes()?;

    let name = prefixed_name("rotated", input);
    let files = ctx
        .deliver(
            vec![Download::new(name, bytes)],
            &output_dir(options.output_dir, input),
            &ctx.operation(),
        )
        .await?;
    ctx.track_operation();

    Ok(Written {
        files,
        page_count: pages.len(),
    })
}

pub async fn run(ctx: &Context, input: &Path, options: &RotateOptions<'_>) -> Result<()> {
    let written = rotate(ctx, input, options).await?;
    print_saved(&written.files);
    println!(
        "Rotated {} page(s) by {} degrees",
        written.page_count, options.degrees
    );
    Ok(())
}
