use super::{materialize_all, output_dir, print_saved, select, Context, Written};
use crate::partition::{partition, OutputMode};
use crate::pdf::PdfDocument;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub struct ExtractOptions<'a> {
    pub pages: Option<&'a str>,
    pub pick: Option<&'a [u32]>,
    /// One file per comma-separated range instead of one combined file
    pub per_range: bool,
    pub password: Option<&'a str>,
    pub output_dir: Option<&'a Path>,
}

pub async fn extract(ctx: &Context, input: &Path, options: &ExtractOptions<'_>) -> Result<Written> {
    let doc = PdfDocument::open_with_password(input, options.password)?;
    let selection = select(doc.page_count(), options.pages, options.pick)?;

    let mode = if options.per_range {
        OutputMode::PerRange
    } else {
        OutputMode::Combined
    };
    let specs = partition(&selection, mode, &doc.name);
    let page_count = selection.resolve().len();

    let cancel = ctx.operation();
    let downloads = materialize_all(ctx, &cancel, Arc::new(doc), &specs).await?;
    let files = ctx
        .deliver(downloads, &output_dir(options.output_dir, input), &cancel)
        .await?;
    ctx.track_operation();

    Ok(Written { files, page_count })
}

pub async fn run(ctx: &Context, input: &Path, options: &ExtractOptions<'_>) -> Result<()> {
    let written = extract(ctx, input, options).await?;
    print_saved(&written.files);
    println!(
        "Extracted {} page(s) into {} file(s)",
        written.page_count,
        written.files.len()
    );
    Ok(())
}
