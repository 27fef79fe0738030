use super::{print_saved, Context};
use crate::delivery::Download;
use crate::pdf::create::DocumentBuilder;
use crate::pdf::document::to_bytes;
use crate::pdf::PdfError;
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Image,
    Text,
}

fn classify(path: &Path) -> Result<SourceKind, PdfError> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" | "jpg" | "jpeg" => Ok(SourceKind::Image),
        "txt" => Ok(SourceKind::Text),
        _ => Err(PdfError::Unsupported {
            name: path.display().to_string(),
            reason: "only PNG, JPG and TXT files can be converted".to_string(),
        }),
    }
}

/// Expand directories into their files, sorted by name.
fn collect_sources(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                files.push(entry.into_path());
            }
        } else {
            files.push(input.clone());
        }
    }
    files
}

fn add_source(builder: &mut DocumentBuilder, path: &Path) -> Result<()> {
    match classify(path)? {
        SourceKind::Image => {
            let image = image::open(path)
                .with_context(|| format!("Failed to open image: {}", path.display()))?;
            builder.add_image_page(&image)?;
        }
        SourceKind::Text => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            builder.add_text_pages(&String::from_utf8_lossy(&bytes))?;
        }
    }
    Ok(())
}

pub async fn run(ctx: &Context, inputs: &[PathBuf], output: &Path) -> Result<()> {
    let sources = collect_sources(inputs);
    if sources.is_empty() {
        anyhow::bail!("No input files specified");
    }

    let mut builder = DocumentBuilder::new();
    let mut used = 0;
    for source in &sources {
        match add_source(&mut builder, source) {
            Ok(()) => used += 1,
            Err(e) => eprintln!("Skipping {}: {:#}", source.display(), e),
        }
    }
    if used == 0 {
        anyhow::bail!("None of the input files could be converted");
    }

    let page_count = builder.page_count();
    let mut doc = builder.finish()?;
    let bytes = to_bytes(&mut doc)?;

    let name = output
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("created.pdf");
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let files = ctx
        .deliver(vec![Download::new(name, bytes)], dir, &ctx.operation())
        .await?;
    ctx.track_operation();
    print_saved(&files);

    println!(
        "Created {} ({} pages from {} files)",
        output.display(),
        page_count,
        used
    );
    Ok(())
}
