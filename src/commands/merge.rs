use super::{print_saved, Context, Written};
use crate::batch::process_in_batches;
use crate::delivery::Download;
use crate::pdf::document::to_bytes;
use crate::pdf::merge::merge_documents;
use crate::pdf::PdfDocument;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub async fn merge(ctx: &Context, inputs: &[PathBuf], output: &Path) -> Result<Written> {
    if inputs.is_empty() {
        anyhow::bail!("No input files specified");
    }

    let names: Vec<String> = inputs.iter().map(|p| p.display().to_string()).collect();
    let cancel = ctx.operation();
    let outcome = process_in_batches(&names, ctx.config.batch.size, &cancel, |name| async move {
        let doc = tokio::task::spawn_blocking(move || PdfDocument::open(&name)).await??;
        Ok(doc)
    })
    .await;

    for failure in &outcome.failures {
        eprintln!("Skipping {}: {}", failure.item, failure.error);
    }
    if outcome.cancelled {
        anyhow::bail!("Cancelled");
    }

    let documents = outcome.values();
    if documents.is_empty() {
        anyhow::bail!("None of the input files could be loaded");
    }
    let merged_files = documents.len();

    let mut merged = merge_documents(documents)?;
    let page_count = merged.get_pages().len();
    let bytes = to_bytes(&mut merged)?;

    let name = output
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("merged.pdf");
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let files = ctx
        .deliver(vec![Download::new(name, bytes)], dir, &cancel)
        .await?;
    ctx.track_operation();
    tracing::info!("merged {} of {} files", merged_files, inputs.len());

    Ok(Written { files, page_count })
}

pub async fn run(ctx: &Context, inputs: &[PathBuf], output: &Path) -> Result<()> {
    let written = merge(ctx, inputs, output).await?;
    print_saved(&written.files);
    println!("Merged {} pages into {}", written.page_count, output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::pdf::fixtures::sample_pdf;

    #[tokio::test]
    async fn test_merge_skips_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        let broken = dir.path().join("broken.pdf");
        std::fs::write(&a, sample_pdf(2)).unwrap();
        std::fs::write(&b, sample_pdf(3)).unwrap();
        std::fs::write(&broken, b"not a pdf").unwrap();
        let output = dir.path().join("merged.pdf");

        let ctx = context();
        run(&ctx, &[a, broken, b], &output).await.unwrap();

        assert_eq!(PdfDocument::open(&output).unwrap().page_count(), 5);
        assert_eq!(ctx.with_counter(|c| c.get()), 1);
    }

    #[tokio::test]
    async fn test_merge_fails_when_nothing_loads() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.pdf");
        std::fs::write(&broken, b"not a pdf").unwrap();

        let ctx = context();
        assert!(run(&ctx, &[broken], &dir.path().join("merged.pdf"))
            .await
            .is_err());
        assert_eq!(ctx.with_counter(|c| c.get()), 0);
    }

    #[tokio::test]
    async fn test_merge_requires_inputs() {
        assert!(run(&context(), &[], Path::new("merged.pdf")).await.is_err());
    }
}
