use super::{materialize_all, output_dir, print_saved, Context, Written};
use crate::partition::{partition, OutputMode};
use crate::pdf::PdfDocument;
use crate::selection::PageSelection;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// How to cut the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitBy<'a> {
    /// One file per comma-separated range
    Ranges(&'a str),
    /// Consecutive chunks of N pages
    Every(u32),
}

pub async fn split(
    ctx: &Context,
    input: &Path,
    by: SplitBy<'_>,
    password: Option<&str>,
    dir: Option<&Path>,
) -> Result<Written> {
    let doc = PdfDocument::open_with_password(input, password)?;
    let total_pages = doc.page_count();

    let selection = match by {
        SplitBy::Ranges(ranges) => PageSelection::ranges(ranges, total_pages)?,
        SplitBy::Every(n) => PageSelection::every_n(n, total_pages)?,
    };
    let specs = partition(&selection, OutputMode::PerRange, &doc.name);

    let cancel = ctx.operation();
    let downloads = materialize_all(ctx, &cancel, Arc::new(doc), &specs).await?;
    let files = ctx
        .deliver(downloads, &output_dir(dir, input), &cancel)
        .await?;
    ctx.track_operation();

    Ok(Written {
        files,
        page_count: total_pages as usize,
    })
}

pub async fn run(
    ctx: &Context,
    input: &Path,
    by: SplitBy<'_>,
    password: Option<&str>,
    dir: Option<&Path>,
) -> Result<()> {
    let written = split(ctx, input, by, password, dir).await?;
    print_saved(&written.files);
    println!(
        "Split {} pages into {} file(s)",
        written.page_count,
        written.files.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::pdf::fixtures::sample_pdf;

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_split_every_two() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.pdf");
        std::fs::write(&input, sample_pdf(5)).unwrap();
        let out = dir.path().join("out");

        run(&context(), &input, SplitBy::Every(2), None, Some(&out))
            .await
            .unwrap();

        assert_eq!(
            names(&out),
            vec!["scan_1to2.pdf", "scan_3to4.pdf", "scan_5to5.pdf"]
        );
        let last = PdfDocument::open(out.join("scan_5to5.pdf")).unwrap();
        assert_eq!(last.page_count(), 1);
    }

    #[tokio::test]
    async fn test_split_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.pdf");
        std::fs::write(&input, sample_pdf(4)).unwrap();
        let out = dir.path().join("out");

        run(&context(), &input, SplitBy::Ranges("3-4,1"), None, Some(&out))
            .await
            .unwrap();
        assert_eq!(names(&out), vec!["scan_pages_1.pdf", "scan_pages_3to4.pdf"]);
    }

    #[tokio::test]
    async fn test_split_every_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.pdf");
        std::fs::write(&input, sample_pdf(3)).unwrap();

        let err = run(&context(), &input, SplitBy::Every(4), None, Some(dir.path()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("between 1 and 3"));
    }
}
