pub mod compress;
pub mod create;
pub mod extract;
pub mod images;
pub mod info;
pub mod merge;
pub mod protect;
pub mod rotate;
pub mod split;
pub mod stats;
pub mod text;
pub mod unlock;

use crate::batch::process_in_batches;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::counter::OperationCounter;
use crate::delivery::{DirectoryTarget, Download, Sequencer};
use crate::partition::OutputSpec;
use crate::pdf::PdfDocument;
use crate::selection::PageSelection;
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Shared state for one run of the tool.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    session: CancelToken,
    counter: Mutex<OperationCounter>,
}

impl Context {
    pub fn new(config: Config, counter: OperationCounter) -> Self {
        Context {
            config,
            session: CancelToken::new(),
            counter: Mutex::new(counter),
        }
    }

    /// Cancelling the session cancels every operation, running or not yet started.
    pub fn session(&self) -> &CancelToken {
        &self.session
    }

    /// A token for one operation, cancelled with the session.
    pub fn operation(&self) -> CancelToken {
        self.session.child()
    }

    /// Count one successful operation.
    pub fn track_operation(&self) -> u64 {
        self.with_counter(|counter| counter.increment())
    }

    pub fn with_counter<R>(&self, f: impl FnOnce(&mut OperationCounter) -> R) -> R {
        let mut counter = self.counter.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut counter)
    }

    /// Write `downloads` into `dir` through the delivery sequencer and
    /// return the saved paths.
    ///
    /// Fails only when nothing could be saved.
    pub async fn deliver(
        &self,
        downloads: Vec<Download>,
        dir: &Path,
        cancel: &CancelToken,
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let count = downloads.len();
        let sequencer = Sequencer::new(self.config.delivery);
        let target = Arc::new(DirectoryTarget::new(dir));
        let report = sequencer.deliver(downloads, target, cancel).await;
        tracing::debug!("delivery finished, {} blob(s) still held", sequencer.blobs().live());

        for failure in report.failures() {
            eprintln!("Warning: {}", failure);
        }
        if report.cancelled() > 0 {
            eprintln!("Cancelled {} pending download(s)", report.cancelled());
        }

        let saved: Vec<PathBuf> = report.saved().map(Path::to_path_buf).collect();
        if count > 0 && saved.is_empty() {
            anyhow::bail!("No files were saved");
        }
        Ok(saved)
    }
}

/// Files written by one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Written {
    pub files: Vec<PathBuf>,
    pub page_count: usize,
}

pub fn print_saved(files: &[PathBuf]) {
    for file in files {
        println!("Saved {}", file.display());
    }
}

/// Build a selection from the `--pages` / `--pick` options; no option
/// means every page.
pub fn select(total_pages: u32, pages: Option<&str>, pick: Option<&[u32]>) -> Result<PageSelection> {
    let selection = match (pages, pick) {
        (Some(_), Some(_)) => anyhow::bail!("Use either --pages or --pick, not both"),
        (Some(pages), None) => PageSelection::parse(pages, total_pages)?,
        (None, Some(pick)) => {
            if let Some(zero) = pick.iter().find(|&&p| p == 0) {
                anyhow::bail!("Page {} is out of range (pages start at 1)", zero);
            }
            let indices = pick.iter().map(|&p| p as usize - 1).collect();
            PageSelection::explicit(indices, total_pages)?
        }
        (None, None) => PageSelection::all(total_pages)?,
    };
    Ok(selection)
}

/// Turn output specs into downloads, a batch at a time.
///
/// Specs that fail are reported and left out.
pub async fn materialize_all(
    ctx: &Context,
    cancel: &CancelToken,
    doc: Arc<PdfDocument>,
    specs: &[OutputSpec],
) -> Result<Vec<Download>> {
    let outcome = process_in_batches(specs, ctx.config.batch.size, cancel, |spec| {
        let doc = doc.clone();
        async move {
            let bytes = tokio::task::spawn_blocking(move || doc.materialize(&spec)).await??;
            Ok(bytes)
        }
    })
    .await;

    if let Some(partial) = outcome.partial_failure() {
        eprintln!("Warning: {}", partial);
    }
    if outcome.cancelled {
        anyhow::bail!("Cancelled");
    }

    let downloads: Vec<Download> = outcome
        .completed
        .into_iter()
        .map(|(spec, bytes)| Download::new(spec.name, bytes))
        .collect();
    if downloads.is_empty() {
        anyhow::bail!("No output documents could be created");
    }
    Ok(downloads)
}

/// `rotated_report.pdf` style names for single-output commands.
pub fn prefixed_name(prefix: &str, input: &Path) -> String {
    let name = input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("document.pdf");
    format!("{}_{}", prefix, name)
}

/// Directory the output lands in: the explicit one, else next to the input.
pub fn output_dir(explicit: Option<&Path>, input: &Path) -> PathBuf {
    match explicit {
        Some(dir) => dir.to_path_buf(),
        None => input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| ".".into()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::sample_pdf;
    use crate::selection::SelectionKind;

    #[test]
    fn test_select_defaults_to_all() {
        let selection = select(4, None, None).unwrap();
        assert_eq!(selection.kind(), &SelectionKind::All);
    }

    #[test]
    fn test_select_pick_is_one_based() {
        let selection = select(5, None, Some(&[4, 2, 4])).unwrap();
        assert_eq!(selection.resolve().into_vec(), vec![1, 3]);
        assert!(select(5, None, Some(&[0])).is_err());
        assert!(select(5, None, Some(&[6])).is_err());
    }

    #[test]
    fn test_select_rejects_both() {
        assert!(select(5, Some("1"), Some(&[1])).is_err());
    }

    #[test]
    fn test_names_and_dirs() {
        assert_eq!(
            prefixed_name("rotated", Path::new("/tmp/a/report.pdf")),
            "rotated_report.pdf"
        );
        assert_eq!(output_dir(None, Path::new("report.pdf")), PathBuf::from("."));
        assert_eq!(
            output_dir(None, Path::new("/tmp/a/report.pdf")),
            PathBuf::from("/tmp/a")
        );
        assert_eq!(
            output_dir(Some(Path::new("out")), Path::new("/tmp/a/report.pdf")),
            PathBuf::from("out")
        );
    }

    #[tokio::test]
    async fn test_materialize_all_keeps_order() {
        let ctx = test_support::context();
        let doc = Arc::new(PdfDocument::from_bytes(&sample_pdf(5), "five.pdf").unwrap());
        let specs: Vec<OutputSpec> = (0..5)
            .map(|i| OutputSpec {
                name: format!("p{}.pdf", i),
                indices: vec![i],
            })
            .collect();

        let downloads = materialize_all(&ctx, &ctx.operation(), doc, &specs).await.unwrap();
        let names: Vec<_> = downloads.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["p0.pdf", "p1.pdf", "p2.pdf", "p3.pdf", "p4.pdf"]);
    }

    #[tokio::test]
    async fn test_materialize_all_skips_bad_specs() {
        let ctx = test_support::context();
        let doc = Arc::new(PdfDocument::from_bytes(&sample_pdf(2), "two.pdf").unwrap());
        let specs = vec![
            OutputSpec {
                name: "ok.pdf".to_string(),
                indices: vec![0],
            },
            OutputSpec {
                name: "bad.pdf".to_string(),
                indices: vec![9],
            },
        ];
        let downloads = materialize_all(&ctx, &ctx.operation(), doc, &specs).await.unwrap();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].name, "ok.pdf");
    }

    #[tokio::test]
    async fn test_deliver_writes_into_directory() {
        let ctx = test_support::context();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let downloads = vec![
            Download::new("a.pdf", b"a".to_vec()),
            Download::new("b.pdf", b"b".to_vec()),
        ];
        let saved = ctx.deliver(downloads, &out, &ctx.operation()).await.unwrap();
        assert_eq!(saved, vec![out.join("a.pdf"), out.join("b.pdf")]);
        assert_eq!(std::fs::read(out.join("b.pdf")).unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_cancelled_session_stops_operations() {
        let ctx = test_support::context();
        let doc = Arc::new(PdfDocument::from_bytes(&sample_pdf(2), "two.pdf").unwrap());
        let specs = vec![OutputSpec {
            name: "one.pdf".to_string(),
            indices: vec![0],
        }];

        ctx.session().cancel();
        let err = materialize_all(&ctx, &ctx.operation(), doc, &specs)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cancelled");
    }

    #[test]
    fn test_track_operation() {
        let ctx = test_support::context();
        assert_eq!(ctx.track_operation(), 1);
        assert_eq!(ctx.track_operation(), 2);
        assert_eq!(ctx.with_counter(|c| c.get()), 2);
    }
}
