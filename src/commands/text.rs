use super::{select, Context};
use crate::pdf::text::{extract_text_pages, format_pages};
use crate::pdf::PdfDocument;
use anyhow::{Context as _, Result};
use std::path::Path;

pub struct TextOptions<'a> {
    pub pages: Option<&'a str>,
    pub pick: Option<&'a [u32]>,
    pub password: Option<&'a str>,
    /// Write to this .txt file instead of stdout
    pub output: Option<&'a Path>,
}

pub async fn run(ctx: &Context, input: &Path, options: &TextOptions<'_>) -> Result<()> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read PDF: {}", input.display()))?;
    let name = input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("document.pdf");
    let mut doc = PdfDocument::from_bytes_with_password(&bytes, name, options.password)?;
    let selection = select(doc.page_count(), options.pages, options.pick)?;
    let indices = selection.resolve().into_vec();
    let bytes = doc.readable_bytes(bytes)?;

    let pages = tokio::task::spawn_blocking(move || extract_text_pages(&bytes, &indices)).await??;
    let text = format_pages(&pages);

    match options.output {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote text of {} page(s) to {}", pages.len(), path.display());
        }
        None => print!("{}", text),
    }
    ctx.track_operation();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::pdf::fixtures::{encrypted_pdf, sample_pdf};

    #[tokio::test]
    async fn test_text_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.pdf");
        std::fs::write(&input, sample_pdf(3)).unwrap();
        let output = dir.path().join("notes.txt");

        let options = TextOptions {
            pages: Some("1,3"),
            pick: None,
            password: None,
            output: Some(&output),
        };
        run(&context(), &input, &options).await.unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("--- Page 1 ---\n"));
        assert!(text.contains("--- Page 3 ---\n"));
        assert!(!text.contains("--- Page 2 ---"));
    }

    #[tokio::test]
    async fn test_text_of_encrypted_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("locked.pdf");
        std::fs::write(&input, encrypted_pdf(2, "secret")).unwrap();
        let output = dir.path().join("locked.txt");

        let mut options = TextOptions {
            pages: Some("2"),
            pick: None,
            password: None,
            output: Some(&output),
        };
        let err = run(&context(), &input, &options).await.unwrap_err();
        assert!(err.to_string().contains("password protected"));

        options.password = Some("secret");
        run(&context(), &input, &options).await.unwrap();
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("Page 2"));
    }
}
