use super::{output_dir, prefixed_name, print_saved, Context};
use crate::delivery::Download;
use crate::pdf::PdfDocument;
use anyhow::Result;
use std::path::Path;

pub async fn run(ctx: &Context, input: &Path, password: &str, dir: Option<&Path>) -> Result<()> {
    if password.is_empty() {
        anyhow::bail!("Please enter the password for this PDF");
    }

    let mut doc = PdfDocument::open_with_password(input, Some(password))?;
    // Loading already dropped the encryption dictionary
    let bytes = doc.to_bytes()?;

    let name = prefixed_name("unlocked", input);
    let files = ctx
        .deliver(
            vec![Download::new(name, bytes)],
            &output_dir(dir, input),
            &ctx.operation(),
        )
        .await?;
    ctx.track_operation();
    print_saved(&files);

    println!("Unlocked {} ({} pages)", input.display(), doc.page_count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::pdf::fixtures::{encrypted_pdf, sample_pdf};
    use crate::pdf::PdfError;

    #[tokio::test]
    async fn test_unlock_plain_document() {
        // An unencrypted file opens with any password and is re-saved as is
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("open.pdf");
        std::fs::write(&input, sample_pdf(2)).unwrap();

        run(&context(), &input, "anything", None).await.unwrap();
        let out = PdfDocument::open(dir.path().join("unlocked_open.pdf")).unwrap();
        assert_eq!(out.page_count(), 2);
    }

    #[tokio::test]
    async fn test_unlock_encrypted_document() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("locked.pdf");
        std::fs::write(&input, encrypted_pdf(3, "secret")).unwrap();

        run(&context(), &input, "secret", None).await.unwrap();
        let out = PdfDocument::open(dir.path().join("unlocked_locked.pdf")).unwrap();
        assert!(!out.encrypted);
        assert_eq!(out.page_count(), 3);
    }

    #[tokio::test]
    async fn test_unlock_wrong_password_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("locked.pdf");
        std::fs::write(&input, encrypted_pdf(1, "secret")).unwrap();

        let err = run(&context(), &input, "nope", None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PdfError>(),
            Some(PdfError::IncorrectPassword)
        ));
        assert!(!dir.path().join("unlocked_locked.pdf").exists());
    }

    #[tokio::test]
    async fn test_unlock_requires_password() {
        assert!(run(&context(), Path::new("x.pdf"), "", None).await.is_err());
    }
}
