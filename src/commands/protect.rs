use crate::pdf::{PdfDocument, PdfError};
use anyhow::Result;
use std::path::Path;

/// Check the inputs a protect request needs, then refuse. Writing encrypted
/// documents is out of scope, and an unencrypted file must not be passed off
/// as protected.
pub fn run(input: &Path, password: &str, confirm: &str) -> Result<()> {
    if password.is_empty() {
        anyhow::bail!("Please enter a password");
    }
    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }
    PdfDocument::open(input)?;

    Err(PdfError::EncryptionUnsupported.into())
}
