use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a valid PDF document: {0}")]
    InvalidDocument(String),

    #[error("Document is password protected; unlock it with the password first")]
    Encrypted,

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("Password protection is not supported: PDFs cannot be encrypted by this tool")]
    EncryptionUnsupported,

    #[error("Page {page} is out of range (1-{total})")]
    PageOutOfRange { page: usize, total: u32 },

    #[error("Failed to render page {page}: {reason}")]
    Render { page: usize, reason: String },

    #[error("Page rendering is unavailable (pdfium could not be loaded): {0}")]
    RendererUnavailable(String),

    #[error("Failed to extract text: {0}")]
    Text(String),

    #[error("Failed to save PDF: {0}")]
    Save(String),

    #[error("Unsupported input {name}: {reason}")]
    Unsupported { name: String, reason: String },
}

impl From<lopdf::Error> for PdfError {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::Decryption(_) => PdfError::Encrypted,
            _ => PdfError::InvalidDocument(err.to_string()),
        }
    }
}

impl From<pdf_extract::OutputError> for PdfError {
    fn from(err: pdf_extract::OutputError) -> Self {
        PdfError::Text(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            PdfError::PageOutOfRange { page: 10, total: 5 }.to_string(),
            "Page 10 is out of range (1-5)"
        );
        assert!(PdfError::Encrypted.to_string().contains("unlock"));
    }
}
