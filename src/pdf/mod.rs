pub mod create;
pub mod document;
pub mod error;
pub mod merge;
pub mod render;
pub mod text;

pub use document::PdfDocument;
pub use error::PdfError;
