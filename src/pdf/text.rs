use super::PdfError;
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-indexed page number
    pub page: u32,
    pub text: String,
}

/// Extract text from the pages at the given zero-based indices.
///
/// The document is extracted once and split per page.
pub fn extract_text_pages(bytes: &[u8], indices: &[usize]) -> Result<Vec<PageText>, PdfError> {
    let pages = extract_all(bytes)?;
    let total = pages.len() as u32;

    indices
        .iter()
        .map(|&index| {
            let text = pages.get(index).ok_or(PdfError::PageOutOfRange {
                page: index + 1,
                total,
            })?;
            Ok(PageText {
                page: index as u32 + 1,
                text: text.trim_end().to_string(),
            })
        })
        .collect()
}

// pdf-extract panics on some malformed input
fn extract_all(bytes: &[u8]) -> Result<Vec<String>, PdfError> {
    match panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    })) {
        Ok(result) => Ok(result?),
        Err(_) => Err(PdfError::Text(
            "extraction panicked on a malformed document".to_string(),
        )),
    }
}

/// Render pages as plain text with `--- Page N ---` separators.
pub fn format_pages(pages: &[PageText]) -> String {
    let mut out = String::new();
    for page in pages {
        out.push_str(&format!("--- Page {} ---\n", page.page));
        out.push_str(&page.text);
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::sample_pdf;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_selected_pages() {
        let pages = extract_text_pages(&sample_pdf(4), &[1, 3]).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page, 2);
        assert!(pages[0].text.contains("Page 2"));
        assert_eq!(pages[1].page, 4);
        assert!(pages[1].text.contains("Page 4"));
    }

    #[test]
    fn test_extract_out_of_range() {
        assert!(matches!(
            extract_text_pages(&sample_pdf(2), &[2]),
            Err(PdfError::PageOutOfRange { page: 3, total: 2 })
        ));
    }

    #[test]
    fn test_format_pages() {
        let pages = vec![
            PageText {
                page: 1,
                text: "one".to_string(),
            },
            PageText {
                page: 3,
                text: "three".to_string(),
            },
        ];
        assert_eq!(
            format_pages(&pages),
            "--- Page 1 ---\none\n\n--- Page 3 ---\nthree\n\n"
        );
    }
}
