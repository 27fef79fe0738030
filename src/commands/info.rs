use crate::pdf::{PdfDocument, PdfError};
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>>(path: P, password: Option<&str>) -> Result<()> {
    let path = path.as_ref();
    let doc = match PdfDocument::open_with_password(path, password) {
        Ok(doc) => doc,
        Err(PdfError::Encrypted) => {
            println!("File: {}", path.display());
            println!("Encrypted: yes (pass --password to read it)");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let info = doc.get_info();

    println!("File: {}", path.display());
    println!("Pages: {}", info.page_count);
    println!("PDF version: {}", info.version);
    println!("Encrypted: {}", if info.encrypted { "yes" } else { "no" });

    if let Some(title) = &info.title {
        println!("Title: {}", title);
    }
    if let Some(author) = &info.author {
        println!("Author: {}", author);
    }
    if let Some(creator) = &info.creator {
        println!("Creator: {}", creator);
    }
    if let Some(producer) = &info.producer {
        println!("Producer: {}", producer);
    }
    if let Some(creation_date) = &info.creation_date {
        println!("Created: {}", format_pdf_date(creation_date));
    }
    if let Some(mod_date) = &info.mod_date {
        println!("Modified: {}", format_pdf_date(mod_date));
    }

    Ok(())
}

/// `D:YYYYMMDDHHmmSS...` as `YYYY-MM-DD HH:mm:SS`
pub fn format_pdf_date(date: &str) -> String {
    let Some(d) = date.strip_prefix("D:") else {
        return date.to_string();
    };
    if d.len() < 8 || !d.is_char_boundary(8) || !d[..8].bytes().all(|b| b.is_ascii_digit()) {
        return date.to_string();
    }
    let time = if d.len() >= 14 && d.is_char_boundary(14) {
        format!(" {}:{}:{}", &d[8..10], &d[10..12], &d[12..14])
    } else {
        String::new()
    };
    format!("{}-{}-{}{}", &d[0..4], &d[4..6], &d[6..8], time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::sample_pdf;

    #[test]
    fn test_format_pdf_date() {
        assert_eq!(format_pdf_date("D:20240131120000+01'00'"), "2024-01-31 12:00:00");
        assert_eq!(format_pdf_date("D:20240131"), "2024-01-31");
        assert_eq!(format_pdf_date("yesterday"), "yesterday");
        assert_eq!(format_pdf_date("D:2024"), "D:2024");
    }

    #[test]
    fn test_info_runs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.pdf");
        std::fs::write(&input, sample_pdf(2)).unwrap();
        run(&input, None).unwrap();
        assert!(run(dir.path().join("missing.pdf"), None).is_err());
    }
}
