use super::PdfError;
use crate::partition::OutputSpec;
use lopdf::xref::XrefEntry;
use lopdf::{Document, Object, ObjectId, Reader};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

pub struct PdfDocument {
    pub doc: Document,
    /// File name the document was loaded from, used to name outputs
    pub name: String,
    /// The file was encrypted when loaded
    pub encrypted: bool,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PdfError> {
        Self::open_with_password(path, None)
    }

    pub fn open_with_password<P: AsRef<Path>>(
        path: P,
        password: Option<&str>,
    ) -> Result<Self, PdfError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| PdfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("document.pdf");
        Self::from_bytes_with_password(&bytes, name, password)
    }

    pub fn from_bytes(bytes: &[u8], name: &str) -> Result<Self, PdfError> {
        Self::from_bytes_with_password(bytes, name, None)
    }

    /// Load a document, decrypting it when it is encrypted.
    ///
    /// Files that open with the empty user password load without one. Any
    /// other encrypted file needs `password` (user or owner) and is
    /// `PdfError::Encrypted` without it. The loaded document never carries
    /// an encryption dictionary, so whatever is saved from it is plain.
    pub fn from_bytes_with_password(
        bytes: &[u8],
        name: &str,
        password: Option<&str>,
    ) -> Result<Self, PdfError> {
        let mut doc = Document::load_mem(bytes)?;
        let encrypted = doc.is_encrypted();

        if encrypted {
            // Already decrypted with the empty password while loading
            if doc.encryption_state.is_none() {
                let password = password.ok_or(PdfError::Encrypted)?;
                doc.authenticate_password(password)
                    .map_err(|_| PdfError::IncorrectPassword)?;
                doc = decrypt_from_source(bytes, doc, password)?;
            }
            strip_encryption(&mut doc);
        }

        if doc.get_pages().is_empty() {
            return Err(PdfError::InvalidDocument("document has no pages".to_string()));
        }

        Ok(PdfDocument {
            doc,
            name: name.to_string(),
            encrypted,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Get 1-indexed page object IDs
    pub fn page_ids(&self) -> Vec<(u32, ObjectId)> {
        let mut pages: Vec<_> = self.doc.get_pages().into_iter().collect();
        pages.sort_by_key(|(num, _)| *num);
        pages
    }

    /// Get metadata from the document info dictionary
    pub fn get_info(&self) -> PdfInfo {
        let mut info = PdfInfo::default();

        if let Ok(Object::Reference(info_ref)) = self.doc.trailer.get(b"Info") {
            if let Ok(Object::Dictionary(dict)) = self.doc.get_object(*info_ref) {
                info.title = get_string_from_dict(dict, b"Title");
                info.author = get_string_from_dict(dict, b"Author");
                info.creator = get_string_from_dict(dict, b"Creator");
                info.producer = get_string_from_dict(dict, b"Producer");
                info.creation_date = get_string_from_dict(dict, b"CreationDate");
                info.mod_date = get_string_from_dict(dict, b"ModDate");
            }
        }

        info.page_count = self.page_count();
        info.version = self.doc.version.to_string();
        info.encrypted = self.encrypted;
        info
    }

    /// Copy the pages at the given zero-based indices into a new document.
    ///
    /// Pages keep their document order.
    pub fn copy_pages(&self, indices: &[usize]) -> Result<Document, PdfError> {
        let all_pages = self.page_ids();
        let total = all_pages.len() as u32;

        if indices.is_empty() {
            return Err(PdfError::InvalidDocument("no pages to copy".to_string()));
        }
        if let Some(&page) = indices.iter().find(|&&i| i >= all_pages.len()) {
            return Err(PdfError::PageOutOfRange {
                page: page + 1,
                total,
            });
        }

        let mut keep = vec![false; all_pages.len()];
        for &i in indices {
            keep[i] = true;
        }
        let pages_to_delete: Vec<u32> = all_pages
            .iter()
            .zip(&keep)
            .filter(|(_, kept)| !**kept)
            .map(|((num, _), _)| *num)
            .collect();

        let mut new_doc = self.doc.clone();
        if !pages_to_delete.is_empty() {
            new_doc.delete_pages(&pages_to_delete);
            new_doc.prune_objects();
        }
        Ok(new_doc)
    }

    /// Build the bytes of one output document.
    pub fn materialize(&self, spec: &OutputSpec) -> Result<Vec<u8>, PdfError> {
        let mut doc = self.copy_pages(&spec.indices)?;
        to_bytes(&mut doc)
    }

    /// Add `degrees` to the rotation of the pages at the given indices.
    pub fn rotate(&mut self, indices: &[usize], degrees: i64) -> Result<(), PdfError> {
        let all_pages = self.page_ids();
        let total = all_pages.len() as u32;

        for &index in indices {
            let (_, page_id) = *all_pages.get(index).ok_or(PdfError::PageOutOfRange {
                page: index + 1,
                total,
            })?;
            let page = self.doc.get_dictionary_mut(page_id)?;
            let current = page
                .get(b"Rotate")
                .and_then(|o| o.as_i64())
                .unwrap_or(0);
            page.set("Rotate", (current + degrees).rem_euclid(360));
        }
        Ok(())
    }

    /// Re-serialize with unused objects pruned and streams compressed.
    pub fn recompress(&mut self) -> Result<Vec<u8>, PdfError> {
        self.doc.prune_objects();
        self.doc.delete_zero_length_streams();
        self.doc.compress();
        to_bytes(&mut self.doc)
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>, PdfError> {
        to_bytes(&mut self.doc)
    }

    /// Bytes the text extractor can read: `source` itself, or the decrypted
    /// document when the file was encrypted.
    pub fn readable_bytes(&mut self, source: Vec<u8>) -> Result<Vec<u8>, PdfError> {
        if self.encrypted {
            self.to_bytes()
        } else {
            Ok(source)
        }
    }
}

/// Re-read every object of an encrypted file and decrypt it with `password`.
///
/// lopdf only parses the objects of an encrypted file when the empty
/// password opens it, so the rest are read again from the cross-reference
/// table before decrypting.
fn decrypt_from_source(
    bytes: &[u8],
    doc: Document,
    password: &str,
) -> Result<Document, PdfError> {
    // Xref offsets count from the header
    let start = bytes.windows(5).position(|w| w == b"%PDF-").unwrap_or(0);
    let reader = Reader {
        buffer: &bytes[start..],
        document: doc,
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    };

    let mut objects = BTreeMap::new();
    for (&number, entry) in &reader.document.reference_table.entries {
        if let XrefEntry::Normal { generation, .. } = *entry {
            let id = (number, generation);
            match reader.get_object(id, &mut HashSet::new()) {
                Ok(object) => {
                    objects.insert(id, object);
                }
                Err(e) => tracing::warn!("skipping object {} {}: {}", number, generation, e),
            }
        }
    }

    let mut doc = reader.document;
    doc.objects = objects;
    doc.decrypt(password)?;
    Ok(doc)
}

fn strip_encryption(doc: &mut Document) {
    if let Some(Object::Reference(id)) = doc.trailer.remove(b"Encrypt") {
        doc.objects.remove(&id);
    }
    doc.encryption_state = None;
}

pub fn to_bytes(doc: &mut Document) -> Result<Vec<u8>, PdfError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfError::Save(e.to_string()))?;
    Ok(buffer)
}

#[derive(Debug, Default, Clone)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub mod_date: Option<String>,
    pub page_count: u32,
    pub version: String,
    pub encrypted: bool,
}

fn get_string_from_dict(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).ok().and_then(|obj| match obj {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        _ => None,
    })
}

fn decode_pdf_string(bytes: &[u8]) -> Option<String> {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        // UTF-16 BE
        let u16_chars: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        String::from_utf16(&u16_chars).ok()
    } else {
        // PDFDocEncoding, approximated as Latin-1
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}
