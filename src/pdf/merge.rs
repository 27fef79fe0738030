use super::{PdfDocument, PdfError};
use lopdf::{Document, Object, ObjectId};
use std::collections::HashSet;

/// Page attributes a page may take from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Append the pages of every document, in order, into one document.
///
/// Sources are renumbered above the destination's highest object ID so
/// they can be moved in wholesale. Every page is then hung directly off the
/// destination's page root, with inherited attributes copied onto it, and
/// the leftover catalogs and page nodes are pruned.
pub fn merge_documents(documents: Vec<PdfDocument>) -> Result<Document, PdfError> {
    let mut sources = documents.into_iter();
    let mut dest = sources
        .next()
        .ok_or_else(|| PdfError::InvalidDocument("no documents to merge".to_string()))?
        .doc;

    let mut kids: Vec<ObjectId> = dest.get_pages().into_values().collect();
    dest.max_id = dest.max_id.max(highest_id(&dest));

    for source in sources {
        let mut doc = source.doc;
        doc.renumber_objects_with(dest.max_id + 1);
        kids.extend(doc.get_pages().into_values());
        dest.max_id = dest.max_id.max(highest_id(&doc));
        dest.objects.extend(doc.objects);
    }

    let pages_id = pages_root(&dest)?;
    for &page_id in &kids {
        adopt_page(&mut dest, page_id, pages_id)?;
    }

    let pages = dest.get_dictionary_mut(pages_id)?;
    for key in INHERITABLE {
        pages.remove(key);
    }
    pages.set("Count", kids.len() as i64);
    pages.set(
        "Kids",
        Object::Array(kids.into_iter().map(Object::Reference).collect()),
    );

    dest.prune_objects();
    Ok(dest)
}

/// Reparent a page under `root`, keeping what it inherited from its old tree.
fn adopt_page(doc: &mut Document, page_id: ObjectId, root: ObjectId) -> Result<(), PdfError> {
    let inherited = inherited_attributes(doc, page_id);
    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        if !page.has(key) {
            page.set(key, value);
        }
    }
    page.set("Parent", Object::Reference(root));
    Ok(())
}

/// The nearest ancestor's value for each inheritable attribute.
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(&'static [u8], Object)> {
    let mut found: Vec<(&'static [u8], Object)> = Vec::new();
    let mut seen = HashSet::new();
    let mut node = parent_of(doc, page_id);

    while let Some(id) = node {
        if !seen.insert(id) {
            break;
        }
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        for key in INHERITABLE {
            if found.iter().any(|(k, _)| *k == key) {
                continue;
            }
            if let Ok(value) = dict.get(key) {
                found.push((key, value.clone()));
            }
        }
        node = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    found
}

fn parent_of(doc: &Document, id: ObjectId) -> Option<ObjectId> {
    doc.get_dictionary(id)
        .ok()?
        .get(b"Parent")
        .and_then(Object::as_reference)
        .ok()
}

fn highest_id(doc: &Document) -> u32 {
    doc.objects.keys().map(|id| id.0).max().unwrap_or(0)
}

fn pages_root(doc: &Document) -> Result<ObjectId, PdfError> {
    let catalog = doc.catalog()?;
    Ok(catalog.get(b"Pages")?.as_reference()?)
}
