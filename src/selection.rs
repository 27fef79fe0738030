//! Page selections and their resolution into zero-based page indices.

use crate::page_range::{self, PageRangeError, PageRangeToken};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error(transparent)]
    Range(#[from] PageRangeError),

    #[error("Cannot split every {n} pages: choose a value between 1 and {total_pages}")]
    EveryN { n: u32, total_pages: u32 },

    #[error("Page index {index} is out of range (document has {total_pages} pages)")]
    IndexOutOfRange { index: usize, total_pages: u32 },

    #[error("No pages selected")]
    NothingSelected,

    #[error("Document has no pages")]
    EmptyDocument,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionKind {
    All,
    Ranges(Vec<PageRangeToken>),
    EveryN(u32),
    /// Zero-based indices in the order they were picked
    Explicit(Vec<usize>),
}

/// A page selection validated against the page count of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    kind: SelectionKind,
    total_pages: u32,
}

impl PageSelection {
    pub fn all(total_pages: u32) -> Result<Self, SelectionError> {
        Self::new(SelectionKind::All, total_pages)
    }

    /// Parse a page range list like "1-3, 5, 7-9"
    pub fn ranges(input: &str, total_pages: u32) -> Result<Self, SelectionError> {
        non_empty(total_pages)?;
        let tokens = page_range::parse(input, total_pages)?;
        Self::new(SelectionKind::Ranges(tokens), total_pages)
    }

    pub fn every_n(n: u32, total_pages: u32) -> Result<Self, SelectionError> {
        non_empty(total_pages)?;
        if n < 1 || n > total_pages {
            return Err(SelectionError::EveryN { n, total_pages });
        }
        Self::new(SelectionKind::EveryN(n), total_pages)
    }

    pub fn explicit(indices: Vec<usize>, total_pages: u32) -> Result<Self, SelectionError> {
        non_empty(total_pages)?;
        if indices.is_empty() {
            return Err(SelectionError::NothingSelected);
        }
        if let Some(&index) = indices.iter().find(|&&i| i >= total_pages as usize) {
            return Err(SelectionError::IndexOutOfRange { index, total_pages });
        }
        Self::new(SelectionKind::Explicit(indices), total_pages)
    }

    /// Parse the user-facing selection forms: `all`, `every N [pages]`, or a
    /// page range list.
    pub fn parse(input: &str, total_pages: u32) -> Result<Self, SelectionError> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Self::all(total_pages);
        }

        let lower = trimmed.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("every") {
            let rest = rest.trim();
            let rest = rest
                .strip_suffix("pages")
                .or_else(|| rest.strip_suffix("page"))
                .unwrap_or(rest)
                .trim();
            let n = rest.parse::<u32>().map_err(|_| PageRangeError::Syntax {
                offending: trimmed.to_string(),
            })?;
            return Self::every_n(n, total_pages);
        }

        Self::ranges(trimmed, total_pages)
    }

    fn new(kind: SelectionKind, total_pages: u32) -> Result<Self, SelectionError> {
        non_empty(total_pages)?;
        Ok(PageSelection { kind, total_pages })
    }

    pub fn kind(&self) -> &SelectionKind {
        &self.kind
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Resolve to ascending, deduplicated zero-based indices.
    ///
    /// Every-N selections cover the whole document; the chunking is done by
    /// the partitioner.
    pub fn resolve(&self) -> ResolvedPages {
        let total = self.total_pages as usize;
        let indices = match &self.kind {
            SelectionKind::All | SelectionKind::EveryN(_) => (0..total).collect(),
            SelectionKind::Ranges(tokens) => {
                let mut seen = vec![false; total];
                let mut indices: Vec<usize> = tokens
                    .iter()
                    .flat_map(|token| token.indices())
                    .filter(|&i| !std::mem::replace(&mut seen[i], true))
                    .collect();
                indices.sort_unstable();
                indices
            }
            SelectionKind::Explicit(picked) => {
                let mut indices = picked.clone();
                indices.sort_unstable();
                indices.dedup();
                indices
            }
        };
        ResolvedPages(indices)
    }
}

fn non_empty(total_pages: u32) -> Result<(), SelectionError> {
    if total_pages == 0 {
        return Err(SelectionError::EmptyDocument);
    }
    Ok(())
}

/// Ascending, deduplicated zero-based page indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPages(Vec<usize>);

impl ResolvedPages {
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.0
    }

    /// 1-based page numbers, for display
    pub fn page_numbers(&self) -> Vec<u32> {
        self.0.iter().map(|&i| i as u32 + 1).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_all() {
        let selection = PageSelection::all(4).unwrap();
        assert_eq!(selection.resolve().as_slice(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_ranges_dedup_and_sort() {
        let selection = PageSelection::ranges("7-9, 1-3, 2-4", 10).unwrap();
        assert_eq!(selection.resolve().as_slice(), &[0, 1, 2, 3, 6, 7, 8]);
    }

    #[test]
    fn test_explicit_click_order() {
        let selection = PageSelection::explicit(vec![3, 1, 3, 0], 5).unwrap();
        assert_eq!(selection.resolve().as_slice(), &[0, 1, 3]);
    }

    #[test]
    fn test_explicit_out_of_range() {
        assert_eq!(
            PageSelection::explicit(vec![0, 5], 5),
            Err(SelectionError::IndexOutOfRange {
                index: 5,
                total_pages: 5
            })
        );
        assert_eq!(
            PageSelection::explicit(vec![], 5),
            Err(SelectionError::NothingSelected)
        );
    }

    #[test]
    fn test_every_n_bounds() {
        assert!(PageSelection::every_n(1, 5).is_ok());
        assert!(PageSelection::every_n(5, 5).is_ok());
        assert_eq!(
            PageSelection::every_n(0, 5),
            Err(SelectionError::EveryN {
                n: 0,
                total_pages: 5
            })
        );
        assert!(PageSelection::every_n(6, 5).is_err());
    }

    #[test]
    fn test_empty_document_rejected() {
        assert_eq!(PageSelection::all(0), Err(SelectionError::EmptyDocument));
        assert_eq!(
            PageSelection::ranges("1", 0),
            Err(SelectionError::EmptyDocument)
        );
        assert_eq!(
            PageSelection::every_n(1, 0),
            Err(SelectionError::EmptyDocument)
        );
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(
            PageSelection::parse(" ALL ", 3).unwrap().kind(),
            &SelectionKind::All
        );
        assert_eq!(
            PageSelection::parse("every 2 pages", 5).unwrap().kind(),
            &SelectionKind::EveryN(2)
        );
        assert_eq!(
            PageSelection::parse("every 1 page", 5).unwrap().kind(),
            &SelectionKind::EveryN(1)
        );
        assert_eq!(
            PageSelection::parse("Every 3", 5).unwrap().kind(),
            &SelectionKind::EveryN(3)
        );
        assert!(matches!(
            PageSelection::parse("1-2,4", 5).unwrap().kind(),
            SelectionKind::Ranges(_)
        ));
        assert!(matches!(
            PageSelection::parse("every other page", 5),
            Err(SelectionError::Range(PageRangeError::Syntax { .. }))
        ));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let selection = PageSelection::ranges("5, 1-2, 4", 6).unwrap();
        assert_eq!(selection.resolve(), selection.resolve());
    }

    #[test]
    fn test_page_numbers() {
        let selection = PageSelection::explicit(vec![3, 1], 5).unwrap();
        assert_eq!(selection.resolve().page_numbers(), vec![2, 4]);
    }

    fn range_list(total: u32) -> impl Strategy<Value = String> {
        prop::collection::vec((1..=total, 1..=total), 1..8).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(a, b)| {
                    let (lo, hi) = (a.min(b), a.max(b));
                    if lo == hi {
                        lo.to_string()
                    } else {
                        format!("{} - {}", lo, hi)
                    }
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
    }

    proptest! {
        #[test]
        fn resolved_indices_stay_in_bounds((total, input) in (1u32..60).prop_flat_map(|t| (Just(t), range_list(t)))) {
            let selection = PageSelection::ranges(&input, total).unwrap();
            let resolved = selection.resolve();
            prop_assert!(!resolved.is_empty());
            prop_assert!(resolved.as_slice().iter().all(|&i| i < total as usize));
            prop_assert!(resolved.as_slice().windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(resolved, selection.resolve());
        }
    }
}
