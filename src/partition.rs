//! Grouping of a page selection into named output documents.

use crate::selection::{PageSelection, SelectionKind};

/// Past this many pages a combined output is named by its first and last
/// page instead of listing every page.
const MAX_LISTED_PAGES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// One document holding every selected page
    #[default]
    Combined,
    /// One document per comma-separated range
    PerRange,
}

/// A named group of zero-based page indices that becomes one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub name: String,
    pub indices: Vec<usize>,
}

impl std::fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Split a selection into output specs.
///
/// Every-N selections are always chunked. Range selections produce one spec
/// per range in `PerRange` mode. Everything else produces a single spec with
/// the resolved pages.
pub fn partition(selection: &PageSelection, mode: OutputMode, base_name: &str) -> Vec<OutputSpec> {
    let base = stem(base_name);

    match (selection.kind(), mode) {
        (SelectionKind::EveryN(n), _) => every_n(*n as usize, selection.total_pages() as usize, base),
        (SelectionKind::Ranges(tokens), OutputMode::PerRange) => tokens
            .iter()
            .map(|token| {
                let label = if token.first() == token.last() {
                    token.first().to_string()
                } else {
                    format!("{}to{}", token.first(), token.last())
                };
                OutputSpec {
                    name: format!("{}_pages_{}.pdf", base, label),
                    indices: token.indices().collect(),
                }
            })
            .collect(),
        _ => {
            let indices = selection.resolve().into_vec();
            vec![OutputSpec {
                name: combined_name(base, &indices),
                indices,
            }]
        }
    }
}

fn every_n(n: usize, total: usize, base: &str) -> Vec<OutputSpec> {
    (0..total)
        .step_by(n)
        .map(|start| {
            let end = (start + n).min(total);
            OutputSpec {
                name: format!("{}_{}to{}.pdf", base, start + 1, end),
                indices: (start..end).collect(),
            }
        })
        .collect()
}

fn combined_name(base: &str, indices: &[usize]) -> String {
    match indices {
        [only] => format!("{}_page_{}.pdf", base, only + 1),
        [first, .., last] if indices.len() > MAX_LISTED_PAGES => {
            format!("{}_pages_{}to{}.pdf", base, first + 1, last + 1)
        }
        _ => {
            let pages: Vec<String> = indices.iter().map(|i| (i + 1).to_string()).collect();
            format!("{}_pages_{}.pdf", base, pages.join("_"))
        }
    }
}

/// Strip a trailing `.pdf` so callers can pass a file name directly.
pub fn stem(base_name: &str) -> &str {
    let len = base_name.len();
    if len > 4 && base_name.is_char_boundary(len - 4) && base_name[len - 4..].eq_ignore_ascii_case(".pdf") {
        &base_name[..len - 4]
    } else {
        base_name
    }
}
