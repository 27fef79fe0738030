use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)(?:\s*-\s*([0-9]+))?$").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageRangeError {
    #[error("No pages specified: enter at least one page range")]
    EmptyInput,

    #[error("Invalid page range syntax at '{offending}' (use a format like: 1-3, 5, 7-9)")]
    Syntax { offending: String },

    #[error("Range {token} is invalid: pages must be between 1 and {total_pages}")]
    OutOfRange { token: String, total_pages: u32 },
}

/// One comma-separated entry of a page range list, with 1-based bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRangeToken {
    Single(u32),
    Range { start: u32, end: u32 },
}

impl PageRangeToken {
    pub fn first(&self) -> u32 {
        match *self {
            PageRangeToken::Single(page) => page,
            PageRangeToken::Range { start, .. } => start,
        }
    }

    pub fn last(&self) -> u32 {
        match *self {
            PageRangeToken::Single(page) => page,
            PageRangeToken::Range { end, .. } => end,
        }
    }

    /// Expand into 1-based page numbers, both bounds inclusive
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.first()..=self.last()
    }

    /// Expand into zero-based page indices
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        self.pages().map(|page| (page - 1) as usize)
    }

    fn check(&self, literal: &str, total_pages: u32) -> Result<(), PageRangeError> {
        let (first, last) = (self.first(), self.last());
        if first < 1 || last > total_pages || first > last {
            return Err(PageRangeError::OutOfRange {
                token: literal.to_string(),
                total_pages,
            });
        }
        Ok(())
    }
}

impl fmt::Display for PageRangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRangeToken::Single(page) => write!(f, "{}", page),
            PageRangeToken::Range { start, end } => write!(f, "{}-{}", start, end),
        }
    }
}

/// Result of the syntax pass: a token, or a bound that didn't fit in a u32.
enum Lexed<'a> {
    Token(PageRangeToken, &'a str),
    Overflow(&'a str),
}

fn lex(part: &str) -> Result<Lexed<'_>, PageRangeError> {
    let captures = TOKEN.captures(part).ok_or_else(|| PageRangeError::Syntax {
        offending: if part.is_empty() {
            ",".to_string()
        } else {
            part.to_string()
        },
    })?;

    let start = captures[1].parse::<u32>();
    let end = captures.get(2).map(|m| m.as_str().parse::<u32>());

    let token = match (start, end) {
        (Ok(page), None) => PageRangeToken::Single(page),
        (Ok(start), Some(Ok(end))) => PageRangeToken::Range { start, end },
        _ => return Ok(Lexed::Overflow(part)),
    };
    Ok(Lexed::Token(token, part))
}

/// Parse a comma-separated list of page ranges like "1-3, 5, 7-9".
///
/// The whole string is checked for syntax before any bound is checked
/// against `total_pages`, so a syntax error always wins over a range error.
pub fn parse(input: &str, total_pages: u32) -> Result<Vec<PageRangeToken>, PageRangeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PageRangeError::EmptyInput);
    }

    let lexed = input
        .split(',')
        .map(|part| lex(part.trim()))
        .collect::<Result<Vec<_>, _>>()?;

    lexed
        .into_iter()
        .map(|entry| match entry {
            Lexed::Token(token, literal) => {
                token.check(literal, total_pages)?;
                Ok(token)
            }
            Lexed::Overflow(literal) => Err(PageRangeError::OutOfRange {
                token: literal.to_string(),
                total_pages,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_page() {
        let tokens = parse("5", 10).unwrap();
        assert_eq!(tokens, vec![PageRangeToken::Single(5)]);
        assert_eq!(tokens[0].pages().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_page_range() {
        let tokens = parse("1-5", 10).unwrap();
        assert_eq!(tokens[0].pages().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(tokens[0].indices().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_length_one_range() {
        let tokens = parse("5-5", 10).unwrap();
        assert_eq!(tokens, vec![PageRangeToken::Range { start: 5, end: 5 }]);
    }

    #[test]
    fn test_whitespace_is_ignored() {
        let tokens = parse("  1 - 3 ,5,  7-9  ", 9).unwrap();
        assert_eq!(
            tokens,
            vec![
                PageRangeToken::Range { start: 1, end: 3 },
                PageRangeToken::Single(5),
                PageRangeToken::Range { start: 7, end: 9 },
            ]
        );
    }

    #[test]
    fn test_overlapping_tokens_are_kept() {
        let tokens = parse("1-3,2-4", 10).unwrap();
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse("", 10), Err(PageRangeError::EmptyInput));
        assert_eq!(parse("   ", 10), Err(PageRangeError::EmptyInput));
    }

    #[test]
    fn test_double_comma_is_syntax_error() {
        assert!(matches!(
            parse("1-3,,5", 10),
            Err(PageRangeError::Syntax { .. })
        ));
    }

    #[test]
    fn test_syntax_error_names_offending_text() {
        assert_eq!(
            parse("1-3, 4a, 6", 10),
            Err(PageRangeError::Syntax {
                offending: "4a".to_string()
            })
        );
        assert!(matches!(parse("-5", 10), Err(PageRangeError::Syntax { .. })));
        assert!(matches!(parse("1-", 10), Err(PageRangeError::Syntax { .. })));
        assert!(matches!(parse("1-2-3", 10), Err(PageRangeError::Syntax { .. })));
        assert!(matches!(parse("1;2", 10), Err(PageRangeError::Syntax { .. })));
    }

    #[test]
    fn test_syntax_checked_before_bounds() {
        assert!(matches!(
            parse("99, x", 10),
            Err(PageRangeError::Syntax { .. })
        ));
    }

    #[test]
    fn test_out_of_range_names_token() {
        assert_eq!(
            parse("1-3,11", 9),
            Err(PageRangeError::OutOfRange {
                token: "11".to_string(),
                total_pages: 9
            })
        );
    }

    #[test]
    fn test_page_zero_is_out_of_range() {
        assert!(matches!(
            parse("0", 10),
            Err(PageRangeError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse("0-2", 10),
            Err(PageRangeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_reversed_range_is_out_of_range() {
        assert_eq!(
            parse("5-3", 10),
            Err(PageRangeError::OutOfRange {
                token: "5-3".to_string(),
                total_pages: 10
            })
        );
    }

    #[test]
    fn test_huge_number_is_out_of_range() {
        assert!(matches!(
            parse("1-99999999999", 10),
            Err(PageRangeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_error_message() {
        let err = parse("12", 9).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Range 12 is invalid: pages must be between 1 and 9"
        );
    }
}
