//! The `\paperentrynum{TITLE}{AUTHORS}{AFFILIATIONS}{ABSTRACT}{KEYWORDS}` artifact.

use serde::Serialize;
use thiserror::Error;

/// Macro name every extracted block starts with.
pub const MACRO: &str = r"\paperentrynum";

/// Number of brace-delimited fields the macro takes.
pub const FIELD_COUNT: usize = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LatexError {
    #[error("block does not start with {name}", name = MACRO)]
    MissingMacro,
    #[error("unexpected text outside braces at byte {0}")]
    TextOutsideBraces(usize),
    #[error("unbalanced braces")]
    Unbalanced,
    #[error("expected {expected} fields, found {0}", expected = FIELD_COUNT)]
    FieldCount(usize),
}

/// Split a macro invocation into its top-level brace groups.
///
/// Nesting is tracked by brace depth; escaped braces (`\{`, `\}`) and other
/// backslash escapes do not affect depth. Whitespace between groups is
/// allowed, anything else outside a group is an error.
pub fn scan_fields(block: &str) -> Result<Vec<&str>, LatexError> {
    let block = block.trim();
    let rest = block.strip_prefix(MACRO).ok_or(LatexError::MissingMacro)?;
    // Reject e.g. `\paperentrynumber{...}`.
    if rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(LatexError::MissingMacro);
    }
    let offset = MACRO.len();

    let mut fields = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut chars = rest.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if depth > 0 => {
                chars.next();
            }
            '{' => {
                if depth == 0 {
                    start = i + 1;
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    return Err(LatexError::Unbalanced);
                }
                depth -= 1;
                if depth == 0 {
                    fields.push(&rest[start..i]);
                }
            }
            c if depth == 0 && c.is_whitespace() => {}
            _ if depth == 0 => return Err(LatexError::TextOutsideBraces(offset + i)),
            _ => {}
        }
    }

    if depth != 0 {
        return Err(LatexError::Unbalanced);
    }
    Ok(fields)
}

/// The five fields of an extracted block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperEntry {
    pub title: String,
    pub authors: String,
    pub affiliations: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: String,
}

impl PaperEntry {
    /// Parse a block into its fields; exactly five top-level groups are required.
    pub fn parse(block: &str) -> Result<Self, LatexError> {
        let fields = scan_fields(block)?;
        if fields.len() != FIELD_COUNT {
            return Err(LatexError::FieldCount(fields.len()));
        }
        let mut it = fields.into_iter().map(|f| f.trim().to_string());
        let mut next = || it.next().unwrap_or_default();
        Ok(Self {
            title: next(),
            authors: next(),
            affiliations: next(),
            abstract_text: next(),
            keywords: next(),
        })
    }

    pub fn author_list(&self) -> Vec<&str> {
        split_list(&self.authors, ',')
    }

    pub fn affiliation_list(&self) -> Vec<&str> {
        split_list(&self.affiliations, ';')
    }

    pub fn keyword_list(&self) -> Vec<&str> {
        split_list(&self.keywords, ';')
    }
}

fn split_list(s: &str, sep: char) -> Vec<&str> {
    s.split(sep)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}
