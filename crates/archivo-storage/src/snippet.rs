//! Snippet formatting shared by the store backends
//!
//! SQLite renders snippets itself through FTS5's `snippet()`; the constants
//! here are bound into that call. [`render`] reproduces the same shape for
//! backends without FTS5.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Placed before each matched term
pub const OPEN_MARKER: &str = "[ ";
/// Placed after each matched term
pub const CLOSE_MARKER: &str = " ]";
/// Marks text cut from either end of the excerpt
pub const ELLIPSIS: &str = "...";
/// Tokens of context in one snippet
pub const CONTEXT_TOKENS: usize = 10;

/// A word in a document: byte range plus its folded text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Split text into alphanumeric runs, case-folded with diacritics removed.
///
/// Matches the default FTS5 `unicode61` tokenizer closely enough for
/// `cafe` and `Café` to produce the same token.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current: Option<usize> = None;

    for (idx, ch) in text.char_indices() {
        match (is_token_char(ch), current) {
            (true, None) => current = Some(idx),
            (false, Some(start)) => {
                tokens.push(Token {
                    start,
                    end: idx,
                    text: fold(&text[start..idx]),
                });
                current = None;
            }
            _ => {}
        }
    }

    if let Some(start) = current {
        tokens.push(Token {
            start,
            end: text.len(),
            text: fold(&text[start..]),
        });
    }

    tokens
}

fn is_token_char(ch: char) -> bool {
    ch.is_alphanumeric() || is_combining_mark(ch)
}

/// Lowercase and strip diacritics
fn fold(word: &str) -> String {
    word.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Render a snippet of `text` around the matched token positions in `hits`.
///
/// `tokens` must come from [`tokenize`] on the same text and `hits` must be
/// sorted. The excerpt spans at most [`CONTEXT_TOKENS`] tokens starting just
/// before the first hit.
pub fn render(text: &str, tokens: &[Token], hits: &[usize]) -> String {
    if tokens.is_empty() {
        return text.to_string();
    }

    let (start, end) = window(tokens.len(), hits.first().copied().unwrap_or(0));

    let mut out = String::with_capacity(text.len().min(256));
    if start > 0 {
        out.push_str(ELLIPSIS);
    }

    let mut cursor = if start == 0 { 0 } else { tokens[start].start };
    for (idx, token) in tokens.iter().enumerate().take(end).skip(start) {
        if hits.binary_search(&idx).is_ok() {
            out.push_str(&text[cursor..token.start]);
            out.push_str(OPEN_MARKER);
            out.push_str(&text[token.start..token.end]);
            out.push_str(CLOSE_MARKER);
            cursor = token.end;
        }
    }

    let stop = if end == tokens.len() {
        text.len()
    } else {
        tokens[end - 1].end
    };
    out.push_str(&text[cursor..stop]);

    if end < tokens.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Token range `[start, end)` of the excerpt
fn window(token_count: usize, first_hit: usize) -> (usize, usize) {
    if token_count <= CONTEXT_TOKENS {
        return (0, token_count);
    }
    // A little leading context, then clamp to the end of the document
    let start = first_hit
        .saturating_sub(2)
        .min(token_count - CONTEXT_TOKENS);
    (start, start + CONTEXT_TOKENS)
}
