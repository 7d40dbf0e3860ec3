//! In-memory page store
//!
//! A [`PageStore`] without SQLite, for callers that want to exercise code
//! against the store contract in unit tests. It understands a subset of the
//! FTS5 query grammar: barewords and `"quoted phrases"`, each optionally
//! followed by `*` for a prefix match, all of which must match (`AND` between
//! them is accepted and implicit). Barewords follow the FTS5 rule, so
//! punctuation outside quotes is a syntax error. Grouping, column filters
//! and `OR`/`NOT`/`NEAR` are rejected.

use crate::snippet::{self, Token};
use crate::store::PageStore;
use archivo_core::{Context, Error, Page, PageId, Result, StoreStats};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default)]
struct State {
    next_id: PageId,
    pages: BTreeMap<PageId, Page>,
}

/// [`PageStore`] held entirely in process memory
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<Option<State>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Some(State::default())),
        }
    }
}

impl PageStore for MemoryStore {
    fn save(&self, ctx: &Context, page: &Page) -> Result<PageId> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(Error::Closed)?;
        ctx.check()?;

        state.next_id += 1;
        let id = state.next_id;
        state.pages.insert(
            id,
            Page {
                id,
                ..page.clone()
            },
        );
        debug!("Saved page {} in memory", id);
        Ok(id)
    }

    fn get(&self, ctx: &Context, id: PageId) -> Result<Page> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(Error::Closed)?;
        ctx.check()?;

        state
            .pages
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("page {}", id)))
    }

    fn search(&self, ctx: &Context, query: &str) -> Result<Vec<Page>> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(Error::Closed)?;
        ctx.check()?;

        let phrases = parse_query(query)?;

        let mut scored = Vec::new();
        for page in state.pages.values() {
            ctx.check()?;
            let tokens = snippet::tokenize(&page.html_content);
            if let Some(hits) = match_phrases(&tokens, &phrases) {
                let content = snippet::render(&page.html_content, &tokens, &hits);
                scored.push((
                    hits.len(),
                    Page {
                        html_content: content,
                        ..page.clone()
                    },
                ));
            }
        }

        // More hits first; ties keep insertion order
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.id.cmp(&b.1.id)));
        Ok(scored.into_iter().map(|(_, page)| page).collect())
    }

    fn stats(&self, ctx: &Context) -> Result<StoreStats> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(Error::Closed)?;
        ctx.check()?;

        let count = state.pages.len() as u64;
        Ok(StoreStats {
            page_count: count,
            index_count: count,
        })
    }

    fn close(&self) -> Result<()> {
        self.state.write().take();
        Ok(())
    }
}

/// One query term, compared against folded document tokens
#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    text: String,
    /// Matches any token starting with `text`
    prefix: bool,
}

impl Term {
    fn matches(&self, token: &Token) -> bool {
        if self.prefix {
            token.text.starts_with(&self.text)
        } else {
            token.text == self.text
        }
    }
}

/// Terms that must appear at consecutive positions
type Phrase = Vec<Term>;

/// Parse a query into phrases
fn parse_query(query: &str) -> Result<Vec<Phrase>> {
    let mut phrases = Vec::new();
    let mut saw_term = false;
    let mut rest = query.trim_start();

    while !rest.is_empty() {
        let (raw, after) = if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted
                .find('"')
                .ok_or_else(|| Error::QuerySyntax("unterminated string".into()))?;
            (&quoted[..end], &quoted[end + 1..])
        } else {
            let end = rest
                .find(|c: char| !is_bareword_char(c))
                .unwrap_or(rest.len());
            let word = &rest[..end];
            match word {
                "" => return Err(syntax_error(rest)),
                "AND" => {
                    rest = rest[end..].trim_start();
                    continue;
                }
                "OR" | "NOT" | "NEAR" => {
                    return Err(Error::QuerySyntax(format!(
                        "operator {} is not supported",
                        word
                    )))
                }
                _ => (word, &rest[end..]),
            }
        };

        let (prefix, after) = match after.strip_prefix('*') {
            Some(remainder) => (true, remainder),
            None => (false, after),
        };
        if let Some(next) = after.chars().next() {
            if !next.is_whitespace() && next != '"' {
                return Err(syntax_error(after));
            }
        }

        let mut phrase: Phrase = snippet::tokenize(raw)
            .into_iter()
            .map(|t| Term {
                text: t.text,
                prefix: false,
            })
            .collect();
        if let Some(last) = phrase.last_mut() {
            last.prefix = prefix;
        }
        phrases.push(phrase);
        saw_term = true;
        rest = after.trim_start();
    }

    if !saw_term {
        return Err(Error::QuerySyntax("empty query".into()));
    }
    Ok(phrases)
}

/// Characters FTS5 accepts in an unquoted term
fn is_bareword_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '\u{1a}' || !c.is_ascii()
}

fn syntax_error(at: &str) -> Error {
    let near: String = at.chars().take(1).collect();
    Error::QuerySyntax(format!("syntax error near \"{}\"", near))
}

/// Token positions covered by the phrases, or `None` if any phrase is absent
fn match_phrases(tokens: &[Token], phrases: &[Phrase]) -> Option<Vec<usize>> {
    let mut hits = Vec::new();

    for phrase in phrases {
        let mut found = false;
        if !phrase.is_empty() && tokens.len() >= phrase.len() {
            for start in 0..=tokens.len() - phrase.len() {
                let matched = phrase
                    .iter()
                    .enumerate()
                    .all(|(offset, term)| term.matches(&tokens[start + offset]));
                if matched {
                    found = true;
                    hits.extend(start..start + phrase.len());
                }
            }
        }
        if !found {
            return None;
        }
    }

    hits.sort_unstable();
    hits.dedup();
    Some(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(text: &str) -> Term {
        Term {
            text: text.to_string(),
            prefix: false,
        }
    }

    #[test]
    fn test_parse_terms_and_phrases() {
        let phrases = parse_query(r#"Rust AND "memory safety" borrow*"#).unwrap();
        assert_eq!(
            phrases,
            vec![
                vec![term("rust")],
                vec![term("memory"), term("safety")],
                vec![Term {
                    text: "borrow".to_string(),
                    prefix: true,
                }],
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        for query in [
            "\"open phrase",
            "   ",
            "AND",
            "a OR b",
            "(((",
            "hello)",
            "foo.bar",
            "a-b",
            "title:rust",
            "*",
            "a*b",
        ] {
            assert!(
                matches!(parse_query(query), Err(Error::QuerySyntax(_))),
                "{:?} should be rejected",
                query
            );
        }
    }

    #[test]
    fn test_bareword_with_underscore_is_a_phrase() {
        let phrases = parse_query("snake_case").unwrap();
        assert_eq!(phrases, vec![vec![term("snake"), term("case")]]);
    }

    #[test]
    fn test_phrase_requires_adjacency() {
        let tokens = snippet::tokenize("memory is safe, safety of memory");
        let phrase = vec![vec![term("memory"), term("safety")]];
        assert!(match_phrases(&tokens, &phrase).is_none());

        let tokens = snippet::tokenize("memory safety matters");
        assert_eq!(match_phrases(&tokens, &phrase), Some(vec![0, 1]));
    }

    #[test]
    fn test_prefix_term_matches_longer_tokens() {
        let tokens = snippet::tokenize("helpers say hello");
        let phrases = parse_query("hel*").unwrap();
        assert_eq!(match_phrases(&tokens, &phrases), Some(vec![0, 2]));
        assert!(match_phrases(&tokens, &parse_query("hel").unwrap()).is_none());
    }

    #[test]
    fn test_ranking_by_hit_count() {
        let store = MemoryStore::new();
        let ctx = Context::background();
        let sparse = store
            .save(&ctx, &Page::new("https://a.org", "A", "rust appears once here"))
            .unwrap();
        let dense = store
            .save(&ctx, &Page::new("https://b.org", "B", "rust rust rust"))
            .unwrap();

        let results = store.search(&ctx, "rust").unwrap();
        let ids: Vec<PageId> = results.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![dense, sparse]);
    }

    #[test]
    fn test_stored_page_keeps_assigned_id() {
        let store = MemoryStore::new();
        let ctx = Context::background();
        let mut page = Page::new("https://e.org", "Example", "body");
        page.id = 99;

        let id = store.save(&ctx, &page).unwrap();
        assert_eq!(id, 1);
        assert_eq!(store.get(&ctx, 1).unwrap().id, 1);
        assert!(store.get(&ctx, 99).unwrap_err().is_not_found());
    }
}
