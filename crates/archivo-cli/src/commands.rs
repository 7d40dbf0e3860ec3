//! Command execution against a page store

use crate::cli::Command;
use anyhow::Context as _;
use archivo_core::{Context, Page};
use archivo_storage::PageStore;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Page body for `save`, read from its file or stdin; `None` for other commands.
///
/// Runs before any store work so an interrupted read never leaves a worker
/// blocked on stdin.
pub fn read_input(command: &Command) -> anyhow::Result<Option<String>> {
    match command {
        Command::Save { file, .. } => read_content(file.as_deref()).map(Some),
        _ => Ok(None),
    }
}

/// Run one command, writing its output to `out`.
///
/// `input` is the page body from [`read_input`].
pub fn execute(
    store: &dyn PageStore,
    ctx: &Context,
    command: &Command,
    input: Option<String>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match command {
        Command::Save { url, title, .. } => {
            let content = input.context("No page content to save")?;
            let id = store.save(ctx, &Page::new(url.as_str(), title.as_str(), content))?;
            debug!("Saved {} as page {}", url, id);
            writeln!(out, "{}", id)?;
        }
        Command::Get { id, json } => {
            let page = store.get(ctx, *id)?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&page)?)?;
            } else {
                writeln!(out, "id:    {}", page.id)?;
                writeln!(out, "url:   {}", page.url)?;
                writeln!(out, "title: {}", page.title)?;
                writeln!(out)?;
                writeln!(out, "{}", page.html_content)?;
            }
        }
        Command::Search { query, json } => {
            let results = store.search(ctx, query)?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&results)?)?;
            } else if results.is_empty() {
                writeln!(out, "No matches")?;
            } else {
                for page in &results {
                    writeln!(out, "{}  {}  {}", page.id, page.title, page.url)?;
                    writeln!(out, "    {}", page.html_content)?;
                }
            }
        }
        Command::Stats { json } => {
            let stats = store.stats(ctx)?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
            } else {
                writeln!(out, "pages:   {}", stats.page_count)?;
                writeln!(out, "indexed: {}", stats.index_count)?;
            }
        }
    }
    Ok(())
}

fn read_content(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read page content from stdin")?;
            Ok(content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archivo_core::Error;
    use archivo_storage::MemoryStore;

    fn run(store: &dyn PageStore, command: Command) -> anyhow::Result<String> {
        let input = read_input(&command)?;
        let mut out = Vec::new();
        execute(store, &Context::background(), &command, input, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    fn save_from_file(store: &dyn PageStore, body: &str) -> String {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, body).unwrap();
        run(
            store,
            Command::Save {
                url: "https://e.org".into(),
                title: "Example".into(),
                file: Some(path),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_save_prints_id() {
        let store = MemoryStore::new();
        assert_eq!(save_from_file(&store, "hello world of search"), "1\n");
        assert_eq!(save_from_file(&store, "second"), "2\n");
    }

    #[test]
    fn test_search_output() {
        let store = MemoryStore::new();
        save_from_file(&store, "hello world of search");

        let text = run(
            &store,
            Command::Search {
                query: "world".into(),
                json: false,
            },
        )
        .unwrap();
        assert!(text.starts_with("1  Example  https://e.org\n"));
        assert!(text.contains("[ world ]"));

        let json = run(
            &store,
            Command::Search {
                query: "world".into(),
                json: true,
            },
        )
        .unwrap();
        let pages: Vec<Page> = serde_json::from_str(&json).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].id, 1);
    }

    #[test]
    fn test_search_without_matches() {
        let store = MemoryStore::new();
        save_from_file(&store, "hello");
        let text = run(
            &store,
            Command::Search {
                query: "absent".into(),
                json: false,
            },
        )
        .unwrap();
        assert_eq!(text, "No matches\n");
    }

    #[test]
    fn test_get_json_round_trips() {
        let store = MemoryStore::new();
        save_from_file(&store, "<p>body</p>");

        let json = run(&store, Command::Get { id: 1, json: true }).unwrap();
        let page: Page = serde_json::from_str(&json).unwrap();
        assert_eq!(page, store.get(&Context::background(), 1).unwrap());
    }

    #[test]
    fn test_get_missing_page_is_store_error() {
        let store = MemoryStore::new();
        let err = run(&store, Command::Get { id: 9, json: false }).unwrap_err();
        let err = err.downcast::<Error>().unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_stats_output() {
        let store = MemoryStore::new();
        save_from_file(&store, "one");
        let text = run(&store, Command::Stats { json: false }).unwrap();
        assert_eq!(text, "pages:   1\nindexed: 1\n");
    }

    #[test]
    fn test_save_uses_prepared_input() {
        let store = MemoryStore::new();
        let command = Command::Save {
            url: "https://stdin.org".into(),
            title: "Piped".into(),
            file: None,
        };

        let mut out = Vec::new();
        execute(
            &store,
            &Context::background(),
            &command,
            Some("piped body".into()),
            &mut out,
        )
        .unwrap();
        assert_eq!(out, b"1\n");
        assert_eq!(
            store.get(&Context::background(), 1).unwrap().html_content,
            "piped body"
        );
    }

    #[test]
    fn test_read_input_only_for_save() {
        assert_eq!(read_input(&Command::Stats { json: false }).unwrap(), None);
        assert_eq!(
            read_input(&Command::Search {
                query: "x".into(),
                json: false,
            })
            .unwrap(),
            None
        );
    }

    #[test]
    fn test_save_missing_file() {
        let store = MemoryStore::new();
        let err = run(
            &store,
            Command::Save {
                url: "https://e.org".into(),
                title: "Example".into(),
                file: Some("/nonexistent/archivo/page.html".into()),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
