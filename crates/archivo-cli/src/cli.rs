//! Command-line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Clone, Debug)]
#[command(name = "archivo")]
#[command(version)]
#[command(about = "Archive web pages and search them with full-text queries", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (overrides autodiscovery)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Archive database path (overrides the configured location)
    #[arg(long, global = true, value_name = "PATH", env = "ARCHIVO_DB")]
    pub db: Option<PathBuf>,

    /// Abandon the operation after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Archive a page; content comes from --file or stdin
    Save {
        #[arg(long)]
        url: String,
        #[arg(long)]
        title: String,
        /// Read the page body from this file instead of stdin
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Print a stored page
    Get {
        id: i64,
        #[arg(long)]
        json: bool,
    },

    /// Full-text search over archived pages
    Search {
        /// FTS5 query, e.g. `rust` or `"memory safety"`
        query: String,
        #[arg(long)]
        json: bool,
    },

    /// Show page and index counts
    Stats {
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_save() {
        let cli = Cli::try_parse_from([
            "archivo",
            "save",
            "--url",
            "https://e.org",
            "--title",
            "Example",
            "--file",
            "page.html",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Command::Save {
                url: "https://e.org".into(),
                title: "Example".into(),
                file: Some(PathBuf::from("page.html")),
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "archivo", "search", "world", "--json", "--db", "/tmp/a.db", "--timeout", "3",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Command::Search {
                query: "world".into(),
                json: true,
            }
        );
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/a.db")));
        assert_eq!(cli.timeout, Some(3));
    }

    #[test]
    fn test_get_requires_numeric_id() {
        assert!(Cli::try_parse_from(["archivo", "get", "abc"]).is_err());
        assert!(Cli::try_parse_from(["archivo", "get", "7"]).is_ok());
    }

    #[test]
    fn test_save_requires_url_and_title() {
        assert!(Cli::try_parse_from(["archivo", "save", "--url", "https://e.org"]).is_err());
    }

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["archivo"]).is_err());
    }
}
