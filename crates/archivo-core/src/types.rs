//! Shared types used across Archivo crates

use serde::{Deserialize, Serialize};

/// Identifier assigned to a page by the store
pub type PageId = i64;

/// An archived web page.
///
/// Callers build one with [`Page::new`] and hand it to a store; the store
/// assigns `id`. Pages returned from a search carry a highlighted snippet in
/// `html_content` instead of the full body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Page {
    /// Zero until the page has been saved
    pub id: PageId,
    pub url: String,
    pub title: String,
    pub html_content: String,
}

impl Page {
    /// Create an unsaved page
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        html_content: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            url: url.into(),
            title: title.into(),
            html_content: html_content.into(),
        }
    }

    /// Whether the store has assigned this page an identity
    pub fn is_saved(&self) -> bool {
        self.id > 0
    }
}

/// Row counts for the two persisted structures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub page_count: u64,
    pub index_count: u64,
}

impl StoreStats {
    /// Every page row has exactly one index entry
    pub fn is_consistent(&self) -> bool {
        self.page_count == self.index_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_page_is_unsaved() {
        let page = Page::new("https://e.org", "Example", "hello world of search");
        assert_eq!(page.id, 0);
        assert!(!page.is_saved());
        assert_eq!(page.url, "https://e.org");
        assert_eq!(page.title, "Example");
        assert_eq!(page.html_content, "hello world of search");
    }

    #[test]
    fn test_page_serialization() {
        let page = Page {
            id: 3,
            ..Page::new("https://e.org", "Example", "<p>body</p>")
        };
        let json = serde_json::to_string(&page).unwrap();
        assert!(json.contains("\"html_content\":\"<p>body</p>\""));

        let parsed: Page = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, page);
    }

    #[test]
    fn test_stats_consistency() {
        let stats = StoreStats {
            page_count: 2,
            index_count: 2,
        };
        assert!(stats.is_consistent());

        let broken = StoreStats {
            page_count: 3,
            index_count: 2,
        };
        assert!(!broken.is_consistent());
    }
}
