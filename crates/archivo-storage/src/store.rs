//! The page store capability shared by every backend

use archivo_core::{Context, Page, PageId, Result, StoreStats};

/// Durable, searchable storage of archived pages.
///
/// Implementations are opened by their own constructors and shared between
/// threads behind an `Arc`. Every call takes a [`Context`]; once it is done the
/// call returns [`archivo_core::Error::Cancelled`] without committing anything.
/// After [`close`](PageStore::close) every other method returns
/// [`archivo_core::Error::Closed`].
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`save`](PageStore::save) | Persist a page and its index entry atomically |
/// | [`get`](PageStore::get) | Load a page with its full content |
/// | [`search`](PageStore::search) | Resolve a full-text query to ranked snippets |
/// | [`stats`](PageStore::stats) | Count page rows and index entries |
/// | [`close`](PageStore::close) | Release the backend |
pub trait PageStore: Send + Sync {
    /// Save a page, returning the identity assigned to it.
    ///
    /// `page.id` is ignored.
    fn save(&self, ctx: &Context, page: &Page) -> Result<PageId>;

    /// Load the page with the given identity.
    ///
    /// Fails with `NotFound` when no page has that identity.
    fn get(&self, ctx: &Context, id: PageId) -> Result<Page>;

    /// Run a full-text query, best match first.
    ///
    /// Each result's `html_content` is a highlighted snippet of the page body.
    /// No match yields an empty vector; a malformed query fails with
    /// `QuerySyntax`.
    fn search(&self, ctx: &Context, query: &str) -> Result<Vec<Page>>;

    fn stats(&self, ctx: &Context) -> Result<StoreStats>;

    /// Release the backend. Calling it again is a no-op.
    fn close(&self) -> Result<()>;
}
