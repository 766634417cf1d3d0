use std::sync::Arc;

use folio_shared::ContentStore;

use crate::markdown::{ContentRenderer, MarkdownRenderer};

#[derive(Clone)]
pub struct AppState {
    /// Stores for every resource, sharing one database handle.
    pub content: ContentStore,
    /// Transform applied to post content on single-post reads.
    pub renderer: Arc<dyn ContentRenderer>,
}

impl AppState {
    pub fn new(content: ContentStore) -> Self {
        Self::with_renderer(content, Arc::new(MarkdownRenderer::default()))
    }

    pub fn with_renderer(content: ContentStore, renderer: Arc<dyn ContentRenderer>) -> Self {
        Self { content, renderer }
    }
}
