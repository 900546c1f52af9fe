//! In-memory storage backend for testing and development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::DocumentStore;
use crate::error::StorageError;
use crate::model::Document;

/// Volatile document store backed by a map.
///
/// Returned documents are clones; mutating them does not affect the store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get_all_documents(&self) -> Result<Vec<Document>, StorageError> {
        let documents = self.documents.read().await;
        let mut all: Vec<Document> = documents.values().cloned().collect();
        // Map iteration order is unstable; sort for a deterministic catalogue.
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<Document>, StorageError> {
        Ok(self.documents.read().await.get(document_id).cloned())
    }

    async fn save_document(&self, document: Document) -> Result<String, StorageError> {
        let id = document.id.clone();
        debug!(document_id = %id, pages = document.pages.len(), "saving document to memory");
        self.documents.write().await.insert(id.clone(), document);
        Ok(id)
    }

    async fn delete_document(&self, document_id: &str) -> Result<bool, StorageError> {
        Ok(self.documents.write().await.remove(document_id).is_some())
    }
}
