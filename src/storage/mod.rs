//! Document storage abstraction.
//!
//! Storage owns the document corpus; the pipeline reads it once per query
//! through [`DocumentStore::get_all_documents`] to build the planner's
//! catalogue. PDF rendering and on-disk persistence live behind this trait
//! in external collaborators.

pub mod memory;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::model::Document;

pub use memory::InMemoryStore;

/// Trait for document storage backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns every stored document, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failures.
    async fn get_all_documents(&self) -> Result<Vec<Document>, StorageError>;

    /// Retrieves a document by id, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failures.
    async fn get_document(&self, document_id: &str) -> Result<Option<Document>, StorageError>;

    /// Saves a document, replacing any existing document with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failures.
    async fn save_document(&self, document: Document) -> Result<String, StorageError>;

    /// Deletes a document by id. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failures.
    async fn delete_document(&self, document_id: &str) -> Result<bool, StorageError>;
}
