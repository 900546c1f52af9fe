//! Document and page models.
//!
//! A document is an ordered set of page images produced by an external
//! rendering step. The agent never sees original source files, only the
//! per-page images referenced here.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing status of a document in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Queued for processing.
    Pending,
    /// Page rendering in progress.
    Processing,
    /// All pages rendered and available.
    Completed,
    /// Processing failed.
    Failed,
}

/// A single document page backed by an image file.
///
/// `page_number` is 1-based and unique within its document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number, unique within the document.
    pub page_number: u32,
    /// Path to the rendered page image.
    pub image_path: String,
    /// Free-form page metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Page {
    /// Creates a page with empty metadata.
    #[must_use]
    pub fn new(page_number: u32, image_path: impl Into<String>) -> Self {
        Self {
            page_number,
            image_path: image_path.into(),
            metadata: HashMap::new(),
        }
    }
}

/// A processed document with its ordered pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable document identifier.
    pub id: String,
    /// Human-readable document name.
    pub name: String,
    /// Ordered pages.
    pub pages: Vec<Page>,
    /// Optional summary used to build the planner's catalogue.
    pub summary: Option<String>,
    /// Processing status.
    pub status: DocumentStatus,
    /// Free-form document metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Creates a completed document with the given pages and no summary.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pages,
            summary: None,
            status: DocumentStatus::Completed,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Sets the document summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Number of pages in this document.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Looks up a page by its 1-based page number.
    #[must_use]
    pub fn get_page(&self, page_number: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.page_number == page_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> Document {
        Document::new(
            "doc_1",
            "Quarterly Report",
            vec![Page::new(1, "p1.jpg"), Page::new(2, "p2.jpg")],
        )
    }

    #[test]
    fn test_page_count() {
        assert_eq!(sample_document().page_count(), 2);
    }

    #[test]
    fn test_get_page() {
        let doc = sample_document();
        assert_eq!(doc.get_page(2).map(|p| p.image_path.as_str()), Some("p2.jpg"));
        assert!(doc.get_page(3).is_none());
    }

    #[test]
    fn test_with_summary() {
        let doc = sample_document().with_summary("Revenue figures");
        assert_eq!(doc.summary.as_deref(), Some("Revenue figures"));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&DocumentStatus::Completed).unwrap_or_default();
        assert_eq!(json, "\"completed\"");
    }
}
