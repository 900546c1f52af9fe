//! # visrag-rs
//!
//! Vision-first adaptive RAG agent. Answers natural-language questions
//! over a corpus of documents by treating each page as an image and
//! letting a vision-capable model read it directly — no text embeddings,
//! no vector index.
//!
//! The core is the adaptive multi-step retrieval orchestration in
//! [`agent`]: a stateful pipeline that decides whether a query needs
//! document lookup at all, decomposes it into document-scoped sub-tasks,
//! selects relevant page images per task via vision calls, revises the
//! plan as findings come in, and synthesizes one final answer. Rendering
//! pages to images, persisting documents, and driving a UI are the
//! caller's concern, reached through the [`storage`] and [`provider`]
//! traits.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use visrag_rs::agent::Orchestrator;
//! use visrag_rs::config::AgentConfig;
//! use visrag_rs::provider::create_provider;
//! use visrag_rs::storage::InMemoryStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AgentConfig::from_env()?;
//! let provider = create_provider(&config)?;
//! let storage = Arc::new(InMemoryStore::new());
//!
//! let orchestrator = Orchestrator::new(provider, storage, config);
//! let result = orchestrator
//!     .process_query("What were the Q3 revenues?", &[], None)
//!     .await;
//! println!("{}", result.answer);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod storage;

pub use agent::{NullProgress, Orchestrator, ProgressSink, PromptSet};
pub use config::AgentConfig;
pub use error::{AgentError, StorageError};
pub use model::{
    AgentTask, ConversationMessage, Document, DocumentStatus, MessageRole, Page, QueryResult,
    TaskPlan, TaskResult, TaskStatus,
};
pub use provider::{OpenAiProvider, Provider, create_provider};
pub use storage::{DocumentStore, InMemoryStore};
