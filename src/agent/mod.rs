//! Adaptive query pipeline.
//!
//! Answers natural-language questions against a corpus of documents by
//! letting a vision-capable model read page images directly. The
//! orchestrator decomposes each query into document-scoped sub-tasks,
//! selects relevant pages per task with a single vision call, lets the
//! plan evolve as findings come in, and synthesizes a final answer.
//!
//! # Architecture
//!
//! ```text
//! User query → Orchestrator
//!   ├── ContextProcessor (summarizes long conversation history)
//!   ├── QueryReformulator (resolves references from context)
//!   ├── QueryClassifier (gate: does this need documents at all?)
//!   ├── TaskPlanner.create_initial_plan (document-scoped sub-tasks)
//!   ├── loop: dequeue task
//!   │     ├── PageSelector (one vision call over candidate pages)
//!   │     ├── per-task vision analysis
//!   │     └── TaskPlanner.update_plan (continue / add / remove / modify)
//!   └── ResponseSynthesizer → final answer
//! ```

pub mod classifier;
pub mod context;
pub mod orchestrator;
mod parse;
pub mod planner;
pub mod progress;
pub mod prompt;
pub mod reformulator;
pub mod selector;
pub mod synthesizer;

// Re-export key types
pub use classifier::{Classification, QueryClassifier};
pub use context::{ContextProcessor, ProcessedContext};
pub use orchestrator::Orchestrator;
pub use planner::{TaskPlanner, build_document_catalogue};
pub use progress::{NullProgress, ProgressSink};
pub use prompt::PromptSet;
pub use reformulator::QueryReformulator;
pub use selector::PageSelector;
pub use synthesizer::ResponseSynthesizer;
