//! Orchestrator for the adaptive query pipeline.
//!
//! Sequences context processing, reformulation, classification, planning,
//! task execution, and synthesis into the end-to-end flow, and owns the
//! adaptive execution loop. Tasks execute strictly one at a time; the
//! iteration cap is the only circuit breaker.
//!
//! The public entry point never raises: any error anywhere in the pipeline
//! is caught once at the top level and converted into an error-shaped
//! [`QueryResult`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use super::classifier::QueryClassifier;
use super::context::ContextProcessor;
use super::planner::TaskPlanner;
use super::progress::ProgressSink;
use super::prompt::{PromptSet, build_task_analysis_prompt};
use super::reformulator::QueryReformulator;
use super::selector::PageSelector;
use super::synthesizer::ResponseSynthesizer;
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::model::{
    AgentTask, ConversationMessage, Document, MessageRole, Page, QueryResult, TaskPlan,
    TaskResult, TaskStatus,
};
use crate::provider::{
    ContentPart, ImageDetail, Provider, multimodal_user_message, system_message,
};
use crate::storage::DocumentStore;

/// Max tokens for the per-task analysis call.
const ANALYSIS_MAX_TOKENS: u32 = 600;
/// Temperature for the per-task analysis call.
const ANALYSIS_TEMPERATURE: f32 = 0.3;
/// How many trailing conversation messages the task analyst sees.
const MEMORY_MESSAGES: usize = 4;
/// Byte budget per conversation message in the analyst's rolling memory.
const MEMORY_SNIPPET_LEN: usize = 100;

/// Orchestrates the adaptive vision-RAG query pipeline.
///
/// Holds the provider and storage collaborators plus one instance of each
/// pipeline component, wired from a single [`AgentConfig`].
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    storage: Arc<dyn DocumentStore>,
    config: AgentConfig,
    context_processor: ContextProcessor,
    reformulator: QueryReformulator,
    classifier: QueryClassifier,
    planner: TaskPlanner,
    selector: PageSelector,
    synthesizer: ResponseSynthesizer,
    analyst_prompt: String,
}

impl Orchestrator {
    /// Creates an orchestrator with the given collaborators and
    /// configuration.
    ///
    /// Loads prompt templates from the directory in
    /// [`AgentConfig::prompt_dir`], falling back to compiled-in defaults.
    #[must_use]
    pub fn new(
        provider: Arc<dyn Provider>,
        storage: Arc<dyn DocumentStore>,
        config: AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        let context_processor = ContextProcessor::new(
            config.max_conversation_turns,
            config.turns_to_summarize,
            config.turns_to_keep_full,
            prompts.summarizer.clone(),
        );
        let reformulator = QueryReformulator::new(prompts.reformulator.clone());
        let classifier = QueryClassifier::new(prompts.classifier.clone());
        let planner = TaskPlanner::new(
            prompts.planner.clone(),
            config.max_tasks_per_plan,
            config.findings_truncate_len,
        );
        let selector = PageSelector::new(prompts.selector.clone(), config.max_pages_per_task);
        let synthesizer = ResponseSynthesizer::new(prompts.synthesizer.clone());
        let analyst_prompt = prompts.analyst;

        Self {
            provider,
            storage,
            config,
            context_processor,
            reformulator,
            classifier,
            planner,
            selector,
            synthesizer,
            analyst_prompt,
        }
    }

    /// Processes a user query with adaptive task planning and execution.
    ///
    /// This entry point never raises: success and error results share the
    /// same shape, with errors reported inside the answer field.
    pub async fn process_query(
        &self,
        query: &str,
        conversation_history: &[ConversationMessage],
        progress: Option<&dyn ProgressSink>,
    ) -> QueryResult {
        let start = Instant::now();
        info!(query = %query.chars().take(100).collect::<String>(), "processing query");

        match self
            .run_pipeline(query, conversation_history, progress, start)
            .await
        {
            Ok(result) => {
                info!(
                    elapsed = ?result.processing_time,
                    iterations = result.total_iterations,
                    "query processed successfully"
                );
                result
            }
            Err(e) => {
                error!(error = %e, "failed to process query");
                Self::error_result(query, &e, start)
            }
        }
    }

    async fn run_pipeline(
        &self,
        query: &str,
        conversation_history: &[ConversationMessage],
        progress: Option<&dyn ProgressSink>,
        start: Instant,
    ) -> Result<QueryResult, AgentError> {
        let mut total_cost = 0.0;

        // Step 1: context processing, only if history is present
        let mut processed_context = String::new();
        if !conversation_history.is_empty() {
            let processed = self
                .context_processor
                .process(&*self.provider, conversation_history, query)
                .await?;
            processed_context = processed.context;
            self.accumulate_cost(&mut total_cost);
            info!("processed conversation context");
        }

        // Step 2: reformulation, only if history is present
        let reformulated_query = if conversation_history.is_empty() {
            query.to_string()
        } else {
            let reformulated = self
                .reformulator
                .reformulate(&*self.provider, query, &processed_context)
                .await?;
            self.accumulate_cost(&mut total_cost);
            reformulated
        };

        // Step 3: classification gates the whole document pipeline
        let classification = self
            .classifier
            .classify(&*self.provider, &reformulated_query)
            .await?;
        self.accumulate_cost(&mut total_cost);

        if !classification.needs_documents {
            return Ok(Self::direct_answer_result(
                query,
                &classification.reasoning,
                total_cost,
                start,
            ));
        }

        // Step 4: fetch the corpus once
        let documents = self.storage.get_all_documents().await?;
        if documents.is_empty() {
            warn!("no documents available for analysis");
            return Ok(Self::no_documents_result(query, total_cost, start));
        }
        info!(documents = documents.len(), "documents available");

        // Step 5: initial plan
        let mut plan = self
            .planner
            .create_initial_plan(&*self.provider, &reformulated_query, &documents)
            .await?;
        self.accumulate_cost(&mut total_cost);

        if let Some(sink) = progress {
            sink.plan_created(&plan).await;
        }

        // Step 6: adaptive execution loop
        let (task_results, iterations) = self
            .execute_plan(
                &mut plan,
                &reformulated_query,
                &documents,
                conversation_history,
                progress,
                &mut total_cost,
            )
            .await?;

        // Step 7: synthesis (falls back internally, never fails)
        let answer = self
            .synthesizer
            .synthesize(&*self.provider, &reformulated_query, &task_results)
            .await;
        self.accumulate_cost(&mut total_cost);

        // Step 8: assemble the final result
        let selected_pages: Vec<Page> = task_results
            .iter()
            .flat_map(|r| r.selected_pages.iter().cloned())
            .collect();

        Ok(QueryResult {
            query: query.to_string(),
            answer,
            selected_pages,
            task_results,
            total_iterations: iterations,
            processing_time: start.elapsed(),
            total_cost,
        })
    }

    /// Executes the plan with adaptive replanning after each task.
    ///
    /// Exiting on the iteration cap is a graceful stop, not an error.
    async fn execute_plan(
        &self,
        plan: &mut TaskPlan,
        original_query: &str,
        documents: &[Document],
        conversation_history: &[ConversationMessage],
        progress: Option<&dyn ProgressSink>,
        total_cost: &mut f64,
    ) -> Result<(Vec<TaskResult>, u32), AgentError> {
        let mut task_results = Vec::new();
        let mut iterations: u32 = 0;

        while plan.has_pending() && iterations < self.config.max_iterations {
            iterations += 1;
            info!(iteration = iterations, "agent iteration");

            let Some(task_id) = plan.next_pending().map(|t| t.id.clone()) else {
                break;
            };
            plan.set_status(&task_id, TaskStatus::InProgress);
            let Some(current_task) = plan.task(&task_id).cloned() else {
                break;
            };
            info!(task = %current_task.name, "executing task");

            if let Some(sink) = progress {
                sink.task_started(&current_task, plan).await;
            }

            let (selected_pages, analysis) = self
                .execute_task(&current_task, documents, conversation_history, progress)
                .await?;
            self.accumulate_cost(total_cost);

            plan.set_status(&task_id, TaskStatus::Completed);
            let completed_task = plan.task(&task_id).cloned().unwrap_or(current_task);
            let task_result = TaskResult {
                task: completed_task.clone(),
                selected_pages,
                analysis,
            };
            info!(
                task = %completed_task.name,
                pages = task_result.pages_analyzed(),
                "task completed"
            );

            if let Some(sink) = progress {
                sink.task_completed(&completed_task, &task_result, plan).await;
            }

            task_results.push(task_result);

            // Replan only while work remains
            if plan.has_pending()
                && let Some(latest) = task_results.last()
            {
                let old_task_count = plan.tasks.len();
                self.planner
                    .update_plan(&*self.provider, plan, latest, original_query, documents)
                    .await?;
                self.accumulate_cost(total_cost);

                if plan.tasks.len() != old_task_count
                    && let Some(sink) = progress
                {
                    sink.plan_updated(plan).await;
                }
            }
        }

        info!(iterations, "task execution completed");
        Ok((task_results, iterations))
    }

    /// Executes one task: candidate resolution, page selection, analysis.
    ///
    /// Page-selection failures propagate (fatal to the query); analysis
    /// failures are absorbed into the returned analysis text so sibling
    /// tasks and synthesis still proceed.
    async fn execute_task(
        &self,
        task: &AgentTask,
        documents: &[Document],
        conversation_history: &[ConversationMessage],
        progress: Option<&dyn ProgressSink>,
    ) -> Result<(Vec<Page>, String), AgentError> {
        let candidates = Self::resolve_candidate_pages(task, documents);

        let selected_pages = self
            .selector
            .select_pages(&*self.provider, &task.name, &task.description, &candidates)
            .await?;

        if let Some(sink) = progress {
            let page_numbers: Vec<u32> = selected_pages.iter().map(|p| p.page_number).collect();
            sink.pages_selected(task, &page_numbers).await;
        }

        let analysis = self
            .analyze_pages(task, &selected_pages, conversation_history)
            .await;

        Ok((selected_pages, analysis))
    }

    /// Resolves the candidate page set for a task.
    ///
    /// Tasks scoped to a document get that document's pages only. An
    /// unassigned task falls back to every page across all documents — a
    /// degraded path that defeats per-task scoping, so it is logged. An
    /// assignment to a vanished document yields no candidates.
    fn resolve_candidate_pages(task: &AgentTask, documents: &[Document]) -> Vec<Page> {
        if task.document.is_empty() {
            warn!(
                task = %task.name,
                "task has no document assignment, using all pages"
            );
            return documents
                .iter()
                .flat_map(|d| d.pages.iter().cloned())
                .collect();
        }

        documents.iter().find(|d| d.id == task.document).map_or_else(
            || {
                warn!(
                    task = %task.name,
                    document = %task.document,
                    "assigned document not found"
                );
                Vec::new()
            },
            |doc| {
                info!(
                    task = %task.name,
                    document = %doc.name,
                    pages = doc.pages.len(),
                    "task scoped to assigned document"
                );
                doc.pages.clone()
            },
        )
    }

    /// Analyzes the selected pages to complete a task.
    ///
    /// Failures are absorbed here: the returned text is either the model's
    /// analysis or a stand-in describing the failure, so one task's
    /// failure never aborts the query.
    async fn analyze_pages(
        &self,
        task: &AgentTask,
        pages: &[Page],
        conversation_history: &[ConversationMessage],
    ) -> String {
        if pages.is_empty() {
            return format!("No relevant pages found for task: {}", task.name);
        }

        let memory_summary = Self::build_memory_summary(conversation_history);
        let prompt = build_task_analysis_prompt(&task.description, &memory_summary);

        let mut parts = Vec::with_capacity(1 + pages.len() * 2);
        parts.push(ContentPart::text(prompt));
        for (i, page) in pages.iter().enumerate() {
            parts.push(ContentPart::image(&page.image_path, ImageDetail::High));
            parts.push(ContentPart::text(format!("[Page {} from document]", i + 1)));
        }

        let messages = vec![
            system_message(&self.analyst_prompt),
            multimodal_user_message(parts),
        ];

        match self
            .provider
            .process_multimodal_messages(&messages, ANALYSIS_MAX_TOKENS, ANALYSIS_TEMPERATURE)
            .await
        {
            Ok(analysis) => analysis.trim().to_string(),
            Err(e) => {
                error!(task = %task.name, error = %e, "page analysis failed");
                format!("Page analysis failed for task {}: {e}", task.name)
            }
        }
    }

    /// Builds the rolling conversation memory for the task analyst.
    fn build_memory_summary(conversation_history: &[ConversationMessage]) -> String {
        if conversation_history.is_empty() {
            return "CONVERSATION CONTEXT: This is the first query in the conversation."
                .to_string();
        }

        let recent = if conversation_history.len() > MEMORY_MESSAGES {
            &conversation_history[conversation_history.len() - MEMORY_MESSAGES..]
        } else {
            conversation_history
        };

        let mut parts = vec!["CONVERSATION CONTEXT:".to_string()];
        for msg in recent {
            let role = if msg.role == MessageRole::User {
                "User"
            } else {
                "Assistant"
            };
            let content = if msg.content.len() > MEMORY_SNIPPET_LEN {
                let mut end = MEMORY_SNIPPET_LEN;
                while end > 0 && !msg.content.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &msg.content[..end])
            } else {
                msg.content.clone()
            };
            parts.push(format!("- {role}: {content}"));
        }

        parts.join("\n")
    }

    fn accumulate_cost(&self, total: &mut f64) {
        if let Some(cost) = self.provider.last_cost() {
            *total += cost;
        }
    }

    /// Result for queries that need no document analysis.
    fn direct_answer_result(
        query: &str,
        reasoning: &str,
        total_cost: f64,
        start: Instant,
    ) -> QueryResult {
        QueryResult {
            query: query.to_string(),
            answer: format!("This query doesn't require document analysis. {reasoning}"),
            selected_pages: Vec::new(),
            task_results: Vec::new(),
            total_iterations: 0,
            processing_time: start.elapsed(),
            total_cost,
        }
    }

    /// Result when storage holds no documents.
    fn no_documents_result(query: &str, total_cost: f64, start: Instant) -> QueryResult {
        QueryResult {
            query: query.to_string(),
            answer: "I don't have any documents to analyze. Please upload some documents first."
                .to_string(),
            selected_pages: Vec::new(),
            task_results: Vec::new(),
            total_iterations: 0,
            processing_time: start.elapsed(),
            total_cost,
        }
    }

    /// Error-shaped result produced by the top-level catch-all.
    fn error_result(query: &str, error: &AgentError, start: Instant) -> QueryResult {
        QueryResult {
            query: query.to_string(),
            answer: format!("I encountered an error while processing your query: {error}"),
            selected_pages: Vec::new(),
            task_results: Vec::new(),
            total_iterations: 0,
            processing_time: start.elapsed(),
            total_cost: 0.0,
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_summary_empty_history() {
        let summary = Orchestrator::build_memory_summary(&[]);
        assert_eq!(
            summary,
            "CONVERSATION CONTEXT: This is the first query in the conversation."
        );
    }

    #[test]
    fn test_memory_summary_truncates_and_limits() {
        let long = "x".repeat(300);
        let history: Vec<ConversationMessage> = (0..6)
            .flat_map(|i| {
                vec![
                    ConversationMessage::user(format!("q{i} {long}")),
                    ConversationMessage::assistant(format!("a{i}")),
                ]
            })
            .collect();
        let summary = Orchestrator::build_memory_summary(&history);
        // Only the last 4 messages appear.
        assert!(summary.contains("- Assistant: a5"));
        assert!(summary.contains("- User: q5"));
        assert!(!summary.contains("a3"));
        // Long contents are truncated with an ellipsis.
        assert!(summary.contains("..."));
    }

    #[test]
    fn test_resolve_candidates_scoped_to_document() {
        let documents = vec![
            Document::new("doc_1", "A", vec![Page::new(1, "a1.jpg")]),
            Document::new("doc_2", "B", vec![Page::new(1, "b1.jpg"), Page::new(2, "b2.jpg")]),
        ];
        let task = AgentTask::new("T", "d", "doc_2");
        let pages = Orchestrator::resolve_candidate_pages(&task, &documents);
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.image_path.starts_with('b')));
    }

    #[test]
    fn test_resolve_candidates_unassigned_uses_all_pages() {
        let documents = vec![
            Document::new("doc_1", "A", vec![Page::new(1, "a1.jpg")]),
            Document::new("doc_2", "B", vec![Page::new(1, "b1.jpg")]),
        ];
        let task = AgentTask::new("T", "d", "");
        let pages = Orchestrator::resolve_candidate_pages(&task, &documents);
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_resolve_candidates_vanished_document_is_empty() {
        let documents = vec![Document::new("doc_1", "A", vec![Page::new(1, "a1.jpg")])];
        let task = AgentTask::new("T", "d", "doc_404");
        let pages = Orchestrator::resolve_candidate_pages(&task, &documents);
        assert!(pages.is_empty());
    }
}
