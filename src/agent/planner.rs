//! Adaptive task planner.
//!
//! Creates the initial task plan for a query and updates it after each
//! completed task. The update protocol is a closed union on `action`:
//! continue, add_tasks, remove_tasks, or modify_tasks. Plans are mutated
//! in place through [`TaskPlan`]'s PENDING-gated methods, so a planner
//! response can never touch a task that already started.

use std::collections::HashSet;
use std::fmt::Write;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::parse::strip_code_fences;
use super::prompt::{PlanUpdateContext, build_initial_plan_prompt, build_plan_update_prompt};
use crate::error::AgentError;
use crate::model::{AgentTask, Document, TaskPlan, TaskResult};
use crate::provider::{Provider, system_message, user_message};

/// Max tokens for planning calls (initial and update).
const PLANNING_MAX_TOKENS: u32 = 500;
/// Temperature for planning calls.
const PLANNING_TEMPERATURE: f32 = 0.3;

/// A task as emitted by the planning model.
#[derive(Debug, Clone, Deserialize)]
struct PlannedTask {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    document: String,
}

#[derive(Debug, Deserialize)]
struct InitialPlanResponse {
    tasks: Vec<PlannedTask>,
}

/// A task modification as emitted by the planning model.
#[derive(Debug, Clone, Deserialize)]
struct TaskModification {
    task_id: String,
    #[serde(default)]
    new_name: Option<String>,
    #[serde(default)]
    new_description: Option<String>,
    #[serde(default)]
    new_document: Option<String>,
}

/// The planner's decision after reviewing the latest findings.
///
/// Closed union: unknown actions fail deserialization rather than being
/// silently dropped.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum PlanUpdate {
    /// Keep the plan unchanged.
    Continue {
        #[serde(default)]
        reason: Option<String>,
    },
    /// Append new pending tasks.
    AddTasks {
        #[serde(default)]
        reason: Option<String>,
        new_tasks: Vec<PlannedTask>,
    },
    /// Delete pending tasks by id.
    RemoveTasks {
        #[serde(default)]
        reason: Option<String>,
        tasks_to_remove: Vec<String>,
    },
    /// Rewrite pending tasks.
    ModifyTasks {
        #[serde(default)]
        reason: Option<String>,
        modified_tasks: Vec<TaskModification>,
    },
}

/// Adaptive task planner: creates plans and revises them as findings
/// come in.
pub struct TaskPlanner {
    system_prompt: String,
    max_tasks_per_plan: usize,
    findings_truncate_len: usize,
}

impl TaskPlanner {
    /// Creates a planner with the given system prompt and limits.
    #[must_use]
    pub const fn new(
        system_prompt: String,
        max_tasks_per_plan: usize,
        findings_truncate_len: usize,
    ) -> Self {
        Self {
            system_prompt,
            max_tasks_per_plan,
            findings_truncate_len,
        }
    }

    /// Creates the initial task plan for a query.
    ///
    /// The planning prompt carries a catalogue of document ids and
    /// summaries and instructs the model to emit the minimum number of
    /// tasks, each scoped to a single document. Assignments to ids not in
    /// the catalogue are cleared (the task falls back to all pages at
    /// execution time). The task list is hard-capped at
    /// `max_tasks_per_plan`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::TaskPlanning`] with the raw response when the
    /// payload is not valid JSON or lacks the `tasks` array.
    pub async fn create_initial_plan(
        &self,
        provider: &dyn Provider,
        query: &str,
        documents: &[Document],
    ) -> Result<TaskPlan, AgentError> {
        info!(query = %truncate(query, 50), "creating initial task plan");

        let documents_text = build_document_catalogue(documents);
        let messages = vec![
            system_message(&self.system_prompt),
            user_message(&build_initial_plan_prompt(query, &documents_text)),
        ];

        let response = provider
            .process_text_messages(&messages, PLANNING_MAX_TOKENS, PLANNING_TEMPERATURE)
            .await?;

        let plan = self.parse_initial_plan(&response, query, documents)?;
        info!(tasks = plan.tasks.len(), "initial plan created");
        for task in &plan.tasks {
            debug!(task = %task.name, document = %task.document, "planned task");
        }
        Ok(plan)
    }

    fn parse_initial_plan(
        &self,
        response: &str,
        query: &str,
        documents: &[Document],
    ) -> Result<TaskPlan, AgentError> {
        let parsed: InitialPlanResponse = serde_json::from_str(strip_code_fences(response))
            .map_err(|e| AgentError::TaskPlanning {
                message: format!("Failed to parse task plan JSON: {e}"),
                content: response.to_string(),
            })?;

        let valid_ids: HashSet<&str> = documents.iter().map(|d| d.id.as_str()).collect();

        let mut tasks: Vec<AgentTask> = parsed
            .tasks
            .into_iter()
            .map(|t| {
                let document = validate_assignment(&t.document, &valid_ids, &t.name);
                AgentTask::new(t.name, t.description, document)
            })
            .collect();

        if tasks.len() > self.max_tasks_per_plan {
            tasks.truncate(self.max_tasks_per_plan);
            debug!(cap = self.max_tasks_per_plan, "limited initial task count");
        }

        Ok(TaskPlan::new(query, tasks))
    }

    /// Adaptively updates the plan after a completed task.
    ///
    /// Issues one call carrying the plan status, progress summary, and the
    /// latest task's truncated findings, then applies exactly one action.
    /// `current_iteration` increments by exactly 1 regardless of the
    /// chosen action.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::TaskPlanning`] with the raw response when the
    /// action payload is malformed or names an unknown action.
    pub async fn update_plan(
        &self,
        provider: &dyn Provider,
        plan: &mut TaskPlan,
        latest_result: &TaskResult,
        original_query: &str,
        documents: &[Document],
    ) -> Result<(), AgentError> {
        info!(completed = %latest_result.task.name, "updating task plan");

        let plan_status = build_plan_status(plan);
        let progress_summary = build_progress_summary(plan, latest_result);
        let available_documents = build_document_catalogue(documents);
        let findings = truncate(&latest_result.analysis, self.findings_truncate_len);

        let ctx = PlanUpdateContext {
            original_query,
            available_documents: &available_documents,
            current_plan_status: &plan_status,
            completed_task_name: &latest_result.task.name,
            task_findings: findings,
            progress_summary: &progress_summary,
        };

        let messages = vec![
            system_message(&self.system_prompt),
            user_message(&build_plan_update_prompt(&ctx)),
        ];

        let response = provider
            .process_text_messages(&messages, PLANNING_MAX_TOKENS, PLANNING_TEMPERATURE)
            .await?;

        self.apply_plan_update(plan, &response, documents)?;
        info!(
            tasks = plan.tasks.len(),
            iteration = plan.current_iteration,
            "plan updated"
        );
        Ok(())
    }

    fn apply_plan_update(
        &self,
        plan: &mut TaskPlan,
        response: &str,
        documents: &[Document],
    ) -> Result<(), AgentError> {
        let update: PlanUpdate = serde_json::from_str(strip_code_fences(response)).map_err(
            |e| AgentError::TaskPlanning {
                message: format!("Failed to parse plan update JSON: {e}"),
                content: response.to_string(),
            },
        )?;

        let valid_ids: HashSet<&str> = documents.iter().map(|d| d.id.as_str()).collect();

        match update {
            PlanUpdate::Continue { reason } => {
                debug!(reason = reason.as_deref().unwrap_or(""), "continuing with current plan");
            }
            PlanUpdate::AddTasks { reason, new_tasks } => {
                debug!(reason = reason.as_deref().unwrap_or(""), "adding tasks");
                for t in new_tasks {
                    let document = validate_assignment(&t.document, &valid_ids, &t.name);
                    let task = AgentTask::new(t.name, t.description, document);
                    info!(task = %task.name, document = %task.document, "added task");
                    plan.add_task(task);
                }
            }
            PlanUpdate::RemoveTasks {
                reason,
                tasks_to_remove,
            } => {
                debug!(reason = reason.as_deref().unwrap_or(""), "removing tasks");
                for task_id in &tasks_to_remove {
                    if plan.remove_task(task_id) {
                        info!(task_id = %task_id, "removed task");
                    } else {
                        warn!(task_id = %task_id, "rejected removal of unknown or non-pending task");
                    }
                }
            }
            PlanUpdate::ModifyTasks {
                reason,
                modified_tasks,
            } => {
                debug!(reason = reason.as_deref().unwrap_or(""), "modifying tasks");
                for m in &modified_tasks {
                    let document = m
                        .new_document
                        .as_deref()
                        .map(|d| validate_assignment(d, &valid_ids, &m.task_id));
                    let applied = plan.modify_task(
                        &m.task_id,
                        m.new_name.as_deref(),
                        m.new_description.as_deref(),
                        document.as_deref(),
                    );
                    if applied {
                        info!(task_id = %m.task_id, "modified task");
                    } else {
                        warn!(task_id = %m.task_id, "rejected modification of unknown or non-pending task");
                    }
                }
            }
        }

        plan.current_iteration += 1;
        Ok(())
    }
}

/// Builds the id + summary catalogue shown to the planning model.
///
/// Assignments are validated against this text: an id the model invents
/// is not a valid assignment.
#[must_use]
pub fn build_document_catalogue(documents: &[Document]) -> String {
    if documents.is_empty() {
        return "No documents available".to_string();
    }
    documents
        .iter()
        .map(|doc| {
            let summary = doc
                .summary
                .clone()
                .unwrap_or_else(|| format!("Document with {} pages", doc.pages.len()));
            format!("{}: {}\nSummary: {}", doc.id, doc.name, summary)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Clears assignments to document ids not present in the catalogue.
fn validate_assignment(document: &str, valid_ids: &HashSet<&str>, task_name: &str) -> String {
    if document.is_empty() || valid_ids.contains(document) {
        document.to_string()
    } else {
        warn!(
            task = task_name,
            document, "clearing assignment to unknown document"
        );
        String::new()
    }
}

/// One status line per task.
fn build_plan_status(plan: &TaskPlan) -> String {
    let mut status = String::new();
    for task in &plan.tasks {
        let _ = writeln!(status, "- {}: {}", task.name, task.status);
    }
    status.trim_end().to_string()
}

/// Names of completed tasks so far.
fn build_progress_summary(plan: &TaskPlan, latest_result: &TaskResult) -> String {
    let completed = plan.completed_tasks();
    if completed.is_empty() {
        return format!("Just completed first task: {}", latest_result.task.name);
    }
    let lines: Vec<String> = completed.iter().map(|t| format!("✓ {}", t.name)).collect();
    format!("Completed tasks:\n{}", lines.join("\n"))
}

/// Truncates to a byte budget on a char boundary.
fn truncate(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Page, TaskStatus};

    fn planner() -> TaskPlanner {
        TaskPlanner::new("plan".to_string(), 4, 500)
    }

    fn docs() -> Vec<Document> {
        vec![
            Document::new("doc_1", "Report", vec![Page::new(1, "a.jpg")])
                .with_summary("Q3 financials"),
            Document::new("doc_2", "Handbook", vec![Page::new(1, "b.jpg")]),
        ]
    }

    fn result_for(task: &AgentTask) -> TaskResult {
        TaskResult {
            task: task.clone(),
            selected_pages: Vec::new(),
            analysis: "found the numbers".to_string(),
        }
    }

    #[test]
    fn test_catalogue_includes_summaries_and_fallback() {
        let catalogue = build_document_catalogue(&docs());
        assert!(catalogue.contains("doc_1: Report\nSummary: Q3 financials"));
        assert!(catalogue.contains("doc_2: Handbook\nSummary: Document with 1 pages"));
    }

    #[test]
    fn test_catalogue_empty() {
        assert_eq!(build_document_catalogue(&[]), "No documents available");
    }

    #[test]
    fn test_parse_initial_plan() {
        let response = r#"{"tasks": [
            {"name": "Get Revenue", "description": "find revenue", "document": "doc_1"}
        ]}"#;
        let plan = planner()
            .parse_initial_plan(response, "query", &docs())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].document, "doc_1");
        assert_eq!(plan.tasks[0].status, TaskStatus::Pending);
        assert_eq!(plan.current_iteration, 0);
    }

    #[test]
    fn test_parse_initial_plan_clears_unknown_document() {
        let response = r#"{"tasks": [
            {"name": "Bad Assignment", "description": "d", "document": "doc_99"}
        ]}"#;
        let plan = planner()
            .parse_initial_plan(response, "query", &docs())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(plan.tasks[0].document, "");
    }

    #[test]
    fn test_parse_initial_plan_caps_task_count() {
        let tasks: Vec<String> = (0..6)
            .map(|i| format!(r#"{{"name": "T{i}", "description": "d", "document": "doc_1"}}"#))
            .collect();
        let response = format!(r#"{{"tasks": [{}]}}"#, tasks.join(","));
        let plan = planner()
            .parse_initial_plan(&response, "query", &docs())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(plan.tasks.len(), 4);
    }

    #[test]
    fn test_parse_initial_plan_malformed_carries_content() {
        let result = planner().parse_initial_plan("no json here", "q", &docs());
        let Err(AgentError::TaskPlanning { content, .. }) = result else {
            unreachable!("expected planning error");
        };
        assert_eq!(content, "no json here");
    }

    #[test]
    fn test_apply_continue_increments_iteration() {
        let mut plan = TaskPlan::new("q", vec![AgentTask::new("A", "d", "doc_1")]);
        planner()
            .apply_plan_update(&mut plan, r#"{"action": "continue", "reason": "on track"}"#, &docs())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(plan.current_iteration, 1);
        assert_eq!(plan.tasks.len(), 1);
    }

    #[test]
    fn test_apply_add_tasks_validates_documents() {
        let mut plan = TaskPlan::new("q", vec![AgentTask::new("A", "d", "doc_1")]);
        let response = r#"{"action": "add_tasks", "new_tasks": [
            {"name": "B", "description": "d2", "document": "doc_2"},
            {"name": "C", "description": "d3", "document": "doc_404"}
        ]}"#;
        planner()
            .apply_plan_update(&mut plan, response, &docs())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(plan.tasks.len(), 3);
        assert_eq!(plan.tasks[1].document, "doc_2");
        assert_eq!(plan.tasks[2].document, "");
        assert_eq!(plan.current_iteration, 1);
    }

    #[test]
    fn test_apply_remove_skips_non_pending() {
        let mut plan = TaskPlan::new(
            "q",
            vec![AgentTask::new("A", "d", "doc_1"), AgentTask::new("B", "d", "doc_2")],
        );
        let completed_id = plan.tasks[0].id.clone();
        let pending_id = plan.tasks[1].id.clone();
        plan.set_status(&completed_id, TaskStatus::Completed);

        let response = format!(
            r#"{{"action": "remove_tasks", "tasks_to_remove": ["{completed_id}", "{pending_id}"]}}"#
        );
        planner()
            .apply_plan_update(&mut plan, &response, &docs())
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].id, completed_id);
        assert_eq!(plan.current_iteration, 1);
    }

    #[test]
    fn test_apply_modify_only_pending() {
        let mut plan = TaskPlan::new(
            "q",
            vec![AgentTask::new("A", "d", "doc_1"), AgentTask::new("B", "d", "doc_2")],
        );
        let in_progress_id = plan.tasks[0].id.clone();
        let pending_id = plan.tasks[1].id.clone();
        plan.set_status(&in_progress_id, TaskStatus::InProgress);

        let response = format!(
            r#"{{"action": "modify_tasks", "modified_tasks": [
                {{"task_id": "{in_progress_id}", "new_name": "Hijacked"}},
                {{"task_id": "{pending_id}", "new_name": "Refined", "new_document": "doc_1"}}
            ]}}"#
        );
        planner()
            .apply_plan_update(&mut plan, &response, &docs())
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(plan.tasks[0].name, "A");
        assert_eq!(plan.tasks[1].name, "Refined");
        assert_eq!(plan.tasks[1].document, "doc_1");
    }

    #[test]
    fn test_apply_unknown_action_fails() {
        let mut plan = TaskPlan::new("q", vec![AgentTask::new("A", "d", "doc_1")]);
        let result = planner().apply_plan_update(
            &mut plan,
            r#"{"action": "restart_everything"}"#,
            &docs(),
        );
        assert!(matches!(result, Err(AgentError::TaskPlanning { .. })));
        assert_eq!(plan.current_iteration, 0);
    }

    #[test]
    fn test_progress_summary_first_task() {
        let plan = TaskPlan::new("q", vec![AgentTask::new("A", "d", "doc_1")]);
        let result = result_for(&plan.tasks[0]);
        assert_eq!(
            build_progress_summary(&plan, &result),
            "Just completed first task: A"
        );
    }

    #[test]
    fn test_progress_summary_lists_completed() {
        let mut plan = TaskPlan::new(
            "q",
            vec![AgentTask::new("A", "d", "doc_1"), AgentTask::new("B", "d", "doc_2")],
        );
        let id = plan.tasks[0].id.clone();
        plan.set_status(&id, TaskStatus::Completed);
        let result = result_for(&plan.tasks[0]);
        let summary = build_progress_summary(&plan, &result);
        assert!(summary.starts_with("Completed tasks:"));
        assert!(summary.contains("✓ A"));
    }

    #[test]
    fn test_plan_status_lines() {
        let mut plan = TaskPlan::new(
            "q",
            vec![AgentTask::new("A", "d", "doc_1"), AgentTask::new("B", "d", "doc_2")],
        );
        let id = plan.tasks[0].id.clone();
        plan.set_status(&id, TaskStatus::Completed);
        let status = build_plan_status(&plan);
        assert!(status.contains("- A: completed"));
        assert!(status.contains("- B: pending"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "ααααα"; // 2 bytes per char
        let cut = truncate(text, 5);
        assert_eq!(cut, "αα");
        assert_eq!(truncate("short", 500), "short");
    }
}
