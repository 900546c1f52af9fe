//! Task plan and result types.
//!
//! A [`TaskPlan`] is owned exclusively by the orchestrator for the duration
//! of one query and mutated in place between sequential awaits. The
//! PENDING-only mutation rules live here so the planner cannot violate them.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::Page;

/// Lifecycle status of an agent task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Queued, not yet started. The only state in which the planner may
    /// remove or modify a task.
    Pending,
    /// Currently executing. At most one task is in this state.
    InProgress,
    /// Finished with a result.
    Completed,
    /// Abandoned without execution.
    Cancelled,
}

impl TaskStatus {
    /// Returns the wire string for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single sub-task in the agent's plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    /// Unique id within the plan.
    pub id: String,
    /// Short task name.
    pub name: String,
    /// What information this task should retrieve.
    pub description: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Assigned document id; empty when unassigned.
    #[serde(default)]
    pub document: String,
}

impl AgentTask {
    /// Creates a pending task with a fresh id.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            document: document.into(),
        }
    }

    /// Whether this task is still pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }
}

/// The agent's mutable plan for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    /// The (reformulated) query this plan answers.
    pub initial_query: String,
    /// Ordered tasks. Dequeue order is strictly FIFO over the pending
    /// subset in list order.
    pub tasks: Vec<AgentTask>,
    /// Number of planner update calls applied to this plan.
    pub current_iteration: u32,
}

impl TaskPlan {
    /// Creates a plan with the given tasks and a zeroed iteration counter.
    #[must_use]
    pub fn new(initial_query: impl Into<String>, tasks: Vec<AgentTask>) -> Self {
        Self {
            initial_query: initial_query.into(),
            tasks,
            current_iteration: 0,
        }
    }

    /// Returns the first pending task in list order.
    #[must_use]
    pub fn next_pending(&self) -> Option<&AgentTask> {
        self.tasks.iter().find(|t| t.is_pending())
    }

    /// Whether any task is still pending.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.tasks.iter().any(AgentTask::is_pending)
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn task(&self, id: &str) -> Option<&AgentTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Sets the status of a task by id. Returns `false` if no such task.
    pub fn set_status(&mut self, id: &str, status: TaskStatus) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.status = status;
                true
            }
            None => false,
        }
    }

    /// Appends a task to the plan.
    pub fn add_task(&mut self, task: AgentTask) {
        self.tasks.push(task);
    }

    /// Removes a task by id. Only pending tasks may be removed; removal of
    /// a non-pending task is rejected and returns `false`.
    pub fn remove_task(&mut self, id: &str) -> bool {
        let removable = self.tasks.iter().any(|t| t.id == id && t.is_pending());
        if removable {
            self.tasks.retain(|t| !(t.id == id && t.is_pending()));
        }
        removable
    }

    /// Rewrites the name/description/document of a pending task. Each field
    /// is updated only when a replacement is supplied. Returns `false` when
    /// the task does not exist or is no longer pending.
    pub fn modify_task(
        &mut self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
        document: Option<&str>,
    ) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id && t.is_pending()) {
            Some(task) => {
                if let Some(name) = name {
                    task.name = name.to_string();
                }
                if let Some(description) = description {
                    task.description = description.to_string();
                }
                if let Some(document) = document {
                    task.document = document.to_string();
                }
                true
            }
            None => false,
        }
    }

    /// Returns all completed tasks in list order.
    #[must_use]
    pub fn completed_tasks(&self) -> Vec<&AgentTask> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .collect()
    }
}

/// Result of executing a single task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Snapshot of the executed task.
    pub task: AgentTask,
    /// Pages the selector chose for this task.
    pub selected_pages: Vec<Page>,
    /// Free-text analysis produced by the vision call (or a failure
    /// stand-in).
    pub analysis: String,
}

impl TaskResult {
    /// Number of pages analyzed for this task.
    #[must_use]
    pub fn pages_analyzed(&self) -> usize {
        self.selected_pages.len()
    }
}

/// Terminal output of one query. Never mutated after construction; error
/// and success results share this shape.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// The original user query.
    pub query: String,
    /// Final synthesized answer (or an error/template message).
    pub answer: String,
    /// Concatenated page selections across tasks, not deduplicated.
    pub selected_pages: Vec<Page>,
    /// Ordered per-task results.
    pub task_results: Vec<TaskResult>,
    /// Number of task-execution loop iterations.
    pub total_iterations: u32,
    /// Wall-clock time for the whole query.
    #[serde(serialize_with = "serialize_duration")]
    pub processing_time: Duration,
    /// Accumulated provider cost, 0.0 when the provider reports none.
    pub total_cost: f64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_duration<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}

impl QueryResult {
    /// Returns selected pages deduplicated by image path, preserving order.
    #[must_use]
    pub fn unique_pages(&self) -> Vec<&Page> {
        let mut seen = std::collections::HashSet::new();
        self.selected_pages
            .iter()
            .filter(|p| seen.insert(p.image_path.as_str()))
            .collect()
    }

    /// Total pages analyzed across all task results.
    #[must_use]
    pub fn total_pages_analyzed(&self) -> usize {
        self.task_results.iter().map(TaskResult::pages_analyzed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_with_tasks() -> TaskPlan {
        TaskPlan::new(
            "q",
            vec![
                AgentTask::new("First", "find a", "doc_1"),
                AgentTask::new("Second", "find b", "doc_2"),
            ],
        )
    }

    #[test]
    fn test_fifo_dequeue() {
        let plan = plan_with_tasks();
        assert_eq!(plan.next_pending().map(|t| t.name.as_str()), Some("First"));
    }

    #[test]
    fn test_set_status_advances_queue() {
        let mut plan = plan_with_tasks();
        let first_id = plan.tasks[0].id.clone();
        assert!(plan.set_status(&first_id, TaskStatus::Completed));
        assert_eq!(plan.next_pending().map(|t| t.name.as_str()), Some("Second"));
    }

    #[test]
    fn test_remove_rejects_non_pending() {
        let mut plan = plan_with_tasks();
        let id = plan.tasks[0].id.clone();
        plan.set_status(&id, TaskStatus::Completed);
        assert!(!plan.remove_task(&id));
        assert_eq!(plan.tasks.len(), 2);
    }

    #[test]
    fn test_remove_pending() {
        let mut plan = plan_with_tasks();
        let id = plan.tasks[1].id.clone();
        assert!(plan.remove_task(&id));
        assert_eq!(plan.tasks.len(), 1);
    }

    #[test]
    fn test_modify_rejects_non_pending() {
        let mut plan = plan_with_tasks();
        let id = plan.tasks[0].id.clone();
        plan.set_status(&id, TaskStatus::InProgress);
        assert!(!plan.modify_task(&id, Some("renamed"), None, None));
        assert_eq!(plan.tasks[0].name, "First");
    }

    #[test]
    fn test_modify_partial_fields() {
        let mut plan = plan_with_tasks();
        let id = plan.tasks[0].id.clone();
        assert!(plan.modify_task(&id, None, Some("updated"), None));
        assert_eq!(plan.tasks[0].name, "First");
        assert_eq!(plan.tasks[0].description, "updated");
        assert_eq!(plan.tasks[0].document, "doc_1");
    }

    #[test]
    fn test_unique_pages() {
        let page = Page::new(1, "a.jpg");
        let result = QueryResult {
            query: "q".to_string(),
            answer: "a".to_string(),
            selected_pages: vec![page.clone(), page.clone(), Page::new(2, "b.jpg")],
            task_results: Vec::new(),
            total_iterations: 0,
            processing_time: Duration::ZERO,
            total_cost: 0.0,
        };
        assert_eq!(result.selected_pages.len(), 3);
        assert_eq!(result.unique_pages().len(), 2);
    }

    #[test]
    fn test_status_wire_strings() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap_or_default();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(TaskStatus::Pending.to_string(), "pending");
    }
}
