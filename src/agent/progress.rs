//! Progress observer for pipeline events.
//!
//! The sink is purely observational: one method per event, all defaulting
//! to no-ops, decoupled from control flow so its absence (or anything it
//! does) changes nothing about pipeline behavior.

use async_trait::async_trait;

use crate::model::{AgentTask, TaskPlan, TaskResult};

/// Observer for pipeline progress events.
///
/// Implement only the events you care about; unimplemented events are
/// no-ops. Methods cannot fail, so a sink can never affect pipeline
/// correctness.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// The initial plan was created.
    async fn plan_created(&self, _plan: &TaskPlan) {}

    /// A task was dequeued and marked in-progress.
    async fn task_started(&self, _task: &AgentTask, _plan: &TaskPlan) {}

    /// Pages were selected for the current task.
    async fn pages_selected(&self, _task: &AgentTask, _page_numbers: &[u32]) {}

    /// A task finished and its result was recorded.
    async fn task_completed(&self, _task: &AgentTask, _result: &TaskResult, _plan: &TaskPlan) {}

    /// A plan update changed the task count.
    async fn plan_updated(&self, _plan: &TaskPlan) {}
}

/// A sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

#[async_trait]
impl ProgressSink for NullProgress {}
