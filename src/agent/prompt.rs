//! System prompts and template builders for the pipeline stages.
//!
//! Prompts are the core instructions that define each stage's behavior and
//! JSON output contract. Template builders format user messages with query
//! context, document catalogues, and plan state.

use std::fmt::Write;
use std::path::Path;

/// System prompt for conversation summarization.
pub const SUMMARIZER_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that creates concise conversation summaries.";

/// System prompt for query reformulation.
pub const REFORMULATOR_SYSTEM_PROMPT: &str = "You are a query reformulation expert.";

/// System prompt for query classification.
pub const CLASSIFIER_SYSTEM_PROMPT: &str =
    "You are a query classification expert. Always respond with valid JSON.";

/// System prompt for the adaptive task planner.
pub const PLANNER_SYSTEM_PROMPT: &str = "You are an adaptive task planning agent. Based on new information you gather, you can modify your task plan by adding new tasks, removing unnecessary tasks, or updating existing ones. You are pragmatic and efficient - you stop when you have enough information to answer the user's query.";

/// System prompt for vision-based page selection.
pub const SELECTOR_SYSTEM_PROMPT: &str = "You are a document page selection expert. You analyze page images to select the most relevant pages for answering specific questions using vision analysis.";

/// System prompt for per-task page analysis.
pub const ANALYST_SYSTEM_PROMPT: &str = "You are an AI assistant that helps users understand and analyze their documents.
You will be shown actual document pages as images. Analyze these images carefully and provide accurate, helpful responses based on what you see.
Always cite which documents/pages you're referencing in your response.";

/// System prompt for final response synthesis.
pub const SYNTHESIZER_SYSTEM_PROMPT: &str = "You are an expert at synthesizing complex document analysis results.
You excel at combining multiple findings into coherent, comprehensive responses that address all aspects of the user's query.";

/// Builds the user message for conversation summarization.
#[must_use]
pub fn build_summarization_prompt(conversation_text: &str) -> String {
    format!(
        "Summarize the following conversation, focusing on:\n\
         1. The main topics discussed\n\
         2. Key questions asked by the user\n\
         3. Important information or conclusions\n\
         4. Any unresolved questions or ongoing discussions\n\n\
         Keep the summary concise but comprehensive.\n\n\
         Conversation:\n{conversation_text}\n\n\
         Summary:"
    )
}

/// Builds the user message for query reformulation.
#[must_use]
pub fn build_reformulation_prompt(conversation_context: &str, current_query: &str) -> String {
    format!(
        r#"Your task is to resolve references in the current query to make it suitable for document search.

Create a reformulated query that:
1. Resolves pronouns (e.g., "it", "this", "that") to their actual subjects from context
2. Keeps the query SHORT and focused ONLY on the current question's intent
3. Does NOT include previous questions or combine multiple intents
4. Expands unclear abbreviations if needed
5. If the query is already clear and specific, return it unchanged

IMPORTANT RULES:
- Focus on what the user is asking NOW, not what they asked before
- Only add context needed to understand references
- Keep the query concise for optimal document search

EXAMPLES:

Example 1:
Context: User asked about "machine learning model performance"
Current: "What about its accuracy?"
Output:
{{"reformulated_query": "What is the machine learning model accuracy?"}}

Example 2:
Current: "Tell me more about the benefits"
Output:
{{"reformulated_query": "Tell me more about the benefits"}}

Example 3:
Context: User discussed "2023 quarterly report"
Current: "Compare it with last year"
Output:
{{"reformulated_query": "Compare 2023 quarterly report with 2022"}}

----------------
CONVERSATION CONTEXT:
{conversation_context}

CURRENT QUERY: {current_query}
----------------

Return a JSON object with the reformulated query. Output only valid JSON and do not include any other text or even backticks like ```json."#
    )
}

/// Builds the user message for query classification.
#[must_use]
pub fn build_classification_prompt(query: &str) -> String {
    format!(
        r#"Analyze the user's query and determine if it needs document retrieval to answer.

Think about whether this query requires searching through documents to provide a complete answer, or if it can be answered directly without documents.

OUTPUT FORMAT (JSON only):
{{
  "reasoning": "Brief explanation of why this query does or doesn't need documents",
  "needs_documents": true/false
}}

Examples:

Query: "What were the Q3 revenues?"
{{
  "reasoning": "This asks for specific financial data that would be found in documents",
  "needs_documents": true
}}

Query: "Hello, how are you?"
{{
  "reasoning": "This is a greeting that doesn't require any document information",
  "needs_documents": false
}}

Query: "Summarize the main findings"
{{
  "reasoning": "This requires extracting and summarizing information from documents",
  "needs_documents": true
}}
----------------
QUERY: {query}
----------------

Analyze the query and return only valid JSON and do not include any other text or even backticks like ```json."#
    )
}

/// Builds the user message for initial task planning.
#[must_use]
pub fn build_initial_plan_prompt(query: &str, documents: &str) -> String {
    format!(
        r#"You are creating an initial task plan for a document analysis query. Create the MINIMUM number of tasks (1-3) needed to gather distinct information to answer the user's question.

TASK CREATION RULES:
1. Create the FEWEST tasks possible - only create multiple tasks if they require fundamentally different information
2. Each task should retrieve DISTINCT information that cannot be found together
3. Avoid creating similar or overlapping tasks
4. Keep task names clear and under 30 characters
5. Task descriptions should be specific about what information to retrieve
6. For each task, specify which document is most relevant to search
7. Prefer one comprehensive task over multiple similar tasks
8. Do not mention the document name in the task's name or description

OUTPUT FORMAT:
Return a JSON object with a "tasks" array. Each task should have:
- "name": Short, clear task name
- "description": Specific description of what single piece of information to find
- "document": Single document ID that is most relevant for this task

EXAMPLE (Single Task):
Query: "What were our Q3 financial results?"
Available Documents:
doc_1: Q3 Financial Report
Summary: Comprehensive Q3 financial data including revenue breakdowns, operating expenses, and profit margins.

Output:
{{
  "tasks": [
    {{
      "name": "Get Q3 Financial Results",
      "description": "Retrieve all Q3 financial data including revenue, expenses, and profit figures",
      "document": "doc_1"
    }}
  ]
}}

EXAMPLE (Two Distinct Information Sources):
Query: "How do we implement user authentication and what are the security requirements?"
Available Documents:
doc_1: User Management API Documentation
Summary: API reference for user-related endpoints including registration, login, and password reset.

doc_2: Security Implementation Manual
Summary: Security guidelines including authentication methods, authorization protocols, and encryption standards.

Output:
{{
  "tasks": [
    {{
      "name": "Get Auth Implementation",
      "description": "Retrieve technical implementation details for user authentication system",
      "document": "doc_1"
    }},
    {{
      "name": "Get Security Requirements",
      "description": "Retrieve security standards and requirements for authentication",
      "document": "doc_2"
    }}
  ]
}}

----------------
User's query: {query}

AVAILABLE DOCUMENTS:
{documents}
----------------

Create your initial task plan now. Remember: use the MINIMUM number of tasks needed. Only create multiple tasks if they require fundamentally different information from different sources. Output only valid JSON and do not include any other text or even backticks like ```json, ONLY THE JSON."#
    )
}

/// Context for a plan-update prompt.
#[derive(Debug, Clone, Copy)]
pub struct PlanUpdateContext<'a> {
    /// The original (reformulated) query.
    pub original_query: &'a str,
    /// Catalogue of available documents.
    pub available_documents: &'a str,
    /// One status line per task in the current plan.
    pub current_plan_status: &'a str,
    /// Name of the task that just completed.
    pub completed_task_name: &'a str,
    /// Truncated findings from the completed task.
    pub task_findings: &'a str,
    /// Summary of completed tasks so far.
    pub progress_summary: &'a str,
}

/// Builds the user message for an adaptive plan update.
#[must_use]
pub fn build_plan_update_prompt(ctx: &PlanUpdateContext<'_>) -> String {
    format!(
        r#"You are an adaptive agent updating your task plan based on new information. Analyze what you've learned and decide if you need to modify your remaining tasks.

DECISION RULES:
1. CONTINUE UNCHANGED: If you're on track and remaining tasks are still relevant
2. ADD NEW TASKS: If you discovered you need more specific information
3. REMOVE TASKS: If completed tasks already answered what remaining tasks were meant to find
4. MODIFY TASKS: If remaining tasks need to be more focused or different

Based on your latest findings, what should you do with your task plan?

OUTPUT FORMAT - Choose ONE:

Option 1 - Continue unchanged:
{{
  "action": "continue",
  "reason": "Brief explanation why current plan is still good"
}}

Option 2 - Add new tasks:
{{
  "action": "add_tasks",
  "reason": "Why new tasks are needed",
  "new_tasks": [
    {{
      "name": "Task name",
      "description": "What this new task should find",
      "document": "document_id_to_search"
    }}
  ]
}}

Option 3 - Remove tasks:
{{
  "action": "remove_tasks",
  "reason": "Why these tasks are no longer needed",
  "tasks_to_remove": ["task_id_1", "task_id_2"]
}}

Option 4 - Modify tasks:
{{
  "action": "modify_tasks",
  "reason": "Why tasks need to be changed",
  "modified_tasks": [
    {{
      "task_id": "existing_task_id",
      "new_name": "Updated name",
      "new_description": "Updated description",
      "new_document": "new_document_id_to_search"
    }}
  ]
}}

----------------
ORIGINAL QUERY: {original_query}

AVAILABLE DOCUMENTS:
{available_documents}

CURRENT TASK PLAN STATUS:
{current_plan_status}

LATEST TASK COMPLETED:
Task: {completed_task_name}
Findings: {task_findings}

PROGRESS SO FAR:
{progress_summary}
----------------

Analyze your situation and decide what to do. Output only valid JSON and do not include any other text or even backticks like ```json."#,
        original_query = ctx.original_query,
        available_documents = ctx.available_documents,
        current_plan_status = ctx.current_plan_status,
        completed_task_name = ctx.completed_task_name,
        task_findings = ctx.task_findings,
        progress_summary = ctx.progress_summary,
    )
}

/// Builds the text portion of the page-selection vision request.
///
/// `max_pages` is a recommendation to the model, not an enforced cap.
#[must_use]
pub fn build_page_selection_prompt(
    task_name: &str,
    task_description: &str,
    max_pages: usize,
) -> String {
    format!(
        r#"Analyze these document page images and select the most relevant pages for this query:

Look at each page image carefully and determine which pages are most likely to contain information that would help answer the query. Consider:
1. Text content visible in the page
2. Charts, graphs, tables, or diagrams that might be relevant
3. Headers, titles, or section names that relate to the query
4. Overall page structure and content type
5. Try to focus on the query and look for the pages that contain the most relevant information only
6. Do not use more than {max_pages} pages in your selection

Select all pages that are relevant - don't limit yourself to a specific number if multiple pages are needed.

Return a JSON object with the page numbers that are most relevant:
{{"selected_pages": [1, 3, 7]}}
----------------
Query: {task_name}
Query Description: {task_description}
----------------
Output only valid JSON and do not include any other text or even backticks like ```json. Here are the page images to analyze:"#
    )
}

/// Builds the text portion of the per-task analysis vision request.
#[must_use]
pub fn build_task_analysis_prompt(task_description: &str, memory_summary: &str) -> String {
    format!(
        "You are analyzing specific documents to complete a focused task as part of a larger analysis.\n\n\
         CURRENT TASK: {task_description}\n\n\
         {memory_summary}\n\n\
         ANALYSIS GUIDELINES:\n\
         1. Focus ONLY on information relevant to this specific task\n\
         2. Extract concrete data, facts, and findings from the documents\n\
         3. Be specific - include numbers, dates, names, and other precise details\n\
         4. If the documents don't contain relevant information, clearly state that\n\
         5. Organize your findings in a structured way\n\n\
         IMPORTANT:\n\
         - This is one task in a multi-step analysis - stay focused on just this task\n\
         - Your findings will be combined with other task results later\n\
         - Be thorough but concise - extract key information without unnecessary detail\n\
         - Always cite which document pages you're referencing\n\n\
         Please analyze the document images below and provide a detailed answer for this specific task."
    )
}

/// Builds the user message for final response synthesis.
#[must_use]
pub fn build_synthesis_prompt(original_query: &str, results_text: &str) -> String {
    format!(
        "Your job is to answer the user's specific question using the analysis results provided.\n\n\
         ORIGINAL USER QUERY: {original_query}\n\n\
         ANALYSIS RESULTS:\n{results_text}\n\n\
         INSTRUCTIONS:\n\
         - Answer ONLY what the user asked\n\
         - Use ONLY information from the analysis results\n\
         - Be conversational and natural in your response\n\
         - Be direct and concise - don't over-explain\n\
         - Never mention sources, citations, documents, or where information came from\n\
         - If the analysis doesn't contain enough information to answer the query, say so clearly\n\
         - Don't add extra context or background unless directly relevant to the query\n\
         - Write as if you naturally know this information\n\n\
         Answer the user's question now."
    )
}

/// Builds the formatted results block fed to the synthesizer.
#[must_use]
pub fn build_results_text(results: &[crate::model::TaskResult]) -> String {
    let mut text = String::new();
    for (i, result) in results.iter().enumerate() {
        let _ = write!(
            text,
            "TASK {n}: {name}\nDescription: {description}\nAnalysis: {analysis}\n\n---\n",
            n = i + 1,
            name = result.task.name,
            description = result.task.description,
            analysis = result.analysis,
        );
    }
    text
}

/// Default prompt directory under user config.
const DEFAULT_PROMPT_DIR: &str = ".config/visrag-rs/prompts";

const SUMMARIZER_FILENAME: &str = "summarizer.md";
/// Filename for the reformulator prompt template.
const REFORMULATOR_FILENAME: &str = "reformulator.md";
/// Filename for the classifier prompt template.
const CLASSIFIER_FILENAME: &str = "classifier.md";
/// Filename for the planner prompt template.
const PLANNER_FILENAME: &str = "planner.md";
/// Filename for the selector prompt template.
const SELECTOR_FILENAME: &str = "selector.md";
/// Filename for the analyst prompt template.
const ANALYST_FILENAME: &str = "analyst.md";
/// Filename for the synthesizer prompt template.
const SYNTHESIZER_FILENAME: &str = "synthesizer.md";

/// A set of system prompts for all pipeline stages.
///
/// Loaded from external template files when available, falling back to
/// compiled-in defaults. Use [`PromptSet::load`] to resolve the prompt
/// directory from configuration, environment, or the default path.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// System prompt for conversation summarization.
    pub summarizer: String,
    /// System prompt for query reformulation.
    pub reformulator: String,
    /// System prompt for query classification.
    pub classifier: String,
    /// System prompt for task planning (initial and updates).
    pub planner: String,
    /// System prompt for page selection.
    pub selector: String,
    /// System prompt for per-task page analysis.
    pub analyst: String,
    /// System prompt for final synthesis.
    pub synthesizer: String,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in
    /// defaults.
    ///
    /// Resolution order for the directory:
    /// 1. Explicit `prompt_dir` argument (from configuration)
    /// 2. `VISRAG_PROMPT_DIR` environment variable
    /// 3. `~/.config/visrag-rs/prompts/`
    ///
    /// Each file is loaded independently — a missing file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(std::path::PathBuf::from)
            .or_else(|| {
                std::env::var("VISRAG_PROMPT_DIR")
                    .ok()
                    .map(std::path::PathBuf::from)
            })
            .or_else(|| dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR)));

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            summarizer: load_file(SUMMARIZER_FILENAME, SUMMARIZER_SYSTEM_PROMPT),
            reformulator: load_file(REFORMULATOR_FILENAME, REFORMULATOR_SYSTEM_PROMPT),
            classifier: load_file(CLASSIFIER_FILENAME, CLASSIFIER_SYSTEM_PROMPT),
            planner: load_file(PLANNER_FILENAME, PLANNER_SYSTEM_PROMPT),
            selector: load_file(SELECTOR_FILENAME, SELECTOR_SYSTEM_PROMPT),
            analyst: load_file(ANALYST_FILENAME, ANALYST_SYSTEM_PROMPT),
            synthesizer: load_file(SYNTHESIZER_FILENAME, SYNTHESIZER_SYSTEM_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            summarizer: SUMMARIZER_SYSTEM_PROMPT.to_string(),
            reformulator: REFORMULATOR_SYSTEM_PROMPT.to_string(),
            classifier: CLASSIFIER_SYSTEM_PROMPT.to_string(),
            planner: PLANNER_SYSTEM_PROMPT.to_string(),
            selector: SELECTOR_SYSTEM_PROMPT.to_string(),
            analyst: ANALYST_SYSTEM_PROMPT.to_string(),
            synthesizer: SYNTHESIZER_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten — use this for initial scaffolding only.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<std::path::PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (SUMMARIZER_FILENAME, SUMMARIZER_SYSTEM_PROMPT),
            (REFORMULATOR_FILENAME, REFORMULATOR_SYSTEM_PROMPT),
            (CLASSIFIER_FILENAME, CLASSIFIER_SYSTEM_PROMPT),
            (PLANNER_FILENAME, PLANNER_SYSTEM_PROMPT),
            (SELECTOR_FILENAME, SELECTOR_SYSTEM_PROMPT),
            (ANALYST_FILENAME, ANALYST_SYSTEM_PROMPT),
            (SYNTHESIZER_FILENAME, SYNTHESIZER_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    ///
    /// Returns `None` if the home directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<std::path::PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentTask, Page, TaskResult};

    #[test]
    fn test_classification_prompt_embeds_query() {
        let prompt = build_classification_prompt("What were Q3 revenues?");
        assert!(prompt.contains("QUERY: What were Q3 revenues?"));
        assert!(prompt.contains("needs_documents"));
    }

    #[test]
    fn test_page_selection_prompt_recommends_cap() {
        let prompt = build_page_selection_prompt("Find CEO", "locate the CEO name", 6);
        assert!(prompt.contains("Do not use more than 6 pages"));
        assert!(prompt.contains("selected_pages"));
        assert!(prompt.contains("Query: Find CEO"));
    }

    #[test]
    fn test_results_text_numbering() {
        let results = vec![
            TaskResult {
                task: AgentTask::new("First", "a", "doc_1"),
                selected_pages: vec![Page::new(1, "p1.jpg")],
                analysis: "found A".to_string(),
            },
            TaskResult {
                task: AgentTask::new("Second", "b", "doc_2"),
                selected_pages: Vec::new(),
                analysis: "found B".to_string(),
            },
        ];
        let text = build_results_text(&results);
        assert!(text.contains("TASK 1: First"));
        assert!(text.contains("TASK 2: Second"));
        assert!(text.contains("Analysis: found B"));
    }

    #[test]
    fn test_prompt_set_defaults() {
        let prompts = PromptSet::defaults();
        assert!(prompts.classifier.contains("valid JSON"));
        assert!(prompts.planner.contains("adaptive task planning"));
    }

    #[test]
    fn test_plan_update_prompt_sections() {
        let ctx = PlanUpdateContext {
            original_query: "q",
            available_documents: "doc_1: Report",
            current_plan_status: "- Task A: completed",
            completed_task_name: "Task A",
            task_findings: "revenue was up",
            progress_summary: "✓ Task A",
        };
        let prompt = build_plan_update_prompt(&ctx);
        assert!(prompt.contains("ORIGINAL QUERY: q"));
        assert!(prompt.contains("Task: Task A"));
        assert!(prompt.contains("\"action\": \"modify_tasks\""));
    }
}
