//! Vision-based page selector.
//!
//! Selects relevant pages for a task by showing the model the candidate
//! page images themselves, tagged with 1-based ordinals, in a single
//! multimodal call. Candidates always come from one document (or one
//! fallback pool) — never the whole corpus — to bound call size and
//! relevance noise.

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::parse::strip_code_fences;
use super::prompt::build_page_selection_prompt;
use crate::error::AgentError;
use crate::model::Page;
use crate::provider::{
    ContentPart, ImageDetail, Provider, multimodal_user_message, system_message,
};

/// Max tokens for the selection call.
const SELECTION_MAX_TOKENS: u32 = 200;
/// Low temperature for consistent selection.
const SELECTION_TEMPERATURE: f32 = 0.1;

#[derive(Debug, Deserialize)]
struct Selection {
    selected_pages: Vec<serde_json::Value>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Selects relevant document pages by analyzing page images directly.
pub struct PageSelector {
    system_prompt: String,
    max_pages_hint: usize,
}

impl PageSelector {
    /// Creates a selector with the given system prompt and the page count
    /// recommended (not enforced) per selection.
    #[must_use]
    pub const fn new(system_prompt: String, max_pages_hint: usize) -> Self {
        Self {
            system_prompt,
            max_pages_hint,
        }
    }

    /// Selects the pages most relevant to a task from its candidate set.
    ///
    /// Every candidate image is included in one vision call at low detail,
    /// tagged with its 1-based ordinal. The response's ordinals are mapped
    /// back to pages in the model's order; out-of-range and non-integer
    /// entries are discarded, and duplicates collapse to their first
    /// occurrence so the result can never exceed the candidate set.
    ///
    /// An empty candidate set short-circuits to an empty selection without
    /// a provider call.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::PageSelection`] when the response is not valid
    /// JSON or contains zero valid ordinals. There is no fallback to
    /// "first N pages".
    pub async fn select_pages(
        &self,
        provider: &dyn Provider,
        task_name: &str,
        task_description: &str,
        candidates: &[Page],
    ) -> Result<Vec<Page>, AgentError> {
        if candidates.is_empty() {
            warn!(task = task_name, "no candidate pages offered for selection");
            return Ok(Vec::new());
        }

        info!(
            task = task_name,
            candidates = candidates.len(),
            "selecting pages via vision call"
        );

        let messages = vec![
            system_message(&self.system_prompt),
            multimodal_user_message(self.build_selection_parts(
                task_name,
                task_description,
                candidates,
            )),
        ];

        let response = provider
            .process_multimodal_messages(&messages, SELECTION_MAX_TOKENS, SELECTION_TEMPERATURE)
            .await?;

        let selected = Self::parse_selection(&response, candidates)?;
        info!(task = task_name, selected = selected.len(), "pages selected");
        Ok(selected)
    }

    /// Builds the multimodal content: instruction text followed by every
    /// candidate image at low detail, each tagged with its ordinal.
    fn build_selection_parts(
        &self,
        task_name: &str,
        task_description: &str,
        candidates: &[Page],
    ) -> Vec<ContentPart> {
        let mut parts = Vec::with_capacity(1 + candidates.len() * 2);
        parts.push(ContentPart::text(build_page_selection_prompt(
            task_name,
            task_description,
            self.max_pages_hint,
        )));

        for (i, page) in candidates.iter().enumerate() {
            parts.push(ContentPart::image(&page.image_path, ImageDetail::Low));
            parts.push(ContentPart::text(format!("[Page {}]", i + 1)));
        }

        parts
    }

    /// Maps the model's 1-based ordinals back to pages.
    fn parse_selection(response: &str, candidates: &[Page]) -> Result<Vec<Page>, AgentError> {
        let selection: Selection =
            serde_json::from_str(strip_code_fences(response)).map_err(|e| {
                AgentError::PageSelection {
                    message: format!("Invalid page selection JSON: {e}"),
                    content: response.to_string(),
                }
            })?;

        if let Some(reasoning) = &selection.reasoning {
            debug!(%reasoning, "selection reasoning");
        }

        let mut seen = std::collections::HashSet::new();
        let mut pages = Vec::new();
        for value in &selection.selected_pages {
            let Some(ordinal) = value.as_u64() else {
                debug!(?value, "discarding non-integer ordinal");
                continue;
            };
            let Ok(ordinal) = usize::try_from(ordinal) else {
                continue;
            };
            if ordinal < 1 || ordinal > candidates.len() {
                debug!(ordinal, "discarding out-of-range ordinal");
                continue;
            }
            if seen.insert(ordinal) {
                pages.push(candidates[ordinal - 1].clone());
            }
        }

        if pages.is_empty() {
            return Err(AgentError::PageSelection {
                message: "Model selected zero valid pages".to_string(),
                content: response.to_string(),
            });
        }

        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidates(n: u32) -> Vec<Page> {
        (1..=n).map(|i| Page::new(i, format!("p{i}.jpg"))).collect()
    }

    #[test]
    fn test_parse_maps_ordinals_in_model_order() {
        let pages = candidates(5);
        let selected =
            PageSelector::parse_selection(r#"{"selected_pages": [3, 1]}"#, &pages)
                .unwrap_or_else(|_| unreachable!());
        let paths: Vec<_> = selected.iter().map(|p| p.image_path.as_str()).collect();
        assert_eq!(paths, vec!["p3.jpg", "p1.jpg"]);
    }

    #[test]
    fn test_parse_discards_out_of_range_and_non_integers() {
        let pages = candidates(3);
        let selected = PageSelector::parse_selection(
            r#"{"selected_pages": [0, 2, 7, "two", 3.5, -1]}"#,
            &pages,
        )
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].image_path, "p2.jpg");
    }

    #[test]
    fn test_parse_deduplicates_ordinals() {
        let pages = candidates(2);
        let selected =
            PageSelector::parse_selection(r#"{"selected_pages": [2, 2, 1, 2]}"#, &pages)
                .unwrap_or_else(|_| unreachable!());
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].image_path, "p2.jpg");
    }

    #[test]
    fn test_parse_zero_valid_is_error() {
        let pages = candidates(3);
        let result = PageSelector::parse_selection(r#"{"selected_pages": [9, 10]}"#, &pages);
        assert!(matches!(result, Err(AgentError::PageSelection { .. })));
    }

    #[test]
    fn test_parse_invalid_json_is_error() {
        let pages = candidates(3);
        let result = PageSelector::parse_selection("pages 1 and 2 look good", &pages);
        assert!(matches!(result, Err(AgentError::PageSelection { .. })));
    }

    #[test]
    fn test_parse_accepts_optional_reasoning() {
        let pages = candidates(3);
        let selected = PageSelector::parse_selection(
            r#"{"selected_pages": [1], "reasoning": "page 1 has the table"}"#,
            &pages,
        )
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_selection_parts_tag_every_candidate() {
        let selector = PageSelector::new("select".to_string(), 6);
        let pages = candidates(3);
        let parts = selector.build_selection_parts("Find CEO", "locate the name", &pages);
        assert_eq!(parts.len(), 1 + 3 * 2);
        match &parts[2] {
            ContentPart::Text { text } => assert_eq!(text, "[Page 1]"),
            ContentPart::ImagePath { .. } => unreachable!("expected ordinal tag"),
        }
        match &parts[1] {
            ContentPart::ImagePath { detail, .. } => assert_eq!(*detail, ImageDetail::Low),
            ContentPart::Text { .. } => unreachable!("expected image part"),
        }
    }

    proptest! {
        /// Every page returned is a member of the candidate set, and the
        /// result never exceeds the number of candidates offered.
        #[test]
        fn prop_selection_subset_of_candidates(
            ordinals in proptest::collection::vec(-5i64..20, 1..12),
            n in 1u32..8,
        ) {
            let pages = candidates(n);
            let response = serde_json::json!({ "selected_pages": ordinals }).to_string();
            if let Ok(selected) = PageSelector::parse_selection(&response, &pages) {
                prop_assert!(selected.len() <= pages.len());
                for page in &selected {
                    prop_assert!(pages.iter().any(|c| c.image_path == page.image_path));
                }
            }
        }
    }
}
