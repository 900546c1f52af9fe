//! Shared response-parsing helpers.

/// Strips markdown code fences from a model response, if present.
///
/// Models occasionally wrap JSON in ```` ```json ```` fences despite
/// instructions not to; every stage parser tolerates this.
#[must_use]
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    }
}
