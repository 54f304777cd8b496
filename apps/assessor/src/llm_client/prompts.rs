// Shared prompt fragments.
// The assessment module defines its own prompts.rs alongside it; this file
// holds the canonical output shape that both the primary and the repair
// instructions demand, so the two can never drift apart.

/// Label of the explanation line.
pub const EXPLANATION_LABEL: &str = "Explanation of assessment possibility";

/// The verdict line as it must appear, with both allowed values.
pub const CANONICAL_VERDICT_LINE: &str = "Assessment disease likelihood: Possible|Not Possible";

/// System role for the repair pass.
pub const STRICT_FORMATTER_SYSTEM: &str = "You strictly format text.";

/// Renders the explanation line with a placeholder, e.g. `<text>`.
pub fn canonical_explanation_line(placeholder: &str) -> String {
    format!("{EXPLANATION_LABEL}: {placeholder}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_lines() {
        assert!(CANONICAL_VERDICT_LINE.starts_with("Assessment disease likelihood: "));
        assert_eq!(
            canonical_explanation_line("<text>"),
            "Explanation of assessment possibility: <text>"
        );
    }
}
