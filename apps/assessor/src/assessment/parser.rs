//! Response Parser: pulls the verdict and rationale out of free model text.
//!
//! Matching is ordered: the first verdict pattern that matches wins, and
//! independently the first explanation pattern that matches wins. Every
//! pattern tolerates case, extra whitespace, light markdown emphasis and the
//! historical `assesment` / `likelyhood` misspellings of the canonical labels.
//!
//! A response with no recognizable verdict parses to `(None, None)`, which is
//! the signal for the repair pass. It is a value, not an error.

use lazy_static::lazy_static;
use regex::Regex;

use crate::assessment::models::AssessmentVerdict;

lazy_static! {
    static ref VERDICT_PATTERNS: Vec<Regex> = vec![
        // Assessment disease likelihood: Possible | Not Possible
        Regex::new(
            r"(?im)^[\s*_#>-]*assess?ment\s+disease\s+likel[iy]hood[\s*_]*:[\s*_]*(possible|not\s*possible)\b"
        )
        .unwrap(),
        // Feasibility: ... / Screening assessment: ...
        Regex::new(
            r"(?im)^[\s*_#>-]*(?:feasibility|screening)(?:\s+assess?ment)?[\s*_]*:[\s*_]*(possible|not\s*possible)\b"
        )
        .unwrap(),
    ];
    static ref EXPLANATION_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?is)explanation\s+of\s+assess?ment\s+possibility[\s*_]*:[\s*_]*(.+)$").unwrap(),
        Regex::new(r"(?is)explanation[\s*_]*:[\s*_]*(.+)$").unwrap(),
        Regex::new(r"(?is)rationale[\s*_]*:[\s*_]*(.+)$").unwrap(),
    ];
}

/// Outcome of parsing one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub verdict: Option<AssessmentVerdict>,
    pub reasoning: Option<String>,
}

impl ParsedResponse {
    const UNPARSEABLE: ParsedResponse = ParsedResponse {
        verdict: None,
        reasoning: None,
    };

    /// `Some` only when both parts are present.
    pub fn resolved(self) -> Option<(AssessmentVerdict, String)> {
        match (self.verdict, self.reasoning) {
            (Some(verdict), Some(reasoning)) => Some((verdict, reasoning)),
            _ => None,
        }
    }
}

pub fn parse_response(raw_text: &str) -> ParsedResponse {
    if raw_text.trim().is_empty() {
        return ParsedResponse::UNPARSEABLE;
    }

    let normalized = raw_text.replace('\u{a0}', " ");

    let Some(verdict) = match_verdict(&normalized) else {
        return ParsedResponse::UNPARSEABLE;
    };

    let reasoning = match_explanation(&normalized)
        .unwrap_or_else(|| collapse_whitespace(&normalized));

    ParsedResponse {
        verdict: Some(verdict),
        reasoning: Some(reasoning),
    }
}

fn match_verdict(text: &str) -> Option<AssessmentVerdict> {
    VERDICT_PATTERNS.iter().find_map(|pattern| {
        pattern.captures(text).map(|caps| {
            let value: String = caps[1]
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            if value.starts_with("not") {
                AssessmentVerdict::NotPossible
            } else {
                AssessmentVerdict::Possible
            }
        })
    })
}

/// First matching explanation, whitespace-collapsed. A match that collapses
/// to nothing counts as no match.
fn match_explanation(text: &str) -> Option<String> {
    EXPLANATION_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .map(|caps| collapse_whitespace(&caps[1]))
            .filter(|explanation| !explanation.is_empty())
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = "Assessment disease likelihood: Not Possible\n\
        Explanation of assessment possibility: insufficient coagulation panel.";

    #[test]
    fn test_parses_canonical_output() {
        let parsed = parse_response(CANONICAL);
        assert_eq!(parsed.verdict, Some(AssessmentVerdict::NotPossible));
        assert_eq!(
            parsed.reasoning.as_deref(),
            Some("insufficient coagulation panel.")
        );
    }

    #[test]
    fn test_parsing_is_idempotent() {
        assert_eq!(parse_response(CANONICAL), parse_response(CANONICAL));
    }

    #[test]
    fn test_verdict_is_case_insensitive() {
        let upper = parse_response("ASSESSMENT DISEASE LIKELIHOOD: POSSIBLE");
        let mixed = parse_response("Assessment disease likelihood: Possible");
        assert_eq!(upper.verdict, Some(AssessmentVerdict::Possible));
        assert_eq!(upper.verdict, mixed.verdict);
    }

    #[test]
    fn test_tolerates_historical_misspellings() {
        let parsed = parse_response(
            "Assesment disease likelyhood: Possible\n\
             Explanation of assesment possibility: CBC differential covers the key signals.",
        );
        assert_eq!(parsed.verdict, Some(AssessmentVerdict::Possible));
        assert_eq!(
            parsed.reasoning.as_deref(),
            Some("CBC differential covers the key signals.")
        );
    }

    #[test]
    fn test_not_possible_without_space_and_extra_whitespace() {
        let parsed = parse_response("  assessment   disease likelihood :   notpossible");
        assert_eq!(parsed.verdict, Some(AssessmentVerdict::NotPossible));
    }

    #[test]
    fn test_non_breaking_spaces_are_normalized() {
        let parsed = parse_response(
            "Assessment\u{a0}disease likelihood:\u{a0}Not\u{a0}Possible\nExplanation: no\u{a0}ADAMTS13 assay.",
        );
        assert_eq!(parsed.verdict, Some(AssessmentVerdict::NotPossible));
        assert_eq!(parsed.reasoning.as_deref(), Some("no ADAMTS13 assay."));
    }

    #[test]
    fn test_markdown_emphasis_is_tolerated() {
        let parsed = parse_response(
            "**Assessment disease likelihood:** Possible\n\
             **Explanation of assessment possibility:** Hemoglobin and MCV available.",
        );
        assert_eq!(parsed.verdict, Some(AssessmentVerdict::Possible));
        assert_eq!(
            parsed.reasoning.as_deref(),
            Some("Hemoglobin and MCV available.")
        );
    }

    #[test]
    fn test_feasibility_label_is_a_fallback_verdict_pattern() {
        let parsed =
            parse_response("Feasibility assessment: Not possible\nRationale: lacks imaging.");
        assert_eq!(parsed.verdict, Some(AssessmentVerdict::NotPossible));
        assert_eq!(parsed.reasoning.as_deref(), Some("lacks imaging."));

        let parsed = parse_response("Screening: possible");
        assert_eq!(parsed.verdict, Some(AssessmentVerdict::Possible));
    }

    #[test]
    fn test_first_verdict_pattern_wins() {
        let parsed = parse_response(
            "Feasibility: Possible\nAssessment disease likelihood: Not Possible\nExplanation: x",
        );
        assert_eq!(parsed.verdict, Some(AssessmentVerdict::NotPossible));
    }

    #[test]
    fn test_explanation_is_whitespace_collapsed_across_lines() {
        let parsed = parse_response(
            "Assessment disease likelihood: Possible\n\
             Explanation of assessment possibility:   ferritin and\n   transferrin   saturation\n\nare listed.",
        );
        assert_eq!(
            parsed.reasoning.as_deref(),
            Some("ferritin and transferrin saturation are listed.")
        );
    }

    #[test]
    fn test_missing_explanation_falls_back_to_full_text() {
        let parsed = parse_response("Assessment disease likelihood: Possible\n  CBC is enough.");
        assert_eq!(parsed.verdict, Some(AssessmentVerdict::Possible));
        assert_eq!(
            parsed.reasoning.as_deref(),
            Some("Assessment disease likelihood: Possible CBC is enough.")
        );
    }

    #[test]
    fn test_empty_explanation_falls_back_to_full_text() {
        let parsed = parse_response("Assessment disease likelihood: Possible\nExplanation:   ");
        assert_eq!(
            parsed.reasoning.as_deref(),
            Some("Assessment disease likelihood: Possible Explanation:")
        );
    }

    #[test]
    fn test_unparseable_text_yields_none_none() {
        let parsed = parse_response("I cannot decide.");
        assert_eq!(parsed, ParsedResponse::UNPARSEABLE);
        assert!(parsed.resolved().is_none());
    }

    #[test]
    fn test_explanation_alone_is_still_unparseable() {
        let parsed = parse_response("Explanation: the panel lacks coagulation markers.");
        assert_eq!(parsed.verdict, None);
        assert_eq!(parsed.reasoning, None);
    }

    #[test]
    fn test_empty_text_is_unparseable() {
        assert_eq!(parse_response(""), ParsedResponse::UNPARSEABLE);
        assert_eq!(parse_response("  \n "), ParsedResponse::UNPARSEABLE);
    }

    #[test]
    fn test_verdict_must_be_a_whole_word() {
        assert_eq!(
            parse_response("Assessment disease likelihood: Possibleish").verdict,
            None
        );
    }
}
