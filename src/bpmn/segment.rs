//! Prompt segmentation
//!
//! Heuristically splits a free-text process description into short step labels.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum number of steps extracted from a prompt
pub const MAX_STEPS: usize = 8;

/// Parts with this many characters or fewer are discarded
const MIN_STEP_LEN: usize = 4;

/// Maximum length of a slug
const MAX_SLUG_LEN: usize = 50;

static STEP_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\n|,| then | and then | -> | after ").expect("valid separator regex")
});

static ENUMERATION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[.)]\s*").expect("valid enumeration regex"));

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// Split a prompt into at most [`MAX_STEPS`] step labels
///
/// Separators are newlines, commas and the words "then", "and then", "->" and
/// "after" (case-insensitive, surrounded by spaces). Leading enumerations such
/// as `1.` or `2)` are removed.
pub fn parse_steps_from_prompt(prompt: &str) -> Vec<String> {
    STEP_SEPARATOR
        .split(prompt)
        .map(|part| ENUMERATION_PREFIX.replace(part, "").trim().to_string())
        .filter(|part| part.chars().count() > MIN_STEP_LEN)
        .take(MAX_STEPS)
        .collect()
}

/// Turn arbitrary text into an identifier fragment
///
/// Returns `"process"` when nothing usable is left.
pub fn slugify(value: &str) -> String {
    let lowered = value.to_lowercase();
    let replaced = NON_SLUG_CHARS.replace_all(&lowered, "_");
    let trimmed = replaced.strip_prefix('_').unwrap_or(&replaced);
    let trimmed = trimmed.strip_suffix('_').unwrap_or(trimmed);

    let slug: String = trimmed.chars().take(MAX_SLUG_LEN).collect();
    if slug.is_empty() {
        "process".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_commas_and_words() {
        let steps = parse_steps_from_prompt(
            "Receive order, check stock then ship package and then send invoice",
        );
        assert_eq!(
            steps,
            vec!["Receive order", "check stock", "ship package", "send invoice"]
        );
    }

    #[test]
    fn test_split_is_case_insensitive() {
        let steps = parse_steps_from_prompt("Collect forms THEN Verify identity AFTER Archive file");
        assert_eq!(steps, vec!["Collect forms", "Verify identity", "Archive file"]);
    }

    #[test]
    fn test_arrow_and_newlines() {
        let steps = parse_steps_from_prompt("Draft contract -> Legal review\nSign contract");
        assert_eq!(steps, vec!["Draft contract", "Legal review", "Sign contract"]);
    }

    #[test]
    fn test_enumeration_prefix_removed() {
        let steps = parse_steps_from_prompt("1. Submit claim\n2) Assess damage\n3.   Pay out");
        assert_eq!(steps, vec!["Submit claim", "Assess damage", "Pay out"]);
    }

    #[test]
    fn test_short_parts_dropped() {
        // "Pay" and "ok" are too short, "abcd" is exactly four characters
        let steps = parse_steps_from_prompt("Pay, ok, abcd, abcde, Refund customer");
        assert_eq!(steps, vec!["abcde", "Refund customer"]);
        assert!(steps.iter().all(|s| s.chars().count() > 4));
    }

    #[test]
    fn test_never_more_than_eight_steps() {
        let prompt = (1..=20)
            .map(|i| format!("Step number {}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let steps = parse_steps_from_prompt(&prompt);
        assert_eq!(steps.len(), MAX_STEPS);
        assert_eq!(steps[0], "Step number 1");
        assert_eq!(steps[7], "Step number 8");
    }

    #[test]
    fn test_empty_prompt() {
        assert!(parse_steps_from_prompt("").is_empty());
        assert!(parse_steps_from_prompt(" , ,\n").is_empty());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("New Flowable Process"), "new_flowable_process");
        assert_eq!(slugify("  Order -> Ship!  "), "order_ship");
        assert_eq!(slugify("!!!"), "process");
        assert_eq!(slugify(""), "process");
    }

    #[test]
    fn test_slugify_truncates() {
        let slug = slugify(&"a".repeat(80));
        assert_eq!(slug.len(), 50);
    }
}
