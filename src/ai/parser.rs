//! Best-effort extraction of structured fields from free-form model text.
//!
//! Model output has no guaranteed shape, so every function here degrades to a
//! documented fallback instead of failing. The one exception is
//! [`parse_problem_info`], whose JSON is a hard requirement of the pipeline.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AiResult, ErrorKind, ProviderError};
use crate::processing::{DebugPayload, ProblemInfo, SolutionPayload};

pub const DEFAULT_THOUGHT: &str = "Solution approach based on efficiency and readability";
pub const DEFAULT_DEBUG_THOUGHT: &str = "Debug analysis based on your screenshots";
pub const DEFAULT_DEBUG_CODE: &str = "// Debug mode - see analysis below";
pub const DEFAULT_TIME_COMPLEXITY: &str = "O(n) - Linear time complexity because we only iterate through the array once. Each element is processed exactly one time, and the hashmap lookups are O(1) operations.";
pub const DEFAULT_SPACE_COMPLEXITY: &str = "O(n) - Linear space complexity because we store elements in the hashmap. In the worst case, we might need to store all elements before finding the solution pair.";
pub const MISSING_NOTATION_PREFIX: &str = "O(n) - ";
pub const NOT_APPLICABLE: &str = "N/A";
pub const MAX_DEBUG_THOUGHTS: usize = 5;

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```([\s\S]*?)```").unwrap());
static LANGUAGE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_+#.\-]*[ \t]*\r?$").unwrap());
static RATIONALE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:thoughts|key insights|reasoning|approach):").unwrap());
static TIME_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)time\s+complexity\s*\**\s*:").unwrap());
static SPACE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)space\s+complexity\s*\**\s*:").unwrap());
static SECTION_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:time\s+complexity|space\s+complexity)\s*\**\s*:|(?:thoughts|key insights|reasoning|approach):",
    )
    .unwrap()
});
static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:[-*•]|\d+[.)])[ \t]+(.+)$").unwrap());
static MARKER_ONLY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s*#\-•\d.)]*$").unwrap());
static BIG_O: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bO\([^)]+\)").unwrap());
static HEADING_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}\s").unwrap());

static DEBUG_SECTIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)issues identified|issues found|problems found|bugs found").unwrap(),
            "## Issues Identified",
        ),
        (
            Regex::new(r"(?i)code improvements|suggested changes|improvements").unwrap(),
            "## Code Improvements",
        ),
        (
            Regex::new(r"(?i)performance improvements|optimizations").unwrap(),
            "## Optimizations",
        ),
        (
            Regex::new(r"(?i)detailed analysis|explanation").unwrap(),
            "## Explanation",
        ),
    ]
});

/// Contents of the first fenced block, or the whole text when there is none.
pub fn extract_code(text: &str) -> String {
    first_fenced_block(text).unwrap_or_else(|| text.trim().to_string())
}

fn first_fenced_block(text: &str) -> Option<String> {
    let inner = FENCE.captures(text)?.get(1)?.as_str();
    let body = match inner.split_once('\n') {
        Some((first_line, rest)) if LANGUAGE_TAG.is_match(first_line) => rest,
        _ => inner,
    };
    Some(body.trim().to_string())
}

/// List items under the rationale heading, falling back to its plain lines and
/// finally to [`DEFAULT_THOUGHT`].
pub fn extract_thoughts(text: &str) -> Vec<String> {
    let thoughts = RATIONALE_HEADING
        .find(text)
        .map(|heading| {
            let rest = &text[heading.end()..];
            let end = TIME_LABEL.find(rest).map(|m| m.start()).unwrap_or(rest.len());
            let span = &rest[..end];

            let items = list_items(span);
            if items.is_empty() {
                span.lines()
                    .map(clean_line)
                    .filter(|line| !line.is_empty())
                    .collect()
            } else {
                items
            }
        })
        .unwrap_or_default();

    if thoughts.is_empty() {
        vec![DEFAULT_THOUGHT.to_string()]
    } else {
        thoughts
    }
}

fn list_items(text: &str) -> Vec<String> {
    LIST_ITEM
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| clean_line(m.as_str()))
        .filter(|item| !item.is_empty())
        .collect()
}

fn clean_line(line: &str) -> String {
    line.trim().trim_matches('*').trim().to_string()
}

/// Text following `label` up to the next labeled section or end of text.
fn labeled_span(text: &str, label: &Regex) -> Option<String> {
    let found = label.find(text)?;
    let rest = &text[found.end()..];
    let end = SECTION_LABEL
        .find(rest)
        .map(|m| m.start())
        .unwrap_or(rest.len());

    let joined = rest[..end]
        .lines()
        .filter(|line| !MARKER_ONLY_LINE.is_match(line))
        .map(clean_line)
        .collect::<Vec<_>>()
        .join(" ");
    let joined = joined.trim().to_string();
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

pub fn extract_time_complexity(text: &str) -> String {
    labeled_span(text, &TIME_LABEL)
        .map(|span| normalize_complexity(&span))
        .unwrap_or_else(|| DEFAULT_TIME_COMPLEXITY.to_string())
}

pub fn extract_space_complexity(text: &str) -> String {
    labeled_span(text, &SPACE_LABEL)
        .map(|span| normalize_complexity(&span))
        .unwrap_or_else(|| DEFAULT_SPACE_COMPLEXITY.to_string())
}

/// Guarantees a Big-O token and a `<notation> - <explanation>` shape.
pub fn normalize_complexity(raw: &str) -> String {
    let raw = raw.trim();
    let Some(notation) = BIG_O.find(raw) else {
        return format!("{}{}", MISSING_NOTATION_PREFIX, raw);
    };

    let has_explanation = raw.contains(['-', '–', '—']) || raw.to_lowercase().contains("because");
    if has_explanation {
        return raw.to_string();
    }

    let notation_text = notation.as_str();
    let remainder = format!("{}{}", &raw[..notation.start()], &raw[notation.end()..]);
    let remainder = remainder.trim().trim_start_matches([',', ':', ';']).trim();
    if remainder.is_empty() {
        notation_text.to_string()
    } else {
        format!("{} - {}", notation_text, remainder)
    }
}

pub fn parse_solution(text: &str) -> SolutionPayload {
    SolutionPayload {
        code: extract_code(text),
        thoughts: extract_thoughts(text),
        time_complexity: extract_time_complexity(text),
        space_complexity: extract_space_complexity(text),
    }
}

/// Inserts canonical section headings when the model did not use any.
pub fn structure_debug_analysis(text: &str) -> String {
    if HEADING_MARKER.is_match(text) {
        return text.to_string();
    }
    DEBUG_SECTIONS
        .iter()
        .fold(text.to_string(), |acc, (pattern, heading)| {
            insert_heading(&acc, pattern, heading)
        })
}

fn insert_heading(text: &str, pattern: &Regex, heading: &str) -> String {
    let Some(found) = pattern.find(text) else {
        return text.to_string();
    };
    let before = &text[..found.start()];
    let after = &text[found.end()..];
    let after = after
        .strip_prefix(':')
        .unwrap_or(after)
        .trim_start_matches([' ', '\t']);

    let mut out = String::with_capacity(text.len() + heading.len() + 2);
    out.push_str(before);
    if !before.is_empty() && !before.trim_end_matches([' ', '\t']).ends_with('\n') {
        out.push('\n');
    }
    out.push_str(heading);
    if !after.is_empty() && !after.starts_with('\n') {
        out.push('\n');
    }
    out.push_str(after);
    out
}

/// Up to [`MAX_DEBUG_THOUGHTS`] list items from anywhere in the analysis.
pub fn extract_debug_thoughts(text: &str) -> Vec<String> {
    let mut items = list_items(text);
    items.truncate(MAX_DEBUG_THOUGHTS);
    if items.is_empty() {
        vec![DEFAULT_DEBUG_THOUGHT.to_string()]
    } else {
        items
    }
}

pub fn extract_debug_code(text: &str) -> String {
    first_fenced_block(text).unwrap_or_else(|| DEFAULT_DEBUG_CODE.to_string())
}

pub fn parse_debug(text: &str) -> DebugPayload {
    let debug_analysis = structure_debug_analysis(text);
    DebugPayload {
        code: extract_debug_code(text),
        thoughts: extract_debug_thoughts(&debug_analysis),
        debug_analysis,
        time_complexity: NOT_APPLICABLE.to_string(),
        space_complexity: NOT_APPLICABLE.to_string(),
    }
}

/// Reads the extraction-stage JSON, tolerating code fences and surrounding prose.
pub fn parse_problem_info(text: &str) -> AiResult<ProblemInfo> {
    let stripped = text.replace("```json", "").replace("```", "");
    let stripped = stripped.trim();

    serde_json::from_str(stripped)
        .or_else(|first_err| match (stripped.find('{'), stripped.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str(&stripped[start..=end]).map_err(|_| first_err)
            }
            _ => Err(first_err),
        })
        .map_err(|e| {
            log::warn!("Problem info JSON did not parse: {}", e);
            ProviderError::new(
                ErrorKind::ParseFailure,
                "Failed to parse problem information. Please try again or use clearer screenshots.",
            )
        })
}
