//! Turns raw provider text into canonical payloads.
//!
//! Providers wrap JSON in markdown fences, prepend chatter, nest it under
//! `data`/`draft`, or rename fields. Every logical field is read through an
//! ordered list of candidate keys; list fields accept either a JSON array of
//! strings or one delimited string.

use super::types::{AiInsights, DecisionExplanation, JobDescriptionDraft, ReasonNormalization};
use serde::Serialize;
use serde_json::{Map, Value};

const WRAPPERS: &[&str] = &["data", "draft"];

const TITLE: &[&str] = &["titleSuggested", "title_suggested", "title"];
const RESPONSIBILITIES: &[&str] = &["responsibilities", "responsibility"];
const REQUIREMENTS: &[&str] = &["requirements", "requirement"];
const NICE_TO_HAVE: &[&str] = &["niceToHave", "nice_to_have", "niceToHaves", "nice_to_haves"];
const JOB_DESCRIPTION: &[&str] = &["jobDescription", "job_description", "description"];

const SUMMARY: &[&str] = &["summary"];
const INSIGHTS: &[&str] = &["insights", "insight"];
const ACTIONS: &[&str] = &[
    "recommendedActions",
    "recommended_actions",
    "recommendations",
    "actions",
];

const CATEGORY: &[&str] = &["category"];
const SUGGESTED_CODE: &[&str] = &[
    "suggestedLeaveTypeCode",
    "suggested_leave_type_code",
    "leaveTypeCode",
    "leave_type_code",
];

const EXPLANATION: &[&str] = &["explanation", "reason"];

/// A normalized payload and whether it met the use case's minimum content.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub valid: bool,
}

impl<T: Serialize> Normalized<T> {
    pub fn canonical_json(&self) -> Value {
        serde_json::to_value(&self.value).unwrap_or(Value::Null)
    }
}

impl<T: Default> Normalized<T> {
    fn unparseable() -> Self {
        Self {
            value: T::default(),
            valid: false,
        }
    }
}

/// Reads logical fields out of one JSON object.
pub struct SchemaReader<'a> {
    payload: &'a Map<String, Value>,
}

impl<'a> SchemaReader<'a> {
    /// Unwraps one level of `data`/`draft` when present.
    pub fn new(root: &'a Map<String, Value>) -> Self {
        let payload = WRAPPERS
            .iter()
            .find_map(|key| root.get(*key).and_then(Value::as_object))
            .unwrap_or(root);
        Self { payload }
    }

    /// First candidate holding a non-blank string, trimmed.
    pub fn string(&self, candidates: &[&str]) -> Option<String> {
        candidates.iter().find_map(|key| {
            self.payload
                .get(*key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    }

    /// First candidate that is an array or a string.
    pub fn string_list(&self, candidates: &[&str]) -> Vec<String> {
        for key in candidates {
            match self.payload.get(*key) {
                Some(Value::Array(items)) => {
                    return items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                Some(Value::String(text)) => return split_list(text),
                _ => continue,
            }
        }
        Vec::new()
    }
}

fn split_list(text: &str) -> Vec<String> {
    text.split(['\n', ';', ','])
        .map(|item| {
            item.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim()
                .to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Direct parse first, then the span between the first `{` and the last `}`.
pub fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    let text = strip_code_fences(raw);

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return Some(map);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Title used when the provider gives none or too short a one.
pub fn synthesized_title(role: &str, department: &str) -> String {
    let role = role.trim();
    let department = department.trim();
    match (role.is_empty(), department.is_empty()) {
        (true, true) => "Open Position".to_string(),
        (true, false) => format!("{department} Position"),
        (false, true) => role.to_string(),
        (false, false) => format!("{department} {role}"),
    }
}

pub fn job_description(raw: &str, role: &str, department: &str) -> Normalized<JobDescriptionDraft> {
    let Some(root) = parse_object(raw) else {
        return Normalized::unparseable();
    };
    let reader = SchemaReader::new(&root);

    let title_suggested = reader
        .string(TITLE)
        .filter(|title| title.split_whitespace().count() >= 3)
        .unwrap_or_else(|| synthesized_title(role, department));

    let value = JobDescriptionDraft {
        title_suggested,
        responsibilities: reader.string_list(RESPONSIBILITIES),
        requirements: reader.string_list(REQUIREMENTS),
        nice_to_have: reader.string_list(NICE_TO_HAVE),
        job_description: reader
            .string(JOB_DESCRIPTION)
            .map(|d| d.replace("\r\n", "\n"))
            .unwrap_or_default(),
    };

    let valid = value.job_description.contains("\n\n")
        && value.responsibilities.len() >= 4
        && value.requirements.len() >= 4
        && value.nice_to_have.len() >= 2;

    Normalized { value, valid }
}

pub fn insights(raw: &str) -> Normalized<AiInsights> {
    let Some(root) = parse_object(raw) else {
        return Normalized::unparseable();
    };
    let reader = SchemaReader::new(&root);

    let value = AiInsights {
        summary: reader.string(SUMMARY).unwrap_or_default(),
        insights: reader.string_list(INSIGHTS),
        recommended_actions: reader.string_list(ACTIONS),
    };
    let valid = !value.summary.is_empty()
        && !value.insights.is_empty()
        && !value.recommended_actions.is_empty();

    Normalized { value, valid }
}

/// A missing leave-type code is not a failure; the policy engine clamps it.
pub fn leave_reason(raw: &str) -> Normalized<ReasonNormalization> {
    let Some(root) = parse_object(raw) else {
        return Normalized::unparseable();
    };
    let reader = SchemaReader::new(&root);

    let value = ReasonNormalization {
        category: reader.string(CATEGORY).unwrap_or_default(),
        summary: reader.string(SUMMARY).unwrap_or_default(),
        suggested_leave_type_code: reader.string(SUGGESTED_CODE).unwrap_or_default(),
    };
    let valid = !value.category.is_empty() && !value.summary.is_empty();

    Normalized { value, valid }
}

pub fn explanation(raw: &str) -> Normalized<DecisionExplanation> {
    let Some(root) = parse_object(raw) else {
        return Normalized::unparseable();
    };
    let reader = SchemaReader::new(&root);

    let value = DecisionExplanation {
        explanation: reader.string(EXPLANATION).unwrap_or_default(),
    };
    let valid = !value.explanation.is_empty();

    Normalized { value, valid }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FULL_DRAFT: &str = r#"{
        "titleSuggested": "Senior Backend Engineer",
        "responsibilities": ["a", "b", "c", "d"],
        "requirements": ["e", "f", "g", "h"],
        "niceToHave": ["i", "j"],
        "jobDescription": "First paragraph.\n\nSecond paragraph."
    }"#;

    #[test]
    fn strips_fences_and_parses() {
        let raw = format!("```json\n{FULL_DRAFT}\n```");
        let normalized = job_description(&raw, "Engineer", "Engineering");
        assert!(normalized.valid);
        assert_eq!(normalized.value.title_suggested, "Senior Backend Engineer");
    }

    #[test]
    fn extracts_object_from_surrounding_chatter() {
        let raw = r#"Sure! Here you go: {"explanation": "Approved as requested."} Hope that helps."#;
        let normalized = explanation(raw);
        assert!(normalized.valid);
        assert_eq!(normalized.value.explanation, "Approved as requested.");
    }

    #[test]
    fn unparseable_text_is_invalid() {
        assert!(!explanation("no json here at all").valid);
        assert!(!explanation("} backwards {").valid);
        assert!(!insights("[1, 2, 3]").valid);
    }

    #[test]
    fn unwraps_one_wrapper_level() {
        let raw = json!({ "data": { "explanation": "Inside data." } }).to_string();
        assert_eq!(explanation(&raw).value.explanation, "Inside data.");

        let raw = json!({ "draft": serde_json::from_str::<Value>(FULL_DRAFT).unwrap() }).to_string();
        assert!(job_description(&raw, "Engineer", "Engineering").valid);
    }

    #[test]
    fn reads_alternate_field_names() {
        let raw = json!({
            "title": "Senior Finance Analyst",
            "responsibility": ["a", "b", "c", "d"],
            "requirement": ["e", "f", "g", "h"],
            "nice_to_haves": ["i", "j"],
            "job_description": "One.\r\n\r\nTwo."
        })
        .to_string();
        let normalized = job_description(&raw, "Analyst", "Finance");
        assert!(normalized.valid);
        assert_eq!(normalized.value.job_description, "One.\n\nTwo.");

        let raw = json!({
            "summary": "s",
            "insight": ["x"],
            "recommendations": ["y"]
        })
        .to_string();
        let normalized = insights(&raw);
        assert!(normalized.valid);
        assert_eq!(normalized.value.recommended_actions, vec!["y"]);
    }

    #[test]
    fn delimited_strings_become_lists() {
        let raw = json!({
            "summary": "s",
            "insights": "- first\n* second; third, fourth",
            "recommendedActions": "act now"
        })
        .to_string();
        let normalized = insights(&raw);
        assert_eq!(
            normalized.value.insights,
            vec!["first", "second", "third", "fourth"]
        );
        assert_eq!(normalized.value.recommended_actions, vec!["act now"]);
    }

    #[test]
    fn short_or_missing_title_is_synthesized() {
        let raw = FULL_DRAFT.replace("Senior Backend Engineer", "Engineer");
        let normalized = job_description(&raw, "Developer", "Engineering");
        assert!(normalized.valid);
        assert_eq!(normalized.value.title_suggested, "Engineering Developer");

        assert_eq!(synthesized_title("", ""), "Open Position");
        assert_eq!(synthesized_title("", "Sales"), "Sales Position");
        assert_eq!(synthesized_title("Recruiter", ""), "Recruiter");
    }

    #[test]
    fn job_description_minimums_are_enforced() {
        let single_paragraph = FULL_DRAFT.replace("\\n\\n", " ");
        assert!(!job_description(&single_paragraph, "r", "d").valid);

        let few_requirements = FULL_DRAFT.replace(r#"["e", "f", "g", "h"]"#, r#"["e"]"#);
        assert!(!job_description(&few_requirements, "r", "d").valid);

        let one_nice = FULL_DRAFT.replace(r#"["i", "j"]"#, r#"["i"]"#);
        assert!(!job_description(&one_nice, "r", "d").valid);
    }

    #[test]
    fn leave_reason_tolerates_missing_code() {
        let raw = json!({ "category": "Health", "summary": "Flu." }).to_string();
        let normalized = leave_reason(&raw);
        assert!(normalized.valid);
        assert_eq!(normalized.value.suggested_leave_type_code, "");

        let raw = json!({ "category": "Health", "summary": "Flu.", "leave_type_code": "SICK" })
            .to_string();
        assert_eq!(leave_reason(&raw).value.suggested_leave_type_code, "SICK");
    }

    #[test]
    fn canonical_json_uses_camel_case() {
        let normalized = job_description(FULL_DRAFT, "r", "d");
        let canonical = normalized.canonical_json();
        assert!(canonical.get("niceToHave").is_some());
        assert!(canonical.get("titleSuggested").is_some());
    }
}
