//! Untrusted raw assessments
//!
//! Models answer with pure JSON, JSON wrapped in markdown fences, or JSON
//! buried in prose. [`RawAssessment::parse`] recovers the object in all three
//! cases and rejects everything else. Entries are kept as untyped
//! [`serde_json::Value`]s; typing happens in the validator.

use crate::candidate::Candidate;
use crate::error::ServiceError;
use serde_json::{Map, Value};

/// Untrusted `candidate → value` mapping returned by the generative service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAssessment {
    entries: Map<String, Value>,
}

impl RawAssessment {
    /// Empty assessment (every candidate will be defaulted)
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, accepting only objects
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(entries) => Some(Self { entries }),
            _ => None,
        }
    }

    /// Parse model output text
    ///
    /// Tries, in order: the whole text, a fenced code block, and the span
    /// from the first `{` to the last `}`.
    ///
    /// # Errors
    /// Returns [`ServiceError::MalformedResponse`] when no JSON object can be
    /// recovered.
    pub fn parse(text: &str) -> Result<Self, ServiceError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::MalformedResponse("empty response".to_string()));
        }

        parse_object(trimmed)
            .or_else(|| fenced_block(trimmed).and_then(parse_object))
            .or_else(|| brace_span(trimmed).and_then(parse_object))
            .map(|entries| Self { entries })
            .ok_or_else(|| {
                ServiceError::MalformedResponse(format!(
                    "no JSON object in {} bytes of output",
                    text.len()
                ))
            })
    }

    /// Entry for a candidate (exact key match)
    #[inline]
    #[must_use]
    pub fn get(&self, candidate: &Candidate) -> Option<&Value> {
        self.entries.get(candidate.as_str())
    }

    /// Number of entries, including ones that name no candidate
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys the model returned
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Body of the first ``` fenced block, with any info string dropped
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // Skip the info string (`json`, `JSON`, ...) up to the end of the line
    let body_start = after.find('\n').map_or(0, |i| i + 1);
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_plain_object() {
        let raw = RawAssessment::parse(r#"{"sensor": {"trl": 4, "justification": "Lab validated"}}"#)
            .unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw.get(&Candidate::new("sensor")).unwrap()["trl"], 4);
    }

    #[test]
    fn parse_fenced_block() {
        let text = "Here you go:\n```json\n{\"pump\": {\"trl\": 3}}\n```\nThanks.";
        let raw = RawAssessment::parse(text).unwrap();
        assert!(raw.get(&Candidate::new("pump")).is_some());
    }

    #[test]
    fn parse_fenced_block_without_info_string() {
        let text = "```\n{\"valve\": {\"trl\": 2}}\n```";
        assert_eq!(RawAssessment::parse(text).unwrap().len(), 1);
    }

    #[test]
    fn parse_object_in_prose() {
        let text = "The assessment is {\"valve\": {\"trl\": 5, \"justification\": \"x\"}} as requested.";
        assert_eq!(RawAssessment::parse(text).unwrap().len(), 1);
    }

    #[test]
    fn parse_rejects_prose() {
        let err = RawAssessment::parse("I cannot assess these components.").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn parse_rejects_non_object_json() {
        assert!(RawAssessment::parse("[1, 2, 3]").is_err());
        assert!(RawAssessment::parse("42").is_err());
        assert!(RawAssessment::parse("   ").is_err());
    }

    #[test]
    fn parse_rejects_truncated_object() {
        assert!(RawAssessment::parse(r#"{"sensor": {"trl": 4, "justif"#).is_err());
    }

    #[test]
    fn from_value_only_objects() {
        assert!(RawAssessment::from_value(json!({"a": 1})).is_some());
        assert!(RawAssessment::from_value(json!("a")).is_none());
    }

    #[test]
    fn lookup_is_exact() {
        let raw = RawAssessment::from_value(json!({"Sensor": {"trl": 4}})).unwrap();
        assert!(raw.get(&Candidate::new("sensor")).is_none());
        assert_eq!(raw.keys().collect::<Vec<_>>(), vec!["Sensor"]);
    }
}
