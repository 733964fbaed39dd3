//! Triage result types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured classification of a ticket produced by the model.
///
/// `priority` is kept exactly as the model wrote it; the workflow coerces it
/// to a canonical [`crate::ticket::Priority`] before persisting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageResult {
    pub summary: String,
    pub priority: String,
    pub helpful_notes: String,
    pub related_skills: Vec<String>,
}

impl Default for TriageResult {
    /// The result used whenever model output is missing or unusable.
    fn default() -> Self {
        Self {
            summary: String::new(),
            priority: "medium".to_string(),
            helpful_notes: String::new(),
            related_skills: Vec::new(),
        }
    }
}

impl TriageResult {
    /// Build a result from an arbitrary JSON value, field by field.
    ///
    /// Returns `None` unless the value is an object. Missing or wrongly typed
    /// fields fall back to their defaults; non-string and blank skills are
    /// dropped.
    pub fn from_json_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let defaults = Self::default();

        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
        };

        let related_skills = object
            .get("relatedSkills")
            .and_then(Value::as_array)
            .map(|skills| {
                skills
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            summary: text("summary").unwrap_or(defaults.summary),
            priority: text("priority").unwrap_or(defaults.priority),
            helpful_notes: text("helpfulNotes").unwrap_or(defaults.helpful_notes),
            related_skills,
        })
    }
}
