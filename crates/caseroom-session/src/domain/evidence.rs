//! Evidence items and list validation.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use caseroom_core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Allowed range of an evidence item's significance score.
pub const SIGNIFICANCE_RANGE: RangeInclusive<u8> = 1..=10;

/// Kind of material an evidence item was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    LogEntry,
    MetricAlert,
    SlackMessage,
    TimelineEvent,
    SystemChange,
    WitnessStatement,
}

/// One unit of reviewable material surfaced to participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Identifier, unique within the room's evidence list.
    pub id: String,
    /// Kind of material.
    #[serde(rename = "type")]
    pub kind: EvidenceKind,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub content: String,
    /// When the underlying material was produced.
    pub timestamp: DateTime<Utc>,
    /// Where the material came from.
    pub source: String,
    /// Grouping label.
    pub category: String,
    /// Whether a participant has reviewed the item.
    #[serde(default)]
    pub reviewed: bool,
    /// Participant name the item is assigned to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Significance score within [`SIGNIFICANCE_RANGE`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub significance: Option<u8>,
}

/// Validates a full replacement list.
///
/// # Errors
///
/// Returns `DomainError::Validation` if an id repeats or a significance
/// score falls outside [`SIGNIFICANCE_RANGE`].
pub fn validate_evidence(items: &[EvidenceItem]) -> Result<(), DomainError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id.as_str()) {
            return Err(DomainError::Validation(format!(
                "duplicate evidence id: {}",
                item.id
            )));
        }
        match item.significance {
            Some(score) if !SIGNIFICANCE_RANGE.contains(&score) => {
                return Err(DomainError::Validation(format!(
                    "evidence {} has significance {score}, expected 1-10",
                    item.id
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Returns a copy of `items` with the matching item flagged as reviewed.
///
/// # Errors
///
/// Returns `DomainError::EvidenceNotFound` if no item has `evidence_id`.
pub fn with_reviewed(
    items: &[EvidenceItem],
    evidence_id: &str,
) -> Result<Vec<EvidenceItem>, DomainError> {
    if !items.iter().any(|item| item.id == evidence_id) {
        return Err(DomainError::EvidenceNotFound(evidence_id.to_owned()));
    }
    Ok(items
        .iter()
        .map(|item| {
            let mut item = item.clone();
            if item.id == evidence_id {
                item.reviewed = true;
            }
            item
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, significance: Option<u8>) -> EvidenceItem {
        EvidenceItem {
            id: id.to_owned(),
            kind: EvidenceKind::LogEntry,
            title: format!("{id} title"),
            content: "Connection timeout after 30s".to_owned(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 15).unwrap(),
            source: "database-logs".to_owned(),
            category: "system_error".to_owned(),
            reviewed: false,
            assigned_to: None,
            tags: vec!["timeout".to_owned()],
            significance,
        }
    }

    #[test]
    fn test_validate_accepts_bounded_significance() {
        let items = vec![item("evid-1", Some(1)), item("evid-2", Some(10)), item("evid-3", None)];
        assert!(validate_evidence(&items).is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_significance() {
        let result = validate_evidence(&[item("evid-1", Some(11))]);
        assert!(matches!(result, Err(DomainError::Validation(_))));

        let result = validate_evidence(&[item("evid-1", Some(0))]);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let result = validate_evidence(&[item("evid-1", None), item("evid-1", None)]);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_with_reviewed_flags_only_the_matching_item() {
        let items = vec![item("evid-1", None), item("evid-2", None)];

        let updated = with_reviewed(&items, "evid-2").unwrap();

        assert!(!updated[0].reviewed);
        assert!(updated[1].reviewed);
        assert_eq!(updated[0], items[0]);
    }

    #[test]
    fn test_with_reviewed_rejects_unknown_id() {
        let result = with_reviewed(&[item("evid-1", None)], "evid-9");
        match result {
            Err(DomainError::EvidenceNotFound(id)) => assert_eq!(id, "evid-9"),
            other => panic!("expected EvidenceNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_wire_shape_uses_type_tag() {
        let json = serde_json::to_value(item("evid-1", Some(9))).unwrap();
        assert_eq!(json["type"], "log_entry");
        assert_eq!(json["significance"], 9);
        assert!(json.get("assigned_to").is_none());
    }
}
