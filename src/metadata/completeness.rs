//! The completeness oracle gating the lazy extraction waterfall. Pure
//! functions over the record; no side effects, no persistence.

use std::fmt;

use serde::Serialize;

use super::record::{MetadataRecord, TrackedValue};

/// A field the record must carry before Phase 1 stops extracting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    ReferenceTender,
    Subject,
    SubmissionDeadline,
    IssuingInstitution,
}

impl RequiredField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredField::ReferenceTender => "reference_tender",
            RequiredField::Subject => "subject",
            RequiredField::SubmissionDeadline => "submission_deadline",
            RequiredField::IssuingInstitution => "issuing_institution",
        }
    }

    pub fn all() -> [RequiredField; 4] {
        [
            RequiredField::ReferenceTender,
            RequiredField::Subject,
            RequiredField::SubmissionDeadline,
            RequiredField::IssuingInstitution,
        ]
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn tracked_missing(value: &Option<TrackedValue>) -> bool {
    value.as_ref().map_or(true, TrackedValue::is_missing)
}

fn field_missing(record: &MetadataRecord, field: RequiredField) -> bool {
    match field {
        RequiredField::ReferenceTender => tracked_missing(&record.reference_tender),
        RequiredField::Subject => tracked_missing(&record.subject),
        RequiredField::IssuingInstitution => tracked_missing(&record.issuing_institution),
        // Only the date half gates completeness; the time half is informative.
        RequiredField::SubmissionDeadline => record
            .submission_deadline
            .as_ref()
            .map_or(true, |deadline| tracked_missing(&deadline.date)),
    }
}

/// Required fields the record still lacks, in canonical order. A null record
/// lacks all of them.
pub fn missing_fields(record: Option<&MetadataRecord>) -> Vec<RequiredField> {
    match record {
        None => RequiredField::all().to_vec(),
        Some(record) => RequiredField::all()
            .into_iter()
            .filter(|field| field_missing(record, *field))
            .collect(),
    }
}

/// True exactly when `missing_fields` returns nothing.
pub fn is_complete(record: Option<&MetadataRecord>) -> bool {
    missing_fields(record).is_empty()
}
