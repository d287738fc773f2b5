//! The AI fragment boundary: an opaque extractor trait plus a lenient
//! normalizer that turns whatever JSON comes back into the typed record.
//! Malformed shapes degrade to absent fields, never to errors.

use std::fmt;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::classify::category::DocumentCategory;

use super::record::{KeywordBuckets, Lot, MetadataRecord, MetadataSource, SubmissionDeadline, TrackedValue};

/// The Phase-1 sources a fragment can be attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentSource {
    Website,
    PrimaryNotice,
    Rules,
    Specification,
}

impl FragmentSource {
    pub fn as_code(&self) -> &'static str {
        match self {
            FragmentSource::Website => "WEBSITE",
            FragmentSource::PrimaryNotice => "AVIS",
            FragmentSource::Rules => "RC",
            FragmentSource::Specification => "CPS",
        }
    }

    pub fn metadata_source(&self) -> MetadataSource {
        match self {
            FragmentSource::Website => MetadataSource::Website,
            FragmentSource::PrimaryNotice => MetadataSource::Document(DocumentCategory::PrimaryNotice),
            FragmentSource::Rules => MetadataSource::Document(DocumentCategory::Rules),
            FragmentSource::Specification => MetadataSource::Document(DocumentCategory::Specification),
        }
    }
}

impl fmt::Display for FragmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Black-box extraction call against one document's text. Expected to be
/// idempotent for identical input; None means the call failed or found
/// nothing usable.
pub trait FragmentExtractor: Send + Sync {
    fn extract_fragment(&self, text: &str, source: FragmentSource) -> Option<Value>;
}

/// Normalize one raw fragment into the typed record.
///
/// Tracked fields accept a full `{value, source_document, source_date}`
/// object, a bare scalar, or null. The caller's source labels any value
/// arriving without one, and the caller's date, when given, overrides
/// whatever date the fragment claims.
pub fn normalize_fragment(
    raw: Value,
    source: MetadataSource,
    source_date: Option<NaiveDate>,
) -> MetadataRecord {
    let Value::Object(mut fields) = raw else {
        return MetadataRecord::default();
    };

    MetadataRecord {
        reference_tender: take_tracked(&mut fields, "reference_tender", source, source_date),
        tender_type: take_tracked(&mut fields, "tender_type", source, source_date),
        issuing_institution: take_tracked(&mut fields, "issuing_institution", source, source_date),
        execution_location: take_tracked(&mut fields, "execution_location", source, source_date),
        folder_opening_location: take_tracked(&mut fields, "folder_opening_location", source, source_date),
        subject: take_tracked(&mut fields, "subject", source, source_date),
        total_estimated_value: take_tracked(&mut fields, "total_estimated_value", source, source_date),
        submission_deadline: take_deadline(&mut fields, source, source_date),
        lots: take_lots(&mut fields),
        keywords: take_keywords(&mut fields),
        extra: fields,
    }
}

fn take_tracked(
    fields: &mut Map<String, Value>,
    key: &str,
    source: MetadataSource,
    source_date: Option<NaiveDate>,
) -> Option<TrackedValue> {
    let raw = fields.remove(key)?;
    normalize_tracked(raw, source, source_date)
}

fn normalize_tracked(
    raw: Value,
    source: MetadataSource,
    source_date: Option<NaiveDate>,
) -> Option<TrackedValue> {
    match raw {
        Value::Null => None,
        Value::Object(mut obj) => {
            let value = match obj.remove("value") {
                None | Some(Value::Null) => None,
                // Tracked values hold scalars; composite shapes are noise.
                Some(Value::Array(_)) | Some(Value::Object(_)) => None,
                Some(scalar) => Some(scalar),
            };
            let source_document = obj
                .remove("source_document")
                .and_then(|v| v.as_str().and_then(MetadataSource::from_code))
                .unwrap_or(source);
            let fragment_date = obj.remove("source_date").and_then(parse_source_date);
            Some(TrackedValue {
                value,
                source_document,
                source_date: source_date.or(fragment_date),
            })
        }
        Value::Array(_) => None,
        scalar => Some(TrackedValue {
            value: Some(scalar),
            source_document: source,
            source_date,
        }),
    }
}

fn parse_source_date(raw: Value) -> Option<NaiveDate> {
    raw.as_str()
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

fn take_deadline(
    fields: &mut Map<String, Value>,
    source: MetadataSource,
    source_date: Option<NaiveDate>,
) -> Option<SubmissionDeadline> {
    let raw = fields.remove("submission_deadline")?;
    let Value::Object(mut obj) = raw else {
        return None;
    };
    let date = obj
        .remove("date")
        .and_then(|v| normalize_tracked(v, source, source_date));
    let time = obj
        .remove("time")
        .and_then(|v| normalize_tracked(v, source, source_date));
    if date.is_none() && time.is_none() {
        return None;
    }
    Some(SubmissionDeadline { date, time })
}

fn take_lots(fields: &mut Map<String, Value>) -> Vec<Lot> {
    let Some(Value::Array(items)) = fields.remove("lots") else {
        return Vec::new();
    };
    items.into_iter().filter_map(normalize_lot).collect()
}

fn normalize_lot(raw: Value) -> Option<Lot> {
    let Value::Object(mut obj) = raw else {
        return None;
    };
    Some(Lot {
        lot_number: take_scalar(&mut obj, "lot_number"),
        lot_subject: take_scalar(&mut obj, "lot_subject"),
        lot_estimated_value: take_scalar(&mut obj, "lot_estimated_value"),
        caution_provisoire: take_scalar(&mut obj, "caution_provisoire"),
    })
}

fn take_scalar(obj: &mut Map<String, Value>, key: &str) -> Option<Value> {
    match obj.remove(key) {
        None | Some(Value::Null) => None,
        Some(Value::Array(_)) | Some(Value::Object(_)) => None,
        Some(scalar) => Some(scalar),
    }
}

fn take_keywords(fields: &mut Map<String, Value>) -> Option<KeywordBuckets> {
    let raw = fields.remove("keywords")?;
    let Value::Object(mut obj) = raw else {
        return None;
    };
    Some(KeywordBuckets {
        keywords_fr: string_list(obj.remove("keywords_fr")),
        keywords_eng: string_list(obj.remove("keywords_eng")),
        keywords_ar: string_list(obj.remove("keywords_ar")),
    })
}

fn string_list(raw: Option<Value>) -> Vec<String> {
    let Some(Value::Array(items)) = raw else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}
