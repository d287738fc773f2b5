//! The provenance-tracked metadata model. Every scalar the pipeline learns
//! about a tender travels inside a TrackedValue so its origin survives
//! arbitrarily many merges.

use std::fmt;

use chrono::NaiveDate;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::classify::category::DocumentCategory;

// ══════════════════════════════════════════════════════════════════════
// Sources
// ══════════════════════════════════════════════════════════════════════

/// Where a tracked value came from: the tender webpage or one of the bundle
/// documents. Serialized as the uppercase code ("WEBSITE", "AVIS", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    Website,
    Document(DocumentCategory),
}

impl MetadataSource {
    pub fn as_code(&self) -> &'static str {
        match self {
            MetadataSource::Website => "WEBSITE",
            MetadataSource::Document(category) => category.as_code(),
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let trimmed = code.trim();
        if trimmed.eq_ignore_ascii_case("WEBSITE") {
            return Some(MetadataSource::Website);
        }
        DocumentCategory::from_code(trimmed).map(MetadataSource::Document)
    }
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl Serialize for MetadataSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_code())
    }
}

impl<'de> Deserialize<'de> for MetadataSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        MetadataSource::from_code(&code)
            .ok_or_else(|| D::Error::custom(format!("unknown metadata source: {code}")))
    }
}

// ══════════════════════════════════════════════════════════════════════
// Tracked values
// ══════════════════════════════════════════════════════════════════════

/// A scalar plus the source that produced it and, when known, the date the
/// source document carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedValue {
    #[serde(default)]
    pub value: Option<Value>,
    pub source_document: MetadataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_date: Option<NaiveDate>,
}

impl TrackedValue {
    pub fn new(value: impl Into<Value>, source: MetadataSource) -> Self {
        Self {
            value: Some(value.into()),
            source_document: source,
            source_date: None,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.source_date = Some(date);
        self
    }

    /// Missing iff the value is absent, null, or a blank string. A numeric
    /// zero or `false` is present.
    pub fn is_missing(&self) -> bool {
        match &self.value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        }
    }
}

/// True when an untracked lot attribute is absent, null, or a blank string.
pub(crate) fn scalar_missing(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

// ══════════════════════════════════════════════════════════════════════
// Composite fields
// ══════════════════════════════════════════════════════════════════════

/// Deadline halves are tracked independently; only the date half counts for
/// completeness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionDeadline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<TrackedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<TrackedValue>,
}

/// One line item of a multi-lot tender. Lot attributes carry no per-field
/// provenance; the record-level source applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_subject: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_estimated_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caution_provisoire: Option<Value>,
}

impl Lot {
    /// Trimmed lot number usable as a merge key; only non-blank strings
    /// qualify, numbers do not.
    pub fn number_key(&self) -> Option<&str> {
        match &self.lot_number {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }
}

/// Per-language keyword lists. Merging treats each bucket atomically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordBuckets {
    #[serde(default)]
    pub keywords_fr: Vec<String>,
    #[serde(default)]
    pub keywords_eng: Vec<String>,
    #[serde(default)]
    pub keywords_ar: Vec<String>,
}

impl KeywordBuckets {
    pub fn is_empty(&self) -> bool {
        self.keywords_fr.is_empty() && self.keywords_eng.is_empty() && self.keywords_ar.is_empty()
    }
}

// ══════════════════════════════════════════════════════════════════════
// The record
// ══════════════════════════════════════════════════════════════════════

/// The fused tender metadata record threaded through merge calls. Keys this
/// schema does not model ride along in `extra` and survive round-trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_tender: Option<TrackedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tender_type: Option<TrackedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuing_institution: Option<TrackedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_location: Option<TrackedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_opening_location: Option<TrackedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<TrackedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_estimated_value: Option<TrackedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_deadline: Option<SubmissionDeadline>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lots: Vec<Lot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<KeywordBuckets>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
