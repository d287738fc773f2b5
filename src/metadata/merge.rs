//! Field-level fusion of a base record with a fallback record. A field the
//! base already carries is never overwritten; a field it lacks takes the
//! fallback's whole TrackedValue so provenance moves with the value.

use std::collections::HashMap;

use super::record::{scalar_missing, KeywordBuckets, Lot, MetadataRecord, SubmissionDeadline, TrackedValue};

/// Merge `fallback` into `base`. A null side returns the other unchanged.
/// Idempotent: merging the same fallback twice changes nothing further.
pub fn merge_metadata(
    base: Option<MetadataRecord>,
    fallback: Option<MetadataRecord>,
) -> Option<MetadataRecord> {
    let Some(mut base) = base else { return fallback };
    let Some(fallback) = fallback else { return Some(base) };

    base.reference_tender = merge_tracked(base.reference_tender, fallback.reference_tender);
    base.tender_type = merge_tracked(base.tender_type, fallback.tender_type);
    base.issuing_institution = merge_tracked(base.issuing_institution, fallback.issuing_institution);
    base.execution_location = merge_tracked(base.execution_location, fallback.execution_location);
    base.folder_opening_location =
        merge_tracked(base.folder_opening_location, fallback.folder_opening_location);
    base.subject = merge_tracked(base.subject, fallback.subject);
    base.total_estimated_value =
        merge_tracked(base.total_estimated_value, fallback.total_estimated_value);

    base.submission_deadline = merge_deadline(base.submission_deadline, fallback.submission_deadline);
    base.lots = merge_lots(base.lots, fallback.lots);
    base.keywords = merge_keywords(base.keywords, fallback.keywords);

    // Unmodeled keys: the base copy wins, fallback-only keys ride along.
    for (key, value) in fallback.extra {
        base.extra.entry(key).or_insert(value);
    }

    Some(base)
}

/// The fallback fills only a missing base slot, and moves in whole: value,
/// source and date together.
fn merge_tracked(base: Option<TrackedValue>, fallback: Option<TrackedValue>) -> Option<TrackedValue> {
    let base_missing = base.as_ref().map_or(true, TrackedValue::is_missing);
    match fallback {
        Some(fallback) if base_missing => Some(fallback),
        _ => base,
    }
}

/// Date and time halves merge independently. Two absent deadlines stay absent
/// rather than materializing an empty object.
fn merge_deadline(
    base: Option<SubmissionDeadline>,
    fallback: Option<SubmissionDeadline>,
) -> Option<SubmissionDeadline> {
    if base.is_none() && fallback.is_none() {
        return None;
    }
    let base = base.unwrap_or_default();
    let fallback = fallback.unwrap_or_default();
    Some(SubmissionDeadline {
        date: merge_tracked(base.date, fallback.date),
        time: merge_tracked(base.time, fallback.time),
    })
}

/// Buckets are atomic per language: a non-empty base bucket wins outright,
/// an empty one takes the fallback's list as-is.
fn merge_keywords(
    base: Option<KeywordBuckets>,
    fallback: Option<KeywordBuckets>,
) -> Option<KeywordBuckets> {
    if base.is_none() && fallback.is_none() {
        return None;
    }
    let base = base.unwrap_or_default();
    let fallback = fallback.unwrap_or_default();

    fn pick(base: Vec<String>, fallback: Vec<String>) -> Vec<String> {
        if base.is_empty() {
            fallback
        } else {
            base
        }
    }

    Some(KeywordBuckets {
        keywords_fr: pick(base.keywords_fr, fallback.keywords_fr),
        keywords_eng: pick(base.keywords_eng, fallback.keywords_eng),
        keywords_ar: pick(base.keywords_ar, fallback.keywords_ar),
    })
}

/// Base lots are authoritative: the list keeps the base's length and order,
/// and fallback lots only fill blank attributes. Pairing is by trimmed lot
/// number when both sides carry one, by position otherwise.
fn merge_lots(base: Vec<Lot>, fallback: Vec<Lot>) -> Vec<Lot> {
    if base.is_empty() {
        return fallback;
    }
    if fallback.is_empty() {
        return base;
    }

    // A duplicated fallback lot number keeps the last entry.
    let mut by_number: HashMap<&str, usize> = HashMap::new();
    for (index, lot) in fallback.iter().enumerate() {
        if let Some(key) = lot.number_key() {
            by_number.insert(key, index);
        }
    }

    let mut merged = Vec::with_capacity(base.len());
    for (index, mut lot) in base.into_iter().enumerate() {
        let paired = match lot.number_key().and_then(|key| by_number.get(key).copied()) {
            Some(matched) => fallback.get(matched),
            None => fallback.get(index),
        };
        if let Some(paired) = paired {
            if scalar_missing(&lot.lot_subject) {
                lot.lot_subject = paired.lot_subject.clone();
            }
            if scalar_missing(&lot.lot_estimated_value) {
                lot.lot_estimated_value = paired.lot_estimated_value.clone();
            }
            if scalar_missing(&lot.caution_provisoire) {
                lot.caution_provisoire = paired.caution_provisoire.clone();
            }
            if scalar_missing(&lot.lot_number) {
                lot.lot_number = paired.lot_number.clone();
            }
        }
        merged.push(lot);
    }
    merged
}
