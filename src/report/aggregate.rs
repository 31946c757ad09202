//! Numeric aggregation primitives and the per-meeting category view.
//!
//! These are the leaves of the pipeline: pure functions over slices of
//! already-coerced values, plus the reduction of one meeting's answers to
//! one value per category.

use crate::error::AggregateError;
use crate::models::{AggregationPolicy, CategoryAggregate, Meeting, OutcomeSet};

/// Arithmetic mean. Callers must guarantee `values` is non-empty.
pub fn mean(values: &[f32]) -> f32 {
    debug_assert!(!values.is_empty(), "mean of empty slice");
    sum(values) / values.len() as f32
}

/// Simple total.
pub fn sum(values: &[f32]) -> f32 {
    values.iter().copied().sum()
}

/// Combine values according to a category's declared policy.
pub fn aggregate(values: &[f32], policy: AggregationPolicy) -> f32 {
    match policy {
        AggregationPolicy::Mean => mean(values),
        AggregationPolicy::Sum => sum(values),
    }
}

/// Reduce one meeting's answers within one category to a single value.
///
/// Collects the numeric value of every answer whose question is active and
/// currently assigned to the category. Returns `Ok(None)` when the meeting
/// has no qualifying answers, which is distinct from a computed zero: the
/// caller can tell "category not answered" apart from "answered with zero".
/// Coercion failures propagate as errors rather than being dropped.
pub fn category_aggregate(
    meeting: &Meeting,
    category_id: &str,
    outcome_set: &OutcomeSet,
) -> Result<Option<CategoryAggregate>, AggregateError> {
    let category = outcome_set
        .category(category_id)
        .ok_or_else(|| AggregateError::UnknownCategory(category_id.to_string()))?;

    let mut values = Vec::with_capacity(meeting.answers.len());
    for answer in &meeting.answers {
        // Answers to questions no longer in the set carry no category.
        let Some(question) = outcome_set.question(&answer.question_id) else {
            continue;
        };
        if !question.is_active() || question.category_id.as_deref() != Some(category_id) {
            continue;
        }
        values.push(answer.value.to_f32()?);
    }

    if values.is_empty() {
        return Ok(None);
    }

    Ok(Some(CategoryAggregate {
        category_id: category.id.clone(),
        value: aggregate(&values, category.aggregation),
    }))
}

/// The per-meeting "aggregates" view: one entry per answered category.
///
/// Used by single-meeting read views independent of cohort reporting.
pub fn category_aggregates(
    meeting: &Meeting,
    outcome_set: &OutcomeSet,
) -> Result<Vec<CategoryAggregate>, AggregateError> {
    let mut out = Vec::with_capacity(outcome_set.categories.len());
    for category in &outcome_set.categories {
        if let Some(agg) = category_aggregate(meeting, &category.id, outcome_set)? {
            out.push(agg);
        }
    }
    Ok(out)
}
