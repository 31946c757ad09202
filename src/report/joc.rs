//! Journey of Change report orchestration.
//!
//! Drives the full pipeline: fetch the outcome set and the in-range
//! meetings, pair each beneficiary's first and last meetings, aggregate
//! every active question and every category across the cohort, and
//! assemble the final report. Only four failures abort a run (outcome-set
//! fetch, in-range fetch, an empty range, cancellation); everything else
//! degrades to warnings so callers always get either a complete report or
//! a single error, never both.

use crate::error::ReportError;
use crate::models::{Excluded, JocCatAggs, JocQAggs, JocServiceReport, OutcomeSet};
use crate::report::accumulator::BeneficiaryAccumulator;
use crate::report::aggregate::category_aggregate;
use crate::report::pairing::{last_meeting_per_beneficiary, pair_first_and_last, FirstAndLast};
use crate::store::MeetingStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Tunables for a report run.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Concurrent beneficiary history fetches.
    pub concurrency: usize,
    /// Abort the run if it has not completed within this window.
    pub timeout: Option<Duration>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout: None,
        }
    }
}

/// Generate a Journey of Change report for one outcome set over a date
/// range (both ends inclusive).
pub async fn generate_joc_report<S: MeetingStore>(
    store: &S,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    outcome_set_id: &str,
    options: &ReportOptions,
) -> Result<JocServiceReport, ReportError> {
    let run = build_report(store, start, end, outcome_set_id, options);
    match options.timeout {
        Some(limit) => tokio::time::timeout(limit, run)
            .await
            .map_err(|_| ReportError::Cancelled)?,
        None => run.await,
    }
}

async fn build_report<S: MeetingStore>(
    store: &S,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    outcome_set_id: &str,
    options: &ReportOptions,
) -> Result<JocServiceReport, ReportError> {
    let outcome_set =
        store
            .outcome_set(outcome_set_id)
            .await
            .map_err(|source| ReportError::OutcomeSet {
                outcome_set_id: outcome_set_id.to_string(),
                source,
            })?;

    let in_range = store
        .meetings_in_range(start, end, outcome_set_id)
        .await
        .map_err(|source| ReportError::MeetingsInRange {
            outcome_set_id: outcome_set_id.to_string(),
            source,
        })?;
    if in_range.is_empty() {
        return Err(ReportError::NoMeetingsInRange);
    }
    info!(
        "generating JOC report for {} over {} in-range meetings",
        outcome_set_id,
        in_range.len()
    );

    let last_meetings = last_meeting_per_beneficiary(in_range);
    let pairing =
        pair_first_and_last(store, outcome_set_id, last_meetings, options.concurrency).await;

    let (question_aggregates, excluded_question_ids) =
        question_aggregations(&outcome_set, &pairing.pairs);
    let (category_aggregates, excluded_category_ids) =
        category_aggregations(&outcome_set, &pairing.pairs);

    Ok(JocServiceReport {
        beneficiary_ids: pairing.pairs.keys().cloned().collect(),
        question_aggregates,
        category_aggregates,
        excluded: Excluded {
            question_ids: excluded_question_ids,
            category_ids: excluded_category_ids,
            beneficiary_ids: pairing.excluded_beneficiary_ids,
        },
        warnings: pairing.warnings,
    })
}

/// Aggregate every active question across the cohort.
fn question_aggregations(
    outcome_set: &OutcomeSet,
    pairs: &BTreeMap<String, FirstAndLast>,
) -> (JocQAggs, Vec<String>) {
    let mut aggs = JocQAggs::default();
    let mut excluded = Vec::new();

    for question in outcome_set.active_questions() {
        let mut acc = BeneficiaryAccumulator::new(&question.id, pairs.len());
        for (beneficiary, pair) in pairs {
            let (Some(first), Some(last)) =
                (pair.first.answer(&question.id), pair.last.answer(&question.id))
            else {
                acc.add_warning(format!(
                    "Beneficiary {} not included as the question was not answered in both the first and last meetings",
                    beneficiary
                ));
                continue;
            };
            match (first.value.to_f32(), last.value.to_f32()) {
                (Ok(first_value), Ok(last_value)) => {
                    acc.add_values(beneficiary, first_value, last_value)
                }
                _ => acc.add_warning(format!(
                    "Beneficiary {} not included as the answers were not of an expected format",
                    beneficiary
                )),
            }
        }
        match acc.into_aggregates() {
            Some(target) => {
                aggs.first.push(target.first.into());
                aggs.last.push(target.last.into());
                aggs.delta.push(target.delta.into());
            }
            None => excluded.push(question.id.clone()),
        }
    }

    (aggs, excluded)
}

/// Aggregate every category across the cohort.
fn category_aggregations(
    outcome_set: &OutcomeSet,
    pairs: &BTreeMap<String, FirstAndLast>,
) -> (JocCatAggs, Vec<String>) {
    let mut aggs = JocCatAggs::default();
    let mut excluded = Vec::new();

    for category in &outcome_set.categories {
        if !outcome_set.has_active_questions_in_category(&category.id) {
            debug!("category {} has no active questions", category.id);
            excluded.push(category.id.clone());
            continue;
        }

        let mut acc = BeneficiaryAccumulator::new(&category.id, pairs.len());
        for (beneficiary, pair) in pairs {
            let first = category_aggregate(&pair.first, &category.id, outcome_set);
            let last = category_aggregate(&pair.last, &category.id, outcome_set);
            match (first, last) {
                (Ok(Some(first)), Ok(Some(last))) => {
                    acc.add_values(beneficiary, first.value, last.value)
                }
                (Err(_), _) | (_, Err(_)) => acc.add_warning(format!(
                    "Beneficiary {} not included because the category aggregation failed",
                    beneficiary
                )),
                _ => acc.add_warning(format!(
                    "Beneficiary {} not included as they had no answers belonging to the category",
                    beneficiary
                )),
            }
        }
        match acc.into_aggregates() {
            Some(target) => {
                aggs.first.push(target.first.into());
                aggs.last.push(target.last.into());
                aggs.delta.push(target.delta.into());
            }
            None => excluded.push(category.id.clone()),
        }
    }

    (aggs, excluded)
}
