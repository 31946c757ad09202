//! Per-target accumulation of beneficiary first/last/delta values.
//!
//! One accumulator lives for a single pass over one aggregation target (a
//! question or a category). It keeps parallel arrays of beneficiary IDs
//! and their phase values, inserting in sorted beneficiary order so the
//! arrays stay aligned and the output is deterministic.

use crate::models::{CatBenAgg, QBenAgg};
use crate::report::aggregate::mean;
use tracing::debug;

/// Cohort aggregate for one target in one phase, before it is labelled as
/// a question or category record.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortAggregate {
    pub target_id: String,
    pub value: f32,
    pub beneficiary_ids: Vec<String>,
    pub warnings: Vec<String>,
}

impl From<CohortAggregate> for QBenAgg {
    fn from(agg: CohortAggregate) -> Self {
        QBenAgg {
            question_id: agg.target_id,
            value: agg.value,
            beneficiary_ids: agg.beneficiary_ids,
            warnings: agg.warnings,
        }
    }
}

impl From<CohortAggregate> for CatBenAgg {
    fn from(agg: CohortAggregate) -> Self {
        CatBenAgg {
            category_id: agg.target_id,
            value: agg.value,
            beneficiary_ids: agg.beneficiary_ids,
            warnings: agg.warnings,
        }
    }
}

/// The three phase aggregates produced for one included target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetAggregates {
    pub first: CohortAggregate,
    pub last: CohortAggregate,
    pub delta: CohortAggregate,
}

/// Working set for one aggregation target.
#[derive(Debug)]
pub struct BeneficiaryAccumulator {
    target_id: String,
    beneficiary_ids: Vec<String>,
    first: Vec<f32>,
    last: Vec<f32>,
    delta: Vec<f32>,
    warnings: Vec<String>,
}

impl BeneficiaryAccumulator {
    pub fn new(target_id: &str, cohort_size: usize) -> Self {
        Self {
            target_id: target_id.to_string(),
            beneficiary_ids: Vec::with_capacity(cohort_size),
            first: Vec::with_capacity(cohort_size),
            last: Vec::with_capacity(cohort_size),
            delta: Vec::with_capacity(cohort_size),
            warnings: Vec::new(),
        }
    }

    /// Include a beneficiary's first and last values for this target.
    ///
    /// The delta is always the numeric difference, independent of any
    /// category policy. Insertion keeps all four arrays aligned on sorted
    /// beneficiary order.
    pub fn add_values(&mut self, beneficiary_id: &str, first: f32, last: f32) {
        let index = self
            .beneficiary_ids
            .binary_search_by(|existing| existing.as_str().cmp(beneficiary_id))
            .unwrap_or_else(|insert_at| insert_at);
        self.beneficiary_ids
            .insert(index, beneficiary_id.to_string());
        self.first.insert(index, first);
        self.last.insert(index, last);
        self.delta.insert(index, last - first);
    }

    /// Record why a beneficiary was omitted from this target.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Fold the collected values into one cohort aggregate per phase.
    ///
    /// Returns `None` when no beneficiary qualified; the caller records the
    /// target in the report's excluded list instead. Each phase value is
    /// the mean of that phase's per-beneficiary values.
    pub fn into_aggregates(self) -> Option<TargetAggregates> {
        if self.beneficiary_ids.is_empty() {
            if !self.warnings.is_empty() {
                debug!(
                    "target {} excluded; dropping {} per-beneficiary warnings",
                    self.target_id,
                    self.warnings.len()
                );
            }
            return None;
        }

        let cohort = |values: &[f32]| CohortAggregate {
            target_id: self.target_id.clone(),
            value: mean(values),
            beneficiary_ids: self.beneficiary_ids.clone(),
            warnings: self.warnings.clone(),
        };

        Some(TargetAggregates {
            first: cohort(&self.first),
            last: cohort(&self.last),
            delta: cohort(&self.delta),
        })
    }
}
