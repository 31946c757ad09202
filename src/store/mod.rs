//! Storage collaborators for meetings and outcome sets.
//!
//! Report generation is read-only: the engine consumes the three query
//! operations below and never writes. Any backend that can answer them can
//! drive a report; [`JsonDirStore`] is the directory-of-documents
//! implementation used by the CLI.

mod json_dir;

pub use json_dir::JsonDirStore;

use crate::error::StoreError;
use crate::models::{Meeting, OutcomeSet};
use chrono::{DateTime, Utc};

/// Read-only access to the meeting store backing a report run.
#[allow(async_fn_in_trait)]
pub trait MeetingStore {
    /// Fetch an outcome set definition by ID.
    async fn outcome_set(&self, outcome_set_id: &str) -> Result<OutcomeSet, StoreError>;

    /// Fetch the meetings conducted against an outcome set within a time
    /// window. Both ends of the window are inclusive.
    async fn meetings_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        outcome_set_id: &str,
    ) -> Result<Vec<Meeting>, StoreError>;

    /// Fetch every meeting a beneficiary has against an outcome set,
    /// regardless of when it was conducted.
    async fn meetings_for_beneficiary(
        &self,
        beneficiary_id: &str,
        outcome_set_id: &str,
    ) -> Result<Vec<Meeting>, StoreError>;
}

#[cfg(test)]
pub(crate) mod testutil {
    //! In-memory store used by pipeline tests.

    use super::MeetingStore;
    use crate::error::StoreError;
    use crate::models::{Meeting, OutcomeSet};
    use chrono::{DateTime, Utc};
    use std::time::Duration;

    /// A store seeded with fixed documents. Individual operations can be
    /// made to fail to exercise the pipeline's degradation paths.
    pub struct InMemoryStore {
        pub outcome_sets: Vec<OutcomeSet>,
        pub meetings: Vec<Meeting>,
        /// Fail `outcome_set` calls.
        pub fail_outcome_set: bool,
        /// Fail `meetings_in_range` calls.
        pub fail_meetings_in_range: bool,
        /// Beneficiary IDs whose history fetch fails.
        pub fail_beneficiaries: Vec<String>,
        /// Delay applied to each history fetch, for cancellation tests.
        pub history_delay: Option<Duration>,
    }

    impl InMemoryStore {
        pub fn new(outcome_set: OutcomeSet, meetings: Vec<Meeting>) -> Self {
            Self {
                outcome_sets: vec![outcome_set],
                meetings,
                fail_outcome_set: false,
                fail_meetings_in_range: false,
                fail_beneficiaries: Vec::new(),
                history_delay: None,
            }
        }
    }

    impl MeetingStore for InMemoryStore {
        async fn outcome_set(&self, outcome_set_id: &str) -> Result<OutcomeSet, StoreError> {
            if self.fail_outcome_set {
                return Err(StoreError::Backend("store unavailable".to_string()));
            }
            self.outcome_sets
                .iter()
                .find(|os| os.id == outcome_set_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound {
                    kind: "outcome set",
                    id: outcome_set_id.to_string(),
                })
        }

        async fn meetings_in_range(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
            outcome_set_id: &str,
        ) -> Result<Vec<Meeting>, StoreError> {
            if self.fail_meetings_in_range {
                return Err(StoreError::Backend("store unavailable".to_string()));
            }
            Ok(self
                .meetings
                .iter()
                .filter(|m| {
                    m.outcome_set_id == outcome_set_id
                        && m.conducted >= start
                        && m.conducted <= end
                })
                .cloned()
                .collect())
        }

        async fn meetings_for_beneficiary(
            &self,
            beneficiary_id: &str,
            outcome_set_id: &str,
        ) -> Result<Vec<Meeting>, StoreError> {
            if let Some(delay) = self.history_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_beneficiaries.iter().any(|b| b == beneficiary_id) {
                return Err(StoreError::Backend("store unavailable".to_string()));
            }
            Ok(self
                .meetings
                .iter()
                .filter(|m| {
                    m.outcome_set_id == outcome_set_id && m.beneficiary == beneficiary_id
                })
                .cloned()
                .collect())
        }
    }
}
