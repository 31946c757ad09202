//! Cohort pairing: finding each beneficiary's first and last meetings.
//!
//! The "last" meeting is the latest-conducted in-range meeting per
//! beneficiary. The "first" meeting is the earliest-conducted meeting in
//! the beneficiary's *entire* history that is not the last meeting by
//! identity, so a true first meeting is found even when it predates the
//! reporting window. Beneficiaries whose history cannot be fetched, or who
//! have no meeting besides their last, are dropped from the whole report
//! with a warning rather than failing it.

use crate::models::Meeting;
use crate::store::MeetingStore;
use futures::stream::{self, StreamExt};
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, error};

/// One beneficiary's qualifying first and last meetings.
///
/// Constructed fresh per report run; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FirstAndLast {
    pub first: Meeting,
    pub last: Meeting,
}

/// The result of pairing a cohort.
#[derive(Debug, Default)]
pub struct PairingOutcome {
    /// Beneficiary ID to first/last pair, for every beneficiary who
    /// qualified. Iteration order is sorted by beneficiary ID.
    pub pairs: BTreeMap<String, FirstAndLast>,
    /// Beneficiaries dropped from the whole report, sorted.
    pub excluded_beneficiary_ids: Vec<String>,
    /// One warning per dropped beneficiary, in beneficiary order.
    pub warnings: Vec<String>,
}

/// Group in-range meetings by beneficiary, keeping only the meeting with
/// the latest "conducted" timestamp for each.
///
/// Equal timestamps are broken by meeting ID, larger ID winning, so the
/// result does not depend on input order.
pub fn last_meeting_per_beneficiary(meetings: Vec<Meeting>) -> BTreeMap<String, Meeting> {
    let mut last_meetings: BTreeMap<String, Meeting> = BTreeMap::new();
    for meeting in meetings {
        match last_meetings.entry(meeting.beneficiary.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(meeting);
            }
            Entry::Occupied(mut slot) => {
                if supersedes_last(&meeting, slot.get()) {
                    slot.insert(meeting);
                }
            }
        }
    }
    last_meetings
}

fn supersedes_last(candidate: &Meeting, current: &Meeting) -> bool {
    match candidate.conducted.cmp(&current.conducted) {
        Ordering::Greater => true,
        Ordering::Equal => candidate.id > current.id,
        Ordering::Less => false,
    }
}

/// Pair each beneficiary's last meeting with their first.
///
/// History fetches are independent, so they run concurrently with bounded
/// parallelism. Beneficiaries are processed in sorted order and the
/// buffered stream preserves it, which keeps warnings and exclusions
/// deterministic regardless of fetch completion order.
pub async fn pair_first_and_last<S: MeetingStore>(
    store: &S,
    outcome_set_id: &str,
    last_meetings: BTreeMap<String, Meeting>,
    concurrency: usize,
) -> PairingOutcome {
    let fetches = last_meetings.into_iter().map(|(beneficiary, last)| async move {
        let history = store
            .meetings_for_beneficiary(&beneficiary, outcome_set_id)
            .await;
        (beneficiary, last, history)
    });

    let fetched: Vec<_> = stream::iter(fetches)
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut outcome = PairingOutcome::default();
    for (beneficiary, last, history) in fetched {
        match history {
            Err(e) => {
                error!("fetching meetings for beneficiary {} failed: {}", beneficiary, e);
                outcome.warnings.push(format!(
                    "Could not include beneficiary {} due to a system error. Please contact support.",
                    beneficiary
                ));
                outcome.excluded_beneficiary_ids.push(beneficiary);
            }
            Ok(history) if history.is_empty() => {
                outcome.warnings.push(format!(
                    "Could not include beneficiary {} as we could not find their first meeting. Please contact support.",
                    beneficiary
                ));
                outcome.excluded_beneficiary_ids.push(beneficiary);
            }
            Ok(history) => match first_meeting(history, &last.id) {
                Some(first) => {
                    outcome
                        .pairs
                        .insert(beneficiary, FirstAndLast { first, last });
                }
                None => {
                    outcome.warnings.push(format!(
                        "Beneficiary {} was not included as they only have a single meeting recorded",
                        beneficiary
                    ));
                    outcome.excluded_beneficiary_ids.push(beneficiary);
                }
            },
        }
    }

    debug!(
        "paired {} beneficiaries, dropped {}",
        outcome.pairs.len(),
        outcome.excluded_beneficiary_ids.len()
    );
    outcome
}

/// Select the earliest-conducted meeting that is not the last meeting by
/// identity. Equal timestamps are broken by meeting ID, smaller winning.
fn first_meeting(history: Vec<Meeting>, last_meeting_id: &str) -> Option<Meeting> {
    let mut first: Option<Meeting> = None;
    for meeting in history {
        if meeting.id == last_meeting_id {
            continue;
        }
        let earlier = match &first {
            None => true,
            Some(current) => match meeting.conducted.cmp(&current.conducted) {
                Ordering::Less => true,
                Ordering::Equal => meeting.id < current.id,
                Ordering::Greater => false,
            },
        };
        if earlier {
            first = Some(meeting);
        }
    }
    first
}
