//! JSON document store backed by a data directory.
//!
//! Layout:
//!
//! ```text
//! <data dir>/
//!   outcomesets/   one outcome set definition per *.json file
//!   meetings/      one meeting per *.json file
//! ```
//!
//! All documents are loaded eagerly at open time; queries run against the
//! in-memory copy. Report generation never writes, so there is no
//! invalidation to worry about within a run.

use crate::error::StoreError;
use crate::models::{Meeting, OutcomeSet};
use crate::store::MeetingStore;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const OUTCOME_SET_DIR: &str = "outcomesets";
const MEETING_DIR: &str = "meetings";

/// Directory-of-JSON-documents store.
pub struct JsonDirStore {
    outcome_sets: HashMap<String, OutcomeSet>,
    meetings: Vec<Meeting>,
}

impl JsonDirStore {
    /// Open a data directory, loading every document under it.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let mut outcome_sets = HashMap::new();
        for path in json_documents(&root.join(OUTCOME_SET_DIR)) {
            let outcome_set: OutcomeSet = read_document(&path)?;
            if let Some(previous) = outcome_sets.insert(outcome_set.id.clone(), outcome_set) {
                warn!("duplicate outcome set {} replaced while loading", previous.id);
            }
        }

        let mut meetings = Vec::new();
        for path in json_documents(&root.join(MEETING_DIR)) {
            meetings.push(read_document::<Meeting>(&path)?);
        }

        debug!(
            "loaded {} outcome sets and {} meetings from {}",
            outcome_sets.len(),
            meetings.len(),
            root.display()
        );

        Ok(Self {
            outcome_sets,
            meetings,
        })
    }

    /// Look up a single meeting by ID.
    pub fn meeting(&self, meeting_id: &str) -> Option<&Meeting> {
        self.meetings.iter().find(|m| m.id == meeting_id)
    }

    /// Number of outcome sets loaded.
    pub fn outcome_set_count(&self) -> usize {
        self.outcome_sets.len()
    }

    /// Number of meetings loaded.
    pub fn meeting_count(&self) -> usize {
        self.meetings.len()
    }
}

impl MeetingStore for JsonDirStore {
    async fn outcome_set(&self, outcome_set_id: &str) -> Result<OutcomeSet, StoreError> {
        self.outcome_sets
            .get(outcome_set_id)
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
        Ok(self
            .meetings
            .iter()
            .filter(|m| {
                m.outcome_set_id == outcome_set_id && m.conducted >= start && m.conducted <= end
            })
            .cloned()
            .collect())
    }

    async fn meetings_for_beneficiary(
        &self,
        beneficiary_id: &str,
        outcome_set_id: &str,
    ) -> Result<Vec<Meeting>, StoreError> {
        Ok(self
            .meetings
            .iter()
            .filter(|m| m.outcome_set_id == outcome_set_id && m.beneficiary == beneficiary_id)
            .cloned()
            .collect())
    }
}

/// Collect the *.json files under a directory, sorted for deterministic
/// load order. A missing directory yields an empty list.
fn json_documents(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("data directory {} does not exist", dir.display());
        return Vec::new();
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry under {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext == "json")
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    paths.sort();
    paths
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn write_doc(dir: &Path, name: &str, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }

    fn meeting_doc(id: &str, beneficiary: &str, conducted: &str) -> String {
        format!(
            r#"{{
                "id": "{id}",
                "beneficiary": "{beneficiary}",
                "outcomeSetID": "OS1",
                "conducted": "{conducted}",
                "answers": [{{"questionID": "Q1", "answer": 5}}]
            }}"#
        )
    }

    fn seeded_store(root: &Path) -> JsonDirStore {
        write_doc(
            &root.join(OUTCOME_SET_DIR),
            "os1.json",
            r#"{
                "id": "OS1",
                "name": "Wellbeing",
                "questions": [{"id": "Q1", "question": "How are you?"}],
                "categories": [{"id": "C1", "name": "Mood", "aggregation": "mean"}]
            }"#,
        );
        let meetings = root.join(MEETING_DIR);
        write_doc(
            &meetings,
            "m1.json",
            &meeting_doc("M1", "B1", "2024-01-10T12:00:00Z"),
        );
        write_doc(
            &meetings,
            "m2.json",
            &meeting_doc("M2", "B1", "2024-02-10T12:00:00Z"),
        );
        write_doc(
            &meetings,
            "m3.json",
            &meeting_doc("M3", "B2", "2024-03-10T12:00:00Z"),
        );
        JsonDirStore::open(root).unwrap()
    }

    #[tokio::test]
    async fn test_outcome_set_lookup() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(dir.path());

        let os = store.outcome_set("OS1").await.unwrap();
        assert_eq!(os.name, "Wellbeing");

        let missing = store.outcome_set("nope").await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_meetings_in_range_is_end_inclusive() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(dir.path());

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap();

        let meetings = store.meetings_in_range(start, end, "OS1").await.unwrap();
        let ids: Vec<_> = meetings.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["M1", "M2"]);
    }

    #[tokio::test]
    async fn test_meetings_for_beneficiary_ignores_range() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(dir.path());

        let meetings = store.meetings_for_beneficiary("B1", "OS1").await.unwrap();
        assert_eq!(meetings.len(), 2);

        let meetings = store.meetings_for_beneficiary("B3", "OS1").await.unwrap();
        assert!(meetings.is_empty());
    }

    #[tokio::test]
    async fn test_single_meeting_lookup() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(dir.path());

        assert!(store.meeting("M3").is_some());
        assert!(store.meeting("M9").is_none());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_doc(
            &dir.path().join(MEETING_DIR),
            "bad.json",
            "{ not json at all",
        );

        let result = JsonDirStore::open(dir.path());
        assert!(matches!(result, Err(StoreError::Malformed { .. })));
    }

    #[test]
    fn test_missing_directories_load_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        assert_eq!(store.outcome_set_count(), 0);
        assert_eq!(store.meeting_count(), 0);
    }
}
