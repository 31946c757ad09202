//! Data models for outcome measurement reporting.
//!
//! This module contains the core data structures used throughout the
//! application: meetings and their answers, outcome set definitions, and
//! the records that make up a Journey of Change report.
//!
//! Serialized field names follow the upstream meeting store's JSON shape
//! (`questionID`, `beneficiaryIDs`, ...) so reports and stored documents
//! stay interchangeable with other consumers of the same data.

use crate::error::CoercionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single answer value as the storage layer may hand it back.
///
/// Answers are loosely typed at rest; they are tagged at ingestion time so
/// aggregation only ever deals with `Result<f32, CoercionError>`, never a
/// raw dynamic value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Whole-number answer (the common case for likert scales).
    Int(i64),
    /// Fractional answer.
    Float(f64),
    /// Boolean answer; not numeric.
    Bool(bool),
    /// Free-text answer; not numeric.
    Text(String),
}

impl AnswerValue {
    /// Returns a human-readable name for the value kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AnswerValue::Int(_) => "integer",
            AnswerValue::Float(_) => "float",
            AnswerValue::Bool(_) => "boolean",
            AnswerValue::Text(_) => "text",
        }
    }

    /// Whether the value can be coerced to a number.
    #[allow(dead_code)] // Utility for answer validation
    pub fn is_numeric(&self) -> bool {
        matches!(self, AnswerValue::Int(_) | AnswerValue::Float(_))
    }

    /// Coerce the value to a number.
    ///
    /// Non-numeric kinds fail with [`CoercionError::NonNumericAnswer`]
    /// rather than silently defaulting to zero.
    pub fn to_f32(&self) -> Result<f32, CoercionError> {
        match self {
            AnswerValue::Int(v) => Ok(*v as f32),
            AnswerValue::Float(v) => Ok(*v as f32),
            AnswerValue::Bool(_) | AnswerValue::Text(_) => {
                Err(CoercionError::NonNumericAnswer { kind: self.kind() })
            }
        }
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Int(v) => write!(f, "{}", v),
            AnswerValue::Float(v) => write!(f, "{}", v),
            AnswerValue::Bool(v) => write!(f, "{}", v),
            AnswerValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// One answer given during a meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// The question this answer responds to.
    #[serde(rename = "questionID")]
    pub question_id: String,
    /// The answer value.
    #[serde(rename = "answer")]
    pub value: AnswerValue,
}

/// One assessment instance: a timestamped set of answers against an
/// outcome set. Immutable once fetched for reporting purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    /// Meeting identifier.
    pub id: String,
    /// The beneficiary being assessed.
    pub beneficiary: String,
    /// The outcome set the meeting was conducted against.
    #[serde(rename = "outcomeSetID")]
    pub outcome_set_id: String,
    /// When the meeting was conducted.
    pub conducted: DateTime<Utc>,
    /// Answers recorded during the meeting.
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl Meeting {
    /// Look up the answer to a question, if one was recorded.
    pub fn answer(&self, question_id: &str) -> Option<&Answer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }
}

/// Numeric aggregation policy declared on a category.
///
/// This is a closed enum: unrecognized policy strings are rejected when the
/// outcome set is parsed, not silently defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationPolicy {
    Mean,
    Sum,
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationPolicy::Mean => write!(f, "mean"),
            AggregationPolicy::Sum => write!(f, "sum"),
        }
    }
}

/// A question belonging to an outcome set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Question identifier.
    pub id: String,
    /// Question text shown to beneficiaries.
    #[serde(default)]
    pub question: String,
    /// Deleted questions remain in the definition for historic answers but
    /// do not participate in aggregation.
    #[serde(default)]
    pub deleted: bool,
    /// Optional category assignment.
    #[serde(rename = "categoryID", default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

impl Question {
    /// Whether the question participates in aggregation.
    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}

/// A grouping of questions with a declared aggregation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Category identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// How answers within the category are combined per meeting.
    pub aggregation: AggregationPolicy,
}

/// A versioned definition of questions and categories used to assess
/// beneficiaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSet {
    /// Outcome set identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Questions, in presentation order.
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Categories questions may be assigned to.
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl OutcomeSet {
    /// Look up a question by ID.
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Look up a category by ID.
    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == category_id)
    }

    /// Active (non-deleted) questions, in presentation order.
    pub fn active_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(|q| q.is_active())
    }

    /// Active questions currently assigned to the given category.
    pub fn active_questions_in_category<'a>(
        &'a self,
        category_id: &'a str,
    ) -> impl Iterator<Item = &'a Question> + 'a {
        self.active_questions()
            .filter(move |q| q.category_id.as_deref() == Some(category_id))
    }

    /// Whether the category has any active questions left.
    ///
    /// A category with none is excluded from reporting entirely.
    pub fn has_active_questions_in_category(&self, category_id: &str) -> bool {
        self.active_questions_in_category(category_id).next().is_some()
    }
}

/// Aggregate of one meeting's answers within one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAggregate {
    #[serde(rename = "categoryID")]
    pub category_id: String,
    pub value: f32,
}

/// Cohort aggregate for one question in one phase (first, last or delta).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QBenAgg {
    #[serde(rename = "questionID")]
    pub question_id: String,
    /// Mean of the phase values contributed by `beneficiary_ids`.
    pub value: f32,
    /// Beneficiaries that contributed, sorted.
    #[serde(rename = "beneficiaryIDs")]
    pub beneficiary_ids: Vec<String>,
    /// Why individual beneficiaries were omitted from this target.
    pub warnings: Vec<String>,
}

/// Cohort aggregate for one category in one phase (first, last or delta).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatBenAgg {
    #[serde(rename = "categoryID")]
    pub category_id: String,
    /// Mean of the phase values contributed by `beneficiary_ids`.
    pub value: f32,
    /// Beneficiaries that contributed, sorted.
    #[serde(rename = "beneficiaryIDs")]
    pub beneficiary_ids: Vec<String>,
    /// Why individual beneficiaries were omitted from this target.
    pub warnings: Vec<String>,
}

/// Per-question cohort aggregates, one entry per included question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JocQAggs {
    pub first: Vec<QBenAgg>,
    pub last: Vec<QBenAgg>,
    pub delta: Vec<QBenAgg>,
}

/// Per-category cohort aggregates, one entry per included category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JocCatAggs {
    pub first: Vec<CatBenAgg>,
    pub last: Vec<CatBenAgg>,
    pub delta: Vec<CatBenAgg>,
}

/// Targets and beneficiaries dropped from the report entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Excluded {
    /// Questions with zero included beneficiaries.
    #[serde(rename = "questionIDs")]
    pub question_ids: Vec<String>,
    /// Categories with zero included beneficiaries or zero active questions.
    #[serde(rename = "categoryIDs")]
    pub category_ids: Vec<String>,
    /// Beneficiaries dropped during cohort pairing.
    #[serde(rename = "beneficiaryIDs")]
    pub beneficiary_ids: Vec<String>,
}

/// The complete Journey of Change report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JocServiceReport {
    /// Sorted distinct beneficiaries with a qualifying first and last meeting.
    #[serde(rename = "beneficiaryIDs")]
    pub beneficiary_ids: Vec<String>,
    #[serde(rename = "questionAggregates")]
    pub question_aggregates: JocQAggs,
    #[serde(rename = "categoryAggregates")]
    pub category_aggregates: JocCatAggs,
    pub excluded: Excluded,
    /// Report-wide warnings: beneficiaries dropped from the whole cohort.
    pub warnings: Vec<String>,
}

/// Metadata about a report run, for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    #[serde(rename = "outcomeSetID")]
    pub outcome_set_id: String,
    #[serde(rename = "outcomeSetName")]
    pub outcome_set_name: String,
    /// Start of the reporting window.
    pub from: DateTime<Utc>,
    /// End of the reporting window (inclusive).
    pub to: DateTime<Utc>,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    #[serde(rename = "durationSeconds")]
    pub duration_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_value_coercion() {
        assert_eq!(AnswerValue::Int(5).to_f32(), Ok(5.0));
        assert_eq!(AnswerValue::Float(2.5).to_f32(), Ok(2.5));
        assert_eq!(
            AnswerValue::Text("five".to_string()).to_f32(),
            Err(CoercionError::NonNumericAnswer { kind: "text" })
        );
        assert_eq!(
            AnswerValue::Bool(true).to_f32(),
            Err(CoercionError::NonNumericAnswer { kind: "boolean" })
        );
    }

    #[test]
    fn test_answer_value_is_numeric() {
        assert!(AnswerValue::Int(0).is_numeric());
        assert!(AnswerValue::Float(0.0).is_numeric());
        assert!(!AnswerValue::Text(String::new()).is_numeric());
        assert!(!AnswerValue::Bool(false).is_numeric());
    }

    #[test]
    fn test_answer_deserialization_tags_values() {
        let answer: Answer =
            serde_json::from_str(r#"{"questionID": "Q1", "answer": 5}"#).unwrap();
        assert_eq!(answer.value, AnswerValue::Int(5));

        let answer: Answer =
            serde_json::from_str(r#"{"questionID": "Q1", "answer": 5.5}"#).unwrap();
        assert_eq!(answer.value, AnswerValue::Float(5.5));

        let answer: Answer =
            serde_json::from_str(r#"{"questionID": "Q1", "answer": "n/a"}"#).unwrap();
        assert_eq!(answer.value, AnswerValue::Text("n/a".to_string()));
    }

    #[test]
    fn test_unknown_aggregation_policy_rejected() {
        let result: Result<Category, _> =
            serde_json::from_str(r#"{"id": "C1", "aggregation": "median"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_meeting_answer_lookup() {
        let meeting = Meeting {
            id: "M1".to_string(),
            beneficiary: "B1".to_string(),
            outcome_set_id: "OS1".to_string(),
            conducted: Utc::now(),
            answers: vec![Answer {
                question_id: "Q1".to_string(),
                value: AnswerValue::Int(3),
            }],
        };
        assert!(meeting.answer("Q1").is_some());
        assert!(meeting.answer("Q2").is_none());
    }

    #[test]
    fn test_active_questions_filtering() {
        let outcome_set = OutcomeSet {
            id: "OS1".to_string(),
            name: String::new(),
            questions: vec![
                Question {
                    id: "Q1".to_string(),
                    question: String::new(),
                    deleted: false,
                    category_id: Some("C1".to_string()),
                },
                Question {
                    id: "Q2".to_string(),
                    question: String::new(),
                    deleted: true,
                    category_id: Some("C1".to_string()),
                },
            ],
            categories: vec![Category {
                id: "C1".to_string(),
                name: String::new(),
                aggregation: AggregationPolicy::Mean,
            }],
        };

        let active: Vec<_> = outcome_set.active_questions().map(|q| q.id.as_str()).collect();
        assert_eq!(active, vec!["Q1"]);
        assert!(outcome_set.has_active_questions_in_category("C1"));

        let in_c1: Vec<_> = outcome_set
            .active_questions_in_category("C1")
            .map(|q| q.id.as_str())
            .collect();
        assert_eq!(in_c1, vec!["Q1"]);
    }

    #[test]
    fn test_report_serialization_field_names() {
        let report = JocServiceReport {
            beneficiary_ids: vec!["B1".to_string()],
            question_aggregates: JocQAggs {
                first: vec![QBenAgg {
                    question_id: "Q1".to_string(),
                    value: 5.0,
                    beneficiary_ids: vec!["B1".to_string()],
                    warnings: vec![],
                }],
                last: vec![],
                delta: vec![],
            },
            category_aggregates: JocCatAggs::default(),
            excluded: Excluded::default(),
            warnings: vec![],
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"beneficiaryIDs\""));
        assert!(json.contains("\"questionAggregates\""));
        assert!(json.contains("\"categoryAggregates\""));
        assert!(json.contains("\"questionID\""));
        assert!(json.contains("\"questionIDs\""));
        assert!(json.contains("\"categoryIDs\""));
    }
}
