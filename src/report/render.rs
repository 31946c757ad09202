//! Markdown and JSON report rendering.
//!
//! Turns a finished [`JocServiceReport`] into output documents. The JSON
//! form preserves the report's field names as-is; Markdown is assembled
//! from per-section helpers.

use crate::models::{
    CatBenAgg, Excluded, JocServiceReport, OutcomeSet, QBenAgg, ReportMetadata,
};
use anyhow::{Context, Result};
use serde::Serialize;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(
    report: &JocServiceReport,
    outcome_set: &OutcomeSet,
    metadata: &ReportMetadata,
) -> String {
    let mut output = String::new();

    output.push_str("# Journey of Change Report\n\n");
    output.push_str(&generate_metadata_section(report, metadata));
    output.push_str(&generate_cohort_section(report));
    output.push_str(&generate_question_section(report, outcome_set));
    output.push_str(&generate_category_section(report, outcome_set));
    output.push_str(&generate_excluded_section(&report.excluded, outcome_set));
    output.push_str(&generate_footer());

    output
}

/// Generate the JSON report: metadata plus the report body, which keeps
/// the store's field naming (`beneficiaryIDs`, `questionAggregates`, ...).
pub fn generate_json_report(
    report: &JocServiceReport,
    metadata: &ReportMetadata,
) -> Result<String> {
    #[derive(Serialize)]
    struct JsonReport<'a> {
        metadata: &'a ReportMetadata,
        report: &'a JocServiceReport,
    }

    serde_json::to_string_pretty(&JsonReport { metadata, report })
        .context("Failed to serialize report to JSON")
}

fn generate_metadata_section(report: &JocServiceReport, metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Outcome Set:** {} (`{}`)\n",
        metadata.outcome_set_name, metadata.outcome_set_id
    ));
    section.push_str(&format!(
        "- **Reporting Window:** {} to {}\n",
        metadata.from.format("%Y-%m-%d %H:%M UTC"),
        metadata.to.format("%Y-%m-%d %H:%M UTC")
    ));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Beneficiaries:** {}\n",
        report.beneficiary_ids.len()
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_cohort_section(report: &JocServiceReport) -> String {
    let mut section = String::new();

    section.push_str("## Cohort\n\n");
    if report.beneficiary_ids.is_empty() {
        section.push_str("No beneficiary had both a qualifying first and last meeting.\n\n");
    } else {
        for beneficiary in &report.beneficiary_ids {
            section.push_str(&format!("- {}\n", beneficiary));
        }
        section.push('\n');
    }

    if !report.warnings.is_empty() {
        section.push_str("### Dropped from this report\n\n");
        for warning in &report.warnings {
            section.push_str(&format!("- ⚠️ {}\n", warning));
        }
        section.push('\n');
    }

    section
}

fn generate_question_section(report: &JocServiceReport, outcome_set: &OutcomeSet) -> String {
    let aggs = &report.question_aggregates;
    if aggs.first.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Question Aggregates\n\n");
    section.push_str("| Question | First | Last | Delta | Beneficiaries |\n");
    section.push_str("|----------|-------|------|-------|---------------|\n");

    for first in &aggs.first {
        let last = find_question(&aggs.last, &first.question_id);
        let delta = find_question(&aggs.delta, &first.question_id);
        section.push_str(&format!(
            "| {} | {:.2} | {} | {} | {} |\n",
            question_label(outcome_set, &first.question_id),
            first.value,
            format_value(last.map(|a| a.value)),
            format_value(delta.map(|a| a.value)),
            first.beneficiary_ids.len()
        ));
    }
    section.push('\n');
    section.push_str(&generate_target_warnings(
        aggs.first
            .iter()
            .map(|a| (question_label(outcome_set, &a.question_id), &a.warnings)),
    ));

    section
}

fn generate_category_section(report: &JocServiceReport, outcome_set: &OutcomeSet) -> String {
    let aggs = &report.category_aggregates;
    if aggs.first.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Category Aggregates\n\n");
    section.push_str("| Category | First | Last | Delta | Beneficiaries |\n");
    section.push_str("|----------|-------|------|-------|---------------|\n");

    for first in &aggs.first {
        let last = find_category(&aggs.last, &first.category_id);
        let delta = find_category(&aggs.delta, &first.category_id);
        section.push_str(&format!(
            "| {} | {:.2} | {} | {} | {} |\n",
            category_label(outcome_set, &first.category_id),
            first.value,
            format_value(last.map(|a| a.value)),
            format_value(delta.map(|a| a.value)),
            first.beneficiary_ids.len()
        ));
    }
    section.push('\n');
    section.push_str(&generate_target_warnings(
        aggs.first
            .iter()
            .map(|a| (category_label(outcome_set, &a.category_id), &a.warnings)),
    ));

    section
}

/// Per-target warnings, taken from the first phase; the same warnings are
/// attached to every phase of a target.
fn generate_target_warnings<'a>(
    targets: impl Iterator<Item = (String, &'a Vec<String>)>,
) -> String {
    let mut lines = String::new();
    for (label, warnings) in targets {
        for warning in warnings {
            lines.push_str(&format!("- ⚠️ {}: {}\n", label, warning));
        }
    }

    if lines.is_empty() {
        return String::new();
    }
    format!("### Warnings\n\n{}\n", lines)
}

fn generate_excluded_section(excluded: &Excluded, outcome_set: &OutcomeSet) -> String {
    if excluded.question_ids.is_empty()
        && excluded.category_ids.is_empty()
        && excluded.beneficiary_ids.is_empty()
    {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Excluded\n\n");

    if !excluded.question_ids.is_empty() {
        let labels: Vec<String> = excluded
            .question_ids
            .iter()
            .map(|id| question_label(outcome_set, id))
            .collect();
        section.push_str(&format!("- **Questions:** {}\n", labels.join(", ")));
    }
    if !excluded.category_ids.is_empty() {
        let labels: Vec<String> = excluded
            .category_ids
            .iter()
            .map(|id| category_label(outcome_set, id))
            .collect();
        section.push_str(&format!("- **Categories:** {}\n", labels.join(", ")));
    }
    if !excluded.beneficiary_ids.is_empty() {
        section.push_str(&format!(
            "- **Beneficiaries:** {}\n",
            excluded.beneficiary_ids.join(", ")
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    format!(
        "---\n*Generated by jocreport v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

fn find_question<'a>(aggs: &'a [QBenAgg], question_id: &str) -> Option<&'a QBenAgg> {
    aggs.iter().find(|a| a.question_id == question_id)
}

fn find_category<'a>(aggs: &'a [CatBenAgg], category_id: &str) -> Option<&'a CatBenAgg> {
    aggs.iter().find(|a| a.category_id == category_id)
}

fn format_value(value: Option<f32>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

fn question_label(outcome_set: &OutcomeSet, question_id: &str) -> String {
    match outcome_set.question(question_id) {
        Some(q) if !q.question.is_empty() => format!("{} (`{}`)", q.question, question_id),
        _ => format!("`{}`", question_id),
    }
}

fn category_label(outcome_set: &OutcomeSet, category_id: &str) -> String {
    match outcome_set.category(category_id) {
        Some(c) if !c.name.is_empty() => format!("{} (`{}`)", c.name, category_id),
        _ => format!("`{}`", category_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AggregationPolicy, Category, JocCatAggs, JocQAggs, Question,
    };
    use chrono::{TimeZone, Utc};

    fn outcome_set() -> OutcomeSet {
        OutcomeSet {
            id: "OS1".to_string(),
            name: "Wellbeing".to_string(),
            questions: vec![Question {
                id: "Q1".to_string(),
                question: "How are you feeling?".to_string(),
                deleted: false,
                category_id: Some("C1".to_string()),
            }],
            categories: vec![Category {
                id: "C1".to_string(),
                name: "Mood".to_string(),
                aggregation: AggregationPolicy::Mean,
            }],
        }
    }

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            outcome_set_id: "OS1".to_string(),
            outcome_set_name: "Wellbeing".to_string(),
            from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            generated_at: Utc.with_ymd_and_hms(2024, 2, 2, 9, 30, 0).unwrap(),
            duration_seconds: 0.2,
        }
    }

    fn sample_report() -> JocServiceReport {
        let agg = |value: f32| QBenAgg {
            question_id: "Q1".to_string(),
            value,
            beneficiary_ids: vec!["B1".to_string()],
            warnings: vec![],
        };
        JocServiceReport {
            beneficiary_ids: vec!["B1".to_string()],
            question_aggregates: JocQAggs {
                first: vec![agg(5.0)],
                last: vec![agg(9.0)],
                delta: vec![agg(4.0)],
            },
            category_aggregates: JocCatAggs {
                first: vec![CatBenAgg {
                    category_id: "C1".to_string(),
                    value: 5.0,
                    beneficiary_ids: vec!["B1".to_string()],
                    warnings: vec!["Beneficiary B2 not included as they had no answers belonging to the category".to_string()],
                }],
                last: vec![],
                delta: vec![],
            },
            excluded: Excluded {
                question_ids: vec![],
                category_ids: vec!["C2".to_string()],
                beneficiary_ids: vec![],
            },
            warnings: vec!["Beneficiary B3 was not included as they only have a single meeting recorded".to_string()],
        }
    }

    #[test]
    fn test_markdown_report_sections() {
        let markdown = generate_markdown_report(&sample_report(), &outcome_set(), &metadata());

        assert!(markdown.contains("# Journey of Change Report"));
        assert!(markdown.contains("- **Outcome Set:** Wellbeing (`OS1`)"));
        assert!(markdown.contains("## Question Aggregates"));
        assert!(markdown.contains("How are you feeling? (`Q1`) | 5.00 | 9.00 | 4.00 | 1"));
        assert!(markdown.contains("Mood (`C1`)"));
        assert!(markdown.contains("### Dropped from this report"));
        assert!(markdown.contains("only have a single meeting recorded"));
        assert!(markdown.contains("## Excluded"));
        assert!(markdown.contains("- **Categories:** `C2`"));
    }

    #[test]
    fn test_markdown_omits_empty_sections() {
        let mut report = sample_report();
        report.warnings.clear();
        report.excluded = Excluded::default();
        report.category_aggregates = JocCatAggs::default();

        let markdown = generate_markdown_report(&report, &outcome_set(), &metadata());
        assert!(!markdown.contains("### Dropped from this report"));
        assert!(!markdown.contains("## Excluded"));
        assert!(!markdown.contains("## Category Aggregates"));
    }

    #[test]
    fn test_missing_phase_renders_placeholder() {
        // The category has a first aggregate but no last/delta entries.
        let markdown = generate_markdown_report(&sample_report(), &outcome_set(), &metadata());
        assert!(markdown.contains("Mood (`C1`) | 5.00 | - | - | 1"));
    }

    #[test]
    fn test_json_report_preserves_field_names() {
        let json = generate_json_report(&sample_report(), &metadata()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["report"]["beneficiaryIDs"][0], "B1");
        assert_eq!(
            value["report"]["questionAggregates"]["first"][0]["questionID"],
            "Q1"
        );
        assert_eq!(value["report"]["excluded"]["categoryIDs"][0], "C2");
        assert_eq!(value["metadata"]["outcomeSetID"], "OS1");
    }

    #[test]
    fn test_target_warnings_render_with_label() {
        let markdown = generate_markdown_report(&sample_report(), &outcome_set(), &metadata());
        assert!(markdown.contains("### Warnings"));
        assert!(markdown.contains("Mood (`C1`): Beneficiary B2 not included"));
    }
}
