//! Report rendering.
//!
//! All rendering is pure: given the same case, summary and timestamp the
//! output is byte-for-byte identical. Nothing here touches files or sockets.

use chrono::{DateTime, SecondsFormat, Utc};

use tracer_core::{Case, NetworkPath};

use crate::types::{AnalysisSummary, CaseReport};

pub(crate) const RULE: &str =
    "============================================================";
const ARROW: &str = "    ↓";

/// Timestamp form used in every rendered document.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// The path from source to destination, one block per element.
///
/// Entries keep the order they were recorded in; source-side entries come
/// before destination-side ones.
pub fn render_diagram(path: &NetworkPath) -> String {
    let mut lines = vec![format!("SOURCE: {}", path.source())];

    for (_, element) in path.sequence() {
        lines.push(ARROW.to_string());
        lines.push(format!(
            "  {} ({}) - {}",
            element.name,
            element.element_type.label(),
            element.movement_type.label()
        ));
        for (key, value) in element.source_info.iter() {
            lines.push(format!("      Source → {key}: {value}"));
        }
        for (key, value) in element.destination_info.iter() {
            lines.push(format!("      Dest → {key}: {value}"));
        }
    }

    lines.push(ARROW.to_string());
    lines.push(format!("DESTINATION: {}", path.destination()));
    join_lines(lines)
}

/// Fixed-format counts block, followed by the flagged pivots and any
/// inferred lateral techniques.
pub fn render_summary(summary: &AnalysisSummary) -> String {
    let mut lines = vec![
        "--- ANALYSIS SUMMARY ---".to_string(),
        format!("Direct Traversals: {}", summary.direct_traversals),
        format!("Lateral Movements: {}", summary.lateral_movements),
        format!("Pivot Points: {}", summary.pivot_points),
    ];

    for pivot in &summary.pivots {
        lines.push(format!("  [{}] {}", pivot.position, pivot.name));
    }

    let techniques: Vec<String> = summary
        .lateral_hops
        .iter()
        .filter_map(|hop| {
            hop.technique
                .as_ref()
                .map(|t| format!("  [{}] {}: {t}", hop.position, hop.name))
        })
        .collect();
    if !techniques.is_empty() {
        lines.push("Lateral Techniques:".to_string());
        lines.extend(techniques);
    }

    join_lines(lines)
}

/// Header, diagram and summary of a case.
pub fn render_report(case: &Case, summary: &AnalysisSummary, generated_at: DateTime<Utc>) -> String {
    let header = join_lines(vec![
        RULE.to_string(),
        "TRACER ANALYSIS REPORT".to_string(),
        RULE.to_string(),
        String::new(),
        format!("Case ID: {}", case.case_id),
        format!("Threat Type: {}", case.threat_type),
        format!("Analysis Timestamp: {}", timestamp(generated_at)),
        format!("Network Elements Analyzed: {}", case.element_count()),
        String::new(),
        "--- COMPLETE NETWORK PATH ---".to_string(),
    ]);

    format!(
        "{header}{}\n{}",
        render_diagram(&case.path),
        render_summary(summary)
    )
}

/// Structured form of the report.
pub fn build_report(
    case: &Case,
    summary: AnalysisSummary,
    generated_at: DateTime<Utc>,
) -> CaseReport {
    CaseReport {
        case_id: case.case_id.clone(),
        threat_type: case.threat_type.clone(),
        created_at: case.created_at,
        generated_at,
        element_count: case.element_count(),
        source_ip: case.path.source().to_string(),
        destination_ip: case.path.destination().to_string(),
        network_elements: case.path.sequence().map(|(_, e)| e.clone()).collect(),
        summary,
    }
}

fn join_lines(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
