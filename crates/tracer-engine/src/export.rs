//! Shareable case exports with BLAKE3 tamper evidence.
//!
//! An export bundles the human-readable report with the raw case document so
//! it can be handed to another team or imported into other tools. The content
//! hash covers the canonical (compact) JSON of the case, so any edit to the
//! embedded document is detectable by re-hashing it.

use chrono::{DateTime, Utc};

use tracer_core::{Case, CaseId, CoreError};

use crate::error::Result;
use crate::report::{render_report, timestamp};
use crate::types::AnalysisSummary;

const BANNER: &str =
    "================================================================================";

/// Hex-encoded BLAKE3 hash of the canonical case document.
pub fn document_hash(case: &Case) -> Result<String> {
    let json = serde_json::to_vec(case).map_err(CoreError::from)?;
    Ok(blake3::hash(&json).to_hex().to_string())
}

/// File name an export is written under.
pub fn export_file_name(case_id: &CaseId, exported_at: DateTime<Utc>) -> String {
    format!(
        "TRACER_Case_{case_id}_{}.txt",
        exported_at.format("%Y%m%d_%H%M%S")
    )
}

/// Render the full export document.
pub fn render_export(
    case: &Case,
    summary: &AnalysisSummary,
    exported_at: DateTime<Utc>,
) -> Result<String> {
    let hash = document_hash(case)?;
    let document = serde_json::to_string_pretty(case).map_err(CoreError::from)?;

    let mut out = String::new();
    for line in [
        BANNER,
        "TRACER FRAMEWORK - CASE EXPORT",
        BANNER,
    ] {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&format!("Export Date: {}\n", timestamp(exported_at)));
    out.push_str(&format!("Case ID: {}\n", case.case_id));
    out.push_str(&format!("Content Hash (BLAKE3): {hash}\n"));
    out.push_str(BANNER);
    out.push_str("\n\n");

    out.push_str(&render_report(case, summary, exported_at));

    out.push('\n');
    out.push_str(BANNER);
    out.push_str("\nRAW CASE DATA (JSON)\n");
    out.push_str(BANNER);
    out.push('\n');
    out.push_str("# This JSON data can be imported into other tools or used for analysis\n\n");
    out.push_str(&document);
    out.push_str("\n\n");
    out.push_str(BANNER);
    out.push_str("\nEND OF CASE EXPORT\n");
    out.push_str(BANNER);
    out.push('\n');

    Ok(out)
}
