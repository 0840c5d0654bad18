//! Shared key generation for report artifacts.

use uuid::Uuid;

/// Storage key of the rendered artifact for a report: `reports/{report_id}.pdf`.
pub fn report_artifact_key(report_id: Uuid) -> String {
    format!("reports/{}.pdf", report_id)
}
