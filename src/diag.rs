//! Diagnostic reporter for session metadata and faults.
//!
//! Purely side-effecting: every function formats borrowed data through
//! `tracing` and returns nothing. Unknown or missing fields are simply
//! skipped, so reporting is best-effort and cannot propagate failures.

use tracing::{error, info};

use crate::mqtt::session::{SessionFault, TransportDiagnostics};

/// Logs the key/value metadata pairs attached to a session event.
pub fn report_user_properties(properties: &[(String, String)]) {
    for (key, value) in properties {
        info!(key = %key, value = %value, "Session user property");
    }
}

/// Logs the correlation byte sequence attached to a message.
pub fn report_correlation_data(data: &[u8]) {
    info!(correlation = %String::from_utf8_lossy(data), "Correlation data attached");
}

/// Logs a session fault. Transport faults carry their nested numeric
/// codes and an OS-derived description of the lowest-level one; unknown
/// commands are not faults and are reported by the interpreter instead.
pub fn report_fault(fault: &SessionFault) {
    match fault {
        SessionFault::Protocol(detail) => error!(detail = %detail, "Session protocol error"),
        SessionFault::Transport(diagnostics) => report_transport(diagnostics),
    }
}

fn report_transport(diagnostics: &TransportDiagnostics) {
    error!(detail = %diagnostics.detail, "Transport error");
    for (label, code) in diagnostics.nonzero_codes() {
        error!(code, "Reported {}", label);
    }
    if let Some(description) = diagnostics.errno_description() {
        error!(description = %description, "Last socket error");
    }
}
