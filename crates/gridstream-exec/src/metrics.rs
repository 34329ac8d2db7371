//! Tracing hooks.
//!
//! No telemetry stack is pulled in here; the binary layer installs a
//! subscriber. Without the `tracing` feature every hook is a no-op.

use std::time::Duration;

use crate::report::ExportReport;

#[cfg(feature = "tracing")]
pub fn emit(event: &'static str, key_values: &[(&'static str, u64)]) {
    let span = tracing::span!(tracing::Level::TRACE, "gridstream", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::trace!(event, key = *k, value = *v, "metric");
    }
}

#[cfg(not(feature = "tracing"))]
pub fn emit(_event: &'static str, _key_values: &[(&'static str, u64)]) { /* no-op */
}

/// Final counters of a session, one metric per field.
pub fn emit_report(event: &'static str, report: &ExportReport) {
    emit(
        event,
        &[
            ("logical_rows", report.logical_rows),
            ("physical_rows", report.physical_rows),
            ("sheets", u64::from(report.sheets)),
            ("recycles", report.recycles),
            ("periodic_flushes", report.periodic_flushes),
            ("truncated_cells", report.truncated_cells),
            ("split_cells", report.split_cells),
            ("peak_estimated_bytes", report.peak_estimated_bytes),
            ("bytes_written", report.bytes_written.unwrap_or(0)),
            ("total_payload_bytes", report.total_payload_bytes),
            ("max_row_payload_bytes", report.max_row_payload_bytes),
            ("mean_row_payload_bytes", report.mean_row_payload_bytes),
            ("elapsed_ms", duration_ms(report.elapsed)),
        ],
    );
}

/// Running counters, emitted every `flush_interval_rows` logical rows.
pub fn emit_progress(report: &ExportReport, elapsed: Duration) {
    emit(
        "progress",
        &[
            ("logical_rows", report.logical_rows),
            ("physical_rows", report.physical_rows),
            ("total_payload_bytes", report.total_payload_bytes),
            ("max_row_payload_bytes", report.max_row_payload_bytes),
            ("mean_row_payload_bytes", report.mean_row_payload_bytes),
            ("elapsed_ms", duration_ms(elapsed)),
        ],
    );
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
