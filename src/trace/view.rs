//! Human-readable rendering of a trace.

use super::TraceEvent;

/// Render events as a time-ordered text log.
///
/// Each entry is a header line `#<seq> <timestamp> <KIND> <step>` followed by
/// the pretty-printed payload.
pub fn render_trace(events: &[TraceEvent]) -> String {
    let mut output = String::new();

    for event in events {
        output.push_str(&format_header(event));
        output.push('\n');

        let payload = serde_json::to_string_pretty(&event.payload)
            .unwrap_or_else(|_| event.payload.to_string());
        for line in payload.lines() {
            output.push_str("    ");
            output.push_str(line);
            output.push('\n');
        }
    }

    output
}

/// Format the one-line header of an event.
pub fn format_header(event: &TraceEvent) -> String {
    format!(
        "#{} {} {} {}",
        event.sequence,
        event.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        event.kind,
        event.step
    )
}
