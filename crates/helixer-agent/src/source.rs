//! Newline-delimited JSON event source.

use crate::hub::EventHub;
use helixer_core::StateChangedEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Read state-changed events, one JSON object per line, into the hub.
///
/// Blank lines are skipped and malformed lines are logged and skipped.
/// Returns the number of events delivered to at least one subscriber.
///
/// # Errors
///
/// Returns error if reading from `reader` fails.
pub async fn pump_lines<R>(reader: R, hub: &EventHub) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    let mut dispatched = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match StateChangedEvent::from_json(line) {
            Ok(event) => {
                if hub.dispatch(event).await > 0 {
                    dispatched += 1;
                }
            }
            Err(err) => {
                tracing::warn!(line = line_no, error = %err, "Skipping malformed event");
            }
        }
    }

    tracing::info!(lines = line_no, dispatched, "Event source exhausted");
    Ok(dispatched)
}
