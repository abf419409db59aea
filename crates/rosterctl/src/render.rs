//! Human-readable output for responses and events

use roster_api::{EventPayload, ResponsePayload, SessionRecord};
use roster_util::{format_duration, format_timestamp};
use std::fmt::Write;

pub fn response(payload: &ResponsePayload) -> String {
    let mut out = String::new();

    match payload {
        ResponsePayload::ShiftStarted {
            user_id,
            started_at,
            total_seconds,
        } => {
            let _ = writeln!(out, "{} is now on duty", user_id);
            let _ = writeln!(out, "Start: {}", format_timestamp(*started_at));
            let _ = write!(out, "Total duty time: {}", format_duration(*total_seconds));
        }
        ResponsePayload::ShiftStopped {
            record,
            total_seconds,
        } => {
            let _ = writeln!(out, "{} is now off duty", record.user_id);
            let _ = writeln!(out, "Shift: {}", format_duration(record.duration_secs()));
            let _ = write!(out, "Total duty time: {}", format_duration(*total_seconds));
        }
        ResponsePayload::Status(status) => {
            let state = if status.on_duty { "On Duty" } else { "Off Duty" };
            let _ = writeln!(out, "{}: {}", status.user_id, state);
            if let (Some(start), Some(elapsed)) = (status.started_at, status.current_elapsed) {
                let _ = writeln!(out, "Current shift started: {}", format_timestamp(start));
                let _ = writeln!(out, "Current shift length: {}", format_duration(elapsed));
            }
            let _ = write!(
                out,
                "Total duty time: {}",
                format_duration(status.total_seconds)
            );
        }
        ResponsePayload::TotalDutyTime {
            user_id,
            total_seconds,
        } => {
            let _ = write!(out, "{}: {}", user_id, format_duration(*total_seconds));
        }
        ResponsePayload::History { user_id, records } => {
            if records.is_empty() {
                let _ = write!(out, "No shifts recorded for {}", user_id);
            }
            for (i, record) in records.iter().enumerate() {
                if i > 0 {
                    out.push_str("\n\n");
                }
                let _ = write!(out, "Shift {}\n{}", i + 1, history_entry(record));
            }
        }
        ResponsePayload::Leaderboard { entries } => {
            if entries.is_empty() {
                out.push_str("No shifts recorded yet");
            }
            let lines: Vec<String> = entries
                .iter()
                .map(|e| {
                    format!(
                        "{}. {} - {}",
                        e.rank,
                        e.user_id,
                        format_duration(e.total_seconds)
                    )
                })
                .collect();
            out.push_str(&lines.join("\n"));
        }
        ResponsePayload::ActiveShifts { shifts } => {
            if shifts.is_empty() {
                out.push_str("No active shifts.");
            }
            let blocks: Vec<String> = shifts
                .iter()
                .map(|s| {
                    format!(
                        "{}\n- Start: {}\n- Duration: {}",
                        s.user_id,
                        format_timestamp(s.started_at),
                        format_duration(s.elapsed_seconds)
                    )
                })
                .collect();
            out.push_str(&blocks.join("\n\n"));
        }
        ResponsePayload::TimeAdded { record } => {
            let _ = write!(
                out,
                "Added {} to {}",
                format_duration(record.duration_secs()),
                record.user_id
            );
        }
        ResponsePayload::TimeRemoved(outcome) => {
            let _ = write!(
                out,
                "Removed {} from {}",
                format_duration(outcome.removed_seconds),
                outcome.user_id
            );
            match &outcome.adjusted {
                Some(record) => {
                    let _ = write!(
                        out,
                        "\nShift now lasts {}",
                        format_duration(record.duration_secs())
                    );
                }
                None => out.push_str("\nShift was used up and deleted"),
            }
        }
        ResponsePayload::Wiped {
            active_cleared,
            history_cleared,
        } => {
            let _ = write!(
                out,
                "Ledger wiped: {} active and {} recorded shifts removed",
                active_cleared, history_cleared
            );
        }
        ResponsePayload::Subscribed { client_id } => {
            let _ = write!(out, "Subscribed as {}", client_id);
        }
        ResponsePayload::Unsubscribed => out.push_str("Unsubscribed"),
        ResponsePayload::Health(health) => {
            let _ = write!(
                out,
                "live: {}\nready: {}\nstore: {}\non duty: {}\nrecorded shifts: {}",
                health.live,
                health.ready,
                if health.store_ok { "ok" } else { "failing" },
                health.on_duty_count,
                health.history_len
            );
        }
        ResponsePayload::Pong => out.push_str("pong"),
    }

    out
}

fn history_entry(record: &SessionRecord) -> String {
    let end = match record.end {
        Some(end) => format_timestamp(end),
        None => "Ongoing".to_string(),
    };
    let duration = match record.duration {
        Some(secs) => format_duration(secs),
        None => "N/A".to_string(),
    };
    format!(
        "Start: {}\nEnd: {}\nDuration: {}",
        format_timestamp(record.start),
        end,
        duration
    )
}

pub fn event(payload: &EventPayload) -> String {
    match payload {
        EventPayload::ShiftStarted {
            user_id, actor, ..
        } if user_id == actor => format!("{} went on duty", user_id),
        EventPayload::ShiftStarted { user_id, actor, .. } => {
            format!("{} put {} on duty", actor, user_id)
        }
        EventPayload::ShiftEnded { actor, record } => {
            let mut line = format!(
                "{} went off duty after {}",
                record.user_id,
                format_duration(record.duration_secs())
            );
            if *actor != record.user_id {
                let _ = write!(line, " (by {})", actor);
            }
            line
        }
        EventPayload::TimeAdded { actor, record } => format!(
            "{} added {} to {}",
            actor,
            format_duration(record.duration_secs()),
            record.user_id
        ),
        EventPayload::TimeRemoved {
            user_id,
            actor,
            removed_seconds,
        } => format!(
            "{} removed {} from {}",
            actor,
            format_duration(*removed_seconds),
            user_id
        ),
        EventPayload::LedgerWiped {
            actor,
            active_cleared,
            history_cleared,
        } => format!(
            "{} wiped the ledger ({} active, {} recorded)",
            actor, active_cleared, history_cleared
        ),
    }
}
