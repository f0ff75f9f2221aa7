//! Data-quality checks on time bookings.
//!
//! Every ticket carries a booking account; its work logs are expected to
//! be booked against that activity. Tickets without any discoverable
//! activity and bookings recorded against the wrong activity feed the
//! warnings section of the report.

use tracing::warn;

use crate::domain::{Ticket, TicketId, TicketSet, WorkLog};
use crate::filter::months_back;

/// Collected data-quality findings of one sweep.
#[derive(Debug, Default)]
pub struct SanitizeResult {
    /// Tickets with no booking activity anywhere.
    pub no_activity: Vec<TicketId>,
    /// Tickets with work logs booked against the wrong activity.
    pub invalid_bookings: Vec<InvalidBookings>,
}

impl SanitizeResult {
    pub fn count(&self) -> usize {
        self.no_activity.len() + self.invalid_bookings.len()
    }
}

/// Offending work logs of one ticket.
#[derive(Debug)]
pub struct InvalidBookings {
    pub ticket: TicketId,
    pub logs: Vec<WorkLog>,
}

/// The activity all of a ticket's bookings are expected to carry: the
/// booking account field, or the first work log carrying one.
pub fn expected_activity(ticket: &Ticket) -> String {
    let mut activity = ticket.activity.clone();
    if activity.is_empty() {
        warn!("activity not defined in ticket {}", ticket.key);
        if let Some(log) = ticket.work_logs.iter().find(|l| !l.activity.is_empty()) {
            activity = log.activity.clone();
        }
    }
    activity
}

/// Work logs whose activity is missing or differs from the expected one.
fn invalid_logs(ticket: &Ticket, expected: &str) -> Vec<WorkLog> {
    let mut invalid = Vec::new();
    for log in &ticket.work_logs {
        if log.activity.is_empty() {
            warn!(
                "time booking without activity on {}: expected {:?}, booking {}",
                ticket.key, expected, log
            );
            invalid.push(log.clone());
        } else if log.activity != expected {
            warn!(
                "time booking with wrong activity on {}: expected {:?}, booking {}",
                ticket.key, expected, log
            );
            invalid.push(log.clone());
        }
    }
    invalid
}

/// Checks all given tickets. With `ignore_old` set, tickets created more
/// than a month ago are skipped in the no-activity check (historic
/// tickets predate the booking-account convention); wrong-activity
/// bookings are always reported.
pub fn sanitize(
    set: &TicketSet,
    ids: &[TicketId],
    ignore_old: bool,
) -> SanitizeResult {
    let old_cutoff = months_back(1);
    let mut result = SanitizeResult::default();

    for &id in ids {
        let ticket = &set[id];
        let expected = expected_activity(ticket);

        if expected.is_empty() {
            warn!("no activity found for ticket {}", ticket.key);
            let is_old = ticket
                .created
                .map(|c| c < old_cutoff)
                .unwrap_or(true);
            if !(ignore_old && is_old) {
                result.no_activity.push(id);
            }
            continue;
        }

        let logs = invalid_logs(ticket, &expected);
        if !logs.is_empty() {
            result.invalid_bookings.push(InvalidBookings { ticket: id, logs });
        }
    }

    result
}
