//! Work-effort and resolution-time statistics.

use chrono::NaiveDateTime;
use std::fmt;

use crate::domain::{format_work, TicketId, TicketSet, Work};
use crate::filter::{
    closed_last_month, closed_last_quarter, closed_last_week, closed_last_year, days_back,
    months_back, types,
};

/// Booked-effort statistics over one group of tickets.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub mean: Work,
    pub median: Work,
    /// Total hours booked inside the observed time range.
    pub overall: Work,
    pub count: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean: {}, median: {}, overall: {}, count: {}",
            format_work(self.mean),
            format_work(self.median),
            format_work(self.overall),
            self.count
        )
    }
}

/// [`Stats`] per reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeRanges {
    pub week: Stats,
    pub month: Stats,
    pub quarter: Stats,
    pub year: Stats,
}

/// Mean of the values; zero for an empty slice.
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of the values; zero for an empty slice.
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sums all work logged on the given tickets after `cutoff`.
pub fn work_after(set: &TicketSet, ids: &[TicketId], cutoff: NaiveDateTime) -> Work {
    ids.iter()
        .flat_map(|&id| set[id].work_logs.iter())
        .filter(|log| log.date.map(|d| d > cutoff).unwrap_or(false))
        .map(|log| log.hours)
        .sum()
}

/// Time-spent statistics for one group of tickets; `overall` counts only
/// work booked after `start`.
pub fn resolution_time(set: &TicketSet, ids: &[TicketId], start: NaiveDateTime) -> Stats {
    let times: Vec<f64> = ids.iter().map(|&id| set[id].time_spent).collect();
    Stats {
        mean: mean(&times),
        median: median(&times),
        overall: work_after(set, ids, start),
        count: ids.len(),
    }
}

/// Resolution-time statistics per ticket type, progressively narrowed
/// from the last year down to the last week. Types without tickets closed
/// in the last year are skipped. Entries keep first-encounter type order
/// so report tables stay stable between runs.
pub fn resolution_times_by_type(set: &TicketSet, ids: &[TicketId]) -> Vec<(String, TimeRanges)> {
    let mut result = Vec::new();

    for ticket_type in types(set, ids) {
        let type_ids = crate::filter::by_type(set, ids, &ticket_type);

        let year_ids = closed_last_year(set, &type_ids);
        let year = resolution_time(set, &year_ids, months_back(12));
        if year.count == 0 {
            // nothing resolved recently, nothing to average
            continue;
        }

        let quarter_ids = closed_last_quarter(set, &year_ids);
        let month_ids = closed_last_month(set, &quarter_ids);
        let week_ids = closed_last_week(set, &month_ids);

        result.push((
            ticket_type,
            TimeRanges {
                week: resolution_time(set, &week_ids, days_back(7)),
                month: resolution_time(set, &month_ids, months_back(1)),
                quarter: resolution_time(set, &quarter_ids, months_back(3)),
                year,
            },
        ));
    }

    result
}

/// Booked hours for the last week, month, quarter and year.
pub fn hours_per_window(set: &TicketSet, ids: &[TicketId]) -> [Work; 4] {
    [
        work_after(set, ids, days_back(7)),
        work_after(set, ids, months_back(1)),
        work_after(set, ids, months_back(3)),
        work_after(set, ids, months_back(12)),
    ]
}

/// Full-time-equivalents for the four windows, assuming a 40 hour week
/// and a 4.25 week month.
pub fn fte_per_window(hours: &[Work; 4]) -> [f64; 4] {
    [
        hours[0] / 40.0,
        hours[1] / (40.0 * 4.25),
        hours[2] / (40.0 * 4.25 * 3.0),
        hours[3] / (40.0 * 52.0),
    ]
}
