//! Report-ready projections of clustered tickets.
//!
//! The HTML template works on plain display structs: every date, effort
//! and percentage is already formatted as a string here, so the template
//! stays free of logic beyond loops and conditionals.

use chrono::{NaiveDateTime, Utc};

use crate::config::Config;
use crate::domain::{format_work, TicketId, TicketSet};
use crate::filter::age_in_days;
use crate::sanitize::SanitizeResult;

/// All data needed to render one HTML report.
#[derive(Debug, Default)]
pub struct Report {
    pub component: String,
    pub date: String,
    pub old_bugs: Vec<ReportIssue>,
    pub bugs: ReportBugs,
    pub features: Vec<ReportIssue>,
    pub improvements: Vec<ReportIssue>,
    pub other: OtherReport,
    pub resources: ResourceReport,
    pub has_warnings: bool,
    pub warnings: Warnings,
}

impl Report {
    pub fn new(component: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            date: date.into(),
            ..Self::default()
        }
    }
}

/// One ticket as shown in the report.
#[derive(Debug, Clone, Default)]
pub struct ReportIssue {
    /// Link into the tracker web UI; empty when no base URL was given.
    pub url: String,
    pub key: String,
    pub summary: String,
    pub activity: String,
    pub priority: String,
    pub has_due: bool,
    pub due: String,
    pub created: String,
    pub age: i64,
    pub labels: Vec<String>,
    pub creator: String,
    pub assignee: String,
    pub status: String,
    pub fix_versions: Vec<String>,
    pub estimate: String,
    pub has_estimate: bool,
    pub time_spent: String,
    pub has_time: bool,
    /// Booked share of the original estimate in percent.
    pub progress: i64,
    pub overtime: bool,
    /// FTEs needed to still meet the due date.
    pub fte: String,
    pub has_children: bool,
    pub children: Vec<ReportIssue>,
    pub parents: Vec<Link>,
}

/// A web link rendered into the report.
#[derive(Debug, Clone)]
pub struct Link {
    pub name: String,
    pub url: String,
}

/// Bug report section.
#[derive(Debug, Default)]
pub struct ReportBugs {
    pub count: usize,
    pub week: ReportCount,
    pub month: ReportCount,
    pub stats: Vec<ReportBugStats>,
    pub counts: BugCounts,
}

/// Open-bug counts per security level and fix version. `values` rows
/// start with the security level and end with the row sum.
#[derive(Debug, Default)]
pub struct BugCounts {
    pub versions: Vec<String>,
    pub values: Vec<Vec<String>>,
}

/// Created/resolved balance of one time window.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportCount {
    pub created: i64,
    pub resolved: i64,
    pub diff: i64,
}

/// Open bugs of one fix version and security level.
#[derive(Debug, Default)]
pub struct ReportBugStats {
    pub version: String,
    pub security: String,
    pub count: usize,
    pub bugs: Vec<ReportIssue>,
}

/// Counts for ticket types outside bug/feature/improvement.
#[derive(Debug, Default)]
pub struct OtherReport {
    pub count: usize,
    pub week: Vec<OtherTypeStats>,
    pub month: Vec<OtherTypeStats>,
}

#[derive(Debug, Default)]
pub struct OtherTypeStats {
    pub type_name: String,
    pub count: usize,
    pub report: ReportCount,
}

/// Spend working hours section.
#[derive(Debug, Default)]
pub struct ResourceReport {
    pub spend: Vec<ResourceSpend>,
    /// Usage breakdowns: one inner list per grouping (type, label), each
    /// holding one group per time window.
    pub usage: Vec<Vec<ResourceGroup>>,
    pub average: Vec<ResourceAverage>,
}

#[derive(Debug, Default)]
pub struct ResourceSpend {
    pub time_range: String,
    pub effort: String,
    pub fte: String,
}

#[derive(Debug, Default)]
pub struct ResourceGroup {
    /// What the details are grouped by ("Type" or "Label").
    pub group: String,
    pub time_range: String,
    pub details: Vec<ResourceDetails>,
}

#[derive(Debug, Default)]
pub struct ResourceDetails {
    pub name: String,
    pub work: String,
    pub fte: String,
    pub percent: i64,
}

#[derive(Debug, Default)]
pub struct ResourceAverage {
    pub time_range: String,
    pub details: Vec<ResourceAverageDetails>,
}

#[derive(Debug, Default)]
pub struct ResourceAverageDetails {
    pub type_name: String,
    pub median: String,
    pub mean: String,
    pub count: usize,
}

/// Data-quality warnings section.
#[derive(Debug, Default)]
pub struct Warnings {
    pub count: usize,
    pub no_activity: Vec<ReportIssue>,
    pub invalid_bookings: Vec<InvalidBooking>,
}

/// An invalid time recording shown in the warnings section.
#[derive(Debug, Default)]
pub struct InvalidBooking {
    pub issue: ReportIssue,
    pub logs: Vec<InvalidLog>,
}

#[derive(Debug, Default)]
pub struct InvalidLog {
    pub activity: String,
    pub date: String,
    pub effort: String,
}

/// Projects one ticket into its report form, including the flattened list
/// of its open descendants.
pub fn report_issue(
    set: &TicketSet,
    id: TicketId,
    base_url: &str,
    config: &Config,
) -> ReportIssue {
    let ticket = &set[id];
    let date_format = config.date_format();
    let mut out = ReportIssue {
        key: ticket.key.clone(),
        summary: ticket.summary.clone(),
        activity: ticket.activity.clone(),
        priority: ticket.priority.clone(),
        labels: ticket.labels.clone(),
        creator: ticket.creator.clone(),
        assignee: ticket.assignee.clone(),
        status: ticket.status.clone(),
        fix_versions: ticket.fix_versions.clone(),
        ..ReportIssue::default()
    };

    if !base_url.is_empty() {
        out.url = format!("{}{}", base_url, ticket.key);
    }
    if let Some(due) = ticket.due {
        out.has_due = true;
        out.due = due.format(&date_format).to_string();
        if ticket.original_estimate > 0.1 {
            out.fte = fte_to_due(due, ticket.original_estimate - ticket.time_spent);
            out.has_estimate = true;
        }
    }
    if let Some(created) = ticket.created {
        out.created = created.format(&date_format).to_string();
        out.age = age_in_days(created);
    }
    if ticket.original_estimate > 0.001 {
        out.estimate = format_work(ticket.original_estimate);
    }
    if ticket.time_spent > 0.1 {
        out.time_spent = format_work(ticket.time_spent);
    }
    if ticket.original_estimate > 0.1 && ticket.time_spent > 0.1 {
        out.has_time = true;
        out.progress = ((ticket.time_spent / ticket.original_estimate) * 100.0) as i64;
        if ticket.time_spent > ticket.original_estimate {
            out.overtime = true;
        }
    }
    if !ticket.children.is_empty() {
        let parent = Link {
            name: ticket.key.clone(),
            url: format!("{}{}", base_url, ticket.key),
        };
        out.children = flatten_tree(set, id, &parent, base_url, config);
        out.has_children = !out.children.is_empty();
    }

    out
}

/// Flattens a ticket's subtree into a single list of its open
/// descendants, each carrying a link back to its direct parent.
fn flatten_tree(
    set: &TicketSet,
    id: TicketId,
    parent: &Link,
    base_url: &str,
    config: &Config,
) -> Vec<ReportIssue> {
    let closed = config.closed_status();
    let mut children = Vec::new();

    for &child in &set[id].children {
        let mut projected = report_issue(set, child, base_url, config);
        projected.parents.push(parent.clone());
        let nested = std::mem::take(&mut projected.children);
        if projected.status != closed {
            children.push(projected);
        }
        for nested_child in nested {
            if nested_child.status != closed {
                children.push(nested_child);
            }
        }
    }

    children
}

/// FTEs required to burn down the remaining effort by the due date,
/// assuming 8 hour days and 5 day weeks.
fn fte_to_due(due: NaiveDateTime, remaining_effort: f64) -> String {
    let needed_days = remaining_effort / 8.0;
    let remaining = due - Utc::now().naive_utc();
    let remaining_weeks = (remaining.num_hours() as f64 / 24.0) / 7.0;
    let remaining_days = remaining_weeks * 5.0;
    format!("{:.2}", needed_days / remaining_days)
}

/// Converts sanitize findings into the report's warnings section.
pub fn warnings_from(
    set: &TicketSet,
    result: &SanitizeResult,
    base_url: &str,
    config: &Config,
) -> Warnings {
    let date_format = config.date_format();
    let mut warnings = Warnings {
        count: result.count(),
        ..Warnings::default()
    };

    for &id in &result.no_activity {
        warnings
            .no_activity
            .push(report_issue(set, id, base_url, config));
    }
    for invalid in &result.invalid_bookings {
        warnings.invalid_bookings.push(InvalidBooking {
            issue: report_issue(set, invalid.ticket, base_url, config),
            logs: invalid
                .logs
                .iter()
                .map(|log| InvalidLog {
                    activity: log.activity.clone(),
                    date: log
                        .date
                        .map(|d| d.format(&date_format).to_string())
                        .unwrap_or_default(),
                    effort: format_work(log.hours),
                })
                .collect(),
        });
    }

    warnings
}
