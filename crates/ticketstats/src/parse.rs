//! CSV ingestion: maps tracker export records to [`Ticket`] objects.
//!
//! The export is a semicolon-delimited CSV with one header row. Column
//! names follow the Jira-style export convention; list-valued fields
//! (versions, components, labels, links, work logs) appear as repeated
//! columns. Broken field values are logged and skipped, only I/O and
//! CSV-shape problems abort the run.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::error;

use crate::config::Config;
use crate::domain::{Ticket, TicketSet, Work, WorkLog};

/// Parses the CSV export at `path` into a ticket set, in record order.
pub fn parse_csv(path: &Path, config: &Config) -> Result<TicketSet> {
    let file = File::open(path)
        .with_context(|| format!("unable to read ticket export {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .with_context(|| format!("{} is not valid CSV", path.display()))?
        .clone();

    let mut set = TicketSet::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("{} is not valid CSV", path.display()))?;
        let mut ticket = Ticket::new();
        for (i, value) in record.iter().enumerate() {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let Some(column) = headers.get(i) else {
                continue;
            };
            apply_field(&mut ticket, column, value, config);
        }
        set.push(ticket);
    }
    Ok(set)
}

/// Maps a single CSV cell onto its ticket field. Unknown columns are
/// ignored.
fn apply_field(ticket: &mut Ticket, column: &str, value: &str, config: &Config) {
    match column {
        "Summary" => ticket.summary = value.to_string(),
        "Issue key" => ticket.key = value.to_string(),
        "Issue id" => ticket.id = value.to_string(),
        "Parent id" => ticket.parent_id = Some(value.to_string()),
        "Issue Type" => ticket.ticket_type = value.to_string(),
        "Status" => ticket.status = value.to_string(),
        "Priority" => ticket.priority = value.to_string(),
        "Assignee" => ticket.assignee = value.to_string(),
        "Creator" => ticket.creator = value.to_string(),
        "Created" => ticket.created = convert_date(value, config),
        "Updated" => ticket.updated = convert_date(value, config),
        "Last Viewed" => ticket.last_viewed = convert_date(value, config),
        "Affects Version/s" => ticket.affects_versions.push(value.to_string()),
        "Fix Version/s" => ticket.fix_versions.push(value.to_string()),
        "Component/s" => ticket.components.push(value.to_string()),
        "Log Work" => ticket.work_logs.push(convert_work_log(value, config)),
        "Original Estimate" => ticket.original_estimate = convert_work(value),
        "Remaining Estimate" => ticket.remaining_estimate = convert_work(value),
        "Time Spent" => ticket.time_spent = convert_work(value),
        "Σ Original Estimate" => ticket.sum_original_estimate = convert_work(value),
        "Σ Remaining Estimate" => ticket.sum_remaining_estimate = convert_work(value),
        "Σ Time Spent" => ticket.sum_time_spent = convert_work(value),
        "Security Level" => ticket.security_level = value.to_string(),
        "Labels" => ticket.labels.push(value.to_string()),
        "Resolution" => ticket.resolution = value.to_string(),
        "Resolved" => ticket.resolved = convert_date(value, config),
        "Due Date" => ticket.due = convert_date(value, config),
        "Outward issue link (Blocks)" => ticket.link_blocks.push(value.to_string()),
        "Outward issue link (Causes)" => ticket.link_causes.push(value.to_string()),
        "Outward issue link (Cloners)" => ticket.link_cloners.push(value.to_string()),
        "Outward issue link (Dependency)" => ticket.link_dependencies.push(value.to_string()),
        "Outward issue link (Duplicate)" => ticket.link_duplicates.push(value.to_string()),
        "Outward issue link (Issue split)" => ticket.link_splits.push(value.to_string()),
        "Outward issue link (Part)" => ticket.link_parts.push(value.to_string()),
        "Outward issue link (Relates)" | "Outward issue link (Relation)" => {
            ticket.link_relates.push(value.to_string())
        }
        "Outward issue link (Triggers)" => ticket.link_triggers.push(value.to_string()),
        "Outward issue link (parent)" => ticket.link_parents.push(value.to_string()),
        other => {
            if other == config.custom_external_id() {
                ticket.external_id = value.to_string();
            } else if other == config.custom_supplier_reference() {
                ticket.supplier_reference = value.to_string();
            } else if other == config.custom_variant() {
                ticket.variant = value.to_string();
            } else if other == config.custom_account() {
                ticket.activity = value.to_string();
            } else if other == config.custom_category() {
                ticket.category = value.to_string();
            }
        }
    }
}

/// Converts an export work value (seconds as string) to hours. Broken
/// values count as zero.
fn convert_work(value: &str) -> Work {
    match value.parse::<i64>() {
        Ok(seconds) => seconds as f64 / 3600.0,
        Err(err) => {
            error!("invalid work value {:?}: {}", value, err);
            0.0
        }
    }
}

/// Converts an export timestamp using the configured format. Broken
/// values leave the field unset.
fn convert_date(value: &str, config: &Config) -> Option<NaiveDateTime> {
    match NaiveDateTime::parse_from_str(value, &config.export_date_format()) {
        Ok(date) => Some(date),
        Err(err) => {
            error!("invalid date {:?}: {}", value, err);
            None
        }
    }
}

/// Converts a work log cell to a [`WorkLog`].
///
/// The cell is a multi-line blob: an optional `ExecutionActivity:<value>`
/// line anywhere in the text, and a last line of the form
/// `<comment>;<date>;<user>;<seconds>` (the user is ignored).
fn convert_work_log(value: &str, config: &Config) -> WorkLog {
    let mut activity = String::new();
    for line in value.lines() {
        if let Some(rest) = line.strip_prefix("ExecutionActivity:") {
            activity = rest.to_string();
        }
    }

    let last = value.lines().last().unwrap_or_default();
    let mut fields = last.rsplit(';');
    let hours = fields.next().map(convert_work).unwrap_or(0.0);
    let _user = fields.next();
    let date = fields.next().and_then(|d| convert_date(d, config));

    WorkLog {
        hours,
        date,
        activity,
    }
}
