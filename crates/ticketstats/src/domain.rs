//! Core domain types for the ticket report pipeline.
//!
//! All tickets of one export live in a single [`TicketSet`] arena and refer
//! to each other through [`TicketId`] indices. The clustering pass mutates
//! the `children`/`parents` lists in place, so every downstream view (flat
//! filters, tree walks, report projections) observes one consistent graph.

use chrono::NaiveDateTime;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Logged work time in hours.
pub type Work = f64;

/// Converts worked hours to a string, splitting into weeks (5 working
/// days), days (8 working hours) and hours for readability.
pub fn format_work(work: Work) -> String {
    if work < 8.0 {
        // short cut for less than one day
        return format!("{:.2}h", work);
    }

    let mut days = (work / 8.0) as i64;
    let hours = work - (days * 8) as f64;
    let weeks = days / 5;
    days %= 5;

    let mut out = String::new();
    if weeks > 0 {
        out.push_str(&format!("{}w ", weeks));
    }
    if days > 0 {
        out.push_str(&format!("{}d ", days));
    }
    if hours > 0.1 {
        out.push_str(&format!("{:.2}h", hours));
    }

    out.trim_end().to_string()
}

/// One logged work time entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkLog {
    /// Worked hours.
    pub hours: Work,
    /// Date of the time recording.
    pub date: Option<NaiveDateTime>,
    /// Booking activity (custom value, may be empty).
    pub activity: String,
}

impl fmt::Display for WorkLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        write!(f, "{}: {} - {}", self.activity, date, format_work(self.hours))
    }
}

/// Index of a ticket inside its [`TicketSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TicketId(usize);

impl TicketId {
    /// Position in the arena, usable for parallel lookup tables.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One tracked work item from the export.
///
/// The parser populates everything except `children` and `parents`; those
/// two lists are owned by the clustering pass and start out empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ticket {
    pub summary: String,
    /// Human-facing unique identifier (e.g. "PROJ-123").
    pub key: String,
    /// Internal unique identifier, a distinct namespace from `key`.
    pub id: String,
    /// Explicit parent field referencing another ticket's `id`.
    pub parent_id: Option<String>,
    pub ticket_type: String,
    pub status: String,
    pub priority: String,
    pub assignee: String,
    pub creator: String,
    pub created: Option<NaiveDateTime>,
    pub updated: Option<NaiveDateTime>,
    pub last_viewed: Option<NaiveDateTime>,
    pub affects_versions: Vec<String>,
    pub fix_versions: Vec<String>,
    pub components: Vec<String>,
    pub work_logs: Vec<WorkLog>,
    pub original_estimate: Work,
    pub remaining_estimate: Work,
    pub time_spent: Work,
    pub sum_original_estimate: Work,
    pub sum_remaining_estimate: Work,
    pub sum_time_spent: Work,
    pub security_level: String,
    pub labels: Vec<String>,
    pub resolution: String,
    pub resolved: Option<NaiveDateTime>,
    pub due: Option<NaiveDateTime>,
    /// Outward link target keys, one list per link type.
    pub link_blocks: Vec<String>,
    pub link_causes: Vec<String>,
    pub link_cloners: Vec<String>,
    pub link_dependencies: Vec<String>,
    pub link_duplicates: Vec<String>,
    pub link_splits: Vec<String>,
    pub link_parts: Vec<String>,
    pub link_relates: Vec<String>,
    pub link_triggers: Vec<String>,
    pub link_parents: Vec<String>,
    pub external_id: String,
    pub supplier_reference: String,
    pub variant: String,
    /// Booking account used to validate work log activities.
    pub activity: String,
    pub category: String,
    /// Child edges, populated exclusively by the clustering pass.
    pub children: Vec<TicketId>,
    /// Parent back-references, populated exclusively by the clustering pass.
    pub parents: Vec<TicketId>,
}

impl Ticket {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ticket counts as resolved once a resolution date was recorded.
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

/// Arena owning all tickets of one export, in input order.
#[derive(Debug, Default)]
pub struct TicketSet {
    tickets: Vec<Ticket>,
}

impl TicketSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a ticket and returns its arena index.
    pub fn push(&mut self, ticket: Ticket) -> TicketId {
        let id = TicketId(self.tickets.len());
        self.tickets.push(ticket);
        id
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// All ticket ids in input order. Does not borrow the set, so callers
    /// may mutate tickets while iterating.
    pub fn ids(&self) -> impl Iterator<Item = TicketId> {
        (0..self.tickets.len()).map(TicketId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TicketId, &Ticket)> {
        self.tickets
            .iter()
            .enumerate()
            .map(|(i, t)| (TicketId(i), t))
    }

    /// Keeps only the given tickets, in the order given. Narrowing must
    /// happen before clustering: `children`/`parents` indices are not
    /// remapped.
    pub fn subset(mut self, ids: &[TicketId]) -> TicketSet {
        let mut tickets = Vec::with_capacity(ids.len());
        for &id in ids {
            tickets.push(std::mem::take(&mut self.tickets[id.0]));
        }
        TicketSet { tickets }
    }
}

impl Index<TicketId> for TicketSet {
    type Output = Ticket;

    fn index(&self, id: TicketId) -> &Ticket {
        &self.tickets[id.0]
    }
}

impl IndexMut<TicketId> for TicketSet {
    fn index_mut(&mut self, id: TicketId) -> &mut Ticket {
        &mut self.tickets[id.0]
    }
}
