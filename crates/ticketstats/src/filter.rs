//! Filtering, ordering and collection helpers over a ticket set.
//!
//! All helpers take the arena plus a slice of ticket ids and return a new
//! id list, so report sections can be narrowed step by step without
//! copying tickets.

use chrono::{Duration, Months, NaiveDateTime, Utc};

use crate::domain::{Ticket, TicketId, TicketSet};

/// Keeps the ids whose ticket matches the predicate, preserving order.
pub fn filter_by(
    set: &TicketSet,
    ids: &[TicketId],
    predicate: impl Fn(&Ticket) -> bool,
) -> Vec<TicketId> {
    ids.iter()
        .copied()
        .filter(|&id| predicate(&set[id]))
        .collect()
}

/// Tickets that are unresolved or saw an update within the last month.
pub fn active_tickets(set: &TicketSet, ids: &[TicketId]) -> Vec<TicketId> {
    let cutoff = months_back(1);
    filter_by(set, ids, |t| {
        !t.is_resolved() || t.updated.map(|u| u > cutoff).unwrap_or(false)
    })
}

/// Tickets that are unresolved and not in the closed status.
pub fn open_tickets(set: &TicketSet, ids: &[TicketId], closed_status: &str) -> Vec<TicketId> {
    filter_by(set, ids, |t| !t.is_resolved() && t.status != closed_status)
}

pub fn created_last_week(set: &TicketSet, ids: &[TicketId]) -> Vec<TicketId> {
    created_after(set, ids, days_back(7))
}

pub fn created_last_month(set: &TicketSet, ids: &[TicketId]) -> Vec<TicketId> {
    created_after(set, ids, months_back(1))
}

pub fn created_last_quarter(set: &TicketSet, ids: &[TicketId]) -> Vec<TicketId> {
    created_after(set, ids, months_back(3))
}

pub fn created_last_year(set: &TicketSet, ids: &[TicketId]) -> Vec<TicketId> {
    created_after(set, ids, months_back(12))
}

pub fn closed_last_week(set: &TicketSet, ids: &[TicketId]) -> Vec<TicketId> {
    resolved_after(set, ids, days_back(7))
}

pub fn closed_last_month(set: &TicketSet, ids: &[TicketId]) -> Vec<TicketId> {
    resolved_after(set, ids, months_back(1))
}

pub fn closed_last_quarter(set: &TicketSet, ids: &[TicketId]) -> Vec<TicketId> {
    resolved_after(set, ids, months_back(3))
}

pub fn closed_last_year(set: &TicketSet, ids: &[TicketId]) -> Vec<TicketId> {
    resolved_after(set, ids, months_back(12))
}

/// Tickets created more than one month ago. Tickets without a creation
/// date count as old.
pub fn older_than_one_month(set: &TicketSet, ids: &[TicketId]) -> Vec<TicketId> {
    let cutoff = months_back(1);
    filter_by(set, ids, |t| {
        t.created.unwrap_or(NaiveDateTime::MIN) < cutoff
    })
}

/// Tickets whose key starts with the given project key.
pub fn by_project(set: &TicketSet, ids: &[TicketId], project: &str) -> Vec<TicketId> {
    filter_by(set, ids, |t| t.key.starts_with(project))
}

pub fn by_type(set: &TicketSet, ids: &[TicketId], ticket_type: &str) -> Vec<TicketId> {
    filter_by(set, ids, |t| t.ticket_type == ticket_type)
}

pub fn by_component(set: &TicketSet, ids: &[TicketId], component: &str) -> Vec<TicketId> {
    filter_by(set, ids, |t| t.components.iter().any(|c| c == component))
}

pub fn by_label(set: &TicketSet, ids: &[TicketId], label: &str) -> Vec<TicketId> {
    filter_by(set, ids, |t| t.labels.iter().any(|l| l == label))
}

pub fn by_fix_version(set: &TicketSet, ids: &[TicketId], version: &str) -> Vec<TicketId> {
    filter_by(set, ids, |t| t.fix_versions.iter().any(|v| v == version))
}

pub fn by_security_level(set: &TicketSet, ids: &[TicketId], level: &str) -> Vec<TicketId> {
    filter_by(set, ids, |t| t.security_level == level)
}

/// Unique ticket types in first-encounter order.
pub fn types(set: &TicketSet, ids: &[TicketId]) -> Vec<String> {
    unique(ids.iter().map(|&id| set[id].ticket_type.clone()))
}

/// Unique components in first-encounter order.
pub fn components(set: &TicketSet, ids: &[TicketId]) -> Vec<String> {
    unique(ids.iter().flat_map(|&id| set[id].components.iter().cloned()))
}

/// Unique labels in first-encounter order.
pub fn labels(set: &TicketSet, ids: &[TicketId]) -> Vec<String> {
    unique(ids.iter().flat_map(|&id| set[id].labels.iter().cloned()))
}

/// Unique fix versions in first-encounter order.
pub fn fix_versions(set: &TicketSet, ids: &[TicketId]) -> Vec<String> {
    unique(
        ids.iter()
            .flat_map(|&id| set[id].fix_versions.iter().cloned()),
    )
}

/// Unique security levels in first-encounter order. Tickets without one
/// contribute an empty entry so unclassified tickets keep a table row.
pub fn security_levels(set: &TicketSet, ids: &[TicketId]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for &id in ids {
        let level = set[id].security_level.clone();
        if seen.insert(level.clone()) {
            out.push(level);
        }
    }
    out
}

fn unique(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for value in values {
        if value.is_empty() {
            continue;
        }
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

/// Sorts by creation date, oldest first; tickets without one sort first.
pub fn order_by_created(set: &TicketSet, ids: &mut [TicketId]) {
    ids.sort_by_key(|&id| set[id].created.unwrap_or(NaiveDateTime::MIN));
}

/// Sorts by due date, soonest first; tickets without one sort last.
pub fn order_by_due(set: &TicketSet, ids: &mut [TicketId]) {
    ids.sort_by_key(|&id| set[id].due.unwrap_or(NaiveDateTime::MAX));
}

/// Stable sort by status label.
pub fn order_by_status(set: &TicketSet, ids: &mut [TicketId]) {
    ids.sort_by(|&a, &b| set[a].status.cmp(&set[b].status));
}

/// Stable sort by priority label.
pub fn order_by_priority(set: &TicketSet, ids: &mut [TicketId]) {
    ids.sort_by(|&a, &b| set[a].priority.cmp(&set[b].priority));
}

/// Days from the given date until now.
pub fn age_in_days(date: NaiveDateTime) -> i64 {
    (Utc::now().naive_utc() - date).num_days()
}

fn created_after(set: &TicketSet, ids: &[TicketId], cutoff: NaiveDateTime) -> Vec<TicketId> {
    filter_by(set, ids, |t| t.created.map(|c| c > cutoff).unwrap_or(false))
}

fn resolved_after(set: &TicketSet, ids: &[TicketId], cutoff: NaiveDateTime) -> Vec<TicketId> {
    filter_by(set, ids, |t| {
        t.resolved.map(|r| r > cutoff).unwrap_or(false)
    })
}

pub(crate) fn days_back(days: i64) -> NaiveDateTime {
    Utc::now().naive_utc() - Duration::days(days)
}

pub(crate) fn months_back(months: u32) -> NaiveDateTime {
    Utc::now()
        .naive_utc()
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDateTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Ticket;

    fn ticket(key: &str) -> Ticket {
        Ticket {
            key: key.to_string(),
            ..Ticket::new()
        }
    }

    fn all_ids(set: &TicketSet) -> Vec<TicketId> {
        set.ids().collect()
    }

    fn keys(set: &TicketSet, ids: &[TicketId]) -> Vec<String> {
        ids.iter().map(|&id| set[id].key.clone()).collect()
    }

    #[test]
    fn test_active_tickets_keeps_unresolved_and_recently_updated() {
        let mut set = TicketSet::new();
        let mut open = ticket("OPEN");
        open.created = Some(days_back(90));
        set.push(open);

        let mut recently_closed = ticket("RECENT");
        recently_closed.resolved = Some(days_back(3));
        recently_closed.updated = Some(days_back(3));
        set.push(recently_closed);

        let mut long_closed = ticket("STALE");
        long_closed.resolved = Some(days_back(90));
        long_closed.updated = Some(days_back(90));
        set.push(long_closed);

        let active = active_tickets(&set, &all_ids(&set));
        assert_eq!(keys(&set, &active), vec!["OPEN", "RECENT"]);
    }

    #[test]
    fn test_open_tickets_excludes_closed_status() {
        let mut set = TicketSet::new();
        let mut a = ticket("A");
        a.status = "Open".to_string();
        set.push(a);
        let mut b = ticket("B");
        b.status = "Closed".to_string();
        set.push(b);
        let mut c = ticket("C");
        c.status = "Open".to_string();
        c.resolved = Some(days_back(1));
        set.push(c);

        let open = open_tickets(&set, &all_ids(&set), "Closed");
        assert_eq!(keys(&set, &open), vec!["A"]);
    }

    #[test]
    fn test_created_window_edges() {
        let mut set = TicketSet::new();
        let mut fresh = ticket("FRESH");
        fresh.created = Some(days_back(2));
        set.push(fresh);
        let mut old = ticket("OLD");
        old.created = Some(days_back(10));
        set.push(old);
        set.push(ticket("UNDATED"));

        let ids = all_ids(&set);
        assert_eq!(keys(&set, &created_last_week(&set, &ids)), vec!["FRESH"]);
        assert_eq!(
            keys(&set, &created_last_month(&set, &ids)),
            vec!["FRESH", "OLD"]
        );
    }

    #[test]
    fn test_closed_windows_use_resolution_date() {
        let mut set = TicketSet::new();
        let mut a = ticket("A");
        a.resolved = Some(days_back(5));
        set.push(a);
        let mut b = ticket("B");
        b.resolved = Some(days_back(200));
        set.push(b);
        set.push(ticket("C"));

        let ids = all_ids(&set);
        assert_eq!(keys(&set, &closed_last_week(&set, &ids)), vec!["A"]);
        assert_eq!(keys(&set, &closed_last_year(&set, &ids)), vec!["A", "B"]);
    }

    #[test]
    fn test_older_than_one_month() {
        let mut set = TicketSet::new();
        let mut old = ticket("OLD");
        old.created = Some(days_back(45));
        set.push(old);
        let mut fresh = ticket("FRESH");
        fresh.created = Some(days_back(2));
        set.push(fresh);
        set.push(ticket("UNDATED"));

        let old_ids = older_than_one_month(&set, &all_ids(&set));
        assert_eq!(keys(&set, &old_ids), vec!["OLD", "UNDATED"]);
    }

    #[test]
    fn test_by_project_matches_key_prefix() {
        let mut set = TicketSet::new();
        set.push(ticket("CORE-1"));
        set.push(ticket("UI-2"));
        set.push(ticket("CORE-3"));

        let core = by_project(&set, &all_ids(&set), "CORE");
        assert_eq!(keys(&set, &core), vec!["CORE-1", "CORE-3"]);
    }

    #[test]
    fn test_by_component_and_collectors() {
        let mut set = TicketSet::new();
        let mut a = ticket("A");
        a.components = vec!["backend".to_string(), "db".to_string()];
        set.push(a);
        let mut b = ticket("B");
        b.components = vec!["backend".to_string()];
        set.push(b);
        let mut c = ticket("C");
        c.components = vec!["ui".to_string()];
        set.push(c);

        let ids = all_ids(&set);
        assert_eq!(keys(&set, &by_component(&set, &ids, "backend")), vec!["A", "B"]);
        assert_eq!(components(&set, &ids), vec!["backend", "db", "ui"]);
    }

    #[test]
    fn test_type_collector_first_encounter_order() {
        let mut set = TicketSet::new();
        for (key, t) in [("A", "Bug"), ("B", "Task"), ("C", "Bug")] {
            let mut ticket = ticket(key);
            ticket.ticket_type = t.to_string();
            set.push(ticket);
        }
        assert_eq!(types(&set, &all_ids(&set)), vec!["Bug", "Task"]);
    }

    #[test]
    fn test_security_levels_keep_unclassified_entry() {
        let mut set = TicketSet::new();
        let mut a = ticket("A");
        a.security_level = "internal".to_string();
        set.push(a);
        set.push(ticket("B"));

        assert_eq!(security_levels(&set, &all_ids(&set)), vec!["internal", ""]);
    }

    #[test]
    fn test_order_by_created_oldest_first() {
        let mut set = TicketSet::new();
        let mut a = ticket("A");
        a.created = Some(days_back(1));
        set.push(a);
        let mut b = ticket("B");
        b.created = Some(days_back(10));
        set.push(b);

        let mut ids = all_ids(&set);
        order_by_created(&set, &mut ids);
        assert_eq!(keys(&set, &ids), vec!["B", "A"]);
    }

    #[test]
    fn test_order_by_due_undated_last() {
        let mut set = TicketSet::new();
        set.push(ticket("NONE"));
        let mut soon = ticket("SOON");
        soon.due = Some(days_back(-2));
        set.push(soon);
        let mut later = ticket("LATER");
        later.due = Some(days_back(-30));
        set.push(later);

        let mut ids = all_ids(&set);
        order_by_due(&set, &mut ids);
        assert_eq!(keys(&set, &ids), vec!["SOON", "LATER", "NONE"]);
    }

    #[test]
    fn test_age_in_days() {
        assert_eq!(age_in_days(days_back(3)), 3);
        assert_eq!(age_in_days(days_back(0)), 0);
    }
}
