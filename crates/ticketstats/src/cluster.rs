//! Ticket clustering: rebuilds parent/child trees from typed links.
//!
//! The export carries relationships only as flat lists of target keys, one
//! list per link type. This module resolves those lists against key/id
//! lookup tables, attaches child edges with a fixed direction or tie-break
//! rule per link type, collapses duplicate child edges across the whole
//! forest, and back-fills parent references so downstream views can walk
//! the trees in either direction.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::domain::{Ticket, TicketId, TicketSet};

/// Errors that can occur while clustering.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClusterError {
    /// The link lists describe a cycle, so no tree can be formed.
    #[error("cycle detected in ticket links at {key}")]
    CycleDetected { key: String },
}

/// Direction of "Part" links.
///
/// Export revisions disagree on which side of a part link is the parent,
/// so the direction is a policy choice rather than a fixed rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartDirection {
    /// The referenced part becomes the parent of the linking ticket.
    #[default]
    ReferencedIsParent,
    /// The referenced part is attached under the linking ticket.
    ReferencedIsChild,
}

/// Policy values the clustering pass needs from the configuration.
#[derive(Debug, Clone)]
pub struct ClusterPolicy {
    /// Status label marking a ticket as closed (duplicate tie-break).
    pub closed_status: String,
    pub part_direction: PartDirection,
}

impl Default for ClusterPolicy {
    fn default() -> Self {
        Self {
            closed_status: "Closed".to_string(),
            part_direction: PartDirection::default(),
        }
    }
}

/// Exact, case-sensitive lookup tables over one ticket set.
///
/// Duplicate keys or ids in the input are not detected here; the last
/// ticket wins the slot.
pub struct TicketIndex {
    by_key: HashMap<String, TicketId>,
    by_id: HashMap<String, TicketId>,
}

impl TicketIndex {
    pub fn build(set: &TicketSet) -> Self {
        let mut by_key = HashMap::new();
        let mut by_id = HashMap::new();
        for (id, ticket) in set.iter() {
            by_key.insert(ticket.key.clone(), id);
            by_id.insert(ticket.id.clone(), id);
        }
        Self { by_key, by_id }
    }

    /// Look up a ticket by its human-facing key.
    pub fn by_key(&self, key: &str) -> Option<TicketId> {
        self.by_key.get(key).copied()
    }

    /// Look up a ticket by its internal id.
    pub fn by_id(&self, id: &str) -> Option<TicketId> {
        self.by_id.get(id).copied()
    }
}

/// Clusters the tickets in place: resolves all links into child edges,
/// collapses duplicate edges and back-fills parent references.
///
/// `children`/`parents` must be empty on entry; the pass populates them
/// once and they stay stable afterwards.
pub fn cluster_tickets(set: &mut TicketSet, policy: &ClusterPolicy) -> Result<(), ClusterError> {
    let index = TicketIndex::build(set);

    // Explicit parent ids form edges before any link type is considered.
    for a in set.ids() {
        let Some(parent_id) = set[a].parent_id.clone() else {
            continue;
        };
        if let Some(parent) = index.by_id(&parent_id) {
            set[parent].children.push(a);
        }
    }

    for a in set.ids() {
        resolve_links(set, &index, a, policy);
    }

    // One seen set shared across the whole sweep: every key stays a direct
    // child of at most one ancestor, earliest visit wins.
    let mut seen: HashMap<String, TicketId> = HashMap::new();
    let mut reduced: HashSet<TicketId> = HashSet::new();
    let mut visiting: HashSet<TicketId> = HashSet::new();
    for a in set.ids() {
        reduce_duplicate_children(set, a, &mut seen, &mut reduced, &mut visiting)?;
    }

    link_parents(set);

    Ok(())
}

/// Resolves the outward link lists of one ticket into child edges.
///
/// Targets missing from the index are skipped: exports routinely reference
/// tickets outside the exported set.
fn resolve_links(set: &mut TicketSet, index: &TicketIndex, a: TicketId, policy: &ClusterPolicy) {
    for key in set[a].link_cloners.clone() {
        let Some(clone) = index.by_key(&key) else {
            continue;
        };
        // The older ticket of a clone pair becomes the parent.
        if created_before(&set[a], &set[clone]) {
            set[a].children.push(clone);
        } else {
            set[clone].children.push(a);
        }
    }

    for key in set[a].link_duplicates.clone() {
        let Some(duplicate) = index.by_key(&key) else {
            continue;
        };
        let a_closed = set[a].status == policy.closed_status;
        let d_closed = set[duplicate].status == policy.closed_status;
        match (a_closed, d_closed) {
            // The open ticket is the parent of its closed duplicate.
            (true, false) => set[duplicate].children.push(a),
            (false, true) => set[a].children.push(duplicate),
            // Same closed-state: fall back to the clone rule.
            _ => {
                if created_before(&set[a], &set[duplicate]) {
                    set[a].children.push(duplicate);
                } else {
                    set[duplicate].children.push(a);
                }
            }
        }
    }

    for key in set[a].link_splits.clone() {
        let Some(split) = index.by_key(&key) else {
            continue;
        };
        set[a].children.push(split);
    }

    for key in set[a].link_parts.clone() {
        let Some(part) = index.by_key(&key) else {
            continue;
        };
        match policy.part_direction {
            PartDirection::ReferencedIsParent => set[part].children.push(a),
            PartDirection::ReferencedIsChild => set[a].children.push(part),
        }
    }

    for key in set[a].link_parents.clone() {
        let Some(parent) = index.by_key(&key) else {
            continue;
        };
        set[parent].children.push(a);
    }
}

/// Strict created-before comparison for tie-breaking; a missing creation
/// date sorts as oldest, equal timestamps resolve to `false` so the
/// linking side consistently ends up as the child.
fn created_before(a: &Ticket, b: &Ticket) -> bool {
    a.created.unwrap_or(chrono::NaiveDateTime::MIN)
        < b.created.unwrap_or(chrono::NaiveDateTime::MIN)
}

/// Collapses each ticket's child list to the first-claimed edges.
///
/// The node's own list is filtered before descending, so an ancestor
/// visited earlier in the sweep keeps the edge and deeper occurrences of
/// the same key are dropped entirely, not reattached. `seen` is shared
/// across the entire sweep, `reduced` prevents a node reached from two
/// ancestors from being filtered twice, and `visiting` holds the current
/// descent path to turn true link cycles into an error instead of
/// unbounded recursion.
fn reduce_duplicate_children(
    set: &mut TicketSet,
    node: TicketId,
    seen: &mut HashMap<String, TicketId>,
    reduced: &mut HashSet<TicketId>,
    visiting: &mut HashSet<TicketId>,
) -> Result<(), ClusterError> {
    if visiting.contains(&node) {
        return Err(ClusterError::CycleDetected {
            key: set[node].key.clone(),
        });
    }
    if !reduced.insert(node) {
        return Ok(());
    }

    let children = std::mem::take(&mut set[node].children);
    let mut kept = Vec::with_capacity(children.len());
    for child in children {
        let key = set[child].key.clone();
        if !seen.contains_key(&key) {
            seen.insert(key, child);
            kept.push(child);
        }
    }
    set[node].children = kept.clone();

    visiting.insert(node);
    for child in kept {
        reduce_duplicate_children(set, child, seen, reduced, visiting)?;
    }
    visiting.remove(&node);

    Ok(())
}

/// Back-fills `parents` from the finished child trees: each ticket ends up
/// with exactly one parents entry per child edge pointing at it.
fn link_parents(set: &mut TicketSet) {
    let mut incoming = vec![0usize; set.len()];
    for id in set.ids() {
        for child in &set[id].children {
            incoming[child.index()] += 1;
        }
    }
    for id in set.ids() {
        if incoming[id.index()] == 0 {
            link_parents_from(set, id);
        }
    }
}

fn link_parents_from(set: &mut TicketSet, node: TicketId) {
    for child in set[node].children.clone() {
        set[child].parents.push(node);
        link_parents_from(set, child);
    }
}

/// Selects the cluster roots out of `ids`: tickets without parents, in the
/// order given. With `require_children` set, single-ticket clusters are
/// excluded as well.
pub fn clusters(set: &TicketSet, ids: &[TicketId], require_children: bool) -> Vec<TicketId> {
    ids.iter()
        .copied()
        .filter(|&id| {
            let ticket = &set[id];
            ticket.parents.is_empty() && (!require_children || !ticket.children.is_empty())
        })
        .collect()
}

/// Renders the clustered forest as console text: one block per ticket with
/// children, listing its direct children. With `shorten` set, child lists
/// are truncated after ten entries.
pub fn render_clusters(set: &TicketSet, ids: &[TicketId], shorten: bool) -> String {
    let mut out = String::new();
    for (i, &id) in ids.iter().enumerate() {
        let ticket = &set[id];
        if ticket.children.is_empty() {
            continue;
        }
        out.push_str(&format!("Cluster {}\n", i));
        out.push_str(&format!(
            "{} {} {}\n",
            ticket.key, ticket.summary, ticket.ticket_type
        ));
        for (j, &child) in ticket.children.iter().enumerate() {
            let c = &set[child];
            out.push_str(&format!("|- {} {} {}\n", c.key, c.summary, c.ticket_type));
            if shorten && j > 9 {
                out.push_str(&format!(
                    "   ... {} children\n",
                    ticket.children.len()
                ));
                break;
            }
        }
        out.push_str("-----------------\n");
    }
    out
}
