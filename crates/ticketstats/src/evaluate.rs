//! Report generation pipeline: one CSV export in, HTML report(s) out.
//!
//! Orchestrates the collaborators: parse the export, narrow it to the
//! requested project/component, cluster the tickets, derive all report
//! sections and render them. With `--split-by-component` the pipeline
//! runs once per component on top of the overall report.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::cluster::{cluster_tickets, clusters, render_clusters};
use crate::config::Config;
use crate::domain::{format_work, TicketId, TicketSet};
use crate::filter::{
    active_tickets, by_component, by_fix_version, by_label, by_project, by_security_level,
    by_type, closed_last_month, closed_last_week, components, created_last_month,
    created_last_week, filter_by, fix_versions, labels, older_than_one_month, open_tickets,
    order_by_created, order_by_due, order_by_priority, order_by_status, security_levels, types,
};
use crate::parse::parse_csv;
use crate::render::render;
use crate::report::{
    report_issue, warnings_from, OtherTypeStats, Report, ReportBugStats, ReportCount,
    ResourceAverage, ResourceAverageDetails, ResourceDetails, ResourceGroup, ResourceSpend,
};
use crate::sanitize::sanitize;
use crate::stats::{fte_per_window, hours_per_window, resolution_times_by_type};

const TIME_RANGES: [&str; 4] = ["Last week", "Last month", "Last quarter", "Last year"];

/// Options of one `report` run.
#[derive(Debug, Clone)]
pub struct EvaluateOptions {
    pub csv: PathBuf,
    /// Project key filter; falls back to the configured default.
    pub project: Option<String>,
    /// Component filter; falls back to the configured default. Setting a
    /// component disables splitting.
    pub component: Option<String>,
    /// Base URL of the tracker web UI for report links.
    pub tracker_base: String,
    pub split_by_component: bool,
    pub output_dir: PathBuf,
    pub config: Option<PathBuf>,
}

/// Generates the full report, plus one report per component if requested.
pub fn evaluate(options: &EvaluateOptions) -> Result<()> {
    let config = Config::load(options.config.as_deref())?;
    let (set, ids) = load_clustered(&options.csv, &config, &options.project, &options.component)?;

    let mut split = options.split_by_component;
    if component_of(options, &config).is_some() {
        split = false;
    }
    let component = component_of(options, &config).unwrap_or_default();

    let report = Evaluator::new(&set, &ids, &config, &options.tracker_base)
        .generate(component, report_date(&config));
    let path = render(&report, &options.output_dir)?;
    info!("report written to {}", path.display());

    if split {
        for component in components(&set, &ids) {
            let component_ids = by_component(&set, &ids, &component);
            let report = Evaluator::new(&set, &component_ids, &config, &options.tracker_base)
                .generate(component.clone(), report_date(&config));
            let path = render(&report, &options.output_dir)?;
            info!("component report written to {}", path.display());
        }
    }

    Ok(())
}

/// Options of one `clusters` run.
#[derive(Debug, Clone)]
pub struct ClustersOptions {
    pub csv: PathBuf,
    pub project: Option<String>,
    pub component: Option<String>,
    pub config: Option<PathBuf>,
    /// Print all children instead of truncating long lists.
    pub full: bool,
}

/// Clusters the export and renders the forest as console text.
pub fn cluster_forest(options: &ClustersOptions) -> Result<String> {
    let config = Config::load(options.config.as_deref())?;
    let (set, ids) = load_clustered(&options.csv, &config, &options.project, &options.component)?;
    Ok(render_clusters(&set, &ids, !options.full))
}

/// Parses, narrows and clusters the export; shared by both subcommands.
///
/// Narrowing happens before clustering, so links into tickets outside the
/// selection stay unresolved and produce no edges.
fn load_clustered(
    csv: &std::path::Path,
    config: &Config,
    project: &Option<String>,
    component: &Option<String>,
) -> Result<(TicketSet, Vec<TicketId>)> {
    let mut set = parse_csv(csv, config)?;
    info!("parsed {} tickets from {}", set.len(), csv.display());

    let mut ids: Vec<TicketId> = set.ids().collect();
    let project = project.clone().or_else(|| config.project.clone());
    if let Some(project) = project.filter(|p| !p.is_empty()) {
        ids = by_project(&set, &ids, &project);
        info!("{} tickets in project {}", ids.len(), project);
    }
    let component = component.clone().or_else(|| config.component.clone());
    if let Some(component) = component.filter(|c| !c.is_empty()) {
        ids = by_component(&set, &ids, &component);
        info!("{} tickets in component {}", ids.len(), component);
    }
    if ids.len() != set.len() {
        set = set.subset(&ids);
    }
    let ids: Vec<TicketId> = set.ids().collect();

    let policy = config.cluster_policy()?;
    cluster_tickets(&mut set, &policy).context("ticket links do not form a forest")?;
    debug!(
        "{} clusters\n{}",
        clusters(&set, &ids, true).len(),
        render_clusters(&set, &ids, true)
    );

    Ok((set, ids))
}

fn component_of(options: &EvaluateOptions, config: &Config) -> Option<String> {
    options
        .component
        .clone()
        .or_else(|| config.component.clone())
        .filter(|c| !c.is_empty())
}

fn report_date(config: &Config) -> String {
    Local::now().format(&config.date_format()).to_string()
}

/// Derives all report sections for one ticket selection.
struct Evaluator<'a> {
    set: &'a TicketSet,
    ids: &'a [TicketId],
    active: Vec<TicketId>,
    config: &'a Config,
    tracker_base: &'a str,
    report: Report,
}

impl<'a> Evaluator<'a> {
    fn new(
        set: &'a TicketSet,
        ids: &'a [TicketId],
        config: &'a Config,
        tracker_base: &'a str,
    ) -> Self {
        Self {
            set,
            ids,
            active: Vec::new(),
            config,
            tracker_base,
            report: Report::default(),
        }
    }

    fn generate(mut self, component: String, date: String) -> Report {
        self.report.component = component;
        self.report.date = date;

        self.active = active_tickets(self.set, self.ids);
        info!("{} active tickets", self.active.len());

        self.sanitize();
        self.old_bugs();
        self.bugs();
        self.features();
        self.improvements();
        self.other();
        self.resources();

        self.report
    }

    fn project(&self, id: TicketId) -> crate::report::ReportIssue {
        report_issue(self.set, id, self.tracker_base, self.config)
    }

    /// Excludes the configured bug-filter statuses.
    fn without_filtered_states(&self, ids: &[TicketId]) -> Vec<TicketId> {
        let filtered = self.config.bug_filter_states();
        filter_by(self.set, ids, |t| {
            !filtered.iter().any(|status| t.status == *status)
        })
    }

    fn sanitize(&mut self) {
        let result = sanitize(self.set, self.ids, true);
        self.report.warnings = warnings_from(self.set, &result, self.tracker_base, self.config);
        self.report.has_warnings = self.report.warnings.count > 0;
    }

    fn old_bugs(&mut self) {
        let bugs = by_type(self.set, &self.active, &self.config.bug_type());
        let old = older_than_one_month(self.set, &bugs);
        let mut old: Vec<TicketId> = filter_by(self.set, &old, |t| !t.is_resolved());
        old = self.without_filtered_states(&old);
        order_by_created(self.set, &mut old);

        info!("{} old bug tickets", old.len());
        for &id in &old {
            self.report.old_bugs.push(self.project(id));
        }
    }

    fn bugs(&mut self) {
        let bugs = by_type(self.set, self.ids, &self.config.bug_type());
        let open = open_tickets(self.set, &bugs, &self.config.closed_status());
        let open = self.without_filtered_states(&open);

        self.report.bugs.count = open.len();
        self.report.bugs.week = week_count(self.set, &bugs);
        self.report.bugs.month = month_count(self.set, &bugs);

        let mut versions = fix_versions(self.set, &open);
        versions.sort_by(|a, b| b.cmp(a));
        self.report.bugs.counts.versions = versions.clone();

        for security in security_levels(self.set, &open) {
            let of_level = by_security_level(self.set, &open, &security);
            let mut row = vec![security.clone()];
            let mut sum = 0;
            for version in &versions {
                let mut of_version = by_fix_version(self.set, &of_level, version);
                if of_version.is_empty() {
                    row.push(String::new());
                    continue;
                }
                sum += of_version.len();
                row.push(of_version.len().to_string());

                order_by_status(self.set, &mut of_version);
                order_by_priority(self.set, &mut of_version);
                let bugs = of_version.iter().map(|&id| self.project(id)).collect();
                self.report.bugs.stats.push(ReportBugStats {
                    version: version.clone(),
                    security: security.clone(),
                    count: of_version.len(),
                    bugs,
                });
            }
            row.push(sum.to_string());
            self.report.bugs.counts.values.push(row);
        }
    }

    fn features(&mut self) {
        let features = by_type(self.set, self.ids, &self.config.feature_type());
        let mut open = open_tickets(self.set, &features, &self.config.closed_status());
        order_by_due(self.set, &mut open);

        for root in clusters(self.set, &open, false) {
            self.report.features.push(self.project(root));
        }
    }

    fn improvements(&mut self) {
        let improvements = by_type(self.set, self.ids, &self.config.improvement_type());
        let mut open = open_tickets(self.set, &improvements, &self.config.closed_status());
        order_by_due(self.set, &mut open);

        for root in clusters(self.set, &open, false) {
            self.report.improvements.push(self.project(root));
        }
    }

    fn other(&mut self) {
        let named = [
            self.config.bug_type(),
            self.config.feature_type(),
            self.config.improvement_type(),
        ];
        let others = filter_by(self.set, self.ids, |t| {
            !named.iter().any(|name| t.ticket_type == *name)
        });

        let closed = self.config.closed_status();
        self.report.other.count = open_tickets(self.set, &others, &closed).len();

        for type_name in types(self.set, &others) {
            let of_type = by_type(self.set, &others, &type_name);
            let count = open_tickets(self.set, &of_type, &closed).len();

            self.report.other.week.push(OtherTypeStats {
                type_name: type_name.clone(),
                count,
                report: week_count(self.set, &of_type),
            });
            self.report.other.month.push(OtherTypeStats {
                type_name,
                count,
                report: month_count(self.set, &of_type),
            });
        }
    }

    fn resources(&mut self) {
        let hours = hours_per_window(self.set, self.ids);
        let fte = fte_per_window(&hours);

        for (i, range) in TIME_RANGES.iter().enumerate() {
            self.report.resources.spend.push(ResourceSpend {
                time_range: range.to_string(),
                effort: format_work(hours[i]),
                fte: format!("{:.2}", fte[i]),
            });
        }

        let mut type_names = types(self.set, self.ids);
        type_names.sort();
        self.report.resources.usage.push(self.usage_groups(
            "Type",
            &type_names,
            &hours,
            3,
            |set, ids, name| by_type(set, ids, name),
        ));

        let mut label_names = labels(self.set, self.ids);
        label_names.sort();
        self.report.resources.usage.push(self.usage_groups(
            "Label",
            &label_names,
            &hours,
            5,
            |set, ids, name| by_label(set, ids, name),
        ));

        let mut quarter = ResourceAverage {
            time_range: "Last quarter".to_string(),
            ..ResourceAverage::default()
        };
        let mut year = ResourceAverage {
            time_range: "Last year".to_string(),
            ..ResourceAverage::default()
        };
        for (type_name, ranges) in resolution_times_by_type(self.set, self.ids) {
            quarter.details.push(ResourceAverageDetails {
                type_name: type_name.clone(),
                count: ranges.quarter.count,
                median: format_work(ranges.quarter.median),
                mean: format_work(ranges.quarter.mean),
            });
            year.details.push(ResourceAverageDetails {
                type_name,
                count: ranges.year.count,
                median: format_work(ranges.year.median),
                mean: format_work(ranges.year.mean),
            });
        }
        self.report.resources.average.push(quarter);
        self.report.resources.average.push(year);
    }

    /// Effort share per group name and time window; shares below
    /// `min_percent` are left out of the tables.
    fn usage_groups(
        &self,
        group: &str,
        names: &[String],
        total_hours: &[f64; 4],
        min_percent: i64,
        select: impl Fn(&TicketSet, &[TicketId], &str) -> Vec<TicketId>,
    ) -> Vec<ResourceGroup> {
        let mut groups: Vec<ResourceGroup> = TIME_RANGES
            .iter()
            .map(|range| ResourceGroup {
                group: group.to_string(),
                time_range: range.to_string(),
                details: Vec::new(),
            })
            .collect();

        for name in names {
            let ids = select(self.set, self.ids, name);
            let hours = hours_per_window(self.set, &ids);
            let fte = fte_per_window(&hours);

            for (i, entry) in groups.iter_mut().enumerate() {
                if total_hours[i] <= 0.0 {
                    continue;
                }
                let percent = ((hours[i] / total_hours[i]) * 100.0) as i64;
                if percent < min_percent {
                    continue;
                }
                entry.details.push(ResourceDetails {
                    name: name.clone(),
                    work: format_work(hours[i]),
                    fte: format!("{:.2}", fte[i]),
                    percent,
                });
            }
        }

        groups
    }
}

fn week_count(set: &TicketSet, ids: &[TicketId]) -> ReportCount {
    let created = created_last_week(set, ids).len() as i64;
    let resolved = closed_last_week(set, ids).len() as i64;
    ReportCount {
        created,
        resolved,
        diff: created - resolved,
    }
}

fn month_count(set: &TicketSet, ids: &[TicketId]) -> ReportCount {
    let created = created_last_month(set, ids).len() as i64;
    let resolved = closed_last_month(set, ids).len() as i64;
    ReportCount {
        created,
        resolved,
        diff: created - resolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Ticket, WorkLog};
    use crate::filter::days_back;

    fn ticket(key: &str, ticket_type: &str) -> Ticket {
        Ticket {
            key: key.to_string(),
            id: key.to_string(),
            summary: format!("Summary {}", key),
            ticket_type: ticket_type.to_string(),
            status: "Open".to_string(),
            created: Some(days_back(10)),
            activity: "ACC-1".to_string(),
            ..Ticket::new()
        }
    }

    fn sample_set() -> (TicketSet, Vec<TicketId>) {
        let mut set = TicketSet::new();

        let mut bug = ticket("CORE-1", "Bug");
        bug.fix_versions.push("1.0".to_string());
        bug.created = Some(days_back(60));
        bug.work_logs.push(WorkLog {
            hours: 4.0,
            date: Some(days_back(3)),
            activity: "ACC-1".to_string(),
        });
        set.push(bug);

        let mut closed_bug = ticket("CORE-2", "Bug");
        closed_bug.status = "Closed".to_string();
        closed_bug.resolved = Some(days_back(2));
        closed_bug.time_spent = 6.0;
        set.push(closed_bug);

        let mut feature = ticket("CORE-3", "New Feature");
        feature.link_splits.push("CORE-4".to_string());
        set.push(feature);

        set.push(ticket("CORE-4", "New Feature"));
        set.push(ticket("CORE-5", "Task"));

        let policy = crate::cluster::ClusterPolicy::default();
        cluster_tickets(&mut set, &policy).unwrap();
        let ids: Vec<TicketId> = set.ids().collect();
        (set, ids)
    }

    #[test]
    fn test_generate_fills_all_sections() {
        let (set, ids) = sample_set();
        let config = Config::default();
        let report = Evaluator::new(&set, &ids, &config, "https://tracker/")
            .generate("backend".to_string(), "2026-01-01".to_string());

        assert_eq!(report.component, "backend");
        assert_eq!(report.bugs.count, 1);
        assert_eq!(report.old_bugs.len(), 1);
        assert_eq!(report.old_bugs[0].key, "CORE-1");
        // CORE-3 is the only feature cluster root, CORE-4 hangs below it
        assert_eq!(report.features.len(), 1);
        assert_eq!(report.features[0].key, "CORE-3");
        assert!(report.features[0].has_children);
        // Task shows up in the other-type section
        assert!(report
            .other
            .week
            .iter()
            .any(|stats| stats.type_name == "Task"));
        assert_eq!(report.resources.spend.len(), 4);
        assert_eq!(report.resources.usage.len(), 2);
    }

    #[test]
    fn test_bug_counts_matrix_row_sums() {
        let (set, ids) = sample_set();
        let config = Config::default();
        let report = Evaluator::new(&set, &ids, &config, "")
            .generate(String::new(), String::new());

        assert_eq!(report.bugs.counts.versions, vec!["1.0"]);
        assert_eq!(report.bugs.counts.values.len(), 1);
        let row = &report.bugs.counts.values[0];
        // security level, one version column, row sum
        assert_eq!(row.len(), 3);
        assert_eq!(row[1], "1");
        assert_eq!(row[2], "1");
        assert_eq!(report.bugs.stats.len(), 1);
        assert_eq!(report.bugs.stats[0].bugs[0].key, "CORE-1");
    }

    #[test]
    fn test_bug_filter_states_exclude_from_tables() {
        let (set, ids) = sample_set();
        let config: Config = toml::from_str(
            r#"
            [states]
            bug_filter = ["Open"]
            "#,
        )
        .unwrap();
        let report = Evaluator::new(&set, &ids, &config, "")
            .generate(String::new(), String::new());

        assert_eq!(report.bugs.count, 0);
        assert!(report.old_bugs.is_empty());
    }

    #[test]
    fn test_week_and_month_counts() {
        let mut set = TicketSet::new();
        let mut fresh = ticket("A", "Bug");
        fresh.created = Some(days_back(2));
        set.push(fresh);
        let mut resolved = ticket("B", "Bug");
        resolved.created = Some(days_back(20));
        resolved.resolved = Some(days_back(1));
        set.push(resolved);
        let ids: Vec<TicketId> = set.ids().collect();

        let week = week_count(&set, &ids);
        assert_eq!(week.created, 1);
        assert_eq!(week.resolved, 1);
        assert_eq!(week.diff, 0);

        let month = month_count(&set, &ids);
        assert_eq!(month.created, 2);
        assert_eq!(month.resolved, 1);
        assert_eq!(month.diff, 1);
    }

    #[test]
    fn test_cluster_forest_prints_tree() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            "Issue key;Issue id;Summary;Issue Type;Outward issue link (Issue split)\n\
             CORE-1;1;Root work;New Feature;CORE-2\n\
             CORE-2;2;Split work;New Feature;\n"
                .as_bytes(),
        )
        .unwrap();

        let out = cluster_forest(&ClustersOptions {
            csv: file.path().to_path_buf(),
            project: None,
            component: None,
            config: None,
            full: false,
        })
        .unwrap();

        assert!(out.contains("CORE-1 Root work New Feature"));
        assert!(out.contains("|- CORE-2 Split work New Feature"));
    }

    #[test]
    fn test_evaluate_writes_report_file() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("export.csv");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        file.write_all(
            "Issue key;Issue id;Summary;Issue Type;Status\n\
             CORE-1;1;Something broke;Bug;Open\n"
                .as_bytes(),
        )
        .unwrap();

        evaluate(&EvaluateOptions {
            csv: csv_path,
            project: None,
            component: None,
            tracker_base: String::new(),
            split_by_component: false,
            output_dir: dir.path().to_path_buf(),
            config: None,
        })
        .unwrap();

        assert!(dir.path().join("report.html").exists());
    }
}
