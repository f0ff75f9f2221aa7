//! Configuration file loading and parsing.
//!
//! The tool reads an optional `ticketstats.toml` next to the working
//! directory (or an explicit `--config` path). Every section is optional;
//! missing values fall back to the defaults of a stock tracker export.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::cluster::{ClusterPolicy, PartDirection};

/// Root configuration structure loaded from `ticketstats.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Default project key filter (optional).
    pub project: Option<String>,
    /// Default component filter (optional).
    pub component: Option<String>,
    /// Ticket type names (optional).
    pub types: Option<TypeNames>,
    /// Workflow state names (optional).
    pub states: Option<StateNames>,
    /// Custom field column names in the export (optional).
    pub customs: Option<CustomFields>,
    /// Date format strings (optional).
    pub formats: Option<Formats>,
    /// Link interpretation policy (optional).
    pub links: Option<LinkPolicy>,
}

/// Ticket type names as they appear in the export.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeNames {
    pub bug: Option<String>,
    pub feature: Option<String>,
    pub improvement: Option<String>,
}

/// Workflow state names as they appear in the export.
#[derive(Debug, Clone, Deserialize)]
pub struct StateNames {
    /// Status label marking a ticket as closed.
    pub closed: Option<String>,
    /// Statuses excluded from the open-bug report tables.
    pub bug_filter: Option<Vec<String>>,
}

/// Custom field column names of the export.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomFields {
    pub external_id: Option<String>,
    pub supplier_reference: Option<String>,
    pub variant: Option<String>,
    /// Booking account column, used to validate work log activities.
    pub account: Option<String>,
    pub category: Option<String>,
}

/// Date format strings (chrono `strftime` syntax).
#[derive(Debug, Clone, Deserialize)]
pub struct Formats {
    /// Format used for dates rendered into the report.
    pub date: Option<String>,
    /// Format of timestamps in the export.
    pub export_date: Option<String>,
}

/// Policy knobs for ambiguous link semantics.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkPolicy {
    /// Direction of "Part" links: `referenced-is-parent` (default) attaches
    /// the linking ticket under the referenced part, `referenced-is-child`
    /// attaches the part under the linking ticket.
    pub part_direction: Option<String>,
}

impl Config {
    /// Load configuration from `path`, or from `ticketstats.toml` in the
    /// current directory if no path was given. Absence of the default file
    /// is not an error; defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(explicit) => Config::from_file(explicit),
            None => {
                let default = Path::new("ticketstats.toml");
                if default.exists() {
                    Config::from_file(default)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        // Surface invalid policy values at load time, not mid-run.
        config.cluster_policy()?;
        Ok(config)
    }

    pub fn bug_type(&self) -> String {
        self.types
            .as_ref()
            .and_then(|t| t.bug.clone())
            .unwrap_or_else(|| "Bug".to_string())
    }

    pub fn feature_type(&self) -> String {
        self.types
            .as_ref()
            .and_then(|t| t.feature.clone())
            .unwrap_or_else(|| "New Feature".to_string())
    }

    pub fn improvement_type(&self) -> String {
        self.types
            .as_ref()
            .and_then(|t| t.improvement.clone())
            .unwrap_or_else(|| "Improvement".to_string())
    }

    /// Status label that marks a ticket as closed.
    pub fn closed_status(&self) -> String {
        self.states
            .as_ref()
            .and_then(|s| s.closed.clone())
            .unwrap_or_else(|| "Closed".to_string())
    }

    /// Statuses excluded from the open-bug tables of the report.
    pub fn bug_filter_states(&self) -> Vec<String> {
        self.states
            .as_ref()
            .and_then(|s| s.bug_filter.clone())
            .unwrap_or_default()
    }

    /// Format for dates rendered into the report.
    pub fn date_format(&self) -> String {
        self.formats
            .as_ref()
            .and_then(|f| f.date.clone())
            .unwrap_or_else(|| "%Y-%m-%d".to_string())
    }

    /// Format of timestamps in the export, e.g. "04/Mar/24 3:15 PM".
    pub fn export_date_format(&self) -> String {
        self.formats
            .as_ref()
            .and_then(|f| f.export_date.clone())
            .unwrap_or_else(|| "%d/%b/%y %l:%M %p".to_string())
    }

    pub fn custom_external_id(&self) -> String {
        self.customs
            .as_ref()
            .and_then(|c| c.external_id.clone())
            .unwrap_or_else(|| "Custom field (External ID)".to_string())
    }

    pub fn custom_supplier_reference(&self) -> String {
        self.customs
            .as_ref()
            .and_then(|c| c.supplier_reference.clone())
            .unwrap_or_else(|| "Custom field (Supplier reference)".to_string())
    }

    pub fn custom_variant(&self) -> String {
        self.customs
            .as_ref()
            .and_then(|c| c.variant.clone())
            .unwrap_or_else(|| "Custom field (Variant)".to_string())
    }

    pub fn custom_account(&self) -> String {
        self.customs
            .as_ref()
            .and_then(|c| c.account.clone())
            .unwrap_or_else(|| "Custom field (Booking Account)".to_string())
    }

    pub fn custom_category(&self) -> String {
        self.customs
            .as_ref()
            .and_then(|c| c.category.clone())
            .unwrap_or_else(|| "Custom field (Bug-Category)".to_string())
    }

    /// The policy values consumed by the clustering core.
    pub fn cluster_policy(&self) -> Result<ClusterPolicy> {
        let part_direction = match self
            .links
            .as_ref()
            .and_then(|l| l.part_direction.as_deref())
        {
            None | Some("referenced-is-parent") => PartDirection::ReferencedIsParent,
            Some("referenced-is-child") => PartDirection::ReferencedIsChild,
            Some(invalid) => anyhow::bail!(
                "Invalid part link direction: '{}'. Valid options: 'referenced-is-parent', 'referenced-is-child'",
                invalid
            ),
        };
        Ok(ClusterPolicy {
            closed_status: self.closed_status(),
            part_direction,
        })
    }
}
