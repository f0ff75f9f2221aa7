//! HTML rendering of the finished report.

use anyhow::{Context, Result};
use askama::Template;
use std::fs;
use std::path::{Path, PathBuf};

use crate::report::Report;

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate<'a> {
    report: &'a Report,
}

/// Renders the report into `output_dir` and returns the written path.
/// Component reports are written as `report_<component>.html`.
pub fn render(report: &Report, output_dir: &Path) -> Result<PathBuf> {
    let file_name = if report.component.is_empty() {
        "report.html".to_string()
    } else {
        format!("report_{}.html", report.component)
    };
    let path = output_dir.join(file_name);

    let html = ReportTemplate { report }
        .render()
        .context("failed to render report template")?;
    fs::write(&path, html)
        .with_context(|| format!("failed to write report {}", path.display()))?;

    Ok(path)
}
