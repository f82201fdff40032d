//! Format store records, node lists, and run summaries as text.

use crate::registry::Registration;
use crate::sync::SyncReport;
use crate::types::NodeId;
use crate::watch::RunSummary;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};

/// One store record as listed by `ls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub key: String,
    pub value: String,
}

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn format_records_text(handle: &str, records: &[RecordEntry]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Records for {}", handle))
    ));
    if records.is_empty() {
        out.push_str("No records.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Key", "Hash"]);
    for record in records {
        table.add_row(vec![record.key.clone(), record.value.clone()]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_nodes_text(handle: &str, nodes: &[NodeId]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Nodes for {}", handle))
    ));
    if nodes.is_empty() {
        out.push_str("No nodes registered.\n");
        return out;
    }
    for (i, node) in nodes.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, node));
    }
    out
}

pub fn format_registration_text(handle: &str, registration: &Registration) -> String {
    let line = match registration {
        Registration::Added { node_id, .. } => format!("Registered node {}\n\n", node_id),
        Registration::AlreadyPresent { node_id, .. } => {
            format!("Node {} already registered\n\n", node_id)
        }
    };
    let mut out = line;
    out.push_str(&format_nodes_text(handle, registration.nodes()));
    out
}

pub fn format_sync_report_text(report: &SyncReport) -> String {
    format!(
        "Synced {} file(s): {} changed, {} unchanged ({} directories skipped)",
        report.files, report.changed, report.unchanged, report.directories
    )
}

pub fn format_run_summary_text(summary: &RunSummary) -> String {
    format!(
        "Watch stopped after {} event(s): {} published, {} unchanged, {} skipped, {} failed, {} watcher error(s)",
        summary.processed(),
        summary.published,
        summary.unchanged,
        summary.skipped,
        summary.failed,
        summary.notify_errors
    )
}
