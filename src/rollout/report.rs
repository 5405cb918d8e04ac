use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use super::types::{RolloutRecord, RolloutResult};

/// Outcome counts of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub pull_requests_opened: usize,
    pub pull_requests_already_open: usize,
    pub skipped_already_present: usize,
    pub skipped_no_supported_language: usize,
    pub would_roll_out: usize,
    pub branches_deleted: usize,
    pub branches_kept: usize,
    pub halted_already_exists: usize,
    pub failed: usize,
}

/// Per-repository records of one run
#[derive(Debug, Clone, Serialize)]
pub struct RolloutReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records: Vec<RolloutRecord>,
}

impl RolloutReport {
    pub fn new(run_id: &str) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.to_string(),
            started_at: now,
            finished_at: now,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: RolloutRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = RolloutRecord>) {
        self.records.extend(records);
        self.sort();
    }

    pub fn sort(&mut self) {
        self.records.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    }

    pub fn record(&self, full_name: &str) -> Option<&RolloutRecord> {
        self.records.iter().find(|record| record.full_name == full_name)
    }

    pub fn has_failures(&self) -> bool {
        self.records.iter().any(RolloutRecord::is_failure)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RolloutRecord> {
        self.records.iter().filter(|record| record.is_failure())
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            total: self.records.len(),
            ..ReportSummary::default()
        };

        for record in &self.records {
            if record.is_failure() {
                summary.failed += 1;
                continue;
            }
            match record.outcome() {
                Some(RolloutResult::PullRequestOpened { .. }) => summary.pull_requests_opened += 1,
                Some(RolloutResult::PullRequestAlreadyOpen) => {
                    summary.pull_requests_already_open += 1
                }
                Some(RolloutResult::SkippedAlreadyPresent) => summary.skipped_already_present += 1,
                Some(RolloutResult::SkippedNoSupportedLanguage) => {
                    summary.skipped_no_supported_language += 1
                }
                Some(RolloutResult::WouldRollOut { .. }) => summary.would_roll_out += 1,
                Some(RolloutResult::RolledBack) => summary.branches_deleted += 1,
                Some(RolloutResult::KeptOpenPullRequest { .. }) => summary.branches_kept += 1,
                Some(RolloutResult::HaltedAlreadyExists { .. }) => {
                    summary.halted_already_exists += 1
                }
                _ => {}
            }
        }
        summary
    }

    /// Human-readable report printed at the end of a command
    pub fn render(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            let marker = match record.outcome() {
                _ if record.is_failure() => "❌",
                Some(RolloutResult::HaltedAlreadyExists { .. }) => "⏸️",
                _ => "✅",
            };
            let outcome = record
                .outcome()
                .map(ToString::to_string)
                .unwrap_or_else(|| "no steps ran".to_string());
            let _ = writeln!(out, "{marker} {}: {outcome}", record.full_name);
            if record.is_failure() {
                for result in record.history.iter() {
                    if let RolloutResult::Failed { step, cause } = result {
                        let _ = writeln!(out, "     ↳ {step}: {cause}");
                    }
                }
            }
        }

        let summary = self.summary();
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "📊 {} repositories: {} opened, {} already open, {} already present, {} without supported language, {} would roll out, {} branches deleted, {} kept, {} halted on existing, {} failed",
            summary.total,
            summary.pull_requests_opened,
            summary.pull_requests_already_open,
            summary.skipped_already_present,
            summary.skipped_no_supported_language,
            summary.would_roll_out,
            summary.branches_deleted,
            summary.branches_kept,
            summary.halted_already_exists,
            summary.failed,
        );
        out
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }
}
