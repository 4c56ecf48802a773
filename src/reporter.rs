/*!
 * Run reports.
 *
 * A [`RunReport`] collects the processing counters and a summary of the
 * dependency store at the end of a run. It is written twice: as pretty JSON
 * for tools, and as a short text summary for people.
 */

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use uuid::Uuid;

use crate::dependencies::{DependencyCounts, DependencyStore};
use crate::processor::ProcessingStats;

/// Most used dependencies kept in the JSON report
const REPORT_MOST_USED: usize = 100;

/// Most used dependencies listed in the text summary
const SUMMARY_MOST_USED: usize = 20;

/// Missing names and failure messages listed in the text summary
const SUMMARY_LINES: usize = 50;

/// One line of the usage ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageEntry {
    pub name: String,
    pub definitions: usize,
}

/// What the dependency store looked like at the end of the run
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencySummary {
    pub counts: DependencyCounts,
    /// Fetches started during the run
    pub fetches: usize,
    pub most_used: Vec<UsageEntry>,
    pub confirmed_missing: Vec<String>,
    pub transient_failures: Vec<String>,
}

impl DependencySummary {
    /// Snapshot of `store`, ranked by the usage counts in `stats`
    pub fn collect(store: &DependencyStore, stats: &ProcessingStats) -> Self {
        Self {
            counts: store.counts(),
            fetches: store.fetch_count(),
            most_used: ranking(stats, REPORT_MOST_USED),
            confirmed_missing: store.confirmed_missing().iter().map(ToString::to_string).collect(),
            transient_failures: store.transient_failures(),
        }
    }

    /// Usage ranking only, for runs without a store
    pub fn usage_only(stats: &ProcessingStats) -> Self {
        Self {
            most_used: ranking(stats, REPORT_MOST_USED),
            ..Self::default()
        }
    }
}

fn ranking(stats: &ProcessingStats, limit: usize) -> Vec<UsageEntry> {
    stats
        .most_used(limit)
        .into_iter()
        .map(|(name, definitions)| UsageEntry { name, definitions })
        .collect()
}

/// Summary of one processing run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Dump file or directory
    pub input: String,
    pub offline: bool,
    /// The run was stopped before the input was exhausted
    pub interrupted: bool,
    pub pages: usize,
    pub definitions: usize,
    pub stats: ProcessingStats,
    pub dependencies: DependencySummary,
}

impl RunReport {
    /// Start a report for a run over `input`
    pub fn new(input: &str, offline: bool) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            input: input.to_string(),
            offline,
            interrupted: false,
            pages: 0,
            definitions: 0,
            stats: ProcessingStats::default(),
            dependencies: DependencySummary::default(),
        }
    }

    /// Record the final counters
    pub fn finish(&mut self, stats: ProcessingStats, store: Option<&DependencyStore>, interrupted: bool) {
        self.dependencies = match store {
            Some(store) => DependencySummary::collect(store, &stats),
            None => DependencySummary::usage_only(&stats),
        };
        self.stats = stats;
        self.interrupted = interrupted;
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration in seconds, zero until finished
    pub fn duration_secs(&self) -> f64 {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0)
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        let stats = &self.stats;
        let mut text = String::new();

        let _ = writeln!(text, "Run {}", self.run_id);
        let _ = writeln!(text, "Input: {}{}", self.input, if self.offline { " (offline)" } else { "" });
        let _ = writeln!(text, "Started: {}", self.started_at.to_rfc3339());
        if self.interrupted {
            let _ = writeln!(text, "Interrupted after {:.1}s", self.duration_secs());
        } else {
            let _ = writeln!(text, "Duration: {:.1}s", self.duration_secs());
        }
        let _ = writeln!(text);
        let _ = writeln!(text, "Pages: {}", self.pages);
        let _ = writeln!(text, "Definitions: {}", self.definitions);
        let _ = writeln!(text, "  processed: {}", stats.processed);
        let _ = writeln!(text, "  succeeded: {}", stats.succeeded);
        let _ = writeln!(text, "  succeeded after retry: {}", stats.retried_succeeded);
        let _ = writeln!(text, "  degraded: {}", stats.degraded);
        let _ = writeln!(text, "  permanently failed: {}", stats.permanently_failed);
        let _ = writeln!(text, "  still pending: {}", stats.still_pending);

        if !self.offline {
            let counts = &self.dependencies.counts;
            let _ = writeln!(text);
            let _ = writeln!(
                text,
                "Dependencies: {} fetched, {} confirmed missing, {} pending ({} fetches)",
                counts.fetched, counts.confirmed_missing, counts.pending, self.dependencies.fetches
            );
        }

        let most_used = &self.dependencies.most_used;
        if !most_used.is_empty() {
            let _ = writeln!(text);
            let _ = writeln!(text, "Most used:");
            for entry in most_used.iter().take(SUMMARY_MOST_USED) {
                let _ = writeln!(text, "  {:>6}  {}", entry.definitions, entry.name);
            }
        }

        write_capped(&mut text, "Confirmed missing", &self.dependencies.confirmed_missing);
        write_capped(&mut text, "Transient failures", &self.dependencies.transient_failures);

        text
    }

    /// Write `<dir>/<stem>.json` and `<dir>/<stem>.txt`, returning both paths
    pub fn write(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;

        let stem = format!(
            "run-{}-{}",
            self.started_at.format("%Y%m%d-%H%M%S"),
            self.run_id.split('-').next().unwrap_or("report")
        );
        let json_path = dir.join(format!("{}.json", stem));
        let text_path = dir.join(format!("{}.txt", stem));

        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        fs::write(&json_path, json)
            .with_context(|| format!("Failed to write report: {}", json_path.display()))?;
        fs::write(&text_path, self.summary())
            .with_context(|| format!("Failed to write report: {}", text_path.display()))?;

        info!("Report written to {}", json_path.display());
        Ok((json_path, text_path))
    }
}

fn write_capped(text: &mut String, title: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let _ = writeln!(text);
    let _ = writeln!(text, "{} ({}):", title, lines.len());
    for line in lines.iter().take(SUMMARY_LINES) {
        let _ = writeln!(text, "  {}", line);
    }
    if lines.len() > SUMMARY_LINES {
        let _ = writeln!(text, "  ... and {} more", lines.len() - SUMMARY_LINES);
    }
}
