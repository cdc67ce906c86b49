//! Per-run pipeline context. Each stage fully consumes its input and
//! returns a new table; nothing global, nothing mutated across stages.

use std::path::{Path, PathBuf};

use crate::aggregate::{self, DateWindow};
use crate::costing::{self, CostingOutcome};
use crate::error::{RecountError, Result};
use crate::loader;
use crate::merge;
use crate::metrics;
use crate::models::{InvoiceRecord, ProjectRecord, ProjectSummary, RateRecord, TimesheetEntry};
use crate::settings::Settings;

/// The four raw tables plus per-file checksums, loaded once per run.
pub struct PipelineRun {
    pub timesheet: Vec<TimesheetEntry>,
    pub rates: Vec<RateRecord>,
    pub registry: Vec<ProjectRecord>,
    pub invoices: Vec<InvoiceRecord>,
    /// (source name, sha256) for each file that was actually read.
    pub checksums: Vec<(String, String)>,
    split_month: Option<(i32, u32)>,
}

/// What a refresh produces: the normalized result set plus the stage
/// counts that make data anomalies observable instead of silent.
pub struct PipelineOutput {
    /// Per-project rows plus the trailing TOTAL row.
    pub summaries: Vec<ProjectSummary>,
    pub refreshed_at: String,
    pub costing: CostingOutcome,
    /// Registry rows collapsed away by duplicate merging.
    pub merged_duplicates: usize,
    /// Aggregate keys that matched no registry row.
    pub orphan_projects: usize,
}

fn require_path(name: &str, raw: &str) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        return Err(RecountError::Settings(format!(
            "no {name} source configured; run `recount sources set {name} <path>`"
        )));
    }
    Ok(PathBuf::from(raw))
}

fn checksum_if_readable(name: &str, path: &Path, out: &mut Vec<(String, String)>) {
    if let Ok(sum) = loader::file_checksum(path) {
        out.push((name.to_string(), sum));
    }
}

impl PipelineRun {
    /// Load all four sources per the configured paths. Structural problems
    /// (missing file everywhere, required column absent) fail here; per-row
    /// irregularities do not.
    pub fn load(settings: &Settings) -> Result<Self> {
        let timesheet_path = require_path("timesheet", &settings.sources.timesheet)?;
        let rates_path = require_path("rates", &settings.sources.rates)?;
        let registry_path = require_path("registry", &settings.sources.registry)?;
        let invoices_path = require_path("invoices", &settings.sources.invoices)?;
        let registry_fallback = if settings.sources.registry_fallback.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&settings.sources.registry_fallback))
        };

        let timesheet = loader::load_timesheet(&timesheet_path, &settings.internal_prefix)?;
        let rates = loader::load_rates(&rates_path)?;
        let registry = loader::load_registry(&registry_path, registry_fallback.as_deref())?;
        let invoices = loader::load_invoices(&invoices_path)?;

        let mut checksums = Vec::new();
        checksum_if_readable("timesheet", &timesheet_path, &mut checksums);
        checksum_if_readable("rates", &rates_path, &mut checksums);
        checksum_if_readable("registry", &registry_path, &mut checksums);
        if let Some(fb) = &registry_fallback {
            checksum_if_readable("registry_fallback", fb, &mut checksums);
        }
        checksum_if_readable("invoices", &invoices_path, &mut checksums);

        Ok(Self {
            timesheet,
            rates,
            registry,
            invoices,
            checksums,
            split_month: settings.split_month_parts(),
        })
    }

    /// Build a run from already-loaded tables (used by tests and by any
    /// embedding caller that sources its own tables).
    pub fn from_tables(
        timesheet: Vec<TimesheetEntry>,
        rates: Vec<RateRecord>,
        registry: Vec<ProjectRecord>,
        invoices: Vec<InvoiceRecord>,
        split_month: Option<(i32, u32)>,
    ) -> Self {
        Self {
            timesheet,
            rates,
            registry,
            invoices,
            checksums: Vec::new(),
            split_month,
        }
    }

    /// Run every stage in order: cost assignment, duplicate merge,
    /// cross-source aggregation, metric derivation, total row.
    pub fn execute(mut self, window: DateWindow) -> PipelineOutput {
        let costing = costing::assign_costs(&mut self.timesheet, &self.rates, self.split_month);

        // Canonical keys before the registry self-join; the loaders already
        // normalize, but embedded callers may not have.
        for rec in &mut self.registry {
            rec.project_no = crate::normalize::normalize_project_no(&rec.project_no);
        }
        let raw_count = self.registry.len();
        let registry = merge::merge_duplicates(self.registry);
        let merged_duplicates = raw_count - registry.len();

        let mut summaries =
            aggregate::build_summaries(&registry, &self.timesheet, &self.invoices, window);
        let orphan_projects = summaries.iter().filter(|r| !r.matched_registry).count();

        for row in &mut summaries {
            metrics::derive(row);
        }
        let total = metrics::total_row(&summaries);
        summaries.push(total);

        PipelineOutput {
            summaries,
            refreshed_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            costing,
            merged_duplicates,
            orphan_projects,
        }
    }
}
