use crate::error::{HarvestError, Result};
use crate::types::{DownloadRecord, DownloadStatus, IssueAssignment, Split, SplitConfig, SplitPlan, SplitSummary};
use fs_extra::file::CopyOptions;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, info_span, warn, Span};

/// Pages an issue must have to be eligible.
pub const PAGES_PER_ISSUE: usize = 4;
const PAGE_RANGE: std::ops::RangeInclusive<u32> = 1..=4;

pub struct DatasetSplitter {
    config: SplitConfig,
    span: Span,
}

impl DatasetSplitter {
    pub fn new(config: SplitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            span: info_span!("split"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Reads the download log, samples issues and copies their pages into the splits.
    pub fn run<R: Rng>(&self, rng: &mut R) -> Result<SplitSummary> {
        let records = read_download_log(&self.config.log_file)?;
        let plan = self.plan(&records, rng);
        self.execute(&plan)
    }

    /// Chooses one issue per split for every year that has enough complete issues.
    pub fn plan<R: Rng>(&self, records: &[DownloadRecord], rng: &mut R) -> SplitPlan {
        let _enter = self.span.enter();
        let mut plan = SplitPlan::default();

        for year in self.config.start_year..=self.config.end_year {
            // Collect eligible issues for the year
            let issues = complete_issues(records, year);

            // Skip years that cannot fill every split
            if issues.len() < Split::ALL.len() {
                warn!(
                    "Year {} does not have enough issues with {} pages. Skipping this year.",
                    year, PAGES_PER_ISSUE
                );
                plan.skipped_years.push(year);
                continue;
            }

            // Draw distinct issues and assign them in split order
            let keys: Vec<&String> = issues.keys().collect();
            let picked = rand::seq::index::sample(rng, keys.len(), Split::ALL.len());
            for (split, idx) in Split::ALL.into_iter().zip(picked) {
                let issue = keys[idx];
                debug!("Year {}: issue {} goes to {}", year, issue, split);
                plan.assignments.push(IssueAssignment {
                    year,
                    split,
                    issue: issue.clone(),
                    filenames: issues[issue].clone(),
                });
            }
        }

        plan
    }

    /// Copies the planned files from the raw directory; sources are left in place.
    pub fn execute(&self, plan: &SplitPlan) -> Result<SplitSummary> {
        let _enter = self.span.enter();

        // Validate source directory when there is something to copy
        if !plan.assignments.is_empty() && !self.config.raw_dir.is_dir() {
            return Err(HarvestError::MissingDirectory {
                path: self.config.raw_dir.display().to_string(),
            });
        }

        // Ensure split directories exist
        for split in Split::ALL {
            ensure_output_directory(&self.config.dataset_dir.join(split.dir_name()))?;
        }

        let mut options = CopyOptions::new();
        options.overwrite = true;
        let mut summary = SplitSummary {
            skipped_years: plan.skipped_years.clone(),
            ..SplitSummary::default()
        };

        // Copy each planned issue into its split
        for assignment in &plan.assignments {
            let target_dir = self.config.dataset_dir.join(assignment.split.dir_name());
            for filename in &assignment.filenames {
                let src = self.config.raw_dir.join(filename);
                let dst = target_dir.join(filename);
                fs_extra::file::copy(&src, &dst, &options)?;
                summary.files_copied += 1;
            }
        }

        summary.years_used = plan.assignments.len() / Split::ALL.len();
        info!(
            "Copied {} files for {} years; {} years skipped",
            summary.files_copied,
            summary.years_used,
            summary.skipped_years.len()
        );
        Ok(summary)
    }
}

/// Issues of `year` with exactly four successful pages in the page range and
/// no repeated filename, keyed by date with their filenames.
pub fn complete_issues(records: &[DownloadRecord], year: i32) -> BTreeMap<String, Vec<String>> {
    let mut issues: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for record in records {
        if record.status != DownloadStatus::Success || record.year() != Some(year) {
            continue;
        }
        if !record.page_number().is_some_and(|page| PAGE_RANGE.contains(&page)) {
            continue;
        }
        if let (Some(issue), Some(filename)) = (record.issue(), record.filename.as_ref()) {
            issues
                .entry(issue.to_string())
                .or_default()
                .push(filename.clone());
        }
    }

    issues.retain(|_, pages| {
        pages.len() == PAGES_PER_ISSUE
            && pages.iter().collect::<BTreeSet<_>>().len() == PAGES_PER_ISSUE
    });
    issues
}

pub fn read_download_log(path: &Path) -> Result<Vec<DownloadRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

fn ensure_output_directory(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        info!("Created output directory: {}", dir.display());
    }
    Ok(())
}
