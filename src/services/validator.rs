use crate::error::{HarvestError, Result};
use crate::types::CheckReport;
use regex::Regex;
use std::path::Path;
use tracing::{info, info_span, warn, Span};
use walkdir::WalkDir;

// Years 1946-1991, months 01-12, days 01-31, issue 000-399, pages 01-04.
const CANONICAL_PATTERN: &str = r"^(194[6-9]|19[5-8][0-9]|199[0-1])-(0[1-9]|1[0-2])-(0[1-9]|[1-2][0-9]|3[0-1])_([0-3][0-9][0-9])_(0[1-4])\.(jpg|png)$";

pub struct FilenameValidator {
    canonical: Regex,
    span: Span,
}

impl FilenameValidator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            canonical: Regex::new(CANONICAL_PATTERN)?,
            span: info_span!("check"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_canonical(&self, filename: &str) -> bool {
        self.canonical.is_match(filename)
    }

    /// Audits the top level of `directory`; nothing is renamed or removed.
    pub fn check_directory(&self, directory: &Path) -> Result<CheckReport> {
        let _enter = self.span.enter();

        if !directory.is_dir() {
            return Err(HarvestError::MissingDirectory {
                path: directory.display().to_string(),
            });
        }

        let mut report = CheckReport::default();
        for entry in WalkDir::new(directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy();
            report.checked += 1;

            if !self.is_canonical(&name) {
                warn!("File '{}' does not match the required pattern.", name);
                report.invalid.push(name.into_owned());
            }
        }

        info!(
            "{} of {} files do not match the required pattern.",
            report.invalid.len(),
            report.checked
        );
        Ok(report)
    }
}

impl Default for FilenameValidator {
    fn default() -> Self {
        Self::new().unwrap()
    }
}
