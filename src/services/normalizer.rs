use crate::error::Result;
use regex::Regex;

/// Link pattern for the archive's image URLs.
///
/// The path after the URL-encoded `КП` segment looks like
/// `{year}/{number}-{day}-{month}-{year}/{d}SEP{m}SEP{y}SEP{page}.{ext}`, where the
/// separators in the file name vary across the archive's history. The alternation
/// below is the accepted set: `--`, `-`, `-%20`, `%20-`, `%20-%20`, `_`.
const LINK_PATTERN: &str = r"(?i)^http.*%D0%9A%D0%9F/(\d+)/(\d+)-(\d+)-(\d+)-(\d+)/(\d+)(?:--|-|-%20|%20-|%20-%20|_)(\d+)(?:--|-|-%20|%20-|%20-%20|_)(\d+)(?:--|-|-%20|%20-|%20-%20|_)(\d+).(\w+|\.\w+)";

/// Fields recovered from an archive image link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedName {
    pub year: String,
    pub number: String,
    pub day: String,
    pub month: String,
    pub page: String,
    pub extension: String,
}

impl NormalizedName {
    /// `YYYY-MM-DD`
    pub fn date(&self) -> String {
        format!("{}-{}-{}", self.year, self.month, self.day)
    }

    /// Canonical `{date}_{number}_{page}.{extension}` name.
    pub fn filename(&self) -> String {
        format!(
            "{}_{}_{}.{}",
            self.date(),
            self.number,
            self.page,
            self.extension
        )
    }
}

pub struct FilenameNormalizer {
    link_pattern: Regex,
}

impl FilenameNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            link_pattern: Regex::new(LINK_PATTERN)?,
        })
    }

    /// Returns `None` when the link does not follow the archive layout.
    pub fn normalize(&self, link: &str) -> Option<NormalizedName> {
        let caps = self.link_pattern.captures(link)?;
        let group = |idx: usize| caps.get(idx).map(|m| m.as_str()).unwrap_or_default();

        Some(NormalizedName {
            year: group(1).to_string(),
            number: zero_pad(group(2), 3),
            day: zero_pad(group(3), 2),
            month: zero_pad(group(4), 2),
            page: zero_pad(group(9), 2),
            extension: group(10).to_lowercase().trim_start_matches('.').to_string(),
        })
    }
}

impl Default for FilenameNormalizer {
    fn default() -> Self {
        Self::new().unwrap()
    }
}

/// Left-pads with zeros up to `width`; longer input is kept as is.
fn zero_pad(digits: &str, width: usize) -> String {
    format!("{:0>width$}", digits, width = width)
}
