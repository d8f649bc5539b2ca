//! Job list filtering for the browse views.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Job, JobCategory};

/// Default salary band of the filter, in thousands.
pub const DEFAULT_SALARY_BAND: (u32, u32) = (50, 150);

/// Locations offered by the filter form; any free-text location can still be passed.
pub const LOCATIONS: [&str; 7] = [
    "Remote",
    "New York, USA",
    "San Francisco, USA",
    "London, UK",
    "Berlin, Germany",
    "Singapore",
    "Tokyo, Japan",
];

static NON_SALARY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9-]").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search_term: String,
    pub categories: Vec<JobCategory>,
    pub locations: Vec<String>,
    /// Inclusive band in thousands, e.g. `(50, 150)` means 50,000..=150,000.
    pub salary_range: (u32, u32),
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            categories: Vec::new(),
            locations: Vec::new(),
            salary_range: DEFAULT_SALARY_BAND,
        }
    }
}

/// Pulls `(min, max)` out of a free-text salary such as `"120,000 - 150,000 USDC"`.
///
/// Everything except digits and `-` is dropped and the rest split on `-`.
/// A side that does not parse is `None`.
pub fn parse_salary(text: &str) -> (Option<i64>, Option<i64>) {
    let cleaned = NON_SALARY_CHARS.replace_all(text, "");
    let mut parts = cleaned.split('-').map(|s| s.trim().parse::<i64>().ok());
    let min = parts.next().flatten();
    let max = parts.next().flatten();
    (min, max)
}

impl FilterCriteria {
    pub fn matches(&self, job: &Job) -> bool {
        self.matches_search(job)
            && (self.categories.is_empty() || self.categories.contains(&job.category))
            && (self.locations.is_empty() || self.locations.iter().any(|l| *l == job.location))
            && self.matches_salary(job)
    }

    fn matches_search(&self, job: &Job) -> bool {
        if self.search_term.is_empty() {
            return true;
        }
        let needle = self.search_term.to_lowercase();
        job.title.to_lowercase().contains(&needle)
            || job.description.to_lowercase().contains(&needle)
            || job.company.to_lowercase().contains(&needle)
    }

    /// Any overlap between the job's range and the band. Unparseable sides never match.
    fn matches_salary(&self, job: &Job) -> bool {
        let lo = i64::from(self.salary_range.0) * 1000;
        let hi = i64::from(self.salary_range.1) * 1000;
        let in_band = |v: i64| v >= lo && v <= hi;

        match parse_salary(&job.salary) {
            (Some(min), Some(max)) => in_band(min) || in_band(max) || (min <= lo && max >= hi),
            (Some(v), None) | (None, Some(v)) => in_band(v),
            (None, None) => false,
        }
    }

    pub fn apply<'a>(&self, jobs: &'a [Job]) -> Vec<&'a Job> {
        jobs.iter().filter(|job| self.matches(job)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(title: &str, company: &str, location: &str, salary: &str, category: JobCategory) -> Job {
        Job {
            id: 1,
            title: title.to_string(),
            company: company.to_string(),
            location: location.to_string(),
            salary: salary.to_string(),
            description: format!("{} at {}", title, company),
            employer: "0x0000".to_string(),
            category,
            is_open: true,
            posted_at: None,
            created_by: None,
            ipfs_hash: None,
        }
    }

    #[test]
    fn test_parse_salary_formats() {
        assert_eq!(
            parse_salary("120,000 - 150,000 USDC"),
            (Some(120_000), Some(150_000))
        );
        assert_eq!(parse_salary("100000"), (Some(100_000), None));
        assert_eq!(parse_salary("competitive"), (None, None));
        assert_eq!(parse_salary("-90000"), (None, Some(90_000)));
    }

    #[test]
    fn test_salary_band_overlap() {
        let criteria = FilterCriteria::default();
        let high = job("A", "Co", "Remote", "160,000 - 200,000 USDC", JobCategory::Design);
        let mid = job("B", "Co", "Remote", "90,000 - 120,000 USDC", JobCategory::Design);
        let straddle = job("C", "Co", "Remote", "140,000 - 180,000", JobCategory::Design);
        let wide = job("D", "Co", "Remote", "10,000 - 500,000", JobCategory::Design);

        assert!(!criteria.matches(&high));
        assert!(criteria.matches(&mid));
        assert!(criteria.matches(&straddle));
        assert!(criteria.matches(&wide));
    }

    #[test]
    fn test_malformed_salary_never_matches() {
        let criteria = FilterCriteria {
            salary_range: (0, 100_000),
            ..Default::default()
        };
        let garbage = job("A", "Co", "Remote", "DOE", JobCategory::Design);
        assert!(!criteria.matches(&garbage));
    }

    #[test]
    fn test_search_is_case_insensitive_over_title_description_company() {
        let jobs = vec![
            job("Solidity Dev", "DeFi", "Remote", "100 - 120000", JobCategory::Development),
            job("Designer", "NFT Market", "Remote", "100000", JobCategory::Design),
        ];
        let criteria = FilterCriteria {
            search_term: "nft".to_string(),
            ..Default::default()
        };
        let hits = criteria.apply(&jobs);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Designer");

        let criteria = FilterCriteria {
            search_term: "SOLIDITY".to_string(),
            ..Default::default()
        };
        assert_eq!(criteria.apply(&jobs)[0].title, "Solidity Dev");
    }

    #[test]
    fn test_category_and_location_membership() {
        let jobs = vec![
            job("A", "Co", "Remote", "100000", JobCategory::Development),
            job("B", "Co", "Berlin, Germany", "100000", JobCategory::Economics),
            job("C", "Co", "Remote", "100000", JobCategory::Security),
        ];
        let criteria = FilterCriteria {
            categories: vec![JobCategory::Development, JobCategory::Economics],
            locations: vec!["Remote".to_string()],
            ..Default::default()
        };
        let hits: Vec<&str> = criteria.apply(&jobs).iter().map(|j| j.title.as_str()).collect();
        assert_eq!(hits, vec!["A"]);
    }
}
