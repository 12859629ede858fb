use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, de::DeserializeOwned};

/// Date format the search form and the "last update" marker both use.
pub const DAY_MONTH_YEAR: &str = "%d.%m.%Y";

const ENV_PREFIX: &str = "ROOKERY_";

/// The raw env vars needed for crawling, before validation.
#[derive(Debug, Deserialize)]
pub struct CrawlEnv {
    #[serde(default = "default_search_url")]
    search_url: String,
    #[serde(default = "default_queries")]
    queries: Vec<String>,
    #[serde(default = "default_date_from")]
    date_from: String,
    #[serde(default = "default_date_to")]
    date_to: String,
    #[serde(default = "default_max_results")]
    max_results: String,
    #[serde(default = "default_checkpoint_dir")]
    checkpoint_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    output_dir: PathBuf,
    #[serde(default = "default_identifier_marker")]
    identifier_marker: String,
    #[serde(default = "default_link_scheme")]
    link_scheme: String,
    #[serde(default = "default_show_details")]
    show_details: bool,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

fn default_search_url() -> String {
    "https://chess-results.com/TurnierSuche.aspx?lan=1".to_string()
}

fn default_queries() -> Vec<String> {
    vec![
        "European Youth".to_string(),
        "International Open".to_string(),
        "World Youth".to_string(),
    ]
}

fn default_date_from() -> String {
    "01.01.2008".to_string()
}

fn default_date_to() -> String {
    "01.01.2020".to_string()
}

// Option value of the "max lines" dropdown; 5 selects 2000 lines.
fn default_max_results() -> String {
    "5".to_string()
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("processed_data")
}

fn default_identifier_marker() -> String {
    "FideID".to_string()
}

fn default_link_scheme() -> String {
    "http".to_string()
}

fn default_show_details() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Inclusive tournament start-date window submitted with every search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> anyhow::Result<Self> {
        anyhow::ensure!(from <= to, "date range starts after it ends: {from} > {to}");
        Ok(Self { from, to })
    }

    pub fn parse(from: &str, to: &str) -> anyhow::Result<Self> {
        let from = NaiveDate::parse_from_str(from.trim(), DAY_MONTH_YEAR)
            .with_context(|| format!("invalid start date '{from}', expected DD.MM.YYYY"))?;
        let to = NaiveDate::parse_from_str(to.trim(), DAY_MONTH_YEAR)
            .with_context(|| format!("invalid end date '{to}', expected DD.MM.YYYY"))?;
        Self::new(from, to)
    }

    pub fn from_form_value(&self) -> String {
        self.from.format(DAY_MONTH_YEAR).to_string()
    }

    pub fn to_form_value(&self) -> String {
        self.to.format(DAY_MONTH_YEAR).to_string()
    }
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub search_url: String,
    pub queries: Vec<String>,
    pub date_range: DateRange,
    pub max_results: String,
    pub checkpoint_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Header fragment identifying the column a "Link" column follows.
    pub identifier_marker: String,
    /// Prefix a profile link must carry to be fetched.
    pub link_scheme: String,
    pub show_details: bool,
    pub request_timeout: Duration,
}

impl CrawlConfig {
    pub fn new() -> anyhow::Result<Self> {
        let crawl_env = CrawlEnv::load_from_env()?;
        Self::from_env(crawl_env)
    }

    pub fn from_env(crawl_env: CrawlEnv) -> anyhow::Result<Self> {
        let date_range = DateRange::parse(&crawl_env.date_from, &crawl_env.date_to)?;
        let queries: Vec<String> = crawl_env
            .queries
            .into_iter()
            .map(|query| query.trim().to_string())
            .filter(|query| !query.is_empty())
            .collect();
        anyhow::ensure!(!queries.is_empty(), "no search queries configured");
        anyhow::ensure!(
            !crawl_env.identifier_marker.trim().is_empty(),
            "identifier marker must not be empty"
        );

        Ok(Self {
            search_url: crawl_env.search_url,
            queries,
            date_range,
            max_results: crawl_env.max_results,
            checkpoint_dir: crawl_env.checkpoint_dir,
            output_dir: crawl_env.output_dir,
            identifier_marker: crawl_env.identifier_marker.trim().to_string(),
            link_scheme: crawl_env.link_scheme,
            show_details: crawl_env.show_details,
            request_timeout: Duration::from_secs(crawl_env.request_timeout_secs),
        })
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        let from = NaiveDate::from_ymd_opt(2008, 1, 1).unwrap_or(NaiveDate::MIN);
        let to = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MAX);
        Self {
            search_url: default_search_url(),
            queries: default_queries(),
            date_range: DateRange { from, to },
            max_results: default_max_results(),
            checkpoint_dir: default_checkpoint_dir(),
            output_dir: default_output_dir(),
            identifier_marker: default_identifier_marker(),
            link_scheme: default_link_scheme(),
            show_details: default_show_details(),
            request_timeout: Duration::from_secs(default_request_timeout_secs()),
        }
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config = envy::prefixed(ENV_PREFIX)
            .from_env::<Self>()
            .context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_range_parses_day_month_year() {
        let range = DateRange::parse("01.01.2019", "03.03.2019").unwrap();
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2019, 3, 3).unwrap());
        assert_eq!(range.to_form_value(), "03.03.2019");
    }

    #[test]
    fn date_range_rejects_inverted_window() {
        assert!(DateRange::parse("01.01.2020", "01.01.2008").is_err());
        assert!(DateRange::parse("2008-01-01", "01.01.2020").is_err());
    }

    #[test]
    fn env_defaults_fill_every_field() {
        let vars = vec![(
            "ROOKERY_QUERIES".to_string(),
            "World Youth, ,European Youth".to_string(),
        )];
        let crawl_env: CrawlEnv = envy::prefixed(ENV_PREFIX).from_iter(vars).unwrap();
        let config = CrawlConfig::from_env(crawl_env).unwrap();
        assert_eq!(config.queries, vec!["World Youth", "European Youth"]);
        assert_eq!(config.identifier_marker, "FideID");
        assert_eq!(config.date_range.from_form_value(), "01.01.2008");
        assert!(config.show_details);
    }
}
