use chrono::NaiveDate;
use regex::Regex;

use crate::pages::TournamentPage;

/// Works out when a tournament took place.
///
/// The title's year wins; the page's "last update" stamp is only a fallback.
pub struct DateResolver {
    // A 4-digit run not embedded in a longer number.
    year_regex: Regex,
    day_month_year_regex: Regex,
}

impl DateResolver {
    pub fn new() -> anyhow::Result<Self> {
        let year_regex = Regex::new(r"(?:^|[^0-9])([0-9]{4})(?:[^0-9]|$)")?;
        let day_month_year_regex = Regex::new(r"(?:^|[^0-9])([0-9]{2})\.([0-9]{2})\.([0-9]{4})")?;
        Ok(Self {
            year_regex,
            day_month_year_regex,
        })
    }

    pub fn resolve_for_page(&self, page: &TournamentPage, title: &str) -> Option<NaiveDate> {
        self.resolve(title, page.last_updated().as_deref())
    }

    pub fn resolve(&self, title: &str, last_updated: Option<&str>) -> Option<NaiveDate> {
        self.year_from_title(title)
            .or_else(|| last_updated.and_then(|marker| self.day_month_year(marker)))
    }

    /// January 1 of the first year token in `title`.
    pub fn year_from_title(&self, title: &str) -> Option<NaiveDate> {
        let caps = self.year_regex.captures(title)?;
        let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
        NaiveDate::from_ymd_opt(year, 1, 1)
    }

    /// First valid `DD.MM.YYYY` date in the marker text.
    pub fn day_month_year(&self, marker: &str) -> Option<NaiveDate> {
        self.day_month_year_regex.captures_iter(marker).find_map(|caps| {
            let day = caps.get(1)?.as_str().parse::<u32>().ok()?;
            let month = caps.get(2)?.as_str().parse::<u32>().ok()?;
            let year = caps.get(3)?.as_str().parse::<i32>().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        })
    }
}
