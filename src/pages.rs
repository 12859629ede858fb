//! Page models for the two sites the crawler reads.
//!
//! Each page kind owns its selectors and exposes named extraction methods, so
//! a layout change on either site is fixed in one place. Features a page may
//! simply not have come back as `Option`.

use std::collections::HashSet;

use reqwest::Url;
use scraper::{ElementRef, Html};

use crate::error::CrawlError;
use crate::table_extractor::{RawTable, extract_raw_table};
use crate::text_manipulators::{extract_text, parse_selector};

/// Prefix the results server puts in front of every tournament title.
pub const TITLE_PREFIX: &str = "Chess-Results Server Chess-results.com - ";
pub const LAST_UPDATED_SELECTOR: &str = ".CRsmall";
const LAST_UPDATED_LABEL: &str = "last update";

pub const SEARCH_RESULTS_LINK_SELECTOR: &str = "table.CRs2 a";

pub const PROFILE_BLOCK_SELECTOR: &str = "div.profile-top-info";
pub const PROFILE_FIELD_SELECTOR: &str = "div.profile-top-info__block__row__data";

// Ordinal positions inside the profile block. These are the profile site's
// contract; re-check them whenever the site changes.
const PROFILE_WORLD_RANK: usize = 0;
const PROFILE_FEDERATION: usize = 1;
const PROFILE_BIRTH_YEAR: usize = 3;
const PROFILE_SEX: usize = 4;
const PROFILE_TITLE: usize = 5;

pub trait PageModel: Sized {
    fn from_document(document: Html) -> Self;

    fn parse(html: &str) -> Self {
        Self::from_document(Html::parse_document(html))
    }
}

/// A tournament standings page.
pub struct TournamentPage {
    document: Html,
}

impl PageModel for TournamentPage {
    fn from_document(document: Html) -> Self {
        Self { document }
    }
}

impl TournamentPage {
    pub fn title(&self) -> Option<String> {
        let selector = parse_selector("title").ok()?;
        let title = extract_text(self.document.select(&selector).next()?);
        let title = title.strip_prefix(TITLE_PREFIX).unwrap_or(&title).trim();
        (!title.is_empty()).then(|| title.to_string())
    }

    pub fn results_table(&self) -> Result<RawTable, CrawlError> {
        extract_raw_table(&self.document)
    }

    /// Text of the "last update" marker, if the page shows one.
    pub fn last_updated(&self) -> Option<String> {
        let selector = parse_selector(LAST_UPDATED_SELECTOR).ok()?;
        self.document
            .select(&selector)
            .map(extract_text)
            .find(|text| text.to_lowercase().contains(LAST_UPDATED_LABEL))
    }

    /// The key/value table following the page's first `<h2>`.
    pub fn details(&self) -> Option<TournamentDetails> {
        let table = self.details_table()?;
        let row_selector = parse_selector("tr").ok()?;
        let cell_selector = parse_selector("td").ok()?;

        let mut details = TournamentDetails::default();
        for row in table.select(&row_selector) {
            let cells: Vec<String> = row.select(&cell_selector).map(extract_text).collect();
            if cells.len() > 1 {
                details.insert(&cells[0], &cells[1]);
            }
        }

        if let Some(date) = details.remove("Date") {
            match date.split_once(" to ") {
                Some((start, end)) => {
                    details.insert("Start Date", start.trim());
                    details.insert("End Date", end.trim());
                }
                None => details.insert("Date", &date),
            }
        }

        (!details.is_empty()).then_some(details)
    }

    fn details_table(&self) -> Option<ElementRef<'_>> {
        let mut seen_heading = false;
        for node in self.document.root_element().descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            match element.value().name() {
                "h2" => seen_heading = true,
                "table" if seen_heading => return Some(element),
                _ => {}
            }
        }
        None
    }
}

/// Ordered key/value facts about a tournament (organizer, venue, dates...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TournamentDetails {
    entries: Vec<(String, String)>,
}

impl TournamentDetails {
    /// Sets `key`, replacing an earlier value in place.
    pub fn insert(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Biographical fields from a player's rating profile. Any of them may be
/// missing; a profile page without the info block yields all `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub federation: Option<String>,
    pub birth_year: Option<String>,
    pub sex: Option<String>,
    pub title: Option<String>,
    pub world_rank: Option<String>,
}

impl ProfileFields {
    pub const HEADERS: [&'static str; 5] =
        ["Federation", "Birth Year", "Sex", "FIDE Title", "World Rank"];

    pub fn values(&self) -> [Option<&str>; 5] {
        [
            self.federation.as_deref(),
            self.birth_year.as_deref(),
            self.sex.as_deref(),
            self.title.as_deref(),
            self.world_rank.as_deref(),
        ]
    }
}

/// A player's rating-site profile.
pub struct ProfilePage {
    document: Html,
}

impl PageModel for ProfilePage {
    fn from_document(document: Html) -> Self {
        Self { document }
    }
}

impl ProfilePage {
    pub fn profile_fields(&self) -> Option<ProfileFields> {
        let block_selector = parse_selector(PROFILE_BLOCK_SELECTOR).ok()?;
        let field_selector = parse_selector(PROFILE_FIELD_SELECTOR).ok()?;

        let block = self.document.select(&block_selector).next()?;
        let fields: Vec<String> = block.select(&field_selector).map(extract_text).collect();
        let field = |index: usize| fields.get(index).filter(|value| !value.is_empty()).cloned();

        Some(ProfileFields {
            federation: field(PROFILE_FEDERATION),
            birth_year: field(PROFILE_BIRTH_YEAR),
            sex: field(PROFILE_SEX),
            title: field(PROFILE_TITLE),
            world_rank: field(PROFILE_WORLD_RANK),
        })
    }
}

/// One `<input>`/`<select>` of a form with the value it would submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
    pub id: Option<String>,
    pub labelled_by: Option<String>,
}

/// A form ready to be filled in and posted back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchForm {
    pub action: Url,
    pub fields: Vec<FormField>,
    /// The form's default submit button, sent on implicit submission.
    pub default_button: Option<(String, String)>,
}

impl SearchForm {
    pub fn set_by_id(&mut self, id: &str, value: &str) -> Result<(), CrawlError> {
        let field = self
            .fields
            .iter_mut()
            .find(|field| field.id.as_deref() == Some(id))
            .ok_or_else(|| CrawlError::malformed(format!("search form has no field #{id}")))?;
        field.value = value.to_string();
        Ok(())
    }

    pub fn set_by_label(&mut self, label_id: &str, value: &str) -> Result<(), CrawlError> {
        let field = self
            .fields
            .iter_mut()
            .find(|field| field.labelled_by.as_deref() == Some(label_id))
            .ok_or_else(|| {
                CrawlError::malformed(format!("search form has no field labelled by {label_id}"))
            })?;
        field.value = value.to_string();
        Ok(())
    }

    /// Name/value pairs as a browser would submit them on Enter.
    pub fn submission(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .fields
            .iter()
            .map(|field| (field.name.clone(), field.value.clone()))
            .collect();
        if let Some(button) = &self.default_button {
            pairs.push(button.clone());
        }
        pairs
    }
}

/// The tournament search page, before submission.
pub struct SearchFormPage {
    document: Html,
}

impl PageModel for SearchFormPage {
    fn from_document(document: Html) -> Self {
        Self { document }
    }
}

impl SearchFormPage {
    /// Reads the page's first form, resolving its action against `base`.
    pub fn search_form(&self, base: &Url) -> Result<SearchForm, CrawlError> {
        let form_selector = parse_selector("form")?;
        let control_selector = parse_selector("input, select, textarea")?;
        let option_selector = parse_selector("option")?;

        let form = self
            .document
            .select(&form_selector)
            .next()
            .ok_or_else(|| CrawlError::malformed("search page has no form"))?;

        let action = match form.value().attr("action") {
            Some(action) if !action.trim().is_empty() => base
                .join(action.trim())
                .map_err(|e| CrawlError::malformed(format!("bad form action '{action}': {e}")))?,
            _ => base.clone(),
        };

        let mut fields = Vec::new();
        let mut default_button = None;
        for control in form.select(&control_selector) {
            let element = control.value();
            let Some(name) = element.attr("name") else {
                continue;
            };
            let kind = element.attr("type").unwrap_or("text").to_ascii_lowercase();

            let value = match (element.name(), kind.as_str()) {
                ("input", "submit" | "image") => {
                    if default_button.is_none() {
                        default_button = Some((
                            name.to_string(),
                            element.attr("value").unwrap_or("").to_string(),
                        ));
                    }
                    continue;
                }
                ("input", "button" | "reset" | "file") => continue,
                ("input", "checkbox" | "radio") => {
                    if element.attr("checked").is_none() {
                        continue;
                    }
                    element.attr("value").unwrap_or("on").to_string()
                }
                ("select", _) => {
                    let options: Vec<ElementRef> = control.select(&option_selector).collect();
                    let chosen = options
                        .iter()
                        .find(|option| option.value().attr("selected").is_some())
                        .or_else(|| options.first());
                    match chosen {
                        Some(option) => option
                            .value()
                            .attr("value")
                            .map(str::to_string)
                            .unwrap_or_else(|| extract_text(*option)),
                        None => continue,
                    }
                }
                ("textarea", _) => control.text().collect(),
                _ => element.attr("value").unwrap_or("").to_string(),
            };

            fields.push(FormField {
                name: name.to_string(),
                value,
                id: element.attr("id").map(str::to_string),
                labelled_by: element.attr("aria-labelledby").map(str::to_string),
            });
        }

        Ok(SearchForm {
            action,
            fields,
            default_button,
        })
    }
}

/// The tournament search page after submission.
pub struct SearchResultsPage {
    document: Html,
}

impl PageModel for SearchResultsPage {
    fn from_document(document: Html) -> Self {
        Self { document }
    }
}

impl SearchResultsPage {
    /// Absolute tournament links in page order, without duplicates.
    pub fn tournament_links(&self, base: &Url) -> Vec<String> {
        let Ok(selector) = parse_selector(SEARCH_RESULTS_LINK_SELECTOR) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        self.document
            .select(&selector)
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter_map(|href| base.join(href.trim()).ok())
            .map(String::from)
            .filter(|link| seen.insert(link.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
        <html><body><div class="profile-top-info">
          <div class="profile-top-info__block__row__data">10</div>
          <div class="profile-top-info__block__row__data">Norway</div>
          <div class="profile-top-info__block__row__data">1503014</div>
          <div class="profile-top-info__block__row__data">1990</div>
          <div class="profile-top-info__block__row__data">Male</div>
          <div class="profile-top-info__block__row__data">GM</div>
        </div></body></html>"#;

    #[test]
    fn profile_fields_are_positional() {
        let fields = ProfilePage::parse(PROFILE).profile_fields().unwrap();
        assert_eq!(fields.world_rank.as_deref(), Some("10"));
        assert_eq!(fields.federation.as_deref(), Some("Norway"));
        assert_eq!(fields.birth_year.as_deref(), Some("1990"));
        assert_eq!(fields.sex.as_deref(), Some("Male"));
        assert_eq!(fields.title.as_deref(), Some("GM"));
    }

    #[test]
    fn missing_profile_block_is_none() {
        let page = ProfilePage::parse("<html><body><p>Player not found</p></body></html>");
        assert_eq!(page.profile_fields(), None);
    }

    #[test]
    fn short_profile_block_leaves_tail_fields_empty() {
        let page = ProfilePage::parse(
            r#"<div class="profile-top-info">
                 <div class="profile-top-info__block__row__data">0</div>
                 <div class="profile-top-info__block__row__data">Italy</div>
               </div>"#,
        );
        let fields = page.profile_fields().unwrap();
        assert_eq!(fields.federation.as_deref(), Some("Italy"));
        assert_eq!(fields.title, None);
    }

    #[test]
    fn title_prefix_is_stripped() {
        let page = TournamentPage::parse(
            "<html><head><title>Chess-Results Server Chess-results.com - World Youth 2019</title></head></html>",
        );
        assert_eq!(page.title().as_deref(), Some("World Youth 2019"));
        assert_eq!(TournamentPage::parse("<html><body></body></html>").title(), None);
    }

    #[test]
    fn details_follow_first_heading_and_split_dates() {
        let page = TournamentPage::parse(
            r#"<html><body>
               <table><tr><td>Menu</td><td>ignored</td></tr></table>
               <h2>European Youth 2019</h2>
               <table>
                 <tr><td>Organizer(s)</td><td>ECU</td></tr>
                 <tr><td>Date</td><td>2019/08/12 to 2019/08/22</td></tr>
                 <tr><td>lonely</td></tr>
               </table></body></html>"#,
        );
        let details = page.details().unwrap();
        assert_eq!(details.get("Organizer(s)"), Some("ECU"));
        assert_eq!(details.get("Start Date"), Some("2019/08/12"));
        assert_eq!(details.get("End Date"), Some("2019/08/22"));
        assert_eq!(details.get("Date"), None);
        assert_eq!(details.get("Menu"), None);
    }

    #[test]
    fn page_without_heading_has_no_details() {
        let page = TournamentPage::parse("<table><tr><td>a</td><td>b</td></tr></table>");
        assert_eq!(page.details(), None);
    }

    #[test]
    fn search_form_reads_state_and_default_button() {
        let base = Url::parse("https://chess-results.com/TurnierSuche.aspx?lan=1").unwrap();
        let page = SearchFormPage::parse(
            r#"<form action="./TurnierSuche.aspx?lan=1" method="post">
                 <input type="hidden" name="__VIEWSTATE" value="abc">
                 <input type="text" name="ctl00$P1$txt_bez" aria-labelledby="P1_lb_bez">
                 <input type="text" id="P1_txt_von_tag" name="ctl00$P1$txt_von_tag" value="">
                 <select id="P1_combo_anzahl_zeilen" name="ctl00$P1$combo_anzahl_zeilen">
                   <option value="0">100</option><option value="5">2000</option>
                 </select>
                 <input type="checkbox" name="unticked">
                 <input type="submit" name="ctl00$P1$cb_suchen" value="Search">
                 <input type="submit" name="ctl00$P1$cb_reset" value="Reset">
               </form>"#,
        );
        let mut form = page.search_form(&base).unwrap();
        assert_eq!(form.action.as_str(), "https://chess-results.com/TurnierSuche.aspx?lan=1");
        form.set_by_label("P1_lb_bez", "World Youth").unwrap();
        form.set_by_id("P1_combo_anzahl_zeilen", "5").unwrap();
        assert!(form.set_by_id("P1_missing", "x").is_err());

        let submission = form.submission();
        assert!(submission.contains(&("__VIEWSTATE".to_string(), "abc".to_string())));
        assert!(submission.contains(&("ctl00$P1$txt_bez".to_string(), "World Youth".to_string())));
        assert!(submission.contains(&("ctl00$P1$combo_anzahl_zeilen".to_string(), "5".to_string())));
        assert!(submission.iter().all(|(name, _)| name != "unticked" && name != "ctl00$P1$cb_reset"));
        assert_eq!(
            submission.last(),
            Some(&("ctl00$P1$cb_suchen".to_string(), "Search".to_string()))
        );
    }

    #[test]
    fn search_results_links_are_absolute_and_unique() {
        let base = Url::parse("https://chess-results.com/TurnierSuche.aspx?lan=1").unwrap();
        let page = SearchResultsPage::parse(
            r#"<table class="CRs2">
                 <tr><td><a href="tnr178566.aspx?lan=1">EYCC 2019</a></td></tr>
                 <tr><td><a href="https://chess-results.com/tnr832523.aspx">WYCC</a></td></tr>
                 <tr><td><a href="tnr178566.aspx?lan=1">EYCC 2019</a></td></tr>
               </table>
               <table class="CRs1"><tr><td><a href="other.aspx">x</a></td></tr></table>"#,
        );
        assert_eq!(
            page.tournament_links(&base),
            vec![
                "https://chess-results.com/tnr178566.aspx?lan=1",
                "https://chess-results.com/tnr832523.aspx"
            ]
        );
    }
}
