use log::{debug, info};
use reqwest::Url;

use crate::config::DateRange;
use crate::error::CrawlError;
use crate::pages::{PageModel, SearchForm, SearchFormPage, SearchResultsPage};
use crate::requests::{Fetcher, FormPoster};

// Element ids on the tournament search form.
const QUERY_FIELD_LABEL: &str = "P1_lb_bez";
const DATE_FROM_FIELD: &str = "P1_txt_von_tag";
const DATE_TO_FIELD: &str = "P1_txt_bis_tag";
const MAX_LINES_FIELD: &str = "P1_combo_anzahl_zeilen";

/// Turns a search query into the list of tournament links it finds.
#[allow(async_fn_in_trait)]
pub trait Discoverer {
    async fn discover(&self, query: &str, date_range: &DateRange)
    -> Result<Vec<String>, CrawlError>;
}

/// Drives the results server's search form over plain HTTP.
pub struct SearchFormDiscoverer<'a, C> {
    client: &'a C,
    search_url: Url,
    max_results: String,
}

impl<'a, C: Fetcher + FormPoster> SearchFormDiscoverer<'a, C> {
    pub fn new(
        client: &'a C,
        search_url: &str,
        max_results: &str,
    ) -> Result<Self, CrawlError> {
        let search_url = Url::parse(search_url)
            .map_err(|e| CrawlError::network(search_url, format!("invalid search URL: {e}")))?;
        Ok(Self {
            client,
            search_url,
            max_results: max_results.to_string(),
        })
    }

    fn fill_form(
        &self,
        html: &str,
        query: &str,
        date_range: &DateRange,
    ) -> Result<SearchForm, CrawlError> {
        let mut form = SearchFormPage::parse(html).search_form(&self.search_url)?;
        form.set_by_label(QUERY_FIELD_LABEL, query)?;
        form.set_by_id(DATE_FROM_FIELD, &date_range.from_form_value())?;
        form.set_by_id(DATE_TO_FIELD, &date_range.to_form_value())?;
        form.set_by_id(MAX_LINES_FIELD, &self.max_results)?;
        Ok(form)
    }
}

impl<C: Fetcher + FormPoster> Discoverer for SearchFormDiscoverer<'_, C> {
    async fn discover(
        &self,
        query: &str,
        date_range: &DateRange,
    ) -> Result<Vec<String>, CrawlError> {
        let search_page = self.client.fetch(self.search_url.as_str()).await?;
        let form = self.fill_form(&search_page, query, date_range)?;
        debug!(
            "Submitting search for '{query}' ({} fields) to {}",
            form.fields.len(),
            form.action
        );

        let results_page = self
            .client
            .post_form(form.action.as_str(), &form.submission())
            .await?;
        let links = SearchResultsPage::parse(&results_page).tournament_links(&form.action);
        info!("Search for '{query}' found {} tournament links", links.len());
        Ok(links)
    }
}
