use log::debug;

use crate::{
    checkpoint_store::CheckpointStore,
    config::{CrawlConfig, DateRange},
    date_resolver::DateResolver,
    discovery::{Discoverer, SearchFormDiscoverer},
    error::CrawlError,
    output::CsvTableWriter,
    ratelimit::RateLimiter,
    requests::{Fetcher, RequestClient},
};

/// Long-lived state shared by every query of a run.
pub struct ScrapingContext {
    pub crawl_config: CrawlConfig,
    pub date_resolver: DateResolver,
    pub checkpoints: CheckpointStore,
    pub writer: CsvTableWriter,
    rate_limiter: RateLimiter,
}

impl ScrapingContext {
    pub fn new(crawl_config: CrawlConfig) -> anyhow::Result<Self> {
        let date_resolver = DateResolver::new()?;
        let checkpoints = CheckpointStore::new(&crawl_config.checkpoint_dir);
        let writer = CsvTableWriter::new(&crawl_config.output_dir);
        let rate_limiter = RateLimiter::new();
        Ok(ScrapingContext {
            crawl_config,
            date_resolver,
            checkpoints,
            writer,
            rate_limiter,
        })
    }

    /// A fresh session for one query. Dropping it releases the HTTP client
    /// and its cookies.
    pub fn open_session(&self, query: &str) -> anyhow::Result<CrawlSession<'_>> {
        let request_client =
            RequestClient::new(&self.rate_limiter, self.crawl_config.request_timeout)?;
        debug!("Opened crawl session for '{query}'");
        Ok(CrawlSession {
            query: query.to_string(),
            request_client,
            search_url: &self.crawl_config.search_url,
            max_results: &self.crawl_config.max_results,
        })
    }
}

pub struct CrawlSession<'a> {
    query: String,
    request_client: RequestClient<'a>,
    search_url: &'a str,
    max_results: &'a str,
}

impl Fetcher for CrawlSession<'_> {
    async fn fetch(&self, url: &str) -> Result<String, CrawlError> {
        self.request_client.fetch(url).await
    }
}

impl Discoverer for CrawlSession<'_> {
    async fn discover(
        &self,
        query: &str,
        date_range: &DateRange,
    ) -> Result<Vec<String>, CrawlError> {
        SearchFormDiscoverer::new(&self.request_client, self.search_url, self.max_results)?
            .discover(query, date_range)
            .await
    }
}

impl Drop for CrawlSession<'_> {
    fn drop(&mut self) {
        debug!("Released crawl session for '{}'", self.query);
    }
}
