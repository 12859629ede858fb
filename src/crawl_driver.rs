use std::fmt;
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use log::{error, info, warn};
use reqwest::Url;

use crate::checkpoint_store::{CheckpointStore, frontier_from_links};
use crate::config::CrawlConfig;
use crate::date_resolver::DateResolver;
use crate::discovery::Discoverer;
use crate::error::CrawlError;
use crate::header_normalizer::{NormalizedTable, normalize_table};
use crate::link_enricher::LinkEnricher;
use crate::output::{CsvTableWriter, TableWriter, TournamentRecord};
use crate::pages::{PageModel, TournamentDetails, TournamentPage};
use crate::requests::Fetcher;
use crate::scraping_context::ScrapingContext;

/// Pipeline step a link was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discover,
    Fetch,
    Extract,
    Persist,
    Checkpoint,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discover => "discover",
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Persist => "persist",
            Stage::Checkpoint => "checkpoint",
        };
        f.write_str(name)
    }
}

struct StageFailure {
    stage: Stage,
    error: CrawlError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageFailure>;
}

impl<T> AtStage<T> for Result<T, CrawlError> {
    fn at(self, stage: Stage) -> Result<T, StageFailure> {
        self.map_err(|error| StageFailure { stage, error })
    }
}

/// What one query's run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryReport {
    pub query: String,
    /// True when the frontier came from a fresh search, not a checkpoint.
    pub discovered: bool,
    pub total: usize,
    pub already_done: usize,
    pub processed: usize,
    pub failed: usize,
}

struct ExtractedTournament {
    title: String,
    date: Option<NaiveDate>,
    table: NormalizedTable,
    details: Option<TournamentDetails>,
}

/// Runs discover → fetch → extract → enrich → persist → checkpoint for each
/// query, strictly one link at a time.
pub struct CrawlDriver<'a, W: TableWriter> {
    config: &'a CrawlConfig,
    checkpoints: &'a CheckpointStore,
    writer: &'a W,
    date_resolver: &'a DateResolver,
}

impl<'a> CrawlDriver<'a, CsvTableWriter> {
    pub fn from_context(ctx: &'a ScrapingContext) -> Self {
        Self::new(
            &ctx.crawl_config,
            &ctx.checkpoints,
            &ctx.writer,
            &ctx.date_resolver,
        )
    }
}

impl<'a, W: TableWriter> CrawlDriver<'a, W> {
    pub fn new(
        config: &'a CrawlConfig,
        checkpoints: &'a CheckpointStore,
        writer: &'a W,
        date_resolver: &'a DateResolver,
    ) -> Self {
        Self {
            config,
            checkpoints,
            writer,
            date_resolver,
        }
    }

    /// Crawls one query to completion or until the process dies.
    ///
    /// Only checkpoint I/O errors come back as `Err`; every other failure is
    /// logged and leaves the link unchecked for the next run.
    pub async fn run_query<S>(&self, session: &S, query: &str) -> Result<QueryReport, CrawlError>
    where
        S: Fetcher + Discoverer,
    {
        let mut report = QueryReport {
            query: query.to_string(),
            ..QueryReport::default()
        };

        let frontier = if self.checkpoints.exists(query) {
            self.checkpoints.load(query)?
        } else {
            match session.discover(query, &self.config.date_range).await {
                Ok(links) => {
                    let frontier = frontier_from_links(links);
                    self.checkpoints.save(query, &frontier)?;
                    report.discovered = true;
                    frontier
                }
                Err(e) => {
                    error!("[{query}] {} failed, will retry on next run: {e}", Stage::Discover);
                    return Ok(report);
                }
            }
        };

        report.total = frontier.len();
        let pending: Vec<String> = frontier
            .into_iter()
            .filter(|entry| !entry.checked)
            .map(|entry| entry.link)
            .collect();
        report.already_done = report.total - pending.len();
        info!(
            "[{query}] {} links, {} already done, {} to go",
            report.total,
            report.already_done,
            pending.len()
        );

        for link in &pending {
            match self.process_link(session, query, link).await {
                Ok(path) => {
                    info!("[{query}] Saved {link} to {}", path.display());
                }
                Err(StageFailure { stage, error }) => {
                    warn!("[{query}] {stage} failed for {link}, leaving it unchecked: {error}");
                    report.failed += 1;
                    continue;
                }
            }

            if !self.checkpoints.mark_checked(query, link)? {
                warn!("[{query}] {} could not find {link} in the frontier", Stage::Checkpoint);
            }
            report.processed += 1;
        }

        info!(
            "[{query}] Done: {} processed, {} failed, {} skipped as already done",
            report.processed, report.failed, report.already_done
        );
        Ok(report)
    }

    async fn process_link<S: Fetcher>(
        &self,
        session: &S,
        query: &str,
        link: &str,
    ) -> Result<PathBuf, StageFailure> {
        let html = session.fetch(&self.fetch_url(link)).await.at(Stage::Fetch)?;
        let extracted = self.extract(link, &html).at(Stage::Extract)?;

        let table = LinkEnricher::new(&self.config.link_scheme)
            .enrich(session, extracted.table)
            .await;

        let record = TournamentRecord {
            link: link.to_string(),
            title: extracted.title,
            date: extracted.date,
            table,
            details: extracted.details,
        };
        let path = self.writer.write_tournament(query, &record).at(Stage::Persist)?;
        // The rows are on disk now; a details failure must not leave the link
        // unchecked or a resume would append them again.
        if let Some(details) = &record.details {
            if let Err(e) = self.writer.write_details(query, details) {
                warn!(
                    "[{query}] {} of tournament details failed for {link}, results kept: {e}",
                    Stage::Persist
                );
            }
        }
        Ok(path)
    }

    fn extract(&self, link: &str, html: &str) -> Result<ExtractedTournament, CrawlError> {
        let page = TournamentPage::parse(html);
        let title = page.title().unwrap_or_else(|| link.to_string());
        let date = self.date_resolver.resolve_for_page(&page, &title);
        let raw = page.results_table()?;
        let table = normalize_table(raw, &self.config.identifier_marker)?;
        let details = if self.config.show_details {
            page.details()
        } else {
            None
        };
        Ok(ExtractedTournament {
            title,
            date,
            table,
            details,
        })
    }

    /// The link to fetch, with the tournament-details view switched on when
    /// configured.
    fn fetch_url(&self, link: &str) -> String {
        if !self.config.show_details {
            return link.to_string();
        }
        match Url::parse(link) {
            Ok(mut url) => {
                if !url.query_pairs().any(|(key, _)| key == "turdet") {
                    url.query_pairs_mut().append_pair("turdet", "YES");
                }
                url.into()
            }
            Err(_) => link.to_string(),
        }
    }
}

/// Crawls every configured query, one scoped session per query.
pub async fn crawl(ctx: &ScrapingContext) -> anyhow::Result<Vec<QueryReport>> {
    let driver = CrawlDriver::from_context(ctx);
    let mut reports = Vec::with_capacity(ctx.crawl_config.queries.len());
    for query in &ctx.crawl_config.queries {
        info!("Processing query: {query}");
        let session = ctx.open_session(query)?;
        let report = driver
            .run_query(&session, query)
            .await
            .with_context(|| format!("checkpoint failure while crawling '{query}'"))?;
        drop(session);
        reports.push(report);
    }
    Ok(reports)
}
