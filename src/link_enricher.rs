use log::{debug, info, warn};

use crate::header_normalizer::NormalizedTable;
use crate::pages::{PageModel, ProfileFields, ProfilePage};
use crate::requests::Fetcher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRow {
    pub cells: Vec<String>,
    pub profile: ProfileFields,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedTable {
    pub headers: Vec<String>,
    pub rows: Vec<EnrichedRow>,
    /// False when the table passed through without profile lookups.
    pub enriched: bool,
}

impl EnrichedTable {
    fn passthrough(table: NormalizedTable) -> Self {
        let rows = table
            .rows
            .into_iter()
            .map(|cells| EnrichedRow {
                cells,
                profile: ProfileFields::default(),
            })
            .collect();
        Self {
            headers: table.headers,
            rows,
            enriched: false,
        }
    }

    /// Headers as written out, enrichment columns included when present.
    pub fn output_headers(&self) -> Vec<String> {
        let mut headers = self.headers.clone();
        if self.enriched {
            headers.extend(ProfileFields::HEADERS.iter().map(|h| h.to_string()));
        }
        headers
    }
}

/// Joins every row of a standings table against the player's rating profile.
pub struct LinkEnricher<'a> {
    link_scheme: &'a str,
}

impl<'a> LinkEnricher<'a> {
    pub fn new(link_scheme: &'a str) -> Self {
        Self { link_scheme }
    }

    /// Fetches one profile per row, one at a time.
    ///
    /// Tables without a "Link" column, or whose "Link" column is entirely
    /// empty, pass through untouched. Otherwise rows with an empty link or a
    /// link that is not an absolute URL are dropped, and rows whose profile
    /// is unreachable or has no info block keep all-`None` fields.
    pub async fn enrich<F: Fetcher>(&self, fetcher: &F, table: NormalizedTable) -> EnrichedTable {
        let Some(link_column) = table.link_column else {
            debug!("No Link column, skipping enrichment");
            return EnrichedTable::passthrough(table);
        };
        let link_of = |cells: &[String]| cells.get(link_column).map(|c| c.trim().to_string());
        if table
            .rows
            .iter()
            .all(|cells| link_of(cells).is_none_or(|link| link.is_empty()))
        {
            debug!("Link column is empty, skipping enrichment");
            return EnrichedTable::passthrough(table);
        }

        let mut rows = Vec::with_capacity(table.rows.len());
        let mut dropped = 0usize;
        for cells in table.rows {
            let link = link_of(&cells).unwrap_or_default();
            if link.is_empty() {
                dropped += 1;
                continue;
            }
            if !link.starts_with(self.link_scheme) {
                // e.g. a federation code sitting where the link should be
                warn!("Dropping row with malformed profile link '{link}'");
                dropped += 1;
                continue;
            }

            let profile = match fetcher.fetch(&link).await {
                Ok(html) => profile_from_html(&html).unwrap_or_else(|| {
                    warn!("No profile block at {link}");
                    ProfileFields::default()
                }),
                Err(e) => {
                    warn!("Profile lookup failed, keeping row without profile: {e}");
                    ProfileFields::default()
                }
            };
            rows.push(EnrichedRow { cells, profile });
        }

        info!("Enriched {} rows, dropped {dropped}", rows.len());
        EnrichedTable {
            headers: table.headers,
            rows,
            enriched: true,
        }
    }
}

fn profile_from_html(html: &str) -> Option<ProfileFields> {
    ProfilePage::parse(html).profile_fields()
}
