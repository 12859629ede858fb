use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, info};

use crate::error::CrawlError;
use crate::link_enricher::EnrichedTable;
use crate::pages::TournamentDetails;
use crate::text_manipulators::sanitize_file_stem;

const TOURNAMENT_HEADER: &str = "Tournament";
const TOURNAMENT_DATE_HEADER: &str = "Tournament Date";

/// Everything extracted from one tournament link. Written once, never
/// updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentRecord {
    pub link: String,
    pub title: String,
    pub date: Option<NaiveDate>,
    pub table: EnrichedTable,
    pub details: Option<TournamentDetails>,
}

impl TournamentRecord {
    pub fn output_headers(&self) -> Vec<String> {
        let mut headers = self.table.output_headers();
        headers.push(TOURNAMENT_HEADER.to_string());
        headers.push(TOURNAMENT_DATE_HEADER.to_string());
        headers
    }

    pub fn output_rows(&self) -> Vec<Vec<String>> {
        let date = self
            .date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        self.table
            .rows
            .iter()
            .map(|row| {
                let mut out = row.cells.clone();
                if self.table.enriched {
                    out.extend(
                        row.profile
                            .values()
                            .iter()
                            .map(|value| value.unwrap_or("").to_string()),
                    );
                }
                out.push(self.title.clone());
                out.push(date.clone());
                out
            })
            .collect()
    }
}

/// Where finished tournaments go.
pub trait TableWriter {
    fn write_tournament(&self, query: &str, record: &TournamentRecord)
    -> Result<PathBuf, CrawlError>;

    fn write_details(
        &self,
        query: &str,
        details: &TournamentDetails,
    ) -> Result<PathBuf, CrawlError>;
}

/// Writes `<root>/<query>/<title>.csv` per tournament and one
/// `<root>/<query>_tournament_info.csv` of details per query. Existing files
/// are appended to.
#[derive(Debug, Clone)]
pub struct CsvTableWriter {
    root: PathBuf,
}

impl CsvTableWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn tournament_path(&self, query: &str, title: &str) -> PathBuf {
        self.root
            .join(sanitize_file_stem(query))
            .join(format!("{}.csv", sanitize_file_stem(title)))
    }

    pub fn details_path(&self, query: &str) -> PathBuf {
        self.root
            .join(format!("{}_tournament_info.csv", sanitize_file_stem(query)))
    }
}

impl TableWriter for CsvTableWriter {
    fn write_tournament(
        &self,
        query: &str,
        record: &TournamentRecord,
    ) -> Result<PathBuf, CrawlError> {
        let path = self.tournament_path(query, &record.title);
        append_or_create(&path, &record.output_headers(), &record.output_rows())?;
        debug!("Wrote {} rows to {}", record.table.rows.len(), path.display());
        Ok(path)
    }

    fn write_details(
        &self,
        query: &str,
        details: &TournamentDetails,
    ) -> Result<PathBuf, CrawlError> {
        let path = self.details_path(query);
        let keys: Vec<String> = details.entries().iter().map(|(k, _)| k.clone()).collect();

        let Some((mut headers, mut rows)) = read_table(&path)? else {
            let row = project(details, &keys);
            append_or_create(&path, &keys, &[row])?;
            return Ok(path);
        };

        let new_keys: Vec<String> = keys
            .into_iter()
            .filter(|key| !headers.contains(key))
            .collect();
        if new_keys.is_empty() {
            append_or_create(&path, &headers, &[project(details, &headers)])?;
            return Ok(path);
        }

        // Detail keys differ between tournaments; widen the file's columns.
        info!("Adding detail columns {new_keys:?} to {}", path.display());
        headers.extend(new_keys);
        for row in &mut rows {
            row.resize(headers.len(), String::new());
        }
        rows.push(project(details, &headers));
        rewrite_table(&path, &headers, &rows).map_err(output_err(&path))?;
        Ok(path)
    }
}

fn project(details: &TournamentDetails, headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|key| details.get(key).unwrap_or("").to_string())
        .collect()
}

fn output_err(path: &Path) -> impl Fn(io::Error) -> CrawlError + '_ {
    move |source| CrawlError::Output {
        path: path.to_path_buf(),
        source,
    }
}

fn read_table(path: &Path) -> Result<Option<(Vec<String>, Vec<Vec<String>>)>, CrawlError> {
    if !path.is_file() {
        return Ok(None);
    }
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(Some((headers, rows)))
}

/// Replaces `path` with a fresh table through a temporary sibling file.
fn rewrite_table(path: &Path, headers: &[String], rows: &[Vec<String>]) -> io::Result<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        writer.write_record(headers)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)
}

fn append_or_create(
    path: &Path,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<(), CrawlError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(output_err(path))?;
    }
    let is_new = !path.is_file();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(output_err(path))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(file);
    if is_new {
        writer.write_record(headers)?;
    }
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush().map_err(output_err(path))?;
    Ok(())
}
