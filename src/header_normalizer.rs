use crate::error::CrawlError;
use crate::table_extractor::RawTable;

pub const LINK_HEADER: &str = "Link";

/// A table whose rows all match the header width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Position of the "Link" header, if the table has one.
    pub link_column: Option<usize>,
}

/// Inserts a "Link" header right after the first header containing `marker`.
///
/// Headers that already contain "Link", or that have no marker column, come
/// back unchanged.
pub fn normalize_headers(mut headers: Vec<String>, marker: &str) -> Vec<String> {
    if headers.iter().any(|header| header == LINK_HEADER) {
        return headers;
    }
    if let Some(index) = headers.iter().position(|header| header.contains(marker)) {
        headers.insert(index + 1, LINK_HEADER.to_string());
    }
    headers
}

/// Normalizes the headers, then binds every row to them.
///
/// A row whose width differs from the normalized header width rejects the
/// whole table with [`CrawlError::SchemaMismatch`].
pub fn normalize_table(raw: RawTable, marker: &str) -> Result<NormalizedTable, CrawlError> {
    let headers = normalize_headers(raw.headers, marker);

    if let Some((row, cells)) = raw
        .rows
        .iter()
        .enumerate()
        .find(|(_, cells)| cells.len() != headers.len())
    {
        return Err(CrawlError::SchemaMismatch {
            headers: headers.len(),
            row,
            cells: cells.len(),
        });
    }

    let link_column = headers.iter().position(|header| header == LINK_HEADER);
    Ok(NormalizedTable {
        headers,
        rows: raw.rows,
        link_column,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn link_goes_right_after_marker_column() {
        let headers = strings(&["Rk.", "Name", "FideID", "FED"]);
        let normalized = normalize_headers(headers, "FideID");
        assert_eq!(normalized, strings(&["Rk.", "Name", "FideID", "Link", "FED"]));
    }

    #[test]
    fn marker_is_matched_as_a_fragment() {
        let normalized = normalize_headers(strings(&["No.", "FideID No", "Pts"]), "FideID");
        assert_eq!(normalized[2], "Link");
    }

    #[test]
    fn existing_link_header_is_a_no_op() {
        let headers = strings(&["Name", "Link", "FideID"]);
        assert_eq!(normalize_headers(headers.clone(), "FideID"), headers);
    }

    #[test]
    fn no_marker_leaves_headers_alone() {
        let headers = strings(&["Rk.", "Team", "TB1"]);
        assert_eq!(normalize_headers(headers.clone(), "FideID"), headers);
    }

    #[test]
    fn uniform_rows_bind_and_record_link_position() {
        let raw = RawTable {
            headers: strings(&["Name", "FideID", "FED"]),
            rows: vec![strings(&["A", "1", "https://x/1", "NOR"])],
        };
        let table = normalize_table(raw, "FideID").unwrap();
        assert_eq!(table.link_column, Some(2));
        assert_eq!(table.rows[0].len(), table.headers.len());
    }

    #[test]
    fn width_disagreement_rejects_table() {
        let raw = RawTable {
            headers: strings(&["Name", "FideID", "FED"]),
            rows: vec![
                strings(&["A", "1", "https://x/1", "NOR"]),
                strings(&["B", "", "CZE"]),
            ],
        };
        match normalize_table(raw, "FideID") {
            Err(CrawlError::SchemaMismatch { headers, row, cells }) => {
                assert_eq!((headers, row, cells), (4, 1, 3));
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn team_table_without_marker_mismatches() {
        let raw = RawTable {
            headers: strings(&["Rk.", "", "Team", "1b", "TB1"]),
            rows: vec![strings(&["1", "", "Germany I", "*", "*", "19"])],
        };
        assert!(normalize_table(raw, "FideID").is_err());
    }
}
