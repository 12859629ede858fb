use scraper::{ElementRef, Html};

use crate::error::CrawlError;
use crate::text_manipulators::{extract_text, parse_selector};

/// Class of the standings table on a tournament page.
pub const RESULTS_TABLE_SELECTOR: &str = "table.CRs1";

/// Headers and rows exactly as the page lays them out.
///
/// A cell holding a hyperlink contributes two values to its row: the visible
/// text, then the link target. Row widths can therefore exceed the header
/// count until a "Link" header is inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Pulls the primary results table out of a tournament page.
///
/// Fails with [`CrawlError::MalformedDocument`] when the page has no results
/// table; the document is unusable and should not be retried.
pub fn extract_raw_table(document: &Html) -> Result<RawTable, CrawlError> {
    let table_selector = parse_selector(RESULTS_TABLE_SELECTOR)?;
    let header_selector = parse_selector("th")?;
    let row_selector = parse_selector("tr")?;
    let anchor_selector = parse_selector("a")?;

    let table = document.select(&table_selector).next().ok_or_else(|| {
        CrawlError::malformed(format!("no `{RESULTS_TABLE_SELECTOR}` in document"))
    })?;

    let headers: Vec<String> = table.select(&header_selector).map(extract_text).collect();

    let mut rows = Vec::new();
    for row_node in table.select(&row_selector) {
        let cells: Vec<ElementRef> = row_node
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "td" | "th"))
            .collect();

        // Header rows echo the labels already collected above.
        if !cells.iter().any(|cell| cell.value().name() == "td") {
            continue;
        }

        let mut row_data = Vec::with_capacity(cells.len() + 1);
        for cell in cells {
            let text = extract_text(cell);
            match cell.select(&anchor_selector).next() {
                Some(anchor) => {
                    row_data.push(text);
                    row_data.push(anchor.value().attr("href").unwrap_or("").trim().to_string());
                }
                None => row_data.push(text),
            }
        }

        if !row_data.is_empty() {
            rows.push(row_data);
        }
    }

    Ok(RawTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STANDINGS: &str = r#"
        <html><body>
        <table class="CRs1">
          <tr class="CRg1b"><th>Rk.</th><th>SNo</th><th> Name </th><th>FideID</th><th>FED</th><th>Pts.</th></tr>
          <tr class="CRg1">
            <td>1</td><td>4</td><td>Carlsen Magnus</td>
            <td><a href="https://ratings.fide.com/profile/1503014">1503014</a></td>
            <td>NOR</td><td>7,5</td>
          </tr>
          <tr class="CRg2">
            <td>2</td><td>9</td><td>Metastasio Niccolo</td><td></td><td>ITA</td><td>6</td>
          </tr>
          <tr></tr>
        </table>
        </body></html>"#;

    #[test]
    fn headers_are_trimmed_and_kept_in_order() {
        let document = Html::parse_document(STANDINGS);
        let table = extract_raw_table(&document).unwrap();
        assert_eq!(table.headers, vec!["Rk.", "SNo", "Name", "FideID", "FED", "Pts."]);
    }

    #[test]
    fn linked_cell_emits_text_then_target() {
        let document = Html::parse_document(STANDINGS);
        let table = extract_raw_table(&document).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows[0],
            vec![
                "1",
                "4",
                "Carlsen Magnus",
                "1503014",
                "https://ratings.fide.com/profile/1503014",
                "NOR",
                "7,5"
            ]
        );
        // No anchor, so one value for the FideID cell.
        assert_eq!(table.rows[1].len(), 6);
    }

    #[test]
    fn duplicate_headers_survive() {
        let html = r#"<table class="CRs1"><tr><th>Rd</th><th>Rd</th></tr><tr><td>a</td><td>b</td></tr></table>"#;
        let table = extract_raw_table(&Html::parse_document(html)).unwrap();
        assert_eq!(table.headers, vec!["Rd", "Rd"]);
        assert_eq!(table.rows, vec![vec!["a", "b"]]);
    }

    #[test]
    fn missing_table_is_malformed() {
        let document = Html::parse_document("<html><body><table class=\"CRs2\"></table></body></html>");
        assert!(matches!(
            extract_raw_table(&document),
            Err(CrawlError::MalformedDocument(_))
        ));
    }
}
