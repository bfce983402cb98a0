use scraper::{ElementRef, Html};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{
    ScrapeError,
    text_manipulators::{extract_text, parse_selector},
};

/// What to do with rows whose cell count differs from the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPolicy {
    /// Drop them. Used where the cells feed calculations, so a short row can
    /// never be read with its columns shifted.
    Strict,
    /// Keep them. Used for tables that are only shown to the user.
    Lenient,
}

/// Pulls the data rows out of an HTML table.
///
/// - a missing table gives no rows, not an error;
/// - a leading row containing `th` cells is treated as the header and skipped;
/// - rows in `tfoot` (totals) come after the body rows, `th` and `td` alike;
/// - every cell is trimmed and rows without any cell are ignored.
#[derive(Debug, Clone, Copy)]
pub struct TableExtractor {
    policy: ColumnPolicy,
}

impl TableExtractor {
    pub fn strict() -> Self {
        Self {
            policy: ColumnPolicy::Strict,
        }
    }

    pub fn lenient() -> Self {
        Self {
            policy: ColumnPolicy::Lenient,
        }
    }

    pub fn extract(
        &self,
        document: &Html,
        table_id: &str,
        expected_columns: Option<usize>,
    ) -> Result<Vec<Vec<String>>, ScrapeError> {
        let table_selector = parse_selector(table_id, &format!("table#{table_id}"))?;
        match document.select(&table_selector).next() {
            Some(table) => self.extract_from(table, expected_columns),
            None => Ok(vec![]),
        }
    }

    pub fn extract_from(
        &self,
        table: ElementRef,
        expected_columns: Option<usize>,
    ) -> Result<Vec<Vec<String>>, ScrapeError> {
        let source_name = table.value().id().unwrap_or("table");
        let row_selector = parse_selector(source_name, "tr")?;
        let data_cell_selector = parse_selector(source_name, "td")?;
        let footer_cell_selector = parse_selector(source_name, "th, td")?;
        let header_cell_selector = parse_selector(source_name, "th")?;

        let (footer_rows, body_rows): (Vec<_>, Vec<_>) = table
            .select(&row_selector)
            .partition(|row| in_footer(*row, table));

        let skip_header = body_rows
            .first()
            .is_some_and(|row| row.select(&header_cell_selector).next().is_some());

        let body = body_rows
            .into_iter()
            .skip(usize::from(skip_header))
            .map(|row| row.select(&data_cell_selector).map(extract_text).collect::<Vec<_>>());
        let footer = footer_rows
            .into_iter()
            .map(|row| row.select(&footer_cell_selector).map(extract_text).collect::<Vec<_>>());

        Ok(body
            .chain(footer)
            .filter(|cells| !cells.is_empty())
            .filter(|cells| self.accepts(cells.len(), expected_columns))
            .collect())
    }

    fn accepts(&self, cell_count: usize, expected_columns: Option<usize>) -> bool {
        match (self.policy, expected_columns) {
            (ColumnPolicy::Strict, Some(expected)) => cell_count == expected,
            _ => true,
        }
    }
}

fn in_footer(row: ElementRef, table: ElementRef) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|el| *el != table)
        .any(|el| el.value().name() == "tfoot")
}

/// `td` texts of a single row, in order.
pub fn row_cells(row: ElementRef) -> Result<Vec<String>, ScrapeError> {
    let cell_selector = parse_selector("row", "td")?;
    Ok(row.select(&cell_selector).map(extract_text).collect())
}

/// Display-only table: named columns, string cells, kept exactly as
/// published. Serializes as a list of [`RawTable::records`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(columns: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as column -> value maps. Cells past the known columns are keyed by
    /// their position (`#10`, `#11`, ...).
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, cell)| {
                        let key = self
                            .columns
                            .get(i)
                            .cloned()
                            .unwrap_or_else(|| format!("#{i}"));
                        (key, Value::String(cell.clone()))
                    })
                    .collect()
            })
            .collect()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }
}

impl Serialize for RawTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records().serialize(serializer)
    }
}
