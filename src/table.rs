use crate::fields::FieldCatalog;
use crate::yahoo::{FundamentalsSnapshot, PricePoint};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Date-by-symbol table of prices. Rows are the ascending union of every
/// date observed across all columns; a symbol without an observation for a
/// date has no cell there, which is different from a cell holding zero.
#[derive(Debug, Clone, Default)]
pub struct PriceMatrix {
    symbols: Vec<String>,
    cells: BTreeMap<NaiveDate, HashMap<String, f64>>,
}

impl PriceMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one symbol's series as the next column. Columns keep the order
    /// symbols were inserted in; an empty series still claims a column.
    pub fn insert_series(&mut self, symbol: &str, series: &[PricePoint]) {
        self.symbols.push(symbol.to_string());
        for point in series {
            self.cells
                .entry(point.date)
                .or_default()
                .insert(symbol.to_string(), point.price);
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.cells.keys().copied()
    }

    pub fn cell(&self, date: NaiveDate, symbol: &str) -> Option<f64> {
        self.cells.get(&date).and_then(|row| row.get(symbol)).copied()
    }

    /// The populated (date, price) pairs of one column, ascending by date.
    pub fn column(&self, symbol: &str) -> Vec<PricePoint> {
        self.cells
            .iter()
            .filter_map(|(&date, row)| {
                row.get(symbol).map(|&price| PricePoint { date, price })
            })
            .collect()
    }

    /// True when no column holds a single observation.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

pub fn assemble_price_matrix(series_by_symbol: &[(String, Vec<PricePoint>)]) -> PriceMatrix {
    let mut matrix = PriceMatrix::new();
    for (symbol, series) in series_by_symbol {
        matrix.insert_series(symbol, series);
    }
    matrix
}

/// Field-by-symbol comparison grid. Rows keep the user's selection order,
/// columns keep symbol entry order, and a (field, symbol) pair the provider
/// did not supply has no cell.
#[derive(Debug, Clone)]
pub struct ComparisonTable {
    fields: Vec<String>,
    symbols: Vec<String>,
    cells: HashMap<(String, String), Value>,
}

impl ComparisonTable {
    pub fn new(fields: Vec<String>, symbols: Vec<String>) -> Self {
        Self {
            fields,
            symbols,
            cells: HashMap::new(),
        }
    }

    pub fn set_cell(&mut self, field: &str, symbol: &str, value: Value) {
        self.cells
            .insert((field.to_string(), symbol.to_string()), value);
    }

    pub fn cell(&self, field: &str, symbol: &str) -> Option<&Value> {
        self.cells.get(&(field.to_string(), symbol.to_string()))
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn populated_cells(&self) -> usize {
        self.cells.len()
    }
}

/// Build the comparison grid for the selected labels over the fetched
/// snapshots. Labels the catalog cannot resolve produce a fully absent row;
/// a resolved key missing from one snapshot leaves just that cell absent.
pub fn assemble_comparison(
    labels: &[String],
    snapshots: &[FundamentalsSnapshot],
    catalog: &FieldCatalog,
) -> ComparisonTable {
    let symbols: Vec<String> = snapshots.iter().map(|s| s.symbol.clone()).collect();
    let mut table = ComparisonTable::new(labels.to_vec(), symbols);

    for label in labels {
        let Some(key) = catalog.key_for(label) else {
            continue;
        };
        for snapshot in snapshots {
            if let Some(value) = snapshot.fields.get(key) {
                table.set_cell(label, &snapshot.symbol, value.clone());
            }
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 3, day).unwrap()
    }

    fn point(day: u32, price: f64) -> PricePoint {
        PricePoint { date: d(day), price }
    }

    #[test]
    fn test_matrix_rows_are_union_of_dates() {
        let matrix = assemble_price_matrix(&[
            ("A".to_string(), vec![point(1, 10.0), point(2, 11.0)]),
            ("B".to_string(), vec![point(2, 20.0), point(3, 21.0)]),
        ]);

        let dates: Vec<NaiveDate> = matrix.dates().collect();
        assert_eq!(dates, vec![d(1), d(2), d(3)]);

        assert_eq!(matrix.cell(d(1), "A"), Some(10.0));
        assert_eq!(matrix.cell(d(2), "A"), Some(11.0));
        assert_eq!(matrix.cell(d(3), "A"), None);
        assert_eq!(matrix.cell(d(1), "B"), None);
        assert_eq!(matrix.cell(d(3), "B"), Some(21.0));
    }

    #[test]
    fn test_matrix_columns_follow_entry_order() {
        let matrix = assemble_price_matrix(&[
            ("MSFT".to_string(), vec![point(1, 1.0)]),
            ("AAPL".to_string(), vec![point(1, 2.0)]),
        ]);
        assert_eq!(matrix.symbols(), ["MSFT", "AAPL"]);
    }

    #[test]
    fn test_matrix_keeps_empty_column_for_failed_symbol() {
        let matrix = assemble_price_matrix(&[
            ("AAPL".to_string(), vec![point(1, 10.0)]),
            ("ZZZZ".to_string(), vec![]),
        ]);
        assert_eq!(matrix.symbols(), ["AAPL", "ZZZZ"]);
        assert!(!matrix.is_empty());
        assert_eq!(matrix.cell(d(1), "ZZZZ"), None);
        assert!(matrix.column("ZZZZ").is_empty());
        assert_eq!(matrix.column("AAPL").len(), 1);
    }

    #[test]
    fn test_matrix_with_no_observations_is_empty() {
        let matrix = assemble_price_matrix(&[("ZZZZ".to_string(), vec![])]);
        assert!(matrix.is_empty());
        assert_eq!(matrix.symbols(), ["ZZZZ"]);
    }

    fn snapshot(symbol: &str, entries: &[(&str, Value)]) -> FundamentalsSnapshot {
        let mut snapshot = FundamentalsSnapshot::empty(symbol);
        for (key, value) in entries {
            snapshot.fields.insert(key.to_string(), value.clone());
        }
        snapshot
    }

    #[test]
    fn test_comparison_grid_has_one_absent_cell() {
        let catalog = FieldCatalog::fallback();
        let labels = vec!["Sector".to_string(), "Market Cap".to_string()];
        let snapshots = vec![
            snapshot(
                "X",
                &[
                    ("sector", json!("Technology")),
                    ("marketCap", json!(1000)),
                ],
            ),
            snapshot("Y", &[("sector", json!("Energy"))]),
        ];

        let table = assemble_comparison(&labels, &snapshots, &catalog);
        assert_eq!(table.fields(), ["Sector", "Market Cap"]);
        assert_eq!(table.symbols(), ["X", "Y"]);
        assert_eq!(table.populated_cells(), 3);
        assert_eq!(table.cell("Sector", "X"), Some(&json!("Technology")));
        assert_eq!(table.cell("Sector", "Y"), Some(&json!("Energy")));
        assert_eq!(table.cell("Market Cap", "X"), Some(&json!(1000)));
        assert_eq!(table.cell("Market Cap", "Y"), None);
    }

    #[test]
    fn test_comparison_rows_follow_selection_order() {
        let catalog = FieldCatalog::fallback();
        let labels = vec![
            "Volume".to_string(),
            "Currency".to_string(),
            "Sector".to_string(),
        ];
        let table = assemble_comparison(&labels, &[snapshot("X", &[])], &catalog);
        assert_eq!(table.fields(), ["Volume", "Currency", "Sector"]);
    }

    #[test]
    fn test_unresolvable_label_leaves_row_absent() {
        let catalog = FieldCatalog::fallback();
        let labels = vec!["Nonexistent Field".to_string()];
        let snapshots = vec![snapshot("X", &[("sector", json!("Tech"))])];
        let table = assemble_comparison(&labels, &snapshots, &catalog);
        assert_eq!(table.fields(), ["Nonexistent Field"]);
        assert_eq!(table.cell("Nonexistent Field", "X"), None);
    }
}
