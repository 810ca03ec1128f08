use crate::table::{ComparisonTable, PriceMatrix};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

// Labeling carried over from the original comparison views.
const PRICE_CHART_TITLE: &str = "Stock Comparison";
const PRICE_HOVER_TEMPLATE: &str = "Date: %{x}<br>Stock Price: %{y}";
const YTD_CHART_TITLE: &str = "YTD Stock Price Comparison, Normalized to 100";

#[derive(Debug, Clone, Serialize)]
pub struct LegendConfig {
    pub title: String,
    pub orientation: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One named line of an overlay chart.
#[derive(Debug, Clone, Serialize)]
pub struct LabeledSeries {
    pub label: String,
    pub points: Vec<ChartPoint>,
}

/// Everything a line-chart rendering surface needs: axis and legend
/// labeling plus the labeled series to overlay.
#[derive(Debug, Clone, Serialize)]
pub struct ChartPayload {
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover_template: Option<String>,
    pub legend: LegendConfig,
    pub series: Vec<LabeledSeries>,
}

impl ChartPayload {
    /// Overlay chart over a price matrix, one line per column in column
    /// order. A column with no observations contributes an empty series,
    /// so it still shows up in the legend.
    pub fn price_comparison(matrix: &PriceMatrix) -> Self {
        let series = matrix
            .symbols()
            .iter()
            .map(|symbol| LabeledSeries {
                label: symbol.clone(),
                points: matrix
                    .column(symbol)
                    .into_iter()
                    .map(|p| ChartPoint {
                        date: p.date,
                        value: p.price,
                    })
                    .collect(),
            })
            .collect();

        Self {
            title: PRICE_CHART_TITLE.to_string(),
            x_axis_title: "Date".to_string(),
            y_axis_title: "Stock Price".to_string(),
            hover_template: Some(PRICE_HOVER_TEMPLATE.to_string()),
            legend: LegendConfig {
                title: "Stock Tickers".to_string(),
                orientation: "h".to_string(),
            },
            series,
        }
    }

    pub fn ytd_comparison(series: Vec<LabeledSeries>) -> Self {
        Self {
            title: YTD_CHART_TITLE.to_string(),
            x_axis_title: "Date".to_string(),
            y_axis_title: "Normalized Price".to_string(),
            hover_template: None,
            legend: LegendConfig {
                title: "Stock Tickers".to_string(),
                orientation: "h".to_string(),
            },
            series,
        }
    }
}

/// Price matrix as explicit rows for tabular rendering. Absent cells
/// serialize as null, never as zero.
#[derive(Debug, Clone, Serialize)]
pub struct MatrixRow {
    pub date: NaiveDate,
    pub cells: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixPayload {
    pub columns: Vec<String>,
    pub rows: Vec<MatrixRow>,
}

impl MatrixPayload {
    pub fn from_matrix(matrix: &PriceMatrix) -> Self {
        let rows = matrix
            .dates()
            .map(|date| MatrixRow {
                date,
                cells: matrix
                    .symbols()
                    .iter()
                    .map(|symbol| matrix.cell(date, symbol))
                    .collect(),
            })
            .collect();

        Self {
            columns: matrix.symbols().to_vec(),
            rows,
        }
    }
}

/// Styling hints the original applied to its comparison grid.
#[derive(Debug, Clone, Serialize)]
pub struct GridStyle {
    pub border_color: String,
    pub border_width_px: u32,
    pub border_style: String,
    pub header_font_size_px: u32,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            border_color: "black".to_string(),
            border_width_px: 1,
            border_style: "solid".to_string(),
            header_font_size_px: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GridRow {
    pub field: String,
    pub cells: Vec<Option<Value>>,
}

/// Comparison table as an ordered grid for a styled data-grid surface.
#[derive(Debug, Clone, Serialize)]
pub struct GridPayload {
    pub columns: Vec<String>,
    pub rows: Vec<GridRow>,
    pub style: GridStyle,
}

impl GridPayload {
    pub fn from_table(table: &ComparisonTable) -> Self {
        let mut columns = Vec::with_capacity(table.symbols().len() + 1);
        columns.push("Data Point".to_string());
        columns.extend(table.symbols().iter().cloned());

        let rows = table
            .fields()
            .iter()
            .map(|field| GridRow {
                field: field.clone(),
                cells: table
                    .symbols()
                    .iter()
                    .map(|symbol| table.cell(field, symbol).cloned())
                    .collect(),
            })
            .collect();

        Self {
            columns,
            rows,
            style: GridStyle::default(),
        }
    }
}
