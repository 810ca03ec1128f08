use crate::chart::{ChartPayload, ChartPoint, GridPayload, LabeledSeries, MatrixPayload};
use crate::data_structures::{SharedCatalog, SharedClient, SharedWatchlist, Watchlist};
use crate::fields::DEFAULT_FIELD_LABELS;
use crate::normalize::normalize_to_100;
use crate::table::{assemble_comparison, PriceMatrix};
use crate::yahoo::{FundamentalsSnapshot, YahooError};
use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query as MultiQuery;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

const EMPTY_TICKERS_WARNING: &str = "Enter valid stock tickers.";
const EMPTY_SYMBOLS_WARNING: &str = "Enter at least one stock symbol.";

// --- Price comparison (date-range chart) ---

#[derive(Debug, Deserialize)]
pub struct PriceCompareParams {
    /// Comma-separated ticker list, as typed into the input field.
    #[serde(default = "default_symbols")]
    pub symbols: String,
    #[serde(default = "default_start")]
    pub start: NaiveDate,
    #[serde(default = "default_end")]
    pub end: NaiveDate,
}

fn default_symbols() -> String {
    "AAPL,GOOGL,MSFT".to_string()
}

fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 1).expect("valid default start date")
}

fn default_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid default end date")
}

#[derive(Debug, Serialize)]
pub struct PriceComparisonResponse {
    pub chart: Option<ChartPayload>,
    pub matrix: Option<MatrixPayload>,
    pub warnings: Vec<String>,
}

fn split_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn fetch_warning(symbol: &str, error: &YahooError) -> String {
    match error {
        YahooError::NoData => format!("No data returned for {symbol}."),
        YahooError::InvalidDateRange(_) => format!("Invalid date range for {symbol}."),
        _ => format!("Could not fetch data for {symbol}."),
    }
}

#[instrument(skip(client), fields(symbols = %params.symbols, start = %params.start, end = %params.end))]
pub async fn price_comparison_handler(
    State(client): State<SharedClient>,
    Query(params): Query<PriceCompareParams>,
) -> impl IntoResponse {
    debug!("Received price comparison request");

    let symbols = split_symbols(&params.symbols);
    if symbols.is_empty() {
        warn!("No symbols entered");
        return Json(PriceComparisonResponse {
            chart: None,
            matrix: None,
            warnings: vec![EMPTY_TICKERS_WARNING.to_string()],
        });
    }

    let mut matrix = PriceMatrix::new();
    let mut warnings = Vec::new();

    // One symbol at a time, in entry order; a failed symbol still claims
    // an (empty) column so downstream output shows the absence.
    let mut client = client.lock().await;
    for symbol in &symbols {
        match client.daily_history(symbol, params.start, params.end).await {
            Ok(series) => {
                info!(symbol = %symbol, points = series.len(), "Fetched price history");
                matrix.insert_series(symbol, &series);
            }
            Err(e) => {
                warn!(symbol = %symbol, error = ?e, "Price history fetch failed");
                matrix.insert_series(symbol, &[]);
                warnings.push(fetch_warning(symbol, &e));
            }
        }
    }
    drop(client);

    if matrix.is_empty() {
        warn!(symbol_count = symbols.len(), "Every symbol came back empty");
        warnings.push(EMPTY_TICKERS_WARNING.to_string());
        return Json(PriceComparisonResponse {
            chart: None,
            matrix: None,
            warnings,
        });
    }

    info!(
        symbol_count = symbols.len(),
        row_count = matrix.dates().count(),
        warning_count = warnings.len(),
        "Assembled price comparison"
    );
    Json(PriceComparisonResponse {
        chart: Some(ChartPayload::price_comparison(&matrix)),
        matrix: Some(MatrixPayload::from_matrix(&matrix)),
        warnings,
    })
}

// --- Fundamentals comparison (field-by-symbol grid) ---

#[derive(Debug, Deserialize)]
pub struct FundamentalsParams {
    /// Repeated `symbol=...` params, one per entered stock.
    #[serde(default)]
    pub symbol: Vec<String>,
    /// Repeated `field=...` params holding formatted labels, in selection
    /// order. Empty means the default selection.
    #[serde(default)]
    pub field: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FundamentalsResponse {
    pub grid: Option<GridPayload>,
    pub warnings: Vec<String>,
}

fn clean_entries(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[instrument(skip(client, catalog, watchlist), fields(symbol_count = params.symbol.len(), field_count = params.field.len()))]
pub async fn fundamentals_comparison_handler(
    State(client): State<SharedClient>,
    State(catalog): State<SharedCatalog>,
    State(watchlist): State<SharedWatchlist>,
    MultiQuery(params): MultiQuery<FundamentalsParams>,
) -> impl IntoResponse {
    debug!("Received fundamentals comparison request");

    let mut symbols = clean_entries(&params.symbol);
    if symbols.is_empty() {
        symbols = watchlist.lock().await.symbols().to_vec();
    }
    if symbols.is_empty() {
        warn!("No symbols entered and watchlist is empty");
        return Json(FundamentalsResponse {
            grid: None,
            warnings: vec![EMPTY_SYMBOLS_WARNING.to_string()],
        });
    }

    let labels = {
        let selected = clean_entries(&params.field);
        if selected.is_empty() {
            DEFAULT_FIELD_LABELS.iter().map(|s| s.to_string()).collect()
        } else {
            selected
        }
    };

    let mut snapshots = Vec::with_capacity(symbols.len());
    let mut warnings = Vec::new();

    let mut client = client.lock().await;
    for symbol in &symbols {
        match client.quote_summary(symbol).await {
            Ok(snapshot) => {
                info!(symbol = %symbol, fields = snapshot.fields.len(), "Fetched fundamentals snapshot");
                snapshots.push(snapshot);
            }
            Err(e) => {
                // Keep the column; every cell in it stays absent
                warn!(symbol = %symbol, error = ?e, "Fundamentals fetch failed");
                snapshots.push(FundamentalsSnapshot::empty(symbol));
                warnings.push(fetch_warning(symbol, &e));
            }
        }
    }
    drop(client);

    let table = assemble_comparison(&labels, &snapshots, &catalog);
    info!(
        rows = table.fields().len(),
        columns = table.symbols().len(),
        populated = table.populated_cells(),
        "Assembled fundamentals comparison"
    );

    Json(FundamentalsResponse {
        grid: Some(GridPayload::from_table(&table)),
        warnings,
    })
}

// --- YTD comparison (normalized chart) ---

#[derive(Debug, Deserialize)]
pub struct YtdParams {
    #[serde(default)]
    pub symbol: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct YtdComparisonResponse {
    pub chart: Option<ChartPayload>,
    /// Per-symbol reasons for lines that could not be drawn.
    pub errors: IndexMap<String, String>,
    pub warnings: Vec<String>,
}

#[instrument(skip(client, watchlist), fields(symbol_count = params.symbol.len()))]
pub async fn ytd_comparison_handler(
    State(client): State<SharedClient>,
    State(watchlist): State<SharedWatchlist>,
    MultiQuery(params): MultiQuery<YtdParams>,
) -> impl IntoResponse {
    debug!("Received YTD comparison request");

    let mut symbols = clean_entries(&params.symbol);
    if symbols.is_empty() {
        symbols = watchlist.lock().await.symbols().to_vec();
    }
    if symbols.is_empty() {
        warn!("No symbols entered and watchlist is empty");
        return Json(YtdComparisonResponse {
            chart: None,
            errors: IndexMap::new(),
            warnings: vec![EMPTY_SYMBOLS_WARNING.to_string()],
        });
    }

    let mut series = Vec::new();
    let mut errors = IndexMap::new();

    let mut client = client.lock().await;
    for symbol in &symbols {
        match client.ytd_history(symbol).await {
            Ok(history) => match normalize_to_100(&history) {
                Ok(normalized) => {
                    info!(symbol = %symbol, points = normalized.len(), "Normalized YTD series");
                    series.push(LabeledSeries {
                        label: symbol.clone(),
                        points: normalized
                            .into_iter()
                            .map(|p| ChartPoint {
                                date: p.date,
                                value: p.price,
                            })
                            .collect(),
                    });
                }
                Err(e) => {
                    // A misleading curve is worse than a missing one
                    warn!(symbol = %symbol, error = %e, "YTD normalization rejected series");
                    errors.insert(symbol.clone(), e.to_string());
                }
            },
            Err(e) => {
                warn!(symbol = %symbol, error = ?e, "YTD history fetch failed");
                errors.insert(symbol.clone(), fetch_warning(symbol, &e));
            }
        }
    }
    drop(client);

    let chart = if series.is_empty() {
        None
    } else {
        Some(ChartPayload::ytd_comparison(series))
    };

    info!(
        drawn = chart.as_ref().map_or(0, |c| c.series.len()),
        failed = errors.len(),
        "Assembled YTD comparison"
    );
    Json(YtdComparisonResponse {
        chart,
        errors,
        warnings: Vec::new(),
    })
}

// --- Field catalog ---

#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    pub fields: Vec<String>,
    pub default_selection: Vec<String>,
}

#[instrument(skip(catalog))]
pub async fn get_fields_handler(State(catalog): State<SharedCatalog>) -> impl IntoResponse {
    let fields: Vec<String> = catalog.labels().map(str::to_string).collect();
    debug!(field_count = fields.len(), "Returning field catalog");
    Json(FieldsResponse {
        fields,
        default_selection: DEFAULT_FIELD_LABELS.iter().map(|s| s.to_string()).collect(),
    })
}

// --- Watchlist ---

#[derive(Debug, Deserialize)]
pub struct AppendSymbolRequest {
    pub symbol: String,
}

#[instrument(skip(watchlist))]
pub async fn get_watchlist_handler(State(watchlist): State<SharedWatchlist>) -> Json<Watchlist> {
    let watchlist = watchlist.lock().await;
    debug!(symbol_count = watchlist.len(), "Returning watchlist");
    Json(watchlist.clone())
}

#[instrument(skip(watchlist), fields(symbol = %payload.symbol))]
pub async fn append_watchlist_handler(
    State(watchlist): State<SharedWatchlist>,
    Json(payload): Json<AppendSymbolRequest>,
) -> Response {
    let symbol = payload.symbol.trim().to_string();
    if symbol.is_empty() {
        warn!("Rejected blank watchlist symbol");
        return (StatusCode::UNPROCESSABLE_ENTITY, "Symbol must not be empty").into_response();
    }

    let mut watchlist = watchlist.lock().await;
    watchlist.append(symbol);
    info!(symbol_count = watchlist.len(), "Appended watchlist symbol");
    (StatusCode::OK, Json(watchlist.clone())).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_symbols_trims_and_drops_blanks() {
        assert_eq!(
            split_symbols("AAPL, GOOGL ,MSFT"),
            vec!["AAPL", "GOOGL", "MSFT"]
        );
        assert_eq!(split_symbols("AAPL,,  ,GOOGL"), vec!["AAPL", "GOOGL"]);
        assert!(split_symbols("").is_empty());
        assert!(split_symbols(" , ,").is_empty());
    }

    #[test]
    fn test_default_range_matches_input_form() {
        assert_eq!(default_symbols(), "AAPL,GOOGL,MSFT");
        assert_eq!(default_start(), NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(default_end(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
    }

    #[test]
    fn test_fetch_warning_names_the_symbol() {
        assert_eq!(
            fetch_warning("ZZZZ", &YahooError::NoData),
            "No data returned for ZZZZ."
        );
    }
}
