use chrono::{DateTime, Datelike, NaiveDate, Utc};
use indexmap::IndexMap;
use rand::seq::IndexedRandom;
use reqwest::{Client, Error as ReqwestError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, SystemTime};
use tokio::time::sleep;

#[derive(Debug)]
pub enum YahooError {
    Http(ReqwestError),
    Serialization(serde_json::Error),
    InvalidDateRange(String),
    InvalidResponse(String),
    NoData,
}

impl From<ReqwestError> for YahooError {
    fn from(error: ReqwestError) -> Self {
        YahooError::Http(error)
    }
}

impl From<serde_json::Error> for YahooError {
    fn from(error: serde_json::Error) -> Self {
        YahooError::Serialization(error)
    }
}

/// One daily observation of a closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Flat snapshot of a symbol's descriptive fields, as returned by the
/// provider. Key order is the order keys were first seen while flattening
/// the quoteSummary modules; reverse lookup and the field catalog both
/// depend on that order staying stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalsSnapshot {
    pub symbol: String,
    pub fields: IndexMap<String, Value>,
}

impl FundamentalsSnapshot {
    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            fields: IndexMap::new(),
        }
    }
}

// Modules flattened into a snapshot, in precedence order. The first module
// to supply a key wins.
pub const QUOTE_SUMMARY_MODULES: [&str; 5] = [
    "price",
    "summaryDetail",
    "defaultKeyStatistics",
    "assetProfile",
    "financialData",
];

enum PriceColumn {
    Close,
    AdjClose,
}

pub struct YahooClient {
    client: Client,
    base_url: String,
    rate_limit_per_minute: u32,
    request_timestamps: Vec<SystemTime>,
    user_agents: Vec<String>,
    random_agent: bool,
}

impl YahooClient {
    pub fn new(random_agent: bool, rate_limit_per_minute: u32) -> Result<Self, YahooError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0".to_string(),
        ];

        Ok(YahooClient {
            client,
            base_url: "https://query1.finance.yahoo.com".to_string(),
            rate_limit_per_minute,
            request_timestamps: Vec::new(),
            user_agents,
            random_agent,
        })
    }

    /// Point the client at a different host, e.g. a self-hosted mirror.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn get_user_agent(&self) -> String {
        if self.random_agent {
            self.user_agents
                .choose(&mut rand::rng())
                .unwrap_or(&self.user_agents[0])
                .clone()
        } else {
            self.user_agents[0].clone()
        }
    }

    async fn enforce_rate_limit(&mut self) {
        let current_time = SystemTime::now();

        // Remove timestamps older than 1 minute
        self.request_timestamps.retain(|&timestamp| {
            current_time
                .duration_since(timestamp)
                .unwrap_or(Duration::from_secs(0))
                < Duration::from_secs(60)
        });

        // If we're at the rate limit, wait
        if self.request_timestamps.len() >= self.rate_limit_per_minute as usize {
            if let Some(&oldest_request) = self.request_timestamps.first() {
                let wait_time = Duration::from_secs(60)
                    - current_time
                        .duration_since(oldest_request)
                        .unwrap_or(Duration::from_secs(0));
                if !wait_time.is_zero() {
                    sleep(wait_time + Duration::from_millis(100)).await;
                }
            }
        }

        self.request_timestamps.push(current_time);
    }

    async fn make_request(
        &mut self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Value, YahooError> {
        const MAX_RETRIES: u32 = 5;

        for attempt in 0..MAX_RETRIES {
            self.enforce_rate_limit().await;

            if attempt > 0 {
                let delay =
                    Duration::from_secs_f64(2.0_f64.powi(attempt as i32 - 1) + rand::random::<f64>());
                let delay = delay.min(Duration::from_secs(60));
                sleep(delay).await;
            }

            let user_agent = self.get_user_agent();
            let request = self
                .client
                .get(url)
                .header("Accept", "application/json, text/plain, */*")
                .header("Accept-Language", "en-US,en;q=0.9")
                .header("Accept-Encoding", "gzip, deflate, br")
                .header("Connection", "keep-alive")
                .header("Cache-Control", "no-cache")
                .header("Pragma", "no-cache")
                .header("DNT", "1")
                .header("Sec-Fetch-Dest", "empty")
                .header("Sec-Fetch-Mode", "cors")
                .header("Sec-Fetch-Site", "same-site")
                .header("User-Agent", user_agent)
                .header("Referer", "https://finance.yahoo.com/")
                .header("Origin", "https://finance.yahoo.com")
                .query(params);

            let response = request.send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        match resp.json::<Value>().await {
                            Ok(data) => return Ok(data),
                            Err(_) => continue,
                        }
                    } else if status == 403 || status == 429 || status.is_server_error() {
                        continue;
                    } else if status == 404 {
                        // Unknown symbols come back as 404 with an error body
                        return Err(YahooError::NoData);
                    } else if status.is_client_error() {
                        break;
                    } else {
                        continue;
                    }
                }
                Err(_) => continue,
            }
        }

        Err(YahooError::InvalidResponse("Max retries exceeded".to_string()))
    }

    /// Daily adjusted closing prices for `[start, end)`, ascending by date.
    pub async fn daily_history(
        &mut self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, YahooError> {
        if end < start {
            return Err(YahooError::InvalidDateRange(format!(
                "end {} precedes start {}",
                end, start
            )));
        }

        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol.to_uppercase());
        let params = [
            ("period1", day_start_timestamp(start).to_string()),
            ("period2", day_start_timestamp(end).to_string()),
            ("interval", "1d".to_string()),
            ("events", "div,splits".to_string()),
        ];

        let response_data = self.make_request(&url, &params).await?;
        parse_chart_response(&response_data, PriceColumn::AdjClose)
    }

    /// Raw closing prices from January 1st of the current year to today.
    ///
    /// The first returned row is whatever the provider reports as the first
    /// trading day of the window; if January 1st was a holiday the series
    /// starts at the next session.
    pub async fn ytd_history(&mut self, symbol: &str) -> Result<Vec<PricePoint>, YahooError> {
        let today = Utc::now().date_naive();
        let start_of_year = NaiveDate::from_ymd_opt(today.year(), 1, 1)
            .expect("January 1st is a valid date");

        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol.to_uppercase());
        let params = [
            ("period1", day_start_timestamp(start_of_year).to_string()),
            ("period2", day_start_timestamp(today).to_string()),
            ("interval", "1d".to_string()),
        ];

        let response_data = self.make_request(&url, &params).await?;
        parse_chart_response(&response_data, PriceColumn::Close)
    }

    /// Snapshot of a symbol's descriptive fields, flattened across the
    /// quoteSummary modules into a single key-to-scalar map.
    pub async fn quote_summary(&mut self, symbol: &str) -> Result<FundamentalsSnapshot, YahooError> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}",
            self.base_url,
            symbol.to_uppercase()
        );
        let params = [("modules", QUOTE_SUMMARY_MODULES.join(","))];

        let response_data = self.make_request(&url, &params).await?;
        flatten_quote_summary(symbol, &response_data)
    }
}

fn day_start_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc()
        .timestamp()
}

fn parse_chart_response(body: &Value, column: PriceColumn) -> Result<Vec<PricePoint>, YahooError> {
    let chart = body
        .get("chart")
        .ok_or_else(|| YahooError::InvalidResponse("Missing chart envelope".to_string()))?;

    if chart.get("error").is_some_and(|e| !e.is_null()) {
        return Err(YahooError::NoData);
    }

    let result = chart
        .get("result")
        .and_then(|r| r.as_array())
        .filter(|r| !r.is_empty())
        .ok_or(YahooError::NoData)?;
    let item = &result[0];

    let timestamps = item
        .get("timestamp")
        .and_then(|t| t.as_array())
        .ok_or(YahooError::NoData)?;
    if timestamps.is_empty() {
        return Err(YahooError::NoData);
    }

    let prices = match column {
        PriceColumn::Close => item
            .pointer("/indicators/quote/0/close")
            .and_then(|c| c.as_array())
            .ok_or_else(|| YahooError::InvalidResponse("Missing close column".to_string()))?,
        PriceColumn::AdjClose => item
            .pointer("/indicators/adjclose/0/adjclose")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                YahooError::InvalidResponse("Missing adjclose column".to_string())
            })?,
    };

    if prices.len() != timestamps.len() {
        return Err(YahooError::InvalidResponse(
            "Inconsistent array lengths".to_string(),
        ));
    }

    let mut points = Vec::with_capacity(timestamps.len());
    for (ts, price) in timestamps.iter().zip(prices) {
        let timestamp = ts.as_i64().ok_or_else(|| {
            YahooError::InvalidResponse(format!("Invalid timestamp {:?}", ts))
        })?;
        let date = DateTime::<Utc>::from_timestamp(timestamp, 0)
            .ok_or_else(|| {
                YahooError::InvalidResponse(format!("Out-of-range timestamp {}", timestamp))
            })?
            .date_naive();

        // Halted sessions show up as nulls inside the price array
        if let Some(price) = price.as_f64() {
            points.push(PricePoint { date, price });
        }
    }

    points.sort_by_key(|p| p.date);
    Ok(points)
}

fn flatten_quote_summary(symbol: &str, body: &Value) -> Result<FundamentalsSnapshot, YahooError> {
    let summary = body
        .get("quoteSummary")
        .ok_or_else(|| YahooError::InvalidResponse("Missing quoteSummary envelope".to_string()))?;

    if summary.get("error").is_some_and(|e| !e.is_null()) {
        return Err(YahooError::NoData);
    }

    let result = summary
        .get("result")
        .and_then(|r| r.as_array())
        .filter(|r| !r.is_empty())
        .ok_or(YahooError::NoData)?;
    let item = &result[0];

    let mut fields: IndexMap<String, Value> = IndexMap::new();
    for module in QUOTE_SUMMARY_MODULES {
        let Some(entries) = item.get(module).and_then(|m| m.as_object()) else {
            continue;
        };
        for (key, value) in entries {
            if let Some(scalar) = scalar_of(value) {
                fields.entry(key.clone()).or_insert(scalar);
            }
        }
    }

    if fields.is_empty() {
        return Err(YahooError::NoData);
    }

    Ok(FundamentalsSnapshot {
        symbol: symbol.to_string(),
        fields,
    })
}

// Numeric fields arrive as {"raw": ..., "fmt": "..."} wrappers; nested
// arrays and objects without a raw value are not comparison material.
fn scalar_of(value: &Value) -> Option<Value> {
    match value {
        Value::Object(map) => map.get("raw").cloned().filter(|raw| !raw.is_null()),
        Value::Array(_) | Value::Null => None,
        other => Some(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_client_creation() {
        let client = YahooClient::new(true, 6);
        assert!(client.is_ok());
    }

    #[test]
    fn test_day_start_timestamp() {
        let date = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        assert_eq!(day_start_timestamp(date), 1640995200);
    }

    fn chart_body(timestamps: Value, close: Value, adjclose: Value) -> Value {
        json!({
            "chart": {
                "result": [{
                    "timestamp": timestamps,
                    "indicators": {
                        "quote": [{"close": close}],
                        "adjclose": [{"adjclose": adjclose}]
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_parse_chart_adjclose_column() {
        // 2022-01-03 and 2022-01-04 midnight UTC
        let body = chart_body(
            json!([1641168000, 1641254400]),
            json!([10.0, 11.0]),
            json!([9.5, 10.5]),
        );
        let points = parse_chart_response(&body, PriceColumn::AdjClose).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2022, 1, 3).unwrap());
        assert_eq!(points[0].price, 9.5);
        assert_eq!(points[1].price, 10.5);
    }

    #[test]
    fn test_parse_chart_close_column_skips_nulls() {
        let body = chart_body(
            json!([1641168000, 1641254400, 1641340800]),
            json!([10.0, null, 12.0]),
            json!([9.5, null, 11.5]),
        );
        let points = parse_chart_response(&body, PriceColumn::Close).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].price, 10.0);
        assert_eq!(points[1].price, 12.0);
        assert_eq!(
            points[1].date,
            NaiveDate::from_ymd_opt(2022, 1, 5).unwrap()
        );
    }

    #[test]
    fn test_parse_chart_provider_error_is_no_data() {
        let body = json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found"}
            }
        });
        assert!(matches!(
            parse_chart_response(&body, PriceColumn::Close),
            Err(YahooError::NoData)
        ));
    }

    #[test]
    fn test_parse_chart_missing_timestamps_is_no_data() {
        let body = json!({
            "chart": {"result": [{"meta": {}}], "error": null}
        });
        assert!(matches!(
            parse_chart_response(&body, PriceColumn::AdjClose),
            Err(YahooError::NoData)
        ));
    }

    #[test]
    fn test_parse_chart_length_mismatch_is_invalid() {
        let body = chart_body(json!([1641168000, 1641254400]), json!([10.0]), json!([9.5]));
        assert!(matches!(
            parse_chart_response(&body, PriceColumn::Close),
            Err(YahooError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_flatten_quote_summary_unwraps_raw_values() {
        let body = json!({
            "quoteSummary": {
                "result": [{
                    "price": {
                        "currency": "USD",
                        "marketCap": {"raw": 2.9e12, "fmt": "2.9T"}
                    },
                    "summaryDetail": {
                        "dividendYield": {"raw": 0.0044, "fmt": "0.44%"},
                        "payoutRatio": {}
                    },
                    "assetProfile": {
                        "sector": "Technology",
                        "companyOfficers": [{"name": "someone"}]
                    },
                    "financialData": {
                        "currentPrice": {"raw": 189.84, "fmt": "189.84"}
                    }
                }],
                "error": null
            }
        });
        let snapshot = flatten_quote_summary("aapl", &body).unwrap();
        assert_eq!(snapshot.symbol, "aapl");
        assert_eq!(snapshot.fields["currency"], json!("USD"));
        assert_eq!(snapshot.fields["sector"], json!("Technology"));
        assert_eq!(snapshot.fields["currentPrice"], json!(189.84));
        // Empty wrappers and nested arrays are dropped
        assert!(!snapshot.fields.contains_key("payoutRatio"));
        assert!(!snapshot.fields.contains_key("companyOfficers"));
    }

    #[test]
    fn test_flatten_quote_summary_first_module_wins() {
        let body = json!({
            "quoteSummary": {
                "result": [{
                    "price": {"marketCap": {"raw": 1.0}},
                    "summaryDetail": {"marketCap": {"raw": 2.0}}
                }],
                "error": null
            }
        });
        let snapshot = flatten_quote_summary("X", &body).unwrap();
        assert_eq!(snapshot.fields["marketCap"], json!(1.0));
    }

    #[test]
    fn test_flatten_quote_summary_error_is_no_data() {
        let body = json!({
            "quoteSummary": {
                "result": null,
                "error": {"code": "Not Found", "description": "Quote not found"}
            }
        });
        assert!(matches!(
            flatten_quote_summary("ZZZZ", &body),
            Err(YahooError::NoData)
        ));
    }
}
