use chrono::NaiveDate;
use stockcompare::fields::format_field_label;
use stockcompare::normalize::normalize_to_100;
use stockcompare::yahoo::{YahooClient, YahooError};

#[tokio::main]
async fn main() -> Result<(), YahooError> {
    println!("Provider Client Demo");
    println!("====================");

    let mut client = YahooClient::new(true, 6)?;
    let test_symbol = "AAPL";

    // 1. Fundamentals snapshot
    println!("\nFundamentals for {}", test_symbol);
    println!("{}", "-".repeat(40));

    match client.quote_summary(test_symbol).await {
        Ok(snapshot) => {
            println!("Retrieved {} fields", snapshot.fields.len());
            for key in ["currentPrice", "marketCap", "sector", "currency"] {
                if let Some(value) = snapshot.fields.get(key) {
                    println!("  {}: {}", format_field_label(key), value);
                }
            }
        }
        Err(e) => println!("Failed to retrieve fundamentals: {:?}", e),
    }

    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

    // 2. Date-range price history
    println!("\nAdjusted close history for {}", test_symbol);
    println!("{}", "-".repeat(40));

    let start = NaiveDate::from_ymd_opt(2022, 1, 1).expect("valid date");
    let end = NaiveDate::from_ymd_opt(2022, 2, 1).expect("valid date");
    match client.daily_history(test_symbol, start, end).await {
        Ok(series) => {
            println!("Retrieved {} data points", series.len());
            if let (Some(first), Some(last)) = (series.first(), series.last()) {
                println!("  Range: {} to {}", first.date, last.date);
                println!("  First close: {:.2}, last close: {:.2}", first.price, last.price);
            }
        }
        Err(e) => println!("Failed to retrieve history: {:?}", e),
    }

    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

    // 3. Normalized year-to-date series
    println!("\nYTD performance for {}, first value rescaled to 100", test_symbol);
    println!("{}", "-".repeat(40));

    match client.ytd_history(test_symbol).await {
        Ok(series) => match normalize_to_100(&series) {
            Ok(normalized) => {
                if let (Some(first), Some(last)) = (normalized.first(), normalized.last()) {
                    println!("  {} sessions", normalized.len());
                    println!("  {}: {:.2}", first.date, first.price);
                    println!("  {}: {:.2}", last.date, last.price);
                }
            }
            Err(e) => println!("Could not normalize series: {}", e),
        },
        Err(e) => println!("Failed to retrieve YTD history: {:?}", e),
    }

    Ok(())
}
