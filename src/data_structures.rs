use crate::fields::FieldCatalog;
use crate::yahoo::YahooClient;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

// --- Core Data Structures ---

/// Ordered, append-only list of the symbols a user has entered. Replaces
/// the original UI's hidden grow-only input counter with an explicit list
/// and an explicit append operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Watchlist {
    symbols: Vec<String>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, symbol: String) {
        self.symbols.push(symbol);
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

// --- Type Aliases for Shared State ---

// Provider client; the lock also serializes fetches, which keeps symbol
// requests one-at-a-time in entry order.
pub type SharedClient = Arc<Mutex<YahooClient>>;

// Per-session symbol entry slots
pub type SharedWatchlist = Arc<Mutex<Watchlist>>;

// Label/key mapping built at startup, read-only afterwards
pub type SharedCatalog = Arc<FieldCatalog>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watchlist_only_grows_and_keeps_order() {
        let mut watchlist = Watchlist::new();
        assert!(watchlist.is_empty());

        watchlist.append("AAPL".to_string());
        watchlist.append("MSFT".to_string());
        watchlist.append("AAPL".to_string());

        assert_eq!(watchlist.len(), 3);
        assert_eq!(watchlist.symbols(), ["AAPL", "MSFT", "AAPL"]);
    }
}
