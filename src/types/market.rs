//! Collaborator data shapes: market data, news and sentiment. These are the
//! contracts consumed from the external feed services; retrieval internals live
//! outside this crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Quote and recent history for one tracked symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolQuote {
    /// Recent closing prices, oldest first.
    pub history: Vec<f64>,
    pub current_price: f64,
    pub change_1d: f64,
    pub change_percent_1d: f64,
    pub volume: u64,
}

/// Daily snapshot of a market index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexQuote {
    pub current: f64,
    pub change_1d: f64,
    pub change_percent_1d: f64,
}

/// Market data for a portfolio's symbols. Sections may be empty when an
/// upstream fetch fails; consumers must tolerate partial data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketData {
    pub holdings: HashMap<String, SymbolQuote>,
    pub indices: HashMap<String, IndexQuote>,
    /// Annualized volatility per symbol.
    pub volatility: HashMap<String, f64>,
    /// Pairwise return correlation between held symbols.
    pub correlation: HashMap<String, HashMap<String, f64>>,
}

/// A news article related to a held symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub source: String,
    pub published_at: String,
    pub summary: String,
    pub related_symbol: Option<String>,
}

/// Sentiment for one symbol: score in [-1, 1], confidence in [0, 1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SymbolSentiment {
    pub score: f64,
    pub confidence: f64,
}

/// Scored sentiment across a portfolio's symbols.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentData {
    pub symbols: HashMap<String, SymbolSentiment>,
    pub overall: SymbolSentiment,
}
