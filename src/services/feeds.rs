//! Collaborator feed contracts.
//!
//! Market data, news retrieval, and sentiment scoring are external
//! collaborators; this module defines the traits the engine consumes and a
//! deterministic `FixtureFeed` so the demo binary and tests run without
//! network access, mirroring the broker adapters' fixture duality.

use crate::brokers::fixture;
use crate::error::Result;
use crate::services::features::base_symbol;
use crate::types::{
    IndexQuote, MarketData, NewsArticle, Portfolio, SentimentData, SymbolQuote, SymbolSentiment,
};
use std::collections::HashMap;
use tracing::debug;

/// Supplies quotes, volatility, and correlation for a portfolio's symbols.
pub trait MarketFeed {
    fn get_market_data(&self, portfolio: &Portfolio) -> Result<MarketData>;
}

/// Retrieves recent news for the symbols a portfolio holds.
pub trait NewsFeed {
    fn get_news_for_portfolio(&self, portfolio: &Portfolio) -> Result<Vec<NewsArticle>>;
}

/// Scores article sentiment per symbol and overall.
pub trait SentimentScorer {
    fn analyze_sentiment(&self, articles: &[NewsArticle]) -> Result<SentimentData>;
}

const POSITIVE_WORDS: &[&str] = &[
    "beats", "record", "surge", "growth", "strong", "upgrade", "profit", "rally",
];
const NEGATIVE_WORDS: &[&str] = &[
    "miss", "drop", "weak", "downgrade", "loss", "probe", "slump", "cut",
];

/// Deterministic offline implementation of all three feed contracts.
#[derive(Debug, Default)]
pub struct FixtureFeed;

impl FixtureFeed {
    pub fn new() -> Self {
        Self
    }

    fn volatility_for(symbol: &str) -> f64 {
        match symbol {
            "RELIANCE" => 0.04,
            "HDFCBANK" => 0.05,
            "TCS" => 0.06,
            _ => 0.05,
        }
    }

    fn quote_for(symbol: &str) -> SymbolQuote {
        let price = fixture::reference_price(symbol);
        // Five sessions of history drifting up to the reference price.
        let history: Vec<f64> = (0..5)
            .map(|i| price * (0.98 + 0.005 * i as f64))
            .collect();
        let previous = history[history.len() - 2];
        SymbolQuote {
            current_price: price,
            change_1d: price - previous,
            change_percent_1d: (price - previous) / previous * 100.0,
            volume: 1_250_000,
            history,
        }
    }
}

impl MarketFeed for FixtureFeed {
    fn get_market_data(&self, portfolio: &Portfolio) -> Result<MarketData> {
        let symbols: Vec<String> = portfolio
            .holdings
            .iter()
            .map(|h| base_symbol(&h.symbol))
            .collect();

        let mut data = MarketData::default();
        for symbol in &symbols {
            data.holdings.insert(symbol.clone(), Self::quote_for(symbol));
            data.volatility
                .insert(symbol.clone(), Self::volatility_for(symbol));
        }

        // Fixed moderate co-movement between every distinct pair.
        for a in &symbols {
            let row: HashMap<String, f64> = symbols
                .iter()
                .map(|b| (b.clone(), if a == b { 1.0 } else { 0.4 }))
                .collect();
            data.correlation.insert(a.clone(), row);
        }

        data.indices.insert(
            "NIFTY".to_string(),
            IndexQuote {
                current: 22_500.00,
                change_1d: 101.25,
                change_percent_1d: 0.45,
            },
        );
        data.indices.insert(
            "BANKNIFTY".to_string(),
            IndexQuote {
                current: 47_400.00,
                change_1d: -94.80,
                change_percent_1d: -0.20,
            },
        );

        debug!(symbols = symbols.len(), "fixture market data assembled");
        Ok(data)
    }
}

impl NewsFeed for FixtureFeed {
    fn get_news_for_portfolio(&self, portfolio: &Portfolio) -> Result<Vec<NewsArticle>> {
        let articles = portfolio
            .holdings
            .iter()
            .map(|h| {
                let symbol = base_symbol(&h.symbol);
                NewsArticle {
                    title: format!("{symbol} beats quarterly estimates on strong demand"),
                    source: "Fixture Wire".to_string(),
                    published_at: "2024-04-12T09:30:00Z".to_string(),
                    summary: format!(
                        "{symbol} reported record revenue growth for the quarter."
                    ),
                    related_symbol: Some(symbol),
                }
            })
            .collect();
        Ok(articles)
    }
}

impl SentimentScorer for FixtureFeed {
    fn analyze_sentiment(&self, articles: &[NewsArticle]) -> Result<SentimentData> {
        let mut per_symbol: HashMap<String, (f64, u32)> = HashMap::new();
        let mut total_score = 0.0;

        for article in articles {
            let text = format!("{} {}", article.title, article.summary).to_lowercase();
            let positive = POSITIVE_WORDS.iter().filter(|w| text.contains(*w)).count() as f64;
            let negative = NEGATIVE_WORDS.iter().filter(|w| text.contains(*w)).count() as f64;
            let mentions = positive + negative;
            let score = if mentions > 0.0 {
                (positive - negative) / mentions
            } else {
                0.0
            };
            total_score += score;

            if let Some(symbol) = &article.related_symbol {
                let entry = per_symbol.entry(symbol.clone()).or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
        }

        let symbols = per_symbol
            .into_iter()
            .map(|(symbol, (sum, count))| {
                (
                    symbol,
                    SymbolSentiment {
                        score: sum / count as f64,
                        // More coverage, more confidence, capped below certainty.
                        confidence: (0.5 + 0.1 * count as f64).min(0.9),
                    },
                )
            })
            .collect();

        let overall = if articles.is_empty() {
            SymbolSentiment::default()
        } else {
            SymbolSentiment {
                score: total_score / articles.len() as f64,
                confidence: (0.5 + 0.05 * articles.len() as f64).min(0.9),
            }
        };

        Ok(SentimentData { symbols, overall })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Holding, MarginState};

    fn demo_portfolio() -> Portfolio {
        Portfolio {
            holdings: vec![Holding {
                symbol: "RELIANCE".to_string(),
                exchange: "NSE".to_string(),
                isin: "INE002A01018".to_string(),
                quantity: 10,
                avg_price: 2500.50,
                current_price: 2650.75,
            }],
            positions: Vec::new(),
            margin: MarginState {
                total: 500_000.0,
                used: 350_000.0,
                available: 150_000.0,
            },
            pledged_holdings: Vec::new(),
        }
    }

    #[test]
    fn test_market_data_covers_holdings() {
        let feed = FixtureFeed::new();
        let data = feed.get_market_data(&demo_portfolio()).unwrap();

        assert!(data.holdings.contains_key("RELIANCE"));
        assert!(data.volatility.contains_key("RELIANCE"));
        assert_eq!(data.correlation["RELIANCE"]["RELIANCE"], 1.0);
        assert!(data.indices["NIFTY"].change_percent_1d > 0.0);
    }

    #[test]
    fn test_sentiment_is_deterministic() {
        let feed = FixtureFeed::new();
        let articles = feed.get_news_for_portfolio(&demo_portfolio()).unwrap();

        let first = feed.analyze_sentiment(&articles).unwrap();
        let second = feed.analyze_sentiment(&articles).unwrap();
        assert_eq!(first.overall.score, second.overall.score);
        assert!(first.overall.score > 0.0);
        assert!(first.symbols.contains_key("RELIANCE"));
    }

    #[test]
    fn test_empty_articles_score_neutral() {
        let feed = FixtureFeed::new();
        let sentiment = feed.analyze_sentiment(&[]).unwrap();
        assert_eq!(sentiment.overall.score, 0.0);
        assert_eq!(sentiment.overall.confidence, 0.0);
        assert!(sentiment.symbols.is_empty());
    }
}
