//! Portfolio risk feature extraction.
//!
//! Pure transformation from a portfolio snapshot plus market and sentiment
//! data into the named feature vector the optimization engine consumes.
//! Missing inputs contribute zero; extraction never fails on partial data.

use crate::types::{FeatureVector, MarketData, Portfolio, SentimentData};

/// Strip the exchange prefix and any derivative suffix from a traded symbol.
///
/// `NSE:NIFTY24APRFUT` and `NIFTY24APRFUT` both map to `NIFTY`: the base is
/// the leading alphabetic run before the first digit.
pub fn base_symbol(symbol: &str) -> String {
    let stripped = symbol
        .strip_prefix("NSE:")
        .unwrap_or(symbol)
        .trim_end_matches("-EQ");
    stripped
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect()
}

/// Derive the feature vector for one account snapshot.
pub fn extract(
    portfolio: &Portfolio,
    market: &MarketData,
    sentiment: &SentimentData,
) -> FeatureVector {
    let mut features = FeatureVector::new();

    let positions = portfolio.positions.len() as f64;
    let holdings = portfolio.holdings.len() as f64;
    features.set("positions_count", positions);
    features.set("holdings_count", holdings);
    features.set("positions_to_holdings_ratio", positions / holdings.max(1.0));

    features.set("avg_volatility", mean(market.volatility.values().copied()));

    for (name, quote) in &market.indices {
        features.set(
            &format!("{}_change_pct", name.to_lowercase()),
            quote.change_percent_1d,
        );
    }

    features.set("avg_correlation", avg_pairwise_correlation(market));

    features.set("overall_sentiment_score", sentiment.overall.score);
    features.set("overall_sentiment_confidence", sentiment.overall.confidence);
    features.set(
        "avg_position_sentiment",
        avg_position_sentiment(portfolio, sentiment),
    );

    features.set("current_margin", portfolio.margin.used);
    features.set(
        "margin_per_position",
        if positions > 0.0 {
            portfolio.margin.used / positions
        } else {
            0.0
        },
    );

    let losing = portfolio.positions.iter().filter(|p| p.pnl() < 0.0).count() as f64;
    features.set(
        "negative_positions_ratio",
        if positions > 0.0 { losing / positions } else { 0.0 },
    );

    features
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0u32), |(s, c), v| (s + v, c + 1));
    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}

/// Mean of the off-diagonal correlation entries. Self-pairs are excluded so a
/// single-symbol portfolio reads as uncorrelated rather than perfectly so.
fn avg_pairwise_correlation(market: &MarketData) -> f64 {
    let pairs = market.correlation.iter().flat_map(|(a, row)| {
        row.iter()
            .filter(move |(b, _)| a != *b)
            .map(|(_, v)| *v)
    });
    mean(pairs)
}

/// Mean sentiment over the base symbols of open positions.
fn avg_position_sentiment(portfolio: &Portfolio, sentiment: &SentimentData) -> f64 {
    let scores = portfolio
        .positions
        .iter()
        .filter_map(|p| sentiment.symbols.get(&base_symbol(&p.symbol)))
        .map(|s| s.score);
    mean(scores)
}
