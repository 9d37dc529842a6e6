//! Fixture snapshot served by adapters in offline mode, and the reference
//! price/haircut tables the pledge workflow values collateral against.

use crate::types::{
    Holding, MarginState, Order, OrderSide, OrderStatus, OrderType, Position, ProductType,
};
use chrono::{TimeZone, Utc};

/// Reference prices for collateral valuation.
pub const REFERENCE_PRICES: &[(&str, f64)] = &[
    ("RELIANCE", 2650.75),
    ("HDFCBANK", 1550.50),
    ("TCS", 3600.25),
    ("INFY", 1490.60),
];

/// Fallback price for symbols without a table entry.
pub const DEFAULT_REFERENCE_PRICE: f64 = 2650.75;

/// Per-symbol collateral haircuts.
pub const HAIRCUTS: &[(&str, f64)] = &[
    ("RELIANCE", 0.20),
    ("HDFCBANK", 0.15),
    ("TCS", 0.125),
    ("INFY", 0.125),
];

/// ISINs for the fixture universe.
pub const ISINS: &[(&str, &str)] = &[
    ("RELIANCE", "INE002A01018"),
    ("HDFCBANK", "INE040A01034"),
    ("TCS", "INE467B01029"),
    ("INFY", "INE009A01021"),
];

pub fn isin_for(symbol: &str) -> String {
    ISINS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, i)| i.to_string())
        .unwrap_or_else(|| format!("IN{symbol}"))
}

pub fn reference_price(symbol: &str) -> f64 {
    REFERENCE_PRICES
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, p)| *p)
        .unwrap_or(DEFAULT_REFERENCE_PRICE)
}

pub fn haircut_for(symbol: &str, default: f64) -> f64 {
    HAIRCUTS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, h)| *h)
        .unwrap_or(default)
}

/// Demat holdings in the fixture account. `style` maps plain symbols to the
/// broker's native spelling (FYERS uses `NSE:RELIANCE-EQ`).
pub fn holdings(style: fn(&str) -> String) -> Vec<Holding> {
    vec![
        Holding {
            symbol: style("RELIANCE"),
            exchange: "NSE".to_string(),
            isin: "INE002A01018".to_string(),
            quantity: 10,
            avg_price: 2500.50,
            current_price: 2650.75,
        },
        Holding {
            symbol: style("HDFCBANK"),
            exchange: "NSE".to_string(),
            isin: "INE040A01034".to_string(),
            quantity: 15,
            avg_price: 1600.25,
            current_price: 1550.50,
        },
        Holding {
            symbol: style("TCS"),
            exchange: "NSE".to_string(),
            isin: "INE467B01029".to_string(),
            quantity: 5,
            avg_price: 3400.00,
            current_price: 3600.25,
        },
    ]
}

/// Open futures positions in the fixture account.
pub fn positions(style: fn(&str) -> String, product: ProductType) -> Vec<Position> {
    vec![
        Position {
            symbol: style("NIFTY24APRFUT"),
            exchange: "NFO".to_string(),
            quantity: 75,
            entry_price: 22450.00,
            current_price: 22500.00,
            margin_used: 250_000.00,
            product,
        },
        Position {
            symbol: style("BANKNIFTY24APRFUT"),
            exchange: "NFO".to_string(),
            quantity: 25,
            entry_price: 47500.00,
            current_price: 47400.00,
            margin_used: 100_000.00,
            product,
        },
    ]
}

/// Margin snapshot in the fixture account.
pub fn margin() -> MarginState {
    MarginState {
        total: 500_000.00,
        used: 350_000.00,
        available: 150_000.00,
    }
}

/// Seed order history so fixture accounts start non-empty.
pub fn order_history(style: fn(&str) -> String, product: ProductType) -> Vec<Order> {
    vec![
        Order {
            order_id: "demo_order_1".to_string(),
            status: OrderStatus::Complete,
            symbol: style("RELIANCE"),
            exchange: "NSE".to_string(),
            side: OrderSide::Buy,
            quantity: 10,
            product,
            order_type: OrderType::Market,
            price: None,
            average_price: 2650.75,
            filled_quantity: 10,
            placed_at: Utc.with_ymd_and_hms(2023, 4, 1, 10, 30, 0).unwrap(),
        },
        Order {
            order_id: "demo_order_2".to_string(),
            status: OrderStatus::Complete,
            symbol: style("HDFCBANK"),
            exchange: "NSE".to_string(),
            side: OrderSide::Buy,
            quantity: 15,
            product,
            order_type: OrderType::Limit,
            price: Some(1600.25),
            average_price: 1600.25,
            filled_quantity: 15,
            placed_at: Utc.with_ymd_and_hms(2023, 4, 5, 11, 15, 0).unwrap(),
        },
    ]
}
