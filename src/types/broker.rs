//! Broker-facing data model: snapshots returned by adapters and the composed
//! portfolio the account facade builds from them.

use crate::types::pledge::PledgeRecord;
use serde::{Deserialize, Serialize};

/// A holding in the demat account. Read-only snapshot owned by the adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub exchange: String,
    pub isin: String,
    pub quantity: u32,
    pub avg_price: f64,
    pub current_price: f64,
}

impl Holding {
    /// Unrealized P&L against the average buy price.
    pub fn pnl(&self) -> f64 {
        (self.current_price - self.avg_price) * self.quantity as f64
    }

    /// P&L as a percentage of the invested value.
    pub fn pnl_percent(&self) -> f64 {
        if self.avg_price == 0.0 {
            return 0.0;
        }
        (self.current_price / self.avg_price - 1.0) * 100.0
    }
}

/// Product type under which a position is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductType {
    /// Overnight futures/options (Zerodha NRML).
    Nrml,
    /// Intraday.
    Mis,
    /// Delivery equity.
    Cnc,
    /// FYERS margin product.
    Margin,
}

/// An open derivative/intraday position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub exchange: String,
    pub quantity: u32,
    pub entry_price: f64,
    pub current_price: f64,
    /// Margin this position consumes.
    pub margin_used: f64,
    pub product: ProductType,
}

impl Position {
    /// Mark-to-market P&L.
    pub fn pnl(&self) -> f64 {
        (self.current_price - self.entry_price) * self.quantity as f64
    }
}

/// Margin snapshot for the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginState {
    pub total: f64,
    pub used: f64,
    pub available: f64,
}

impl MarginState {
    /// Percentage of total margin currently consumed.
    pub fn percent_used(&self) -> f64 {
        if self.total == 0.0 {
            return 0.0;
        }
        self.used / self.total * 100.0
    }
}

/// User profile reported by the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub pan: String,
    pub account_type: String,
}

/// Buy/sell side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Complete,
    Cancelled,
    Rejected,
}

/// Parameters for placing or modifying an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderParams {
    pub symbol: String,
    pub exchange: String,
    pub side: OrderSide,
    pub quantity: u32,
    pub product: ProductType,
    pub order_type: OrderType,
    /// Limit price; ignored for market orders.
    pub price: Option<f64>,
}

/// Acknowledgement returned by order mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    pub status: OrderStatus,
}

/// A placed order as reported by the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub status: OrderStatus,
    pub symbol: String,
    pub exchange: String,
    pub side: OrderSide,
    pub quantity: u32,
    pub product: ProductType,
    pub order_type: OrderType,
    pub price: Option<f64>,
    pub average_price: f64,
    pub filled_quantity: u32,
    pub placed_at: chrono::DateTime<chrono::Utc>,
}

/// Acknowledgement returned by `connect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectAck {
    pub broker: String,
    pub user_id: String,
    pub message: String,
}

/// The composed account view: broker snapshots plus current pledged holdings.
/// Built atomically; a sub-call failure means no portfolio at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub holdings: Vec<Holding>,
    pub positions: Vec<Position>,
    pub margin: MarginState,
    pub pledged_holdings: Vec<PledgeRecord>,
}
