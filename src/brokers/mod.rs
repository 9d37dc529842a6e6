//! Broker adapters.
//!
//! One `BrokerAdapter` trait spans heterogeneous broker APIs. Every variant is
//! constructed with an explicit [`DataSource`]: `Live` talks to the broker over
//! blocking HTTP, `Fixture` serves a fixed internal snapshot so the rest of the
//! system can be exercised without network access.

pub mod fixture;
pub mod fyers;
pub mod registry;
pub mod zerodha;

pub use fyers::FyersAdapter;
pub use registry::BrokerRegistry;
pub use zerodha::ZerodhaAdapter;

use crate::error::Result;
use crate::types::{
    ConnectAck, Holding, MarginState, Order, OrderAck, OrderParams, Profile,
};
use chrono::{DateTime, Duration, Utc};

/// Where an adapter's data comes from, decided at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Real broker API over blocking HTTP.
    Live,
    /// Fixed internal snapshot; every operation succeeds offline.
    Fixture,
}

/// Credential material for `connect`. Which fields matter is broker-specific:
/// Zerodha exchanges a request token + checksum, FYERS an auth code.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub request_token: Option<String>,
    pub checksum: Option<String>,
    pub auth_code: Option<String>,
    pub redirect_uri: Option<String>,
}

/// An authenticated broker session with expiry.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(access_token: String, user_id: String, ttl_hours: i64) -> Self {
        Self {
            access_token,
            user_id,
            expires_at: Utc::now() + Duration::hours(ttl_hours),
        }
    }

    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// Uniform contract over one broker account.
///
/// Implementations never panic past this boundary: missing credential material
/// is an `Authentication` error, a live read without a valid session is a
/// session-expired `Authentication` error, and fixture mode always succeeds.
pub trait BrokerAdapter: Send + std::fmt::Debug {
    /// Broker name as registered (lowercase).
    fn name(&self) -> &'static str;

    /// Data source the adapter was constructed with.
    fn data_source(&self) -> DataSource;

    fn connect(&mut self, credentials: &Credentials) -> Result<ConnectAck>;
    fn disconnect(&mut self) -> Result<()>;

    fn get_profile(&self) -> Result<Profile>;
    fn get_holdings(&self) -> Result<Vec<Holding>>;
    fn get_positions(&self) -> Result<Vec<crate::types::Position>>;
    fn get_margin(&self) -> Result<MarginState>;

    fn place_order(&mut self, params: &OrderParams) -> Result<OrderAck>;
    fn get_order_status(&self, order_id: &str) -> Result<Order>;
    fn get_order_history(&self) -> Result<Vec<Order>>;
    fn modify_order(&mut self, order_id: &str, params: &OrderParams) -> Result<OrderAck>;
    fn cancel_order(&mut self, order_id: &str) -> Result<OrderAck>;
}

/// Shared order-parameter validation applied by every adapter.
pub(crate) fn validate_order_params(params: &OrderParams) -> Result<()> {
    if params.symbol.trim().is_empty() {
        return Err(crate::error::AppError::Validation(
            "order symbol must not be empty".to_string(),
        ));
    }
    if params.quantity == 0 {
        return Err(crate::error::AppError::Validation(
            "order quantity must be positive".to_string(),
        ));
    }
    Ok(())
}
