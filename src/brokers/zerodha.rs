//! Zerodha (Kite Connect) adapter.
//!
//! Live mode exchanges a request token + checksum for an access token, then
//! reads with `token api_key:access_token` authorization. Fixture mode serves
//! the shared snapshot and keeps an in-memory order book so placed orders show
//! up in status and history.

use crate::brokers::{fixture, validate_order_params, BrokerAdapter, Credentials, DataSource, Session};
use crate::config::{Config, ZerodhaConfig};
use crate::error::{AppError, Result};
use crate::types::{
    ConnectAck, Holding, MarginState, Order, OrderAck, OrderParams, OrderStatus, OrderType,
    Position, ProductType, Profile,
};
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info, warn};

const SESSION_TTL_HOURS: i64 = 24;
const KITE_LOGIN_URL: &str = "https://kite.zerodha.com/connect/login";

fn plain(symbol: &str) -> String {
    symbol.to_string()
}

#[derive(Debug, Deserialize)]
struct SessionData {
    access_token: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct KiteResponse<T> {
    data: T,
}

/// Adapter for the Zerodha Kite Connect API.
#[derive(Debug)]
pub struct ZerodhaAdapter {
    config: ZerodhaConfig,
    source: DataSource,
    session: Option<Session>,
    http: reqwest::blocking::Client,
    /// Fixture-mode order book, seeded with the demo history.
    orders: Vec<Order>,
}

impl ZerodhaAdapter {
    /// Build an adapter from configuration. A missing API key selects fixture
    /// mode explicitly at construction.
    pub fn new(config: &Config) -> Self {
        let source = if config.zerodha.api_key.is_some() {
            DataSource::Live
        } else {
            DataSource::Fixture
        };
        debug!(?source, "constructing zerodha adapter");

        Self {
            config: config.zerodha.clone(),
            source,
            session: None,
            http: reqwest::blocking::Client::new(),
            orders: fixture::order_history(plain, ProductType::Cnc),
        }
    }

    /// Boxed constructor for the registry.
    pub fn boxed(config: &Config) -> Box<dyn BrokerAdapter> {
        Box::new(Self::new(config))
    }

    fn api_key(&self) -> &str {
        self.config.api_key.as_deref().unwrap_or_default()
    }

    fn live_session(&self) -> Result<&Session> {
        match &self.session {
            Some(s) if s.is_valid() => Ok(s),
            _ => Err(AppError::Authentication(
                "session expired, please reconnect".to_string(),
            )),
        }
    }

    fn auth_header(&self, session: &Session) -> String {
        format!("token {}:{}", self.api_key(), session.access_token)
    }

    fn get_live<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let session = self.live_session()?;
        let url = format!("{}{}", self.config.base_url, path);
        let response = self
            .http
            .get(&url)
            .header("Authorization", self.auth_header(session))
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            warn!(%status, "zerodha request failed: {}", path);
            return Err(AppError::Upstream(format!(
                "zerodha returned {status}: {body}"
            )));
        }

        let wrapped: KiteResponse<T> = response.json()?;
        Ok(wrapped.data)
    }

    fn next_order_id() -> String {
        let suffix: u32 = rand::thread_rng().gen_range(1000..10000);
        format!("order_{}_{suffix}", Utc::now().timestamp())
    }
}

impl BrokerAdapter for ZerodhaAdapter {
    fn name(&self) -> &'static str {
        "zerodha"
    }

    fn data_source(&self) -> DataSource {
        self.source
    }

    fn connect(&mut self, credentials: &Credentials) -> Result<ConnectAck> {
        if self.source == DataSource::Fixture {
            self.session = Some(Session::new(
                "fixture_zerodha_token".to_string(),
                "ZD0000".to_string(),
                SESSION_TTL_HOURS,
            ));
            info!("connected to zerodha in fixture mode");
            return Ok(ConnectAck {
                broker: "zerodha".to_string(),
                user_id: "ZD0000".to_string(),
                message: "Connected to Zerodha in fixture mode".to_string(),
            });
        }

        let request_token = credentials.request_token.as_deref().ok_or_else(|| {
            AppError::Authentication(format!(
                "request token required; obtain one at {}?api_key={}",
                KITE_LOGIN_URL,
                self.api_key()
            ))
        })?;
        let checksum = credentials.checksum.as_deref().ok_or_else(|| {
            AppError::Authentication("checksum required for session exchange".to_string())
        })?;

        let url = format!("{}/session/token", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("api_key", self.api_key()),
                ("request_token", request_token),
                ("checksum", checksum),
            ])
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(AppError::Authentication(format!(
                "zerodha session exchange failed ({status}): {body}"
            )));
        }

        let wrapped: KiteResponse<SessionData> = response.json()?;
        let user_id = wrapped.data.user_id.clone();
        self.session = Some(Session::new(
            wrapped.data.access_token,
            user_id.clone(),
            SESSION_TTL_HOURS,
        ));
        info!(%user_id, "connected to zerodha");

        Ok(ConnectAck {
            broker: "zerodha".to_string(),
            user_id,
            message: "Connected to Zerodha".to_string(),
        })
    }

    fn disconnect(&mut self) -> Result<()> {
        // Kite has no logout endpoint; the token is invalidated locally.
        self.session = None;
        info!("disconnected from zerodha");
        Ok(())
    }

    fn get_profile(&self) -> Result<Profile> {
        if self.source == DataSource::Fixture {
            return Ok(Profile {
                user_id: "ZD0000".to_string(),
                name: "Demo User".to_string(),
                email: "demo@example.com".to_string(),
                phone: "9999999999".to_string(),
                pan: "ABCDE1234F".to_string(),
                account_type: "individual".to_string(),
            });
        }
        self.get_live("/user/profile")
    }

    fn get_holdings(&self) -> Result<Vec<Holding>> {
        if self.source == DataSource::Fixture {
            return Ok(fixture::holdings(plain));
        }
        self.get_live("/portfolio/holdings")
    }

    fn get_positions(&self) -> Result<Vec<Position>> {
        if self.source == DataSource::Fixture {
            return Ok(fixture::positions(plain, ProductType::Nrml));
        }
        self.get_live("/portfolio/positions")
    }

    fn get_margin(&self) -> Result<MarginState> {
        if self.source == DataSource::Fixture {
            return Ok(fixture::margin());
        }
        self.get_live("/user/margins")
    }

    fn place_order(&mut self, params: &OrderParams) -> Result<OrderAck> {
        validate_order_params(params)?;

        if self.source == DataSource::Fixture {
            let order_id = Self::next_order_id();
            // Market orders fill immediately at the reference price; limit
            // orders rest as pending.
            let (status, average_price, filled_quantity) = match params.order_type {
                OrderType::Market => (
                    OrderStatus::Complete,
                    fixture::reference_price(&params.symbol),
                    params.quantity,
                ),
                OrderType::Limit => (OrderStatus::Pending, 0.0, 0),
            };
            self.orders.push(Order {
                order_id: order_id.clone(),
                status,
                symbol: params.symbol.clone(),
                exchange: params.exchange.clone(),
                side: params.side,
                quantity: params.quantity,
                product: params.product,
                order_type: params.order_type,
                price: params.price,
                average_price,
                filled_quantity,
                placed_at: Utc::now(),
            });
            debug!(%order_id, "fixture order placed");
            return Ok(OrderAck { order_id, status });
        }

        let session = self.live_session()?;
        let url = format!("{}/orders/regular", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header(session))
            .json(params)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "zerodha order placement failed ({status}): {body}"
            )));
        }

        let wrapped: KiteResponse<OrderAck> = response.json()?;
        Ok(wrapped.data)
    }

    fn get_order_status(&self, order_id: &str) -> Result<Order> {
        if self.source == DataSource::Fixture {
            return self
                .orders
                .iter()
                .find(|o| o.order_id == order_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("order {order_id}")));
        }
        self.get_live(&format!("/orders/{order_id}"))
    }

    fn get_order_history(&self) -> Result<Vec<Order>> {
        if self.source == DataSource::Fixture {
            return Ok(self.orders.clone());
        }
        self.get_live("/orders")
    }

    fn modify_order(&mut self, order_id: &str, params: &OrderParams) -> Result<OrderAck> {
        validate_order_params(params)?;

        if self.source == DataSource::Fixture {
            let order = self
                .orders
                .iter_mut()
                .find(|o| o.order_id == order_id)
                .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
            if order.status != OrderStatus::Pending {
                return Err(AppError::Validation(format!(
                    "order {order_id} is not open for modification"
                )));
            }
            order.quantity = params.quantity;
            order.price = params.price;
            order.order_type = params.order_type;
            return Ok(OrderAck {
                order_id: order_id.to_string(),
                status: OrderStatus::Pending,
            });
        }

        let session = self.live_session()?;
        let url = format!("{}/orders/{order_id}", self.config.base_url);
        let response = self
            .http
            .put(&url)
            .header("Authorization", self.auth_header(session))
            .json(params)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Upstream(format!(
                "zerodha order modification failed ({status})"
            )));
        }

        Ok(OrderAck {
            order_id: order_id.to_string(),
            status: OrderStatus::Pending,
        })
    }

    fn cancel_order(&mut self, order_id: &str) -> Result<OrderAck> {
        if self.source == DataSource::Fixture {
            let order = self
                .orders
                .iter_mut()
                .find(|o| o.order_id == order_id)
                .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
            if order.status != OrderStatus::Pending {
                return Err(AppError::Validation(format!(
                    "order {order_id} cannot be cancelled: status is {:?}",
                    order.status
                )));
            }
            order.status = OrderStatus::Cancelled;
            return Ok(OrderAck {
                order_id: order_id.to_string(),
                status: OrderStatus::Cancelled,
            });
        }

        let session = self.live_session()?;
        let url = format!("{}/orders/{order_id}", self.config.base_url);
        let response = self
            .http
            .delete(&url)
            .header("Authorization", self.auth_header(session))
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Upstream(format!(
                "zerodha order cancellation failed ({status})"
            )));
        }

        Ok(OrderAck {
            order_id: order_id.to_string(),
            status: OrderStatus::Cancelled,
        })
    }
}
