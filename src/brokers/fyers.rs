//! FYERS adapter.
//!
//! Live mode validates an auth code using the SHA-256 app-id hash
//! (`app_id:app_secret:auth_code`) and authorizes requests with
//! `app_id:access_token`. Symbols use the FYERS spelling (`NSE:RELIANCE-EQ`)
//! and positions are carried under the MARGIN product.

use crate::brokers::{fixture, validate_order_params, BrokerAdapter, Credentials, DataSource, Session};
use crate::config::{Config, FyersConfig};
use crate::error::{AppError, Result};
use crate::types::{
    ConnectAck, Holding, MarginState, Order, OrderAck, OrderParams, OrderStatus, OrderType,
    Position, ProductType, Profile,
};
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

const SESSION_TTL_HOURS: i64 = 8;

fn equity(symbol: &str) -> String {
    format!("NSE:{symbol}-EQ")
}

fn derivative(symbol: &str) -> String {
    format!("NSE:{symbol}")
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user_id: String,
}

/// Adapter for the FYERS API.
#[derive(Debug)]
pub struct FyersAdapter {
    config: FyersConfig,
    source: DataSource,
    session: Option<Session>,
    http: reqwest::blocking::Client,
    orders: Vec<Order>,
}

impl FyersAdapter {
    /// Build an adapter from configuration. A missing app id selects fixture
    /// mode explicitly at construction.
    pub fn new(config: &Config) -> Self {
        let source = if config.fyers.app_id.is_some() {
            DataSource::Live
        } else {
            DataSource::Fixture
        };
        debug!(?source, "constructing fyers adapter");

        Self {
            config: config.fyers.clone(),
            source,
            session: None,
            http: reqwest::blocking::Client::new(),
            orders: fixture::order_history(equity, ProductType::Margin),
        }
    }

    /// Boxed constructor for the registry.
    pub fn boxed(config: &Config) -> Box<dyn BrokerAdapter> {
        Box::new(Self::new(config))
    }

    fn app_id(&self) -> &str {
        self.config.app_id.as_deref().unwrap_or_default()
    }

    /// SHA-256 over `app_id:app_secret:auth_code`, hex encoded.
    fn app_id_hash(&self, auth_code: &str) -> String {
        let key = format!(
            "{}:{}:{auth_code}",
            self.app_id(),
            self.config.app_secret.as_deref().unwrap_or_default()
        );
        hex::encode(Sha256::digest(key.as_bytes()))
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
        format!("{}:{}", self.app_id(), session.access_token)
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
            warn!(%status, "fyers request failed: {}", path);
            return Err(AppError::Upstream(format!(
                "fyers returned {status}: {body}"
            )));
        }

        Ok(response.json()?)
    }

    fn next_order_id() -> String {
        let suffix: u32 = rand::thread_rng().gen_range(1000..10000);
        format!("FY{}{suffix}", Utc::now().timestamp())
    }
}

impl BrokerAdapter for FyersAdapter {
    fn name(&self) -> &'static str {
        "fyers"
    }

    fn data_source(&self) -> DataSource {
        self.source
    }

    fn connect(&mut self, credentials: &Credentials) -> Result<ConnectAck> {
        if self.source == DataSource::Fixture {
            self.session = Some(Session::new(
                "fixture_fyers_token".to_string(),
                "FY0000".to_string(),
                SESSION_TTL_HOURS,
            ));
            info!("connected to fyers in fixture mode");
            return Ok(ConnectAck {
                broker: "fyers".to_string(),
                user_id: "FY0000".to_string(),
                message: "Connected to FYERS in fixture mode".to_string(),
            });
        }

        let auth_code = credentials.auth_code.as_deref().ok_or_else(|| {
            let redirect = credentials
                .redirect_uri
                .as_deref()
                .unwrap_or("https://your-redirect-url.example");
            AppError::Authentication(format!(
                "auth code required; obtain one at {}/generate-authcode?client_id={}&redirect_uri={redirect}&response_type=code",
                self.config.base_url,
                self.app_id()
            ))
        })?;

        let url = format!("{}/validate-authcode", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "grant_type": "authorization_code",
                "appIdHash": self.app_id_hash(auth_code),
                "code": auth_code,
            }))
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(AppError::Authentication(format!(
                "fyers auth code validation failed ({status}): {body}"
            )));
        }

        let token: TokenResponse = response.json()?;
        let user_id = token.user_id.clone();
        self.session = Some(Session::new(
            token.access_token,
            user_id.clone(),
            SESSION_TTL_HOURS,
        ));
        info!(%user_id, "connected to fyers");

        Ok(ConnectAck {
            broker: "fyers".to_string(),
            user_id,
            message: "Connected to FYERS".to_string(),
        })
    }

    fn disconnect(&mut self) -> Result<()> {
        // FYERS has no explicit logout; the token is invalidated locally.
        self.session = None;
        info!("disconnected from fyers");
        Ok(())
    }

    fn get_profile(&self) -> Result<Profile> {
        if self.source == DataSource::Fixture {
            return Ok(Profile {
                user_id: "FY0000".to_string(),
                name: "Demo Trader".to_string(),
                email: "demo@fyers.example".to_string(),
                phone: "8888888888".to_string(),
                pan: "FGHIJ5678K".to_string(),
                account_type: "individual".to_string(),
            });
        }
        self.get_live("/profile")
    }

    fn get_holdings(&self) -> Result<Vec<Holding>> {
        if self.source == DataSource::Fixture {
            return Ok(fixture::holdings(equity));
        }
        self.get_live("/holdings")
    }

    fn get_positions(&self) -> Result<Vec<Position>> {
        if self.source == DataSource::Fixture {
            return Ok(fixture::positions(derivative, ProductType::Margin));
        }
        self.get_live("/positions")
    }

    fn get_margin(&self) -> Result<MarginState> {
        if self.source == DataSource::Fixture {
            return Ok(fixture::margin());
        }
        self.get_live("/funds")
    }

    fn place_order(&mut self, params: &OrderParams) -> Result<OrderAck> {
        validate_order_params(params)?;

        if self.source == DataSource::Fixture {
            let order_id = Self::next_order_id();
            let (status, average_price, filled_quantity) = match params.order_type {
                OrderType::Market => (
                    OrderStatus::Complete,
                    fixture::reference_price(params.symbol.trim_start_matches("NSE:").trim_end_matches("-EQ")),
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
        let url = format!("{}/orders", self.config.base_url);
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
                "fyers order placement failed ({status}): {body}"
            )));
        }

        Ok(response.json()?)
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
        self.get_live(&format!("/orders?id={order_id}"))
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
        let url = format!("{}/orders", self.config.base_url);
        let response = self
            .http
            .put(&url)
            .header("Authorization", self.auth_header(session))
            .json(&serde_json::json!({ "id": order_id, "params": params }))
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Upstream(format!(
                "fyers order modification failed ({status})"
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
        let url = format!("{}/orders", self.config.base_url);
        let response = self
            .http
            .delete(&url)
            .header("Authorization", self.auth_header(session))
            .json(&serde_json::json!({ "id": order_id }))
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Upstream(format!(
                "fyers order cancellation failed ({status})"
            )));
        }

        Ok(OrderAck {
            order_id: order_id.to_string(),
            status: OrderStatus::Cancelled,
        })
    }
}
