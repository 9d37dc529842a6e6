//! Unified account facade.
//!
//! One connected broker adapter at a time, plus the pledge workflow, the
//! optimization engine, and the collaborator feeds. Operations that need a
//! broker fail fast before `connect`; `get_portfolio` composes sub-calls
//! fail-fast so a partial portfolio is never returned.

use crate::brokers::{BrokerAdapter, BrokerRegistry, Credentials};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::features;
use crate::services::feeds::{MarketFeed, NewsFeed, SentimentScorer};
use crate::services::optimizer::OptimizationEngine;
use crate::services::pledge::{OtpAck, PledgeStatus, PledgeWorkflow};
use crate::types::{
    AuthorizeAck, ConnectAck, MarginState, MarketData, Order, OrderAck, OrderParams,
    OptimizationResult, PledgeRecord, PledgeTicket, Portfolio, Profile, SentimentData,
};
use std::sync::Mutex;
use tracing::info;

/// Feed bundle the account consults when optimizing.
pub struct Feeds {
    pub market: Box<dyn MarketFeed + Send>,
    pub news: Box<dyn NewsFeed + Send>,
    pub sentiment: Box<dyn SentimentScorer + Send>,
}

/// Broker-agnostic account facade.
pub struct UnifiedAccount {
    config: Config,
    registry: BrokerRegistry,
    adapter: Mutex<Option<Box<dyn BrokerAdapter>>>,
    pledges: PledgeWorkflow,
    engine: OptimizationEngine,
    feeds: Feeds,
}

impl UnifiedAccount {
    pub fn new(config: Config, registry: BrokerRegistry, feeds: Feeds) -> Self {
        let engine = OptimizationEngine::new(
            config.model_path.as_ref(),
            &config.primary_index,
        );
        let pledges = if config.pledge.seed_fixture_holdings {
            PledgeWorkflow::with_fixture_holdings(config.pledge.default_haircut)
        } else {
            PledgeWorkflow::new(config.pledge.default_haircut)
        };
        Self {
            config,
            registry,
            adapter: Mutex::new(None),
            pledges,
            engine,
            feeds,
        }
    }

    /// Connect to `broker`, replacing any previously connected adapter.
    pub fn connect(&self, broker: &str, credentials: &Credentials) -> Result<ConnectAck> {
        let mut adapter = self.registry.create(broker, &self.config)?;
        let ack = adapter.connect(credentials)?;
        *self.adapter.lock().unwrap() = Some(adapter);
        info!(broker, user_id = %ack.user_id, "account connected");
        Ok(ack)
    }

    /// Disconnect the current adapter. A no-op success when none is connected.
    pub fn disconnect(&self) -> Result<()> {
        let mut guard = self.adapter.lock().unwrap();
        if let Some(adapter) = guard.as_mut() {
            adapter.disconnect()?;
        }
        *guard = None;
        Ok(())
    }

    pub fn connected_broker(&self) -> Option<&'static str> {
        self.adapter.lock().unwrap().as_ref().map(|a| a.name())
    }

    pub fn supported_brokers(&self) -> Vec<String> {
        self.registry.list()
    }

    fn with_adapter<T>(&self, f: impl FnOnce(&dyn BrokerAdapter) -> Result<T>) -> Result<T> {
        let guard = self.adapter.lock().unwrap();
        match guard.as_ref() {
            Some(adapter) => f(adapter.as_ref()),
            None => Err(AppError::Configuration("no broker connected".to_string())),
        }
    }

    fn with_adapter_mut<T>(
        &self,
        f: impl FnOnce(&mut dyn BrokerAdapter) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.adapter.lock().unwrap();
        match guard.as_mut() {
            Some(adapter) => f(adapter.as_mut()),
            None => Err(AppError::Configuration("no broker connected".to_string())),
        }
    }

    pub fn get_profile(&self) -> Result<Profile> {
        self.with_adapter(|a| a.get_profile())
    }

    pub fn get_margin(&self) -> Result<MarginState> {
        self.with_adapter(|a| a.get_margin())
    }

    /// Full portfolio snapshot: holdings, positions, margin, and pledged
    /// collateral. Any sub-call failure short-circuits.
    pub fn get_portfolio(&self) -> Result<Portfolio> {
        let guard = self.adapter.lock().unwrap();
        let adapter = guard
            .as_ref()
            .ok_or_else(|| AppError::Configuration("no broker connected".to_string()))?;

        let holdings = adapter.get_holdings()?;
        let positions = adapter.get_positions()?;
        let margin = adapter.get_margin()?;

        Ok(Portfolio {
            holdings,
            positions,
            margin,
            pledged_holdings: self.pledges.get_pledged_holdings(),
        })
    }

    pub fn place_order(&self, params: &OrderParams) -> Result<OrderAck> {
        self.with_adapter_mut(|a| a.place_order(params))
    }

    pub fn get_order_status(&self, order_id: &str) -> Result<Order> {
        self.with_adapter(|a| a.get_order_status(order_id))
    }

    pub fn get_order_history(&self) -> Result<Vec<Order>> {
        self.with_adapter(|a| a.get_order_history())
    }

    pub fn modify_order(&self, order_id: &str, params: &OrderParams) -> Result<OrderAck> {
        self.with_adapter_mut(|a| a.modify_order(order_id, params))
    }

    pub fn cancel_order(&self, order_id: &str) -> Result<OrderAck> {
        self.with_adapter_mut(|a| a.cancel_order(order_id))
    }

    pub fn create_pledge_request(
        &self,
        security_id: &str,
        quantity: u32,
        reason: Option<String>,
    ) -> Result<PledgeTicket> {
        self.pledges.create_pledge_request(security_id, quantity, reason)
    }

    pub fn unpledge_request(
        &self,
        pledge_id: &str,
        quantity: u32,
        reason: Option<String>,
    ) -> Result<PledgeTicket> {
        self.pledges.unpledge_request(pledge_id, quantity, reason)
    }

    pub fn request_pledge_otp(&self, request_id: &str) -> Result<OtpAck> {
        self.pledges.request_pledge_otp(request_id)
    }

    pub fn authorize_pledge(&self, request_id: &str, otp: &str) -> Result<AuthorizeAck> {
        self.pledges.authorize_pledge(request_id, otp)
    }

    pub fn get_pledge_status(&self, id: &str) -> Result<PledgeStatus> {
        self.pledges.get_pledge_status(id)
    }

    pub fn get_pledged_holdings(&self) -> Vec<PledgeRecord> {
        self.pledges.get_pledged_holdings()
    }

    /// Run the optimization pipeline: portfolio snapshot, market data, scored
    /// news sentiment, feature extraction, then the engine.
    pub fn optimize_margin(&self) -> Result<OptimizationResult> {
        let portfolio = self.get_portfolio()?;
        let market = self.feeds.market.get_market_data(&portfolio)?;
        let articles = self.feeds.news.get_news_for_portfolio(&portfolio)?;
        let sentiment = self.feeds.sentiment.analyze_sentiment(&articles)?;

        Ok(self.optimize_margin_for(&portfolio, &market, &sentiment))
    }

    /// Optimize from already-fetched inputs, skipping the feed round trips.
    pub fn optimize_margin_for(
        &self,
        portfolio: &Portfolio,
        market: &MarketData,
        sentiment: &SentimentData,
    ) -> OptimizationResult {
        let features = features::extract(portfolio, market, sentiment);
        let result = self.engine.optimize(&features, portfolio.margin.used);
        info!(
            method = ?result.method,
            reduction = result.reduction_percent,
            savings = result.potential_savings,
            "margin optimization complete"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brokers::BrokerRegistry;
    use crate::services::feeds::FixtureFeed;

    fn fixture_account() -> UnifiedAccount {
        let mut config = Config::default();
        config.pledge.seed_fixture_holdings = true;
        UnifiedAccount::new(
            config,
            BrokerRegistry::with_defaults(),
            Feeds {
                market: Box::new(FixtureFeed::new()),
                news: Box::new(FixtureFeed::new()),
                sentiment: Box::new(FixtureFeed::new()),
            },
        )
    }

    #[test]
    fn test_operations_before_connect_fail_fast() {
        let account = fixture_account();

        for err in [
            account.get_portfolio().unwrap_err(),
            account.get_profile().unwrap_err(),
            account.optimize_margin().unwrap_err(),
        ] {
            assert!(matches!(err, AppError::Configuration(_)));
            assert!(err.to_string().contains("no broker connected"));
        }
    }

    #[test]
    fn test_disconnect_without_adapter_is_noop() {
        let account = fixture_account();
        assert!(account.disconnect().is_ok());
        assert!(account.connected_broker().is_none());
    }

    #[test]
    fn test_reconnect_replaces_adapter() {
        let account = fixture_account();
        let credentials = Credentials::default();

        account.connect("zerodha", &credentials).unwrap();
        assert_eq!(account.connected_broker(), Some("zerodha"));

        account.connect("fyers", &credentials).unwrap();
        assert_eq!(account.connected_broker(), Some("fyers"));
    }

    #[test]
    fn test_portfolio_includes_pledged_collateral() {
        let account = fixture_account();
        account.connect("zerodha", &Credentials::default()).unwrap();

        let portfolio = account.get_portfolio().unwrap();
        assert_eq!(portfolio.holdings.len(), 3);
        assert_eq!(portfolio.positions.len(), 2);
        assert_eq!(portfolio.pledged_holdings.len(), 2);
        assert_eq!(portfolio.margin.used, 350_000.0);
    }
}
