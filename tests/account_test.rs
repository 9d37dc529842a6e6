//! Unified account end-to-end tests over the fixture broker and feeds.

use lien::brokers::{BrokerRegistry, Credentials};
use lien::error::AppError;
use lien::services::{
    Feeds, FixtureFeed, MarketFeed, NewsFeed, SentimentScorer, UnifiedAccount,
};
use lien::types::{
    OptimizationMethod, OrderParams, OrderSide, OrderStatus, OrderType, ProductType,
    RequestStatus,
};
use lien::{Config, Envelope};

fn fixture_account(seed_pledges: bool) -> UnifiedAccount {
    let mut config = Config::default();
    config.pledge.seed_fixture_holdings = seed_pledges;
    // Keep the engine on the rule strategy regardless of shipped artifacts.
    config.model_path = "/nonexistent/margin_optimizer.json".to_string();
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
fn connect_then_portfolio_then_optimize() {
    let account = fixture_account(true);
    let ack = account.connect("zerodha", &Credentials::default()).unwrap();
    assert_eq!(ack.broker, "zerodha");

    let portfolio = account.get_portfolio().unwrap();
    assert_eq!(portfolio.holdings.len(), 3);
    assert_eq!(portfolio.positions.len(), 2);
    assert_eq!(portfolio.pledged_holdings.len(), 2);

    let result = account.optimize_margin().unwrap();
    assert_eq!(result.current_margin, 350_000.0);
    // No model artifact on disk, so the rule strategy answers.
    assert_eq!(result.method, OptimizationMethod::Rule);
    assert!(result.reduction_percent >= 0.05 && result.reduction_percent <= 0.25);
    assert!(result.optimized_margin <= result.current_margin);
}

#[test]
fn operations_without_broker_fail_fast() {
    let account = fixture_account(false);

    let err = account.get_portfolio().unwrap_err();
    assert!(matches!(err, AppError::Configuration(_)));
    assert!(err.to_string().contains("no broker connected"));

    // Pledge operations run without a broker; they are depository-side.
    let ticket = account
        .create_pledge_request("RELIANCE", 5, None)
        .unwrap();
    assert_eq!(ticket.status, RequestStatus::PendingAuthorization);
}

#[test]
fn disconnect_with_no_adapter_is_noop_success() {
    let account = fixture_account(false);
    assert!(account.disconnect().is_ok());

    account.connect("fyers", &Credentials::default()).unwrap();
    assert_eq!(account.connected_broker(), Some("fyers"));
    account.disconnect().unwrap();
    assert!(account.connected_broker().is_none());

    // Second disconnect after the real one is still fine.
    assert!(account.disconnect().is_ok());
}

#[test]
fn order_delegation_round_trip() {
    let account = fixture_account(false);
    account.connect("zerodha", &Credentials::default()).unwrap();

    let ack = account
        .place_order(&OrderParams {
            symbol: "RELIANCE".to_string(),
            exchange: "NSE".to_string(),
            side: OrderSide::Buy,
            quantity: 10,
            product: ProductType::Cnc,
            order_type: OrderType::Market,
            price: None,
        })
        .unwrap();
    assert_eq!(ack.status, OrderStatus::Complete);

    let order = account.get_order_status(&ack.order_id).unwrap();
    assert_eq!(order.symbol, "RELIANCE");
    assert!(account
        .get_order_history()
        .unwrap()
        .iter()
        .any(|o| o.order_id == ack.order_id));
}

#[test]
fn pledge_walkthrough_via_facade() {
    let account = fixture_account(false);
    account.connect("zerodha", &Credentials::default()).unwrap();

    let ticket = account
        .create_pledge_request("RELIANCE", 5, Some("margin top-up".to_string()))
        .unwrap();
    account.request_pledge_otp(&ticket.request_id).unwrap();
    let ack = account
        .authorize_pledge(&ticket.request_id, "123456")
        .unwrap();
    assert_eq!(ack.status, RequestStatus::Completed);

    let pledged = account.get_pledged_holdings();
    assert_eq!(pledged.len(), 1);
    assert!((pledged[0].collateral_value - 5.0 * 2650.75 * 0.80).abs() < 1e-9);

    // The new collateral shows up in the composed portfolio.
    let portfolio = account.get_portfolio().unwrap();
    assert_eq!(portfolio.pledged_holdings.len(), 1);
}

#[test]
fn reconnecting_replaces_the_previous_session() {
    let account = fixture_account(false);

    account.connect("zerodha", &Credentials::default()).unwrap();
    let zerodha_view = account.get_portfolio().unwrap();
    assert!(zerodha_view.holdings.iter().any(|h| h.symbol == "RELIANCE"));

    account.connect("fyers", &Credentials::default()).unwrap();
    let fyers_view = account.get_portfolio().unwrap();
    assert!(fyers_view
        .holdings
        .iter()
        .any(|h| h.symbol == "NSE:RELIANCE-EQ"));
}

#[test]
fn optimize_accepts_prefetched_inputs() {
    let account = fixture_account(false);
    account.connect("zerodha", &Credentials::default()).unwrap();

    let feed = FixtureFeed::new();
    let portfolio = account.get_portfolio().unwrap();
    let market = feed.get_market_data(&portfolio).unwrap();
    let articles = feed.get_news_for_portfolio(&portfolio).unwrap();
    let sentiment = feed.analyze_sentiment(&articles).unwrap();

    let direct = account.optimize_margin_for(&portfolio, &market, &sentiment);
    let fetched = account.optimize_margin().unwrap();

    // Same inputs, same recommendation either way.
    assert_eq!(direct.method, fetched.method);
    assert_eq!(direct.reduction_percent, fetched.reduction_percent);
    assert_eq!(direct.optimized_margin, fetched.optimized_margin);
}

#[test]
fn envelope_conversion_at_the_boundary() {
    let account = fixture_account(false);

    let failure = Envelope::from(account.get_portfolio());
    let json = serde_json::to_value(&failure).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("no broker connected"));

    account.connect("zerodha", &Credentials::default()).unwrap();
    let success = Envelope::from(account.get_profile());
    let json = serde_json::to_value(&success).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["user_id"], "ZD0000");

    // List payloads serialize under a data key rather than failing.
    account
        .create_pledge_request("RELIANCE", 5, None)
        .and_then(|t| account.authorize_pledge(&t.request_id, "123456"))
        .unwrap();
    let listing = Envelope::from(lien::Result::Ok(account.get_pledged_holdings()));
    let json = serde_json::to_value(&listing).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"][0]["symbol"], "RELIANCE");
}
