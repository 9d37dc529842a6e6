//! Demo binary: runs an offline session against the fixture broker, walks the
//! pledge workflow end to end, and prints the margin recommendation.

use anyhow::Result;
use lien::brokers::{BrokerRegistry, Credentials};
use lien::services::{Feeds, FixtureFeed, UnifiedAccount};
use lien::types::{OrderParams, OrderSide, OrderType, ProductType};
use lien::{Config, Envelope};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_envelope<T: Serialize>(label: &str, result: lien::Result<T>) {
    let envelope = Envelope::from(result);
    println!(
        "--- {label}\n{}\n",
        serde_json::to_string_pretty(&envelope).unwrap_or_else(|e| e.to_string())
    );
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();
    let account = UnifiedAccount::new(
        config,
        BrokerRegistry::with_defaults(),
        Feeds {
            market: Box::new(FixtureFeed::new()),
            news: Box::new(FixtureFeed::new()),
            sentiment: Box::new(FixtureFeed::new()),
        },
    );

    info!(brokers = ?account.supported_brokers(), "demo session starting");

    print_envelope("connect", account.connect("zerodha", &Credentials::default()));
    print_envelope("profile", account.get_profile());
    print_envelope("portfolio", account.get_portfolio());

    // Place and inspect a fixture order.
    let order = OrderParams {
        symbol: "TCS".to_string(),
        exchange: "NSE".to_string(),
        side: OrderSide::Buy,
        quantity: 2,
        product: ProductType::Cnc,
        order_type: OrderType::Market,
        price: None,
    };
    let ack = account.place_order(&order);
    let order_id = ack.as_ref().map(|a| a.order_id.clone()).ok();
    print_envelope("place_order", ack);
    if let Some(id) = order_id {
        print_envelope("order_status", account.get_order_status(&id));
    }

    // Pledge 5 RELIANCE, authorize with the demo OTP, then release 2.
    let ticket = account.create_pledge_request("RELIANCE", 5, Some("margin top-up".to_string()));
    let request_id = ticket.as_ref().map(|t| t.request_id.clone()).ok();
    print_envelope("create_pledge_request", ticket);

    if let Some(id) = request_id {
        print_envelope("request_pledge_otp", account.request_pledge_otp(&id));
        print_envelope("authorize_pledge", account.authorize_pledge(&id, "123456"));
        print_envelope("pledge_status", account.get_pledge_status(&id));

        let unpledge = account.unpledge_request(&id, 2, None);
        let unpledge_id = unpledge.as_ref().map(|t| t.request_id.clone()).ok();
        print_envelope("unpledge_request", unpledge);
        if let Some(up) = unpledge_id {
            print_envelope("authorize_unpledge", account.authorize_pledge(&up, "123456"));
        }
    }

    print_envelope("pledged_holdings", Ok(account.get_pledged_holdings()));
    print_envelope("optimize_margin", account.optimize_margin());

    account.disconnect()?;
    info!("demo session complete");
    Ok(())
}
