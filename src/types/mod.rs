pub mod broker;
pub mod market;
pub mod optimize;
pub mod pledge;

pub use broker::{
    ConnectAck, Holding, MarginState, Order, OrderAck, OrderParams, OrderSide, OrderStatus,
    OrderType, Portfolio, Position, ProductType, Profile,
};
pub use market::{
    IndexQuote, MarketData, NewsArticle, SentimentData, SymbolQuote, SymbolSentiment,
};
pub use optimize::{
    FactorBreakdown, FeatureVector, OptimizationMethod, OptimizationResult,
};
pub use pledge::{
    AuthorizeAck, PledgeRecord, PledgeRequest, PledgeTicket, RequestKind, RequestStatus,
};
