//! Stateful services: the account facade, the pledge workflow, feature
//! extraction, the optimization engine, and the collaborator feed contracts.

pub mod account;
pub mod features;
pub mod feeds;
pub mod optimizer;
pub mod pledge;

pub use account::{Feeds, UnifiedAccount};
pub use feeds::{FixtureFeed, MarketFeed, NewsFeed, SentimentScorer};
pub use optimizer::{LinearArtifact, ModelArtifact, OptimizationEngine};
pub use pledge::{OtpAck, PledgeStatus, PledgeWorkflow};
