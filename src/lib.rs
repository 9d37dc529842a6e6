//! Margin optimization and collateral pledge service.
//!
//! `lien` recommends a reduced collateral margin for a brokerage account from
//! derived portfolio-risk features, market signals, and news sentiment, then
//! executes that recommendation through a broker-agnostic, OTP-gated
//! pledge/unpledge workflow.
//!
//! The crate is organized around three seams:
//!
//! - [`brokers`]: one [`brokers::BrokerAdapter`] trait over heterogeneous
//!   broker APIs, each variant with a self-consistent fixture mode.
//! - [`services::PledgeWorkflow`]: the two-phase, OTP-gated collateral state
//!   machine with at-most-once authorization.
//! - [`services::OptimizationEngine`]: a trained-model strategy degrading to
//!   a deterministic rule, output bounded to a 5-25% margin reduction.

pub mod brokers;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use config::Config;
pub use error::{AppError, Envelope, Result};
