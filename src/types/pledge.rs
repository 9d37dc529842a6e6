//! Collateral pledge data model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle status of pledge records and requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    PendingAuthorization,
    Active,
    Completed,
    Rejected,
}

/// Discriminates pledge from unpledge requests. The ids keep the familiar
/// `PL`/`UP` spelling but nothing dispatches on the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Pledge,
    Unpledge,
}

/// A security encumbered with the depository and usable as margin collateral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PledgeRecord {
    pub pledge_id: String,
    pub symbol: String,
    pub isin: String,
    pub quantity: u32,
    pub pledge_date: NaiveDate,
    pub status: RequestStatus,
    /// Discount applied when valuing the security as collateral.
    pub haircut: f64,
    /// Market value of the pledged quantity.
    pub value: f64,
    /// Usable collateral: `quantity x price x (1 - haircut)`.
    pub collateral_value: f64,
}

/// A pending pledge or unpledge request awaiting OTP authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PledgeRequest {
    pub id: String,
    pub kind: RequestKind,
    pub symbol: String,
    pub isin: String,
    pub quantity: u32,
    /// The ACTIVE record an unpledge releases quantity from. Reference only;
    /// the record outlives the request.
    pub pledge_id: Option<String>,
    pub request_date: NaiveDate,
    pub status: RequestStatus,
    pub reason: Option<String>,
}

/// Acknowledgement returned when a request is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PledgeTicket {
    pub request_id: String,
    pub status: RequestStatus,
    pub message: String,
}

/// Acknowledgement returned by OTP authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeAck {
    pub request_id: String,
    pub status: RequestStatus,
    pub message: String,
}
