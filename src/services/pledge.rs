//! Collateral pledge/unpledge workflow.
//!
//! A two-phase, OTP-gated state machine: requests are created in
//! `PENDING_AUTHORIZATION` and only `authorize_pledge` moves them to a terminal
//! state, applying the collateral side effect exactly once. All state sits
//! behind one mutex so requests process in arrival order and retried
//! authorizations can never double-apply.

use crate::brokers::fixture;
use crate::error::{AppError, Result};
use crate::types::{
    AuthorizeAck, PledgeRecord, PledgeRequest, PledgeTicket, RequestKind, RequestStatus,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Mutex;
use tracing::{debug, info};

/// OTPs are exactly this many ASCII digits.
pub const OTP_LENGTH: usize = 6;

/// First id issued by the shared pledge/unpledge sequence.
const FIRST_SEQUENCE_ID: u64 = 12347;

/// Acknowledgement for an OTP delivery request.
#[derive(Debug, Clone, Serialize)]
pub struct OtpAck {
    pub reference: String,
    pub message: String,
}

/// Status projection: a still-pending (or terminal) request, or an ACTIVE
/// collateral record.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PledgeStatus {
    Request(PledgeRequest),
    Record(PledgeRecord),
}

struct PledgeState {
    requests: Vec<PledgeRequest>,
    active: Vec<PledgeRecord>,
    next_seq: u64,
    default_haircut: f64,
}

impl PledgeState {
    fn request(&self, id: &str) -> Option<&PledgeRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    fn request_mut(&mut self, id: &str) -> Option<&mut PledgeRequest> {
        self.requests.iter_mut().find(|r| r.id == id)
    }
}

/// Broker-independent pledge lifecycle over in-memory session state.
pub struct PledgeWorkflow {
    state: Mutex<PledgeState>,
}

impl PledgeWorkflow {
    pub fn new(default_haircut: f64) -> Self {
        Self {
            state: Mutex::new(PledgeState {
                requests: Vec::new(),
                active: Vec::new(),
                next_seq: FIRST_SEQUENCE_ID,
                default_haircut,
            }),
        }
    }

    /// Workflow pre-seeded with the demo ACTIVE pledges, for offline sessions.
    pub fn with_fixture_holdings(default_haircut: f64) -> Self {
        let workflow = Self::new(default_haircut);
        {
            let mut state = workflow.state.lock().unwrap();
            state.active.push(record(
                "PL12345",
                "RELIANCE",
                5,
                0.20,
                NaiveDate::from_ymd_opt(2023, 4, 1).unwrap(),
            ));
            state.active.push(record(
                "PL12346",
                "HDFCBANK",
                8,
                0.15,
                NaiveDate::from_ymd_opt(2023, 4, 5).unwrap(),
            ));
        }
        workflow
    }

    /// Create a pledge request for `quantity` shares of `security_id`.
    pub fn create_pledge_request(
        &self,
        security_id: &str,
        quantity: u32,
        reason: Option<String>,
    ) -> Result<PledgeTicket> {
        if quantity == 0 {
            return Err(AppError::Validation(
                "pledge quantity must be positive".to_string(),
            ));
        }

        let mut state = self.state.lock().unwrap();
        let id = format!("PL{}", state.next_seq);
        state.next_seq += 1;

        state.requests.push(PledgeRequest {
            id: id.clone(),
            kind: RequestKind::Pledge,
            symbol: security_id.to_string(),
            isin: fixture::isin_for(security_id),
            quantity,
            pledge_id: None,
            request_date: Utc::now().date_naive(),
            status: RequestStatus::PendingAuthorization,
            reason,
        });
        info!(request_id = %id, symbol = security_id, quantity, "pledge request created");

        Ok(PledgeTicket {
            request_id: id,
            status: RequestStatus::PendingAuthorization,
            message: "Pledge request created. OTP has been sent to your registered mobile."
                .to_string(),
        })
    }

    /// Create an unpledge request releasing `quantity` shares from an ACTIVE
    /// pledge.
    pub fn unpledge_request(
        &self,
        pledge_id: &str,
        quantity: u32,
        reason: Option<String>,
    ) -> Result<PledgeTicket> {
        if quantity == 0 {
            return Err(AppError::Validation(
                "unpledge quantity must be positive".to_string(),
            ));
        }

        let mut state = self.state.lock().unwrap();
        let pledge = state
            .active
            .iter()
            .find(|p| p.pledge_id == pledge_id)
            .ok_or_else(|| AppError::NotFound(format!("pledge {pledge_id}")))?;

        if quantity > pledge.quantity {
            return Err(AppError::Validation(format!(
                "unpledge quantity {quantity} exceeds pledged quantity {}",
                pledge.quantity
            )));
        }

        let symbol = pledge.symbol.clone();
        let isin = pledge.isin.clone();
        let id = format!("UP{}", state.next_seq);
        state.next_seq += 1;

        state.requests.push(PledgeRequest {
            id: id.clone(),
            kind: RequestKind::Unpledge,
            symbol,
            isin,
            quantity,
            pledge_id: Some(pledge_id.to_string()),
            request_date: Utc::now().date_naive(),
            status: RequestStatus::PendingAuthorization,
            reason,
        });
        info!(request_id = %id, pledge_id, quantity, "unpledge request created");

        Ok(PledgeTicket {
            request_id: id,
            status: RequestStatus::PendingAuthorization,
            message: "Unpledge request created. OTP has been sent to your registered mobile."
                .to_string(),
        })
    }

    /// Trigger out-of-band OTP delivery for a pending request.
    pub fn request_pledge_otp(&self, request_id: &str) -> Result<OtpAck> {
        let state = self.state.lock().unwrap();
        let request = state
            .request(request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id}")))?;

        if request.status != RequestStatus::PendingAuthorization {
            return Err(AppError::AlreadyCompleted(format!(
                "request {request_id} is no longer pending"
            )));
        }

        debug!(request_id, "otp delivery requested");
        Ok(OtpAck {
            reference: format!("OTP{request_id}"),
            message: "OTP sent to your registered mobile number".to_string(),
        })
    }

    /// Authorize a pending request with an OTP, applying the side effect
    /// exactly once.
    ///
    /// A malformed OTP fails validation without mutating anything. A terminal
    /// request fails `AlreadyCompleted` and never re-applies its effect.
    pub fn authorize_pledge(&self, request_id: &str, otp: &str) -> Result<AuthorizeAck> {
        if otp.len() != OTP_LENGTH || !otp.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::Validation(format!(
                "invalid OTP: expected {OTP_LENGTH} digits"
            )));
        }

        let mut state = self.state.lock().unwrap();
        let request = state
            .request(request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id}")))?
            .clone();

        if request.status != RequestStatus::PendingAuthorization {
            return Err(AppError::AlreadyCompleted(format!(
                "request {request_id} already {:?}",
                request.status
            )));
        }

        match request.kind {
            RequestKind::Pledge => {
                let haircut = fixture::haircut_for(&request.symbol, state.default_haircut);
                state.active.push(record(
                    &request.id,
                    &request.symbol,
                    request.quantity,
                    haircut,
                    Utc::now().date_naive(),
                ));
            }
            RequestKind::Unpledge => {
                let pledge_id = request.pledge_id.as_deref().ok_or_else(|| {
                    AppError::Validation(format!(
                        "unpledge request {request_id} has no linked pledge"
                    ))
                })?;
                let index = state
                    .active
                    .iter()
                    .position(|p| p.pledge_id == pledge_id)
                    .ok_or_else(|| AppError::NotFound(format!("pledge {pledge_id}")))?;

                // Creation-time checks can go stale once another unpledge
                // against the same record completes; re-check here.
                let available = state.active[index].quantity;
                if request.quantity > available {
                    return Err(AppError::Validation(format!(
                        "unpledge quantity {} exceeds remaining pledged quantity {available}",
                        request.quantity
                    )));
                }

                let remaining = available - request.quantity;
                if remaining == 0 {
                    let released = state.active.remove(index);
                    info!(pledge_id, symbol = %released.symbol, "pledge fully released");
                } else {
                    let price = fixture::reference_price(&state.active[index].symbol);
                    let pledge = &mut state.active[index];
                    pledge.quantity = remaining;
                    pledge.value = remaining as f64 * price;
                    pledge.collateral_value = pledge.value * (1.0 - pledge.haircut);
                }
            }
        }

        if let Some(entry) = state.request_mut(request_id) {
            entry.status = RequestStatus::Completed;
        }
        info!(request_id, kind = ?request.kind, "request authorized");

        Ok(AuthorizeAck {
            request_id: request_id.to_string(),
            status: RequestStatus::Completed,
            message: format!("Request {request_id} authorized successfully"),
        })
    }

    /// Reject a pending request (depository-side refusal).
    pub fn reject_request(&self, request_id: &str, reason: Option<String>) -> Result<AuthorizeAck> {
        let mut state = self.state.lock().unwrap();
        let request = state
            .request_mut(request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id}")))?;

        if request.status != RequestStatus::PendingAuthorization {
            return Err(AppError::AlreadyCompleted(format!(
                "request {request_id} already {:?}",
                request.status
            )));
        }

        request.status = RequestStatus::Rejected;
        if reason.is_some() {
            request.reason = reason;
        }
        info!(request_id, "request rejected");

        Ok(AuthorizeAck {
            request_id: request_id.to_string(),
            status: RequestStatus::Rejected,
            message: format!("Request {request_id} rejected"),
        })
    }

    /// Status of a request or of an ACTIVE collateral record.
    pub fn get_pledge_status(&self, id: &str) -> Result<PledgeStatus> {
        let state = self.state.lock().unwrap();

        if let Some(request) = state.request(id) {
            return Ok(PledgeStatus::Request(request.clone()));
        }
        if let Some(record) = state.active.iter().find(|p| p.pledge_id == id) {
            return Ok(PledgeStatus::Record(record.clone()));
        }
        Err(AppError::NotFound(format!("pledge {id}")))
    }

    /// All ACTIVE pledged holdings, in insertion order.
    pub fn get_pledged_holdings(&self) -> Vec<PledgeRecord> {
        self.state.lock().unwrap().active.clone()
    }
}

fn record(
    pledge_id: &str,
    symbol: &str,
    quantity: u32,
    haircut: f64,
    pledge_date: NaiveDate,
) -> PledgeRecord {
    let price = fixture::reference_price(symbol);
    let value = quantity as f64 * price;
    PledgeRecord {
        pledge_id: pledge_id.to_string(),
        symbol: symbol.to_string(),
        isin: fixture::isin_for(symbol),
        quantity,
        pledge_date,
        status: RequestStatus::Active,
        haircut,
        value,
        collateral_value: value * (1.0 - haircut),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorized_pledge(workflow: &PledgeWorkflow, symbol: &str, quantity: u32) -> String {
        let ticket = workflow
            .create_pledge_request(symbol, quantity, None)
            .unwrap();
        workflow
            .authorize_pledge(&ticket.request_id, "123456")
            .unwrap();
        ticket.request_id
    }

    #[test]
    fn test_pledge_lifecycle() {
        let workflow = PledgeWorkflow::new(0.20);

        let ticket = workflow
            .create_pledge_request("RELIANCE", 5, Some("margin top-up".to_string()))
            .unwrap();
        assert_eq!(ticket.status, RequestStatus::PendingAuthorization);

        let otp = workflow.request_pledge_otp(&ticket.request_id).unwrap();
        assert_eq!(otp.reference, format!("OTP{}", ticket.request_id));

        let ack = workflow
            .authorize_pledge(&ticket.request_id, "123456")
            .unwrap();
        assert_eq!(ack.status, RequestStatus::Completed);

        let holdings = workflow.get_pledged_holdings();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].symbol, "RELIANCE");
        assert_eq!(holdings[0].quantity, 5);
        // collateral = 5 x 2650.75 x (1 - 0.20)
        assert!((holdings[0].collateral_value - 5.0 * 2650.75 * 0.80).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_otp_no_mutation() {
        let workflow = PledgeWorkflow::new(0.20);
        let ticket = workflow.create_pledge_request("TCS", 3, None).unwrap();

        for bad in ["12345", "1234567", "12a456", "", "......"] {
            let err = workflow.authorize_pledge(&ticket.request_id, bad).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "otp {bad:?}");
        }

        // Still pending, nothing pledged.
        match workflow.get_pledge_status(&ticket.request_id).unwrap() {
            PledgeStatus::Request(r) => {
                assert_eq!(r.status, RequestStatus::PendingAuthorization)
            }
            PledgeStatus::Record(_) => panic!("must still be a pending request"),
        }
        assert!(workflow.get_pledged_holdings().is_empty());
    }

    #[test]
    fn test_authorize_is_at_most_once() {
        let workflow = PledgeWorkflow::new(0.20);
        let id = authorized_pledge(&workflow, "RELIANCE", 5);

        let err = workflow.authorize_pledge(&id, "654321").unwrap_err();
        assert!(matches!(err, AppError::AlreadyCompleted(_)));

        // No double-credited collateral.
        assert_eq!(workflow.get_pledged_holdings().len(), 1);
    }

    #[test]
    fn test_unpledge_reduces_and_removes() {
        let workflow = PledgeWorkflow::new(0.20);
        let pledge_id = authorized_pledge(&workflow, "RELIANCE", 5);

        let partial = workflow.unpledge_request(&pledge_id, 2, None).unwrap();
        workflow
            .authorize_pledge(&partial.request_id, "111111")
            .unwrap();

        let holdings = workflow.get_pledged_holdings();
        assert_eq!(holdings[0].quantity, 3);
        assert!((holdings[0].collateral_value - 3.0 * 2650.75 * 0.80).abs() < 1e-9);

        let rest = workflow.unpledge_request(&pledge_id, 3, None).unwrap();
        workflow.authorize_pledge(&rest.request_id, "222222").unwrap();
        assert!(workflow.get_pledged_holdings().is_empty());

        // The record vanished with its quantity; further unpledges find nothing.
        let err = workflow.unpledge_request(&pledge_id, 1, None).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_unpledge_cannot_exceed_quantity() {
        let workflow = PledgeWorkflow::new(0.20);
        let pledge_id = authorized_pledge(&workflow, "HDFCBANK", 8);

        let err = workflow.unpledge_request(&pledge_id, 9, None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = workflow.unpledge_request(&pledge_id, 0, None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_unknown_ids() {
        let workflow = PledgeWorkflow::new(0.20);

        assert!(matches!(
            workflow.request_pledge_otp("PL99999").unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            workflow.authorize_pledge("PL99999", "123456").unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            workflow.get_pledge_status("UP99999").unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_reject_blocks_authorization() {
        let workflow = PledgeWorkflow::new(0.20);
        let ticket = workflow.create_pledge_request("INFY", 4, None).unwrap();

        workflow
            .reject_request(&ticket.request_id, Some("insufficient free quantity".to_string()))
            .unwrap();

        let err = workflow
            .authorize_pledge(&ticket.request_id, "123456")
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyCompleted(_)));
        assert!(workflow.get_pledged_holdings().is_empty());
    }

    #[test]
    fn test_fixture_seed() {
        let workflow = PledgeWorkflow::with_fixture_holdings(0.20);
        let holdings = workflow.get_pledged_holdings();

        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].pledge_id, "PL12345");
        assert_eq!(holdings[1].symbol, "HDFCBANK");
        assert!((holdings[1].collateral_value - 8.0 * 1550.50 * 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_requests_keep_arrival_order_ids() {
        let workflow = PledgeWorkflow::new(0.20);
        let first = workflow.create_pledge_request("RELIANCE", 1, None).unwrap();
        let second = workflow.create_pledge_request("TCS", 1, None).unwrap();

        assert_eq!(first.request_id, "PL12347");
        assert_eq!(second.request_id, "PL12348");
    }
}
