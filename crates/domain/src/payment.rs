//! Payment records and their lifecycle.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, PaymentId, RetailerId, WholesalerId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// How the retailer says they paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMode {
    Upi,
    Cash,
    Neft,
    NetBanking,
    Rtgs,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Upi => "UPI",
            PaymentMode::Cash => "CASH",
            PaymentMode::Neft => "NEFT",
            PaymentMode::NetBanking => "NET_BANKING",
            PaymentMode::Rtgs => "RTGS",
        }
    }
}

impl std::fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPI" => Ok(PaymentMode::Upi),
            "CASH" => Ok(PaymentMode::Cash),
            "NEFT" => Ok(PaymentMode::Neft),
            "NET_BANKING" => Ok(PaymentMode::NetBanking),
            "RTGS" => Ok(PaymentMode::Rtgs),
            other => Err(format!("unknown payment mode: {other}")),
        }
    }
}

/// Verification state of a payment claim.
///
/// Created as `PendingVerification`; `Confirmed`, `Rejected`, and
/// `Failed` are terminal. Confirmation is the only path that posts to
/// the account ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentState {
    #[default]
    PendingVerification,
    Confirmed,
    Rejected,
    Failed,
}

impl PaymentState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentState::PendingVerification)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::PendingVerification => "PENDING_VERIFICATION",
            PaymentState::Confirmed => "CONFIRMED",
            PaymentState::Rejected => "REJECTED",
            PaymentState::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_VERIFICATION" => Ok(PaymentState::PendingVerification),
            "CONFIRMED" => Ok(PaymentState::Confirmed),
            "REJECTED" => Ok(PaymentState::Rejected),
            "FAILED" => Ok(PaymentState::Failed),
            other => Err(format!("unknown payment state: {other}")),
        }
    }
}

/// A payment claim recorded by a retailer against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub wholesaler_id: WholesalerId,
    pub retailer_id: RetailerId,
    pub amount: Money,
    pub mode: PaymentMode,
    pub state: PaymentState,
    pub reference: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<WholesalerId>,
    /// Optimistic-concurrency version, bumped on every state change.
    pub version: u64,
}

impl Payment {
    /// Records a new claim awaiting wholesaler verification.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        order_id: OrderId,
        wholesaler_id: WholesalerId,
        retailer_id: RetailerId,
        amount: Money,
        mode: PaymentMode,
        reference: Option<String>,
        note: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            order_id,
            wholesaler_id,
            retailer_id,
            amount,
            mode,
            state: PaymentState::PendingVerification,
            reference,
            note,
            created_at,
            confirmed_at: None,
            rejected_at: None,
            confirmed_by: None,
            version: 1,
        }
    }

    /// Confirms the payment. Returns `false` as an idempotent no-op when
    /// already confirmed; fails on any other terminal state.
    pub fn confirm(
        &mut self,
        by: WholesalerId,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        match self.state {
            PaymentState::Confirmed => Ok(false),
            PaymentState::Rejected => Err(DomainError::AlreadyFinalized(
                "payment was already rejected",
            )),
            PaymentState::Failed => Err(DomainError::AlreadyFinalized(
                "payment has already failed",
            )),
            PaymentState::PendingVerification => {
                self.state = PaymentState::Confirmed;
                self.confirmed_at = Some(now);
                self.confirmed_by = Some(by);
                self.version += 1;
                Ok(true)
            }
        }
    }

    /// Rejects the payment, appending the reason to the note field.
    pub fn reject(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), DomainError> {
        match self.state {
            PaymentState::Confirmed => Err(DomainError::AlreadyFinalized(
                "payment was already confirmed",
            )),
            PaymentState::Rejected => Err(DomainError::AlreadyFinalized(
                "payment was already rejected",
            )),
            PaymentState::Failed => Err(DomainError::AlreadyFinalized(
                "payment has already failed",
            )),
            PaymentState::PendingVerification => {
                self.state = PaymentState::Rejected;
                self.rejected_at = Some(now);
                self.note = Some(match self.note.take() {
                    Some(old) => format!("{old} | Rejected: {reason}"),
                    None => format!("Rejected: {reason}"),
                });
                self.version += 1;
                Ok(())
            }
        }
    }

    /// Description posted to the ledger when this payment is confirmed.
    pub fn ledger_description(&self) -> String {
        format!(
            "Payment confirmed ({}) Ref: {}",
            self.mode,
            self.reference.as_deref().unwrap_or("-")
        )
    }
}
