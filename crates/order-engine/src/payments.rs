//! Payment reconciliation.

use chrono::Utc;
use common::{Money, OrderId, PaymentId, RetailerId, WholesalerId};
use domain::{
    DomainError, LedgerEntry, Payment, PaymentMode, PaymentState, PaymentStatus,
};
use order_store::{OrderPaymentStatusWrite, PaymentDecisionWrite, Store, StoreError};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Records payment claims and reconciles them on the wholesaler's
/// decision. Confirmation is the only path that posts a CREDIT to the
/// account ledger, and it rides in the same write unit as the payment
/// flip and the order payment-status recompute.
pub struct PaymentService<S> {
    store: S,
    max_retries: u32,
}

impl<S: Store> PaymentService<S> {
    pub fn new(store: S, config: &EngineConfig) -> Self {
        Self {
            store,
            max_retries: config.max_retries,
        }
    }

    /// Records a claim awaiting verification.
    ///
    /// The amount must be positive and must not exceed the order's due
    /// (total minus already-confirmed payments). Pending claims do not
    /// count against due, so several partial claims may coexist.
    #[tracing::instrument(skip(self))]
    pub async fn record_payment(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
        amount: Money,
        mode: PaymentMode,
        reference: Option<String>,
        note: Option<String>,
    ) -> Result<Payment> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .filter(|o| o.retailer_id() == retailer_id)
            .ok_or(DomainError::NotFound("order"))?;

        if !amount.is_positive() {
            return Err(DomainError::InvalidAmount(
                "payment amount must be positive".to_string(),
            )
            .into());
        }
        let confirmed: Money = self
            .store
            .payments_for_order(order_id)
            .await?
            .iter()
            .filter(|p| p.state == PaymentState::Confirmed)
            .map(|p| p.amount)
            .sum();
        let due = order.total_amount() - confirmed;
        if amount > due {
            return Err(DomainError::InvalidAmount(format!(
                "amount {amount} exceeds due {due}"
            ))
            .into());
        }

        let payment = Payment::record(
            order_id,
            order.wholesaler_id(),
            retailer_id,
            amount,
            mode,
            reference,
            note,
            Utc::now(),
        );
        self.store.insert_payment(payment.clone()).await?;
        metrics::counter!("payments_recorded_total").increment(1);
        Ok(payment)
    }

    /// Confirms a pending payment.
    ///
    /// Idempotent: a payment that is already confirmed is returned
    /// unchanged without touching the ledger. The first confirmation
    /// posts exactly one CREDIT entry and recomputes the order's
    /// payment status, all in one write unit.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        wholesaler_id: WholesalerId,
        payment_id: PaymentId,
    ) -> Result<Payment> {
        for attempt in 0..=self.max_retries {
            let current = self
                .store
                .get_payment(payment_id)
                .await?
                .filter(|p| p.wholesaler_id == wholesaler_id)
                .ok_or(DomainError::NotFound("payment"))?;

            let now = Utc::now();
            let mut payment = current;
            let expected_payment_version = payment.version;
            if !payment.confirm(wholesaler_id, now)? {
                return Ok(payment);
            }

            let entry = LedgerEntry::credit(
                wholesaler_id,
                payment.retailer_id,
                payment.amount,
                payment.ledger_description(),
                now,
            );

            let order = self
                .store
                .get_order(payment.order_id)
                .await?
                .ok_or(DomainError::NotFound("order"))?;
            // The stored record for this payment still reads pending, so
            // its amount is added explicitly.
            let confirmed: Money = self
                .store
                .payments_for_order(payment.order_id)
                .await?
                .iter()
                .filter(|p| p.state == PaymentState::Confirmed && p.id != payment.id)
                .map(|p| p.amount)
                .sum::<Money>()
                + payment.amount;
            let new_status = PaymentStatus::from_amounts(confirmed, order.total_amount());
            // The guarded order write rides along even when the status
            // value is unchanged: confirmations of different payments
            // against the same order must serialize on the order row,
            // or both recomputes read the same stale confirmed sum.
            let expected_order_version = order.version();
            let mut order = order;
            order.set_payment_status(new_status);
            let order_write = OrderPaymentStatusWrite {
                order,
                expected_order_version,
            };

            match self
                .store
                .commit_payment_decision(PaymentDecisionWrite {
                    payment: payment.clone(),
                    expected_payment_version,
                    ledger_entry: Some(entry),
                    order: Some(order_write),
                })
                .await
            {
                Ok(()) => {
                    metrics::counter!("payments_confirmed_total").increment(1);
                    tracing::info!(
                        amount = %payment.amount,
                        payment_status = %new_status,
                        "payment confirmed"
                    );
                    return Ok(payment);
                }
                Err(StoreError::Conflict { entity }) => {
                    metrics::counter!("payment_decision_conflicts_total").increment(1);
                    tracing::debug!(attempt, entity, "confirmation conflict, restarting");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::Contention("payment confirmation"))
    }

    /// Rejects a pending payment, appending the reason to its note.
    #[tracing::instrument(skip(self))]
    pub async fn reject_payment(
        &self,
        wholesaler_id: WholesalerId,
        payment_id: PaymentId,
        reason: &str,
    ) -> Result<Payment> {
        for attempt in 0..=self.max_retries {
            let current = self
                .store
                .get_payment(payment_id)
                .await?
                .filter(|p| p.wholesaler_id == wholesaler_id)
                .ok_or(DomainError::NotFound("payment"))?;

            let mut payment = current;
            let expected_payment_version = payment.version;
            payment.reject(reason, Utc::now())?;

            match self
                .store
                .commit_payment_decision(PaymentDecisionWrite {
                    payment: payment.clone(),
                    expected_payment_version,
                    ledger_entry: None,
                    order: None,
                })
                .await
            {
                Ok(()) => {
                    metrics::counter!("payments_rejected_total").increment(1);
                    return Ok(payment);
                }
                Err(StoreError::Conflict { entity }) => {
                    metrics::counter!("payment_decision_conflicts_total").increment(1);
                    tracing::debug!(attempt, entity, "rejection conflict, restarting");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::Contention("payment rejection"))
    }

    /// Payments recorded against an order, oldest first.
    pub async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>> {
        Ok(self.store.payments_for_order(order_id).await?)
    }
}
