use crate::errors::{MarketError, Result};
use crate::state::Order;

/// outcome of confirming a checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub success: bool,
    pub payment_ref: String,
}

/// seam to the external payment provider
///
/// The core never retries these calls; webhook-style confirmations feed
/// back through `Marketplace::confirm_payment`.
pub trait PaymentGateway: Send + Sync {
    /// open a checkout session for the order's total amount
    fn create_checkout(&self, order: &Order) -> Result<String>;

    /// synchronously confirm a session
    fn confirm(&self, session_ref: &str) -> Result<PaymentConfirmation>;
}

/// deterministic in-process gateway for tests and demos
#[derive(Debug, Default)]
pub struct MockGateway {
    pub decline_all: bool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declining() -> Self {
        Self { decline_all: true }
    }
}

impl PaymentGateway for MockGateway {
    fn create_checkout(&self, order: &Order) -> Result<String> {
        if !order.total_amount.is_positive() {
            return Err(MarketError::PaymentFailed {
                message: format!("order {} has nothing to charge", order.id),
            });
        }
        Ok(format!("cs_{}", order.id.simple()))
    }

    fn confirm(&self, session_ref: &str) -> Result<PaymentConfirmation> {
        if self.decline_all {
            return Ok(PaymentConfirmation {
                success: false,
                payment_ref: String::new(),
            });
        }
        Ok(PaymentConfirmation {
            success: true,
            payment_ref: session_ref.replacen("cs_", "pay_", 1),
        })
    }
}
