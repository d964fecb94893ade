use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: Uuid,
    },

    #[error("insufficient availability for listing {listing_id}: requested {requested}, available {available}")]
    InsufficientAvailability {
        listing_id: Uuid,
        requested: u32,
        available: u32,
    },

    #[error("listing not bookable: {listing_id}")]
    ListingNotBookable {
        listing_id: Uuid,
    },

    #[error("invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("invalid fee amount: {amount}")]
    InvalidFeeAmount {
        amount: Money,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("payment failed: {message}")]
    PaymentFailed {
        message: String,
    },
}

impl MarketError {
    /// validation error from any displayable message
    pub fn validation(message: impl Into<String>) -> Self {
        MarketError::Validation {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketError>;
