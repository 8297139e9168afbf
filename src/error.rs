//! Error types shared by the parser, the book and the configuration layer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PricerError>;

/// Every failure the pricer can report. None of them is fatal on its own:
/// the run loop logs record and event errors and moves on to the next line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricerError {
    /// Feed record with the wrong number of fields or an unparseable value
    #[error("malformed record {record:?}: {reason}")]
    OrderFormat { record: String, reason: String },

    /// Add for an order id that is still live
    #[error("duplicate order id: {order_id}")]
    DuplicateOrder { order_id: String },

    /// Reduce for an order id that is not live
    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// Target size (or other setting) that cannot be used
    #[error("invalid configuration value {value:?}: {reason}")]
    InvalidConfiguration { value: String, reason: String },
}

impl PricerError {
    pub fn format(record: impl Into<String>, reason: impl Into<String>) -> Self {
        PricerError::OrderFormat { record: record.into(), reason: reason.into() }
    }

    pub fn config(value: impl Into<String>, reason: impl Into<String>) -> Self {
        PricerError::InvalidConfiguration { value: value.into(), reason: reason.into() }
    }

    /// Short label used for the `kind` metric label and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PricerError::OrderFormat { .. } => "order_format",
            PricerError::DuplicateOrder { .. } => "duplicate_order",
            PricerError::OrderNotFound { .. } => "order_not_found",
            PricerError::InvalidConfiguration { .. } => "invalid_configuration",
        }
    }
}
