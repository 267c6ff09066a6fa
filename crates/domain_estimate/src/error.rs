//! Estimate domain errors

use thiserror::Error;

use core_kernel::MoneyError;

/// Errors that can occur in the estimate domain
#[derive(Debug, Error)]
pub enum EstimateError {
    /// The estimate has been submitted and can no longer change
    #[error("Estimate {0} is locked")]
    Locked(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// A line item references a code missing from the catalog
    #[error("Unknown line item code: {0}")]
    UnknownLineItemCode(String),

    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    #[error("Line item not found: {0}")]
    LineItemNotFound(String),

    /// Zone dimensions or openings violate geometry invariants
    #[error("Invalid geometry for zone '{zone}': {message}")]
    InvalidGeometry { zone: String, message: String },

    #[error("Invalid pitch: {0}")]
    InvalidPitch(String),

    #[error("Financial error: {0}")]
    Financial(#[from] MoneyError),
}

impl EstimateError {
    /// Creates a geometry error for the named zone
    pub fn geometry(zone: impl Into<String>, message: impl Into<String>) -> Self {
        EstimateError::InvalidGeometry {
            zone: zone.into(),
            message: message.into(),
        }
    }
}
