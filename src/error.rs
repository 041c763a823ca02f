//! Engine error taxonomy
//!
//! Validation and precondition failures are rejected before any write;
//! data-insufficiency conditions (e.g. a forecast with too little history)
//! are tagged results, not errors, and never appear here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Channel value outside the closed enumeration.
    #[error("unknown channel '{0}'")]
    InvalidChannel(String),

    /// Stage value outside the closed enumeration.
    #[error("unknown stage '{0}'")]
    InvalidStage(String),

    /// Attribution model name outside the closed enumeration.
    #[error("unknown attribution model '{0}'")]
    InvalidModel(String),

    /// Negative or NaN revenue amount.
    #[error("invalid revenue amount {0}")]
    InvalidRevenue(f64),

    /// Conversion recorded for a contact with no touchpoint history.
    #[error("contact '{contact_id}' has no recorded touchpoints")]
    NoTouchpoints { contact_id: String },

    /// Two stage writes raced for the same contact; the loser gets this
    /// and should retry.
    #[error("concurrent stage update for contact '{contact_id}'")]
    Conflict { contact_id: String },

    #[error("metadata serialization failed: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
