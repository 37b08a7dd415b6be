//! Unified error types and result handling.
//!
//! One enum for the whole crate; the booking core returns these directly and
//! the web layer maps them onto HTTP responses. User-facing policy errors
//! carry German display text (the language of the bar UI), internal errors
//! stay English and are never shown verbatim.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or missing input; never mutates state.
    #[error("{message}")]
    Validation { message: String },

    /// An amount that is zero, negative where it must not be, or not finite.
    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Mitglied {id} nicht gefunden.")]
    MemberNotFound { id: i64 },

    #[error("Artikel {id} nicht gefunden.")]
    ArticleNotFound { id: i64 },

    #[error("Buchung {id} nicht gefunden.")]
    BookingNotFound { id: i64 },

    #[error("Bericht {id} nicht gefunden.")]
    ReportNotFound { id: i64 },

    /// Requested quantity exceeds the available stock.
    #[error("Nicht genügend {article} auf Lager. Verfügbar: {available}")]
    InsufficientStock {
        article: String,
        requested: i32,
        available: i32,
    },

    /// Purchase rejected by the minimum-balance policy.
    #[error("Nicht genügend Guthaben: {balance:.2} € vorhanden, {required:.2} € benötigt.")]
    InsufficientBalance { balance: f64, required: f64 },

    /// Member is blocked; every purchase is rejected regardless of amount.
    #[error("Mitglied {name} ist gesperrt.")]
    Blacklisted { name: String },

    #[error("Unauthorized")]
    Unauthorized,

    /// The admin SQL console refused a statement.
    #[error("Query rejected: {message}")]
    QueryRejected { message: String },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a [`Error::Validation`] with a formatted message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
