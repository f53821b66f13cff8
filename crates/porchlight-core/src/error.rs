use thiserror::Error;

/// Errors surfaced by the analytics service layer.
///
/// `Validation` and `NotFound` carry caller-facing messages; `Store` wraps
/// whatever the backing store returned and is rendered as a generic internal
/// error at the HTTP boundary.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
