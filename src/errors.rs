use thiserror::Error;

/// Rejections raised by [`crate::orders::OrderFactory`] when asked to mint an
/// order that violates the limit-order invariants.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order quantity must be greater than zero, got {0}")]
    NonPositiveQuantity(u64),

    #[error("order price must be a finite, positive number, got {0}")]
    InvalidPrice(f64),
}

/// Failures surfaced by an [`crate::event::Observer`], most notably the
/// reference JSON-lines log sink.
///
/// A sink failure propagates out of the [`crate::orderbook::OrderBook`]
/// operation that triggered it rather than being swallowed.
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("failed to open log sink at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write event to log sink: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}
