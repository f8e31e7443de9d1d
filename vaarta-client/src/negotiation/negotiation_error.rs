use thiserror::Error;
use vaarta_core::SignalError;

#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The message did not fit the session; it is ignored and the state is
    /// left unchanged.
    #[error(transparent)]
    Signal(#[from] SignalError),

    /// The platform peer connection failed; the call cannot continue.
    #[error("media failure: {0:#}")]
    Media(anyhow::Error),

    /// The operation was aborted by ending the call.
    #[error("cancelled")]
    Cancelled,
}
