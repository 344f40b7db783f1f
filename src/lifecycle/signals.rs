//! OS signal handling.
//!
//! # Responsibilities
//! - Translate Ctrl-C (SIGINT) into cancellation of an in-flight stream
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A stream that finishes on its own stops waiting for the signal

use crate::lifecycle::cancel::CancelToken;

/// Cancel `token` when the process receives Ctrl-C.
///
/// Returns as soon as either the signal arrives or the token is cancelled
/// by someone else.
pub async fn cancel_on_interrupt(token: CancelToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => {
                    tracing::info!("Interrupt received, stopping stream");
                    token.cancel();
                }
                Err(e) => tracing::error!(error = %e, "Failed to listen for interrupt"),
            }
        }
        _ = token.cancelled() => {}
    }
}
