//! # Termination signals.
//!
//! [`wait_for_shutdown_signal`] completes on the first of `SIGINT`, `SIGTERM`
//! or `SIGQUIT` (Unix), or on Ctrl-C elsewhere. It backs
//! [`Broker::run_until_signal`](crate::Broker::run_until_signal).

use std::io;

/// Completes when a termination signal arrives.
///
/// Listeners are registered per call. Fails only if registration fails.
pub(crate) async fn wait_for_shutdown_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        let mut quit = signal(SignalKind::quit())?;
        let signal = tokio::select! {
            res = tokio::signal::ctrl_c() => { res?; "SIGINT" }
            _ = terminate.recv() => "SIGTERM",
            _ = quit.recv() => "SIGQUIT",
        };
        tracing::debug!(signal, "termination signal");
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::debug!(signal = "ctrl_c", "termination signal");
        Ok(())
    }
}
