//! # OS termination signals.
//!
//! Unix: `SIGINT`, `SIGTERM`, `SIGQUIT` (and Ctrl-C). Elsewhere: Ctrl-C only.

/// Completes when the process is asked to terminate.
///
/// Errors only when the signal handlers cannot be registered.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Completes when the process is asked to terminate.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
