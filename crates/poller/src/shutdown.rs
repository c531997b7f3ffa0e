//! Termination signal handling.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancels the returned token on the first SIGINT, SIGQUIT or SIGTERM.
///
/// Handlers are registered before returning, so a signal that arrives right
/// after this call is not lost. Must be called inside a tokio runtime.
#[cfg(unix)]
pub fn install() -> std::io::Result<CancellationToken> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut int = signal(SignalKind::interrupt())?;
    let mut quit = signal(SignalKind::quit())?;
    let mut term = signal(SignalKind::terminate())?;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        let name = tokio::select! {
            _ = int.recv() => "SIGINT",
            _ = quit.recv() => "SIGQUIT",
            _ = term.recv() => "SIGTERM",
            _ = trigger.cancelled() => return,
        };
        info!(signal = name, "shutdown requested");
        trigger.cancel();
    });
    Ok(token)
}

/// Cancels the returned token on ctrl-c.
#[cfg(not(unix))]
pub fn install() -> std::io::Result<CancellationToken> {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if res.is_ok() {
                    info!("shutdown requested");
                    trigger.cancel();
                }
            }
            _ = trigger.cancelled() => {}
        }
    });
    Ok(token)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_starts_live_and_cancels_once() {
        let token = install().unwrap();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
