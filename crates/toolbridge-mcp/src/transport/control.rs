//! Start/stop coordination shared by the transports.

use std::sync::Mutex;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::types::{McpError, McpResult};

/// Tokens for one `start` run. Both are children of the start context.
#[derive(Debug, Clone)]
pub(crate) struct RunTokens {
    /// Stop accepting new work and let in-flight requests finish.
    pub stop: CancellationToken,
    /// Parent of every request context; cancelling it aborts in-flight work.
    pub force: CancellationToken,
}

#[derive(Debug)]
pub(crate) struct RunControl {
    running: watch::Sender<bool>,
    tokens: Mutex<Option<RunTokens>>,
}

impl RunControl {
    pub fn new() -> Self {
        Self {
            running: watch::channel(false).0,
            tokens: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Claim a run. `None` when one is already active.
    pub fn begin(&self, ctx: &CancellationToken) -> Option<RunTokens> {
        let mut claimed = false;
        self.running.send_if_modified(|running| {
            if *running {
                return false;
            }
            *running = true;
            claimed = true;
            true
        });
        if !claimed {
            return None;
        }

        let tokens = RunTokens {
            stop: ctx.child_token(),
            force: ctx.child_token(),
        };
        if let Ok(mut slot) = self.tokens.lock() {
            *slot = Some(tokens.clone());
        }
        Some(tokens)
    }

    pub fn finish(&self) {
        if let Ok(mut slot) = self.tokens.lock() {
            *slot = None;
        }
        self.running.send_replace(false);
    }

    /// Ask the active run to stop and wait until it has. Once `ctx` is
    /// cancelled, requests still in flight are cancelled as well.
    pub async fn stop(&self, ctx: CancellationToken) -> McpResult<()> {
        let tokens = self
            .tokens
            .lock()
            .map_err(|e| McpError::Transport(e.to_string()))?
            .clone();
        let Some(tokens) = tokens else {
            return Ok(());
        };

        let mut idle = self.running.subscribe();
        tokens.stop.cancel();
        tokio::select! {
            _ = wait_idle(&mut idle) => {}
            _ = ctx.cancelled() => {
                tracing::warn!("Stop deadline reached, cancelling in-flight requests");
                tokens.force.cancel();
                wait_idle(&mut idle).await;
            }
        }
        Ok(())
    }
}

async fn wait_idle(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|running| !*running).await;
}
