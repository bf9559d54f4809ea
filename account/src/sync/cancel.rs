//! Cancellation for the link-time profile poll.
//!
//! A `tokio::sync::watch<bool>` under the hood. The handle flips it to
//! `true`; dropping the handle counts as cancelling too, so a poll can never
//! outlive whoever started it.

use tokio::sync::watch;

/// Create a connected cancel handle and token.
pub fn link_cancellation() -> (LinkCancelHandle, LinkCancellation) {
    let (tx, rx) = watch::channel(false);
    (LinkCancelHandle { tx }, LinkCancellation { rx: Some(rx) })
}

/// Owner side: cancels the poll.
#[derive(Debug)]
pub struct LinkCancelHandle {
    tx: watch::Sender<bool>,
}

impl LinkCancelHandle {
    pub fn cancel(&self) {
        // No receivers left means nothing to cancel.
        let _ = self.tx.send(true);
    }
}

/// Poll side: checked between network attempts and raced against each one.
#[derive(Debug, Clone)]
pub struct LinkCancellation {
    rx: Option<watch::Receiver<bool>>,
}

impl LinkCancellation {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.rx {
            Some(rx) => *rx.borrow() || rx.has_changed().is_err(),
            None => false,
        }
    }

    /// Resolves once cancelled. Pending forever for [`LinkCancellation::never`].
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
