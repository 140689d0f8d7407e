//! One-shot completion signal shared between the worker and waiting callers.

use tokio::sync::watch;

/// Worker side of a completion signal.
#[derive(Debug)]
pub(crate) struct CompletionTrigger {
    tx: watch::Sender<bool>,
}

impl CompletionTrigger {
    pub(crate) fn fire(&self) {
        self.tx.send_replace(true);
    }
}

/// Caller side of a completion signal.
///
/// Clones observe the same signal, so several tasks may wait on one request.
#[derive(Debug, Clone)]
pub struct Completion {
    rx: watch::Receiver<bool>,
}

impl Completion {
    /// Wait until the request's result has been published.
    ///
    /// Also returns if the scheduler is dropped before the request ran.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|done| *done).await;
    }

    /// Non-blocking check.
    pub fn is_complete(&self) -> bool {
        *self.rx.borrow()
    }
}

pub(crate) fn signal() -> (CompletionTrigger, Completion) {
    let (tx, rx) = watch::channel(false);
    (CompletionTrigger { tx }, Completion { rx })
}
