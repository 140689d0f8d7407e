//! Opaque units of work handed to the schedulers.
//!
//! The schedulers never look inside a [`Work`]; they only care whether it
//! returned a value or failed. Panics count as failures.

use std::any::Any;
use std::future::Future;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

/// Error type returned by caller-supplied work.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by caller-supplied work.
pub type WorkResult<T> = std::result::Result<T, BoxError>;

enum Kind<T> {
    Async(BoxFuture<'static, WorkResult<T>>),
    Blocking(Box<dyn FnOnce() -> WorkResult<T> + Send + 'static>),
}

/// A unit of work queued for serial execution.
pub struct Work<T> {
    kind: Kind<T>,
}

impl<T: Send + 'static> Work<T> {
    /// Wrap an async computation (e.g. a call to the generation backend).
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = WorkResult<T>> + Send + 'static,
    {
        Self {
            kind: Kind::Async(future.boxed()),
        }
    }

    /// Wrap a blocking computation. It runs on tokio's blocking pool so the
    /// async workers stay responsive.
    pub fn blocking<F>(f: F) -> Self
    where
        F: FnOnce() -> WorkResult<T> + Send + 'static,
    {
        Self {
            kind: Kind::Blocking(Box::new(f)),
        }
    }

    /// Execute the work in its own task and turn every failure mode into an
    /// error message.
    pub(crate) async fn run(self) -> std::result::Result<T, String> {
        let handle = match self.kind {
            Kind::Async(future) => tokio::spawn(future),
            Kind::Blocking(f) => tokio::task::spawn_blocking(f),
        };

        match handle.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(join_err) if join_err.is_panic() => {
                Err(format!("Work panicked: {}", panic_message(join_err.into_panic())))
            }
            Err(join_err) => Err(join_err.to_string()),
        }
    }
}

impl<T> std::fmt::Debug for Work<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            Kind::Async(_) => "async",
            Kind::Blocking(_) => "blocking",
        };
        f.debug_struct("Work").field("kind", &kind).finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
