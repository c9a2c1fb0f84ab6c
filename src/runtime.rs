//! Task scaffolding shared by channels and background jobs.
//!
//! A [`Component`] captures whatever state it needs at construction and is
//! handed to [`spawn_components`], which runs each one as its own Tokio task.
//! Any component error cancels the shared [`CancellationToken`] so siblings
//! stop cooperatively.

use std::future::Future;
use std::pin::Pin;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::AppError;

pub type ComponentFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// An independently runnable unit: a console, an HTTP listener, a pruner.
pub trait Component: Send + 'static {
    /// Stable identifier used in log lines.
    fn id(&self) -> &str;

    /// Consume the component and return its run loop. The loop must return
    /// once `shutdown` is cancelled.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture;
}

/// Resolves when every spawned component has exited.
pub struct RuntimeHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl RuntimeHandle {
    /// Await all components and return the first error, if any.
    pub async fn join(self) -> Result<(), AppError> {
        match self.inner.await {
            Ok(r) => r,
            Err(e) => Err(AppError::Runtime(format!("component manager panicked: {e}"))),
        }
    }
}

/// Spawn each component and return a handle for the whole set.
///
/// On the first error or panic, `shutdown` is cancelled and the remaining
/// components are drained; the first error is returned from
/// [`RuntimeHandle::join`].
pub fn spawn_components(components: Vec<Box<dyn Component>>, shutdown: CancellationToken) -> RuntimeHandle {
    let handle = tokio::spawn(async move {
        let mut set: JoinSet<Result<(), AppError>> = JoinSet::new();

        for component in components {
            debug!(component = component.id(), "spawning component");
            set.spawn(component.run(shutdown.clone()));
        }

        let mut first_err: Option<AppError> = None;

        while let Some(res) = set.join_next().await {
            match res {
                Err(e) => {
                    error!("component panicked: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert_with(|| AppError::Runtime(format!("component panicked: {e}")));
                }
                Ok(Err(e)) => {
                    error!("component error: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert(e);
                }
                Ok(Ok(())) => {}
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    });

    RuntimeHandle { inner: handle }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Waiter;

    impl Component for Waiter {
        fn id(&self) -> &str {
            "waiter"
        }

        fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async move {
                shutdown.cancelled().await;
                Ok(())
            })
        }
    }

    struct Failer;

    impl Component for Failer {
        fn id(&self) -> &str {
            "failer"
        }

        fn run(self: Box<Self>, _shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async { Err(AppError::Comms("bind failed".into())) })
        }
    }

    #[tokio::test]
    async fn clean_shutdown_joins_ok() {
        let token = CancellationToken::new();
        let handle = spawn_components(vec![Box::new(Waiter), Box::new(Waiter)], token.clone());
        token.cancel();
        assert!(handle.join().await.is_ok());
    }

    #[tokio::test]
    async fn error_cancels_siblings() {
        let token = CancellationToken::new();
        let handle = spawn_components(vec![Box::new(Waiter), Box::new(Failer)], token.clone());
        let err = handle.join().await.unwrap_err();
        assert!(err.to_string().contains("bind failed"));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn empty_set_finishes_immediately() {
        let handle = spawn_components(Vec::new(), CancellationToken::new());
        assert!(handle.join().await.is_ok());
    }
}
