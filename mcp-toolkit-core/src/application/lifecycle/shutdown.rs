use super::registry::ActiveToolkits;
use futures::future::join_all;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

static GLOBAL: Lazy<Arc<ShutdownCoordinator>> =
    Lazy::new(|| Arc::new(ShutdownCoordinator::new(ActiveToolkits::global())));

/// Cleans up every registered toolkit, at most once per coordinator.
pub struct ShutdownCoordinator {
    registry: Arc<ActiveToolkits>,
    fired: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new(registry: Arc<ActiveToolkits>) -> Self {
        Self {
            registry,
            fired: AtomicBool::new(false),
        }
    }

    /// Coordinator bound to [`ActiveToolkits::global`].
    pub fn global() -> Arc<ShutdownCoordinator> {
        Arc::clone(&GLOBAL)
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Run the sweep unless it already ran. Returns `true` for the call that ran it.
    ///
    /// Every member is cleaned up in its own task and all of them are awaited,
    /// so one slow or panicking cleanup cannot stop the others.
    pub async fn trigger(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            debug!("Shutdown sweep already ran; ignoring trigger");
            return false;
        }

        let members = self.registry.snapshot();
        info!(toolkit_count = members.len(), "Shutting down active toolkits");

        let cleanups = members.into_iter().map(|toolkit| {
            let name = toolkit.name().to_string();
            let handle = tokio::spawn(async move { toolkit.cleanup().await });
            async move { (name, handle.await) }
        });
        for (name, outcome) in join_all(cleanups).await {
            if let Err(err) = outcome {
                warn!(server = %name, %err, "Toolkit cleanup failed during shutdown");
            }
        }

        info!("Shutdown sweep complete");
        true
    }

    /// Wait for SIGINT or SIGTERM, then run the sweep.
    pub async fn listen(&self) -> bool {
        wait_for_termination_signal().await;
        self.trigger().await
    }

    /// Drive `work` to completion unless `signal` resolves first.
    ///
    /// On a signal the sweep runs while `work` is still alive, so toolkits it owns
    /// are cleaned up before they are dropped. Returns `None` when interrupted.
    pub async fn run_until<F, S>(&self, work: F, signal: S) -> Option<F::Output>
    where
        F: Future,
        S: Future<Output = ()>,
    {
        tokio::pin!(work);
        tokio::select! {
            output = &mut work => Some(output),
            () = signal => {
                self.trigger().await;
                None
            }
        }
    }

    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<bool> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move { coordinator.listen().await })
    }
}

/// Resolves on the first interrupt (Ctrl-C) or, on Unix, termination signal.
pub async fn wait_for_termination_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "failed to listen for interrupt signal");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(%err, "failed to listen for termination signal");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("Received interrupt signal"),
        _ = terminate => info!("Received termination signal"),
    }
}
