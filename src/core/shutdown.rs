use std::{future::pending, time::Duration};

use tokio::{sync::watch, time::sleep};

use crate::prelude::*;

/// Requests the shutdown of all the tasks holding a [`Shutdown`].
pub struct ShutdownTrigger(watch::Sender<bool>);

impl ShutdownTrigger {
    pub fn trigger(&self) {
        info!("shutting down…");
        self.0.send_replace(true);
    }
}

/// Cloneable shutdown signal.
#[derive(Clone)]
pub struct Shutdown(watch::Receiver<bool>);

#[must_use]
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownTrigger(sender), Shutdown(receiver))
}

impl Shutdown {
    /// Signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        Self(watch::channel(false).1)
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        *self.0.borrow()
    }

    /// Wait until the shutdown is requested.
    pub async fn requested(&self) {
        let mut receiver = self.0.clone();
        if receiver.wait_for(|is_requested| *is_requested).await.is_err() {
            // The trigger is gone, so nobody can request the shutdown anymore.
            pending::<()>().await;
        }
    }

    /// Sleep for the duration unless interrupted.
    ///
    /// Returns `false` when the shutdown has been requested before the time was up.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            () = sleep(duration) => true,
            () = self.requested() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sleep_completes_without_shutdown() {
        let (_trigger, shutdown) = channel();
        let start = Instant::now();
        assert!(shutdown.sleep(Duration::from_secs(5)).await);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_is_interrupted() {
        let (trigger, shutdown) = channel();
        let start = Instant::now();
        let sleeper = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { shutdown.sleep(Duration::from_secs(3600)).await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.trigger();
        assert!(!sleeper.await.unwrap());
        assert!(start.elapsed() < Duration::from_secs(3600));
        assert!(shutdown.is_requested());
    }

    #[tokio::test(start_paused = true)]
    async fn never_does_not_fire() {
        let shutdown = Shutdown::never();
        assert!(shutdown.sleep(Duration::from_secs(10)).await);
        assert!(!shutdown.is_requested());
    }
}
