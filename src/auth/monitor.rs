//! Periodic session re-check.
//!
//! Runs `is_authenticated()` on a fixed interval and publishes the result on
//! a `watch` channel so boundaries notice expiry without user interaction.

use super::Authenticator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default re-check interval.
pub const DEFAULT_RECHECK_INTERVAL_SECS: u64 = 60;

/// Handle to a running re-check loop.
pub struct SessionMonitor {
    state: watch::Receiver<bool>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SessionMonitor {
    /// Start re-checking every `interval`. The first check runs immediately.
    pub fn spawn(auth: Arc<Authenticator>, interval: Duration) -> Self {
        let (state_tx, state_rx) = watch::channel(auth.is_authenticated());
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                let authenticated = auth.is_authenticated();
                let previous = *state_tx.borrow();
                if previous != authenticated {
                    if authenticated {
                        tracing::info!("Session became active");
                    } else {
                        tracing::info!("Session no longer valid");
                    }
                }

                if state_tx.send(authenticated).is_err() {
                    tracing::debug!("No session observers left; stopping monitor");
                    break;
                }
            }
        });

        Self {
            state: state_rx,
            shutdown: shutdown_tx,
            task,
        }
    }

    /// A receiver that yields the latest authentication state.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.clone()
    }

    /// Last published state.
    pub fn is_authenticated(&self) -> bool {
        *self.state.borrow()
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{KeyRegistry, ManualClock, SessionLifetimes};
    use crate::storage::MemoryKvStore;
    use chrono::{TimeZone, Utc};

    fn setup() -> (Arc<ManualClock>, Arc<Authenticator>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
        ));
        let auth = Arc::new(Authenticator::new(
            Arc::new(MemoryKvStore::new()),
            Arc::new(KeyRegistry::from_keys(["AAA111"])),
            clock.clone(),
            SessionLifetimes::default(),
        ));
        (clock, auth)
    }

    #[tokio::test]
    async fn publishes_expiry() {
        let (clock, auth) = setup();
        assert!(auth.login("AAA111"));

        let monitor = SessionMonitor::spawn(auth.clone(), Duration::from_millis(10));
        let mut rx = monitor.subscribe();
        assert!(*rx.borrow());

        clock.advance(chrono::Duration::hours(25));
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| !*v))
            .await
            .expect("monitor should observe expiry")
            .unwrap();

        assert!(!monitor.is_authenticated());
        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn publishes_login() {
        let (_clock, auth) = setup();
        let monitor = SessionMonitor::spawn(auth.clone(), Duration::from_millis(10));
        let mut rx = monitor.subscribe();
        assert!(!*rx.borrow());

        assert!(auth.login("AAA111"));
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| *v))
            .await
            .expect("monitor should observe login")
            .unwrap();

        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_stops_loop() {
        let (_clock, auth) = setup();
        let monitor = SessionMonitor::spawn(auth, Duration::from_secs(3600));
        tokio::time::timeout(Duration::from_secs(5), monitor.shutdown())
            .await
            .expect("shutdown should complete promptly");
    }
}
