// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity signal and reconnect detection.
//!
//! The signal is a `watch` channel holding "online right now". Mutations
//! sample it once per call; the reconnect watcher turns offline→online
//! edges into reconciliation requests once the link has stayed up for the
//! debounce window.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Shared, cloneable connectivity flag.
#[derive(Debug, Clone)]
pub struct ConnectivitySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivitySignal {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        ConnectivitySignal { tx: Arc::new(tx) }
    }

    /// Updates the flag. Subscribers are only woken on an actual change.
    pub fn set(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!("connectivity: {}", if online { "online" } else { "offline" });
        }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Debounced offline→online edge detector.
#[derive(Debug)]
pub struct ReconnectWatch {
    rx: watch::Receiver<bool>,
    debounce: Duration,
    /// Last state that held for the full debounce window.
    stable_online: bool,
}

impl ReconnectWatch {
    pub fn new(mut rx: watch::Receiver<bool>, debounce: Duration) -> Self {
        let stable_online = *rx.borrow_and_update();
        ReconnectWatch {
            rx,
            debounce,
            stable_online,
        }
    }

    /// Waits for the next offline→online edge that survives the debounce
    /// window. Returns false once the signal is gone.
    ///
    /// Cancel safe: dropping the future mid-debounce restarts the window on
    /// the next call.
    pub async fn next_reconnect(&mut self) -> bool {
        loop {
            let online = *self.rx.borrow_and_update();
            if !online {
                self.stable_online = false;
            } else if !self.stable_online {
                match tokio::time::timeout(self.debounce, wait_for_offline(&mut self.rx)).await {
                    Err(_) => {
                        self.stable_online = true;
                        return true;
                    }
                    Ok(true) => {
                        debug!("connectivity flapped within {:?}, ignoring", self.debounce);
                        continue;
                    }
                    Ok(false) => return false,
                }
            }

            if self.rx.changed().await.is_err() {
                return false;
            }
        }
    }
}

/// Resolves true when the signal drops to offline, false if it closes.
async fn wait_for_offline(rx: &mut watch::Receiver<bool>) -> bool {
    loop {
        if rx.changed().await.is_err() {
            return false;
        }
        if !*rx.borrow_and_update() {
            return true;
        }
    }
}

/// Feeds the signal from a reachability probe every `interval` until
/// cancelled.
pub async fn probe_loop<F, Fut>(
    signal: ConnectivitySignal,
    interval: Duration,
    cancel: CancellationToken,
    mut probe: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let online = probe().await;
                signal.set(online);
            }
        }
    }
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
