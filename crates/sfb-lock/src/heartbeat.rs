//! Background lease renewal.
//!
//! One task per worker. It shares nothing with the main loop except two
//! watch signals: `stop` (set by the worker on shutdown) and `lock_lost`
//! (set here on any heartbeat failure). Any failure, including a transient
//! store error, counts as loss of the lock; the worker must abort cleanly
//! without releasing.

use std::sync::Arc;
use std::time::Duration;

use sfb_store::ObjectStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ops::{heartbeat, LockRequest, LockSettings};

pub struct HeartbeatHandle {
    stop_tx: watch::Sender<bool>,
    lock_lost_rx: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// True once any heartbeat has failed.
    pub fn lock_lost(&self) -> bool {
        *self.lock_lost_rx.borrow()
    }

    /// Signal the task to stop and wait (bounded) for it to notice.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        let _ = tokio::time::timeout(Duration::from_secs(5), self.task).await;
    }
}

/// Spawn the renewal task. It sleeps `interval`, heartbeats, and repeats
/// until stopped or until a heartbeat fails.
pub fn spawn_heartbeat(
    store: Arc<dyn ObjectStore>,
    settings: LockSettings,
    request: LockRequest,
    interval: Duration,
) -> HeartbeatHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let (lock_lost_tx, lock_lost_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        return;
                    }
                }
                () = tokio::time::sleep(interval) => {
                    match heartbeat(store.as_ref(), &settings, &request).await {
                        Ok(doc) => {
                            debug!(generation = doc.generation, "lock heartbeat ok");
                        }
                        Err(err) => {
                            warn!(%err, "lock heartbeat failed; flagging lock as lost");
                            let _ = lock_lost_tx.send(true);
                            return;
                        }
                    }
                }
            }
        }
    });

    HeartbeatHandle {
        stop_tx,
        lock_lost_rx,
        task,
    }
}
