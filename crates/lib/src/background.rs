//! Detached background work (storage writes, notification fan-out).
//!
//! Handlers run on the decode loop and must not wait on I/O, so they submit futures
//! here and return. In detached mode nothing is kept; in tracked mode join handles
//! are collected so callers (tests, graceful shutdown) can wait until all work,
//! including work spawned by work, has finished.

use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

#[derive(Clone, Default)]
pub struct Background {
    tracked: Option<Arc<Mutex<Vec<JoinHandle<()>>>>>,
}

impl Background {
    /// Fire-and-forget: spawned tasks are not observed.
    pub fn detached() -> Self {
        Self { tracked: None }
    }

    /// Keep join handles so [`Background::wait_idle`] can await them.
    pub fn tracked() -> Self {
        Self {
            tracked: Some(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Spawn `fut` on the tokio runtime. `what` names the work in logs.
    pub fn spawn<F>(&self, what: &'static str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        log::trace!("background: spawning {}", what);
        let handle = tokio::spawn(fut);
        if let Some(ref tracked) = self.tracked {
            let mut g = tracked.lock().unwrap_or_else(|e| e.into_inner());
            g.retain(|h| !h.is_finished());
            g.push(handle);
        }
    }

    /// Wait for every tracked task. Returns immediately in detached mode.
    pub async fn wait_idle(&self) {
        let Some(ref tracked) = self.tracked else {
            return;
        };
        loop {
            let handles = {
                let mut g = tracked.lock().unwrap_or_else(|e| e.into_inner());
                std::mem::take(&mut *g)
            };
            if handles.is_empty() {
                break;
            }
            for h in handles {
                if let Err(e) = h.await {
                    log::error!("background: task failed: {}", e);
                }
            }
        }
    }
}
