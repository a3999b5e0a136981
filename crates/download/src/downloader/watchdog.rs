//! Pending-start watchdog

use relup_errors::DownloadError;
use relup_types::DownloadId;
use std::sync::Arc;
use tracing::{debug, warn};

use super::Inner;

impl Inner {
    /// Arm the one-shot timer for `id`, replacing any earlier one
    pub(super) fn arm_watchdog(self: &Arc<Self>, id: DownloadId) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if !state.is_current(id) || state.finished {
            return;
        }
        if let Some(previous) = state.watchdog_task.take() {
            previous.abort();
        }
        let inner = Arc::clone(self);
        let timeout = self.settings.pending_timeout;
        state.watchdog_task = Some(self.runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            inner.on_pending_timeout(id).await;
        }));
    }

    async fn on_pending_timeout(self: Arc<Self>, id: DownloadId) {
        // Aborting the timer may race with its expiry, so identity decides
        if !self.is_current(id) {
            debug!(id = %id, "watchdog fired for a stale download");
            return;
        }
        match self.service.is_pending(id).await {
            Ok(true) => self.fail_pending(id),
            Ok(false) => debug!(id = %id, "download left the pending phase in time"),
            Err(e) => warn!(id = %id, error = %e, "could not check pending download"),
        }
    }

    fn fail_pending(&self, id: DownloadId) {
        let guard = self.state.lock();
        let live = {
            let state = guard.borrow();
            state.is_current(id) && !state.finished
        };
        if live {
            self.finish_with_error(
                Some(id),
                DownloadError::PendingTimeout {
                    id: id.get(),
                    timeout_secs: self.settings.pending_timeout.as_secs(),
                },
            );
        }
        drop(guard);
    }
}
