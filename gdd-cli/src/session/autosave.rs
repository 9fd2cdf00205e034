//! Debounced autosave.
//!
//! [`AutosaveTimer`] is plain bookkeeping over `tokio::time::Instant`;
//! [`run_autosave`] drives it against a live session.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{EditingSession, SaveReport};

#[derive(Debug, Clone)]
pub struct AutosaveTimer {
    delay: Duration,
    deadline: Option<Instant>,
    saving: bool,
}

impl AutosaveTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            saving: false,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the debounce window. No deadline is set while a save is in flight.
    pub fn record_edit(&mut self, now: Instant) {
        if !self.saving {
            self.deadline = Some(now + self.delay);
        }
    }

    pub fn begin_save(&mut self) {
        self.saving = true;
        self.deadline = None;
    }

    /// A save resolved. Pending edits get a fresh window starting at `now`.
    pub fn finish_save(&mut self, now: Instant, has_pending_edits: bool) {
        self.saving = false;
        self.deadline = has_pending_edits.then(|| now + self.delay);
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Save `session` whenever its debounce window elapses, until `cancel` fires.
///
/// Edits wake the loop so the deadline is recomputed. The session lock is
/// not held while the save request is in flight.
pub async fn run_autosave(session: Arc<EditingSession>, cancel: CancellationToken) {
    loop {
        let deadline = session.autosave_deadline().await;

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = session.edited() => continue,
            _ = sleep_until_deadline(deadline) => {}
        }

        if !session.autosave_due().await {
            continue;
        }
        match session.save().await {
            Ok(SaveReport::Saved { version }) => debug!(version, "Autosaved section"),
            Ok(SaveReport::NothingToSave) => {}
            Err(e) => warn!("Autosave failed: {}", e),
        }
    }
    debug!("Autosave driver stopped");
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
